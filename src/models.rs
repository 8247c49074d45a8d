use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Applied,
    Screening,
    Interviewing,
    Offer,
    Rejected,
    Withdrawn,
}

impl JobStatus {
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Screening => "Screening",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
            JobStatus::Withdrawn => "Withdrawn",
        }
    }

    /// Closed applications no longer count as active.
    pub fn is_active(self) -> bool {
        !matches!(self, JobStatus::Rejected | JobStatus::Withdrawn)
    }

    pub fn all() -> Vec<JobStatus> {
        JobStatus::iter().collect()
    }

    /// Next status in declaration order, wrapping around.
    pub fn cycle(self, forward: bool) -> JobStatus {
        let all = JobStatus::all();
        let idx = all.iter().position(|s| *s == self).unwrap_or(0);
        let next = if forward {
            (idx + 1) % all.len()
        } else {
            (idx + all.len() - 1) % all.len()
        };
        all[next]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: i64,
    pub company: String,
    pub position: String,
    pub status: JobStatus,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_url: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub email_id: Option<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub applied_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::required")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    pub items: Vec<JobApplication>,
    pub total: i64,
}

/// Body of `POST /jobs`. Blank optional fields travel as explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDraft {
    pub company: String,
    pub position: String,
    pub status: JobStatus,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_url: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub applied_date: Option<DateTime<Utc>>,
}

/// Body of `PATCH /jobs/{id}`.
///
/// `None` leaves a field untouched on the server; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<Option<DateTime<Utc>>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl From<JobDraft> for JobPatch {
    fn from(draft: JobDraft) -> Self {
        Self {
            company: Some(draft.company),
            position: Some(draft.position),
            status: Some(draft.status),
            location: Some(draft.location),
            salary_range: Some(draft.salary_range),
            job_url: Some(draft.job_url),
            source: Some(draft.source),
            notes: Some(draft.notes),
            applied_date: Some(draft.applied_date),
        }
    }
}

/// Filters accepted by `GET /jobs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<JobStatus>,
    pub search: Option<String>,
}

impl JobQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(skip) = self.skip {
            params.push(("skip", skip.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUrl {
    pub auth_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncReport {
    pub message: String,
    #[serde(default)]
    pub emails_found: Option<u32>,
    #[serde(default)]
    pub new_applications: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GmailProbe {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub total_messages: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Backend timestamps arrive either as RFC 3339 or as naive ISO datetimes
/// (SQLite drops the offset). Naive values are taken as UTC.
pub mod timestamp {
    use super::*;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};
    use std::str::FromStr;

    const JOB_JSON: &str = r#"{
        "id": 7,
        "company": "Google",
        "position": "SRE",
        "status": "interviewing",
        "location": null,
        "salary_range": null,
        "job_url": "https://careers.google.com/7",
        "source": "LinkedIn",
        "notes": null,
        "email_id": null,
        "applied_date": "2024-03-15T00:00:00",
        "created_at": "2024-03-16T10:11:12.123456",
        "updated_at": "2024-03-16T10:11:12Z"
    }"#;

    #[test]
    fn test_status_parses_only_known_values() {
        assert_eq!(JobStatus::from_str("offer").unwrap(), JobStatus::Offer);
        assert_eq!(JobStatus::from_str("withdrawn").unwrap(), JobStatus::Withdrawn);
        assert!(JobStatus::from_str("ghosted").is_err());
        assert!(JobStatus::from_str("").is_err());
        assert_eq!(JobStatus::default(), JobStatus::Applied);
        assert_eq!(JobStatus::all().len(), 6);
    }

    #[test]
    fn test_status_cycle_wraps() {
        assert_eq!(JobStatus::Withdrawn.cycle(true), JobStatus::Applied);
        assert_eq!(JobStatus::Applied.cycle(false), JobStatus::Withdrawn);
        assert_eq!(JobStatus::Screening.cycle(true), JobStatus::Interviewing);
    }

    #[test]
    fn test_job_decodes_naive_and_offset_timestamps() {
        let job: JobApplication = serde_json::from_str(JOB_JSON).unwrap();
        assert_eq!(job.status, JobStatus::Interviewing);
        let applied = job.applied_date.unwrap();
        assert_eq!(applied.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(job.created_at.day(), 16);
        assert_eq!(job.updated_at.year(), 2024);
    }

    #[test]
    fn test_job_with_unknown_status_is_rejected() {
        let bad = JOB_JSON.replace("\"interviewing\"", "\"ghosted\"");
        let result: Result<JobApplication, _> = serde_json::from_str(&bad);
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_distinguishes_absent_from_null() {
        let patch = JobPatch::status(JobStatus::Offer);
        assert_eq!(serde_json::to_value(&patch).unwrap(), serde_json::json!({"status": "offer"}));

        let clearing = JobPatch {
            notes: Some(None),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&clearing).unwrap(), serde_json::json!({"notes": null}));
        assert_eq!(serde_json::to_value(JobPatch::default()).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_query_params_skip_empty_search() {
        let query = JobQuery {
            limit: Some(100),
            status: Some(JobStatus::Rejected),
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            query.to_params(),
            vec![("limit", "100".to_string()), ("status", "rejected".to_string())]
        );
    }

    #[test]
    fn test_gmail_probe_tolerates_missing_fields() {
        let probe: GmailProbe = serde_json::from_str(r#"{"connected": false, "error": "no token"}"#).unwrap();
        assert!(!probe.connected);
        assert_eq!(probe.error.as_deref(), Some("no token"));
        assert!(probe.email.is_none());
    }
}
