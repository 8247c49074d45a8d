use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    AuthStatus, GmailProbe, JobApplication, JobDraft, JobList, JobPatch, JobQuery, LoginUrl,
    SyncReport,
};

// --- Backend trait ---

/// The job-tracker REST surface, one method per endpoint.
///
/// Implementations never retry; failures come back exactly as observed.
pub trait Backend: Send + Sync {
    fn auth_status(&self) -> Result<AuthStatus, ApiError>;
    fn login_url(&self) -> Result<String, ApiError>;
    fn logout(&self) -> Result<(), ApiError>;
    fn list_jobs(&self, query: &JobQuery) -> Result<JobList, ApiError>;
    fn get_job(&self, id: i64) -> Result<JobApplication, ApiError>;
    fn create_job(&self, draft: &JobDraft) -> Result<JobApplication, ApiError>;
    fn update_job(&self, id: i64, patch: &JobPatch) -> Result<JobApplication, ApiError>;
    fn delete_job(&self, id: i64) -> Result<(), ApiError>;
    fn sync_gmail(&self) -> Result<SyncReport, ApiError>;
    fn test_gmail(&self) -> Result<GmailProbe, ApiError>;
}

// --- HTTP backend ---

pub struct HttpBackend {
    base: Url,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let base = config.api_base()?;

        // The session travels as cookies; the jar also keeps whatever the backend sets.
        let jar = Arc::new(Jar::default());
        if let Some(cookie) = config.session_cookie.as_deref().filter(|c| !c.is_empty()) {
            jar.add_cookie_str(cookie, &base);
        }

        let client = Client::builder()
            .cookie_provider(jar)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Transport(format!("invalid URL for '{}': {}", path, e)))
    }

    fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "backend rejected request");
        Err(ApiError::Http {
            status: status.as_u16(),
            detail: ApiError::detail_from_body(&body),
        })
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.execute(request)?
            .json::<T>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl Backend for HttpBackend {
    fn auth_status(&self) -> Result<AuthStatus, ApiError> {
        tracing::debug!("GET /auth/status");
        self.fetch(self.client.get(self.url("auth/status")?))
    }

    fn login_url(&self) -> Result<String, ApiError> {
        tracing::debug!("GET /auth/login");
        let login: LoginUrl = self.fetch(self.client.get(self.url("auth/login")?))?;
        Ok(login.auth_url)
    }

    fn logout(&self) -> Result<(), ApiError> {
        tracing::debug!("POST /auth/logout");
        self.execute(self.client.post(self.url("auth/logout")?))?;
        Ok(())
    }

    fn list_jobs(&self, query: &JobQuery) -> Result<JobList, ApiError> {
        let params = query.to_params();
        tracing::debug!(?params, "GET /jobs");
        self.fetch(self.client.get(self.url("jobs")?).query(&params))
    }

    fn get_job(&self, id: i64) -> Result<JobApplication, ApiError> {
        tracing::debug!(id, "GET /jobs/{{id}}");
        self.fetch(self.client.get(self.url(&format!("jobs/{}", id))?))
    }

    fn create_job(&self, draft: &JobDraft) -> Result<JobApplication, ApiError> {
        tracing::debug!(company = %draft.company, "POST /jobs");
        self.fetch(self.client.post(self.url("jobs")?).json(draft))
    }

    fn update_job(&self, id: i64, patch: &JobPatch) -> Result<JobApplication, ApiError> {
        tracing::debug!(id, "PATCH /jobs/{{id}}");
        self.fetch(self.client.patch(self.url(&format!("jobs/{}", id))?).json(patch))
    }

    fn delete_job(&self, id: i64) -> Result<(), ApiError> {
        tracing::debug!(id, "DELETE /jobs/{{id}}");
        self.execute(self.client.delete(self.url(&format!("jobs/{}", id))?))?;
        Ok(())
    }

    fn sync_gmail(&self) -> Result<SyncReport, ApiError> {
        tracing::debug!("GET /gmail/sync");
        self.fetch(self.client.get(self.url("gmail/sync")?))
    }

    fn test_gmail(&self) -> Result<GmailProbe, ApiError> {
        tracing::debug!("GET /gmail/test");
        self.fetch(self.client.get(self.url("gmail/test")?))
    }
}

// --- In-memory backend for tests ---

#[cfg(test)]
pub mod memory {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    use crate::models::JobStatus;

    #[derive(Default)]
    struct State {
        jobs: Vec<JobApplication>,
        next_id: i64,
        auth: AuthStatus,
        fail_next: Option<ApiError>,
        sync_adds: Vec<(String, String, JobStatus)>,
        calls: Vec<String>,
    }

    /// Mirrors the backend's behavior closely enough for the cache tests.
    #[derive(Default)]
    pub struct MemoryBackend {
        state: Mutex<State>,
    }

    pub fn job(id: i64, company: &str, position: &str, status: JobStatus) -> JobApplication {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        JobApplication {
            id,
            company: company.to_string(),
            position: position.to_string(),
            status,
            location: None,
            salary_range: None,
            job_url: None,
            source: None,
            notes: None,
            email_id: None,
            applied_date: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    impl MemoryBackend {
        pub fn with_jobs(jobs: Vec<JobApplication>) -> Self {
            let next_id = jobs.iter().map(|j| j.id).max().unwrap_or(0) + 1;
            Self {
                state: Mutex::new(State {
                    jobs,
                    next_id,
                    ..Default::default()
                }),
            }
        }

        pub fn set_auth(&self, auth: AuthStatus) {
            self.state.lock().unwrap().auth = auth;
        }

        /// The next call of any kind fails with `err`.
        pub fn fail_next(&self, err: ApiError) {
            self.state.lock().unwrap().fail_next = Some(err);
        }

        /// Applications the next Gmail sync will create.
        pub fn queue_sync(&self, company: &str, position: &str, status: JobStatus) {
            self.state
                .lock()
                .unwrap()
                .sync_adds
                .push((company.to_string(), position.to_string(), status));
        }

        pub fn jobs(&self) -> Vec<JobApplication> {
            self.state.lock().unwrap().jobs.clone()
        }

        pub fn calls(&self) -> Vec<String> {
            self.state.lock().unwrap().calls.clone()
        }

        fn enter(&self, call: &str) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.to_string());
            match state.fail_next.take() {
                Some(err) => Err(err),
                None => Ok(state),
            }
        }

        fn not_found() -> ApiError {
            ApiError::Http {
                status: 404,
                detail: Some("Job application not found".to_string()),
            }
        }
    }

    impl Backend for MemoryBackend {
        fn auth_status(&self) -> Result<AuthStatus, ApiError> {
            Ok(self.enter("auth_status")?.auth.clone())
        }

        fn login_url(&self) -> Result<String, ApiError> {
            self.enter("login_url")?;
            Ok("https://accounts.example.com/o/oauth2/auth?client_id=test".to_string())
        }

        fn logout(&self) -> Result<(), ApiError> {
            self.enter("logout")?.auth = AuthStatus::default();
            Ok(())
        }

        fn list_jobs(&self, query: &JobQuery) -> Result<JobList, ApiError> {
            let state = self.enter("list_jobs")?;
            let needle = query.search.as_deref().map(str::to_lowercase);
            let matching: Vec<JobApplication> = state
                .jobs
                .iter()
                .filter(|j| query.status.is_none_or(|s| j.status == s))
                .filter(|j| {
                    needle.as_deref().is_none_or(|n| {
                        j.company.to_lowercase().contains(n) || j.position.to_lowercase().contains(n)
                    })
                })
                .cloned()
                .collect();
            let total = matching.len() as i64;
            let items = matching
                .into_iter()
                .skip(query.skip.unwrap_or(0) as usize)
                .take(query.limit.unwrap_or(50) as usize)
                .collect();
            Ok(JobList { items, total })
        }

        fn get_job(&self, id: i64) -> Result<JobApplication, ApiError> {
            let state = self.enter("get_job")?;
            state.jobs.iter().find(|j| j.id == id).cloned().ok_or_else(Self::not_found)
        }

        fn create_job(&self, draft: &JobDraft) -> Result<JobApplication, ApiError> {
            let mut state = self.enter("create_job")?;
            let id = state.next_id;
            state.next_id += 1;
            let mut created = job(id, &draft.company, &draft.position, draft.status);
            created.location = draft.location.clone();
            created.salary_range = draft.salary_range.clone();
            created.job_url = draft.job_url.clone();
            created.source = draft.source.clone();
            created.notes = draft.notes.clone();
            created.applied_date = draft.applied_date;
            state.jobs.push(created.clone());
            Ok(created)
        }

        fn update_job(&self, id: i64, patch: &JobPatch) -> Result<JobApplication, ApiError> {
            let mut state = self.enter("update_job")?;
            let job = state
                .jobs
                .iter_mut()
                .find(|j| j.id == id)
                .ok_or_else(Self::not_found)?;
            if let Some(company) = &patch.company {
                job.company = company.clone();
            }
            if let Some(position) = &patch.position {
                job.position = position.clone();
            }
            if let Some(status) = patch.status {
                job.status = status;
            }
            if let Some(location) = &patch.location {
                job.location = location.clone();
            }
            if let Some(salary_range) = &patch.salary_range {
                job.salary_range = salary_range.clone();
            }
            if let Some(job_url) = &patch.job_url {
                job.job_url = job_url.clone();
            }
            if let Some(source) = &patch.source {
                job.source = source.clone();
            }
            if let Some(notes) = &patch.notes {
                job.notes = notes.clone();
            }
            if let Some(applied_date) = patch.applied_date {
                job.applied_date = applied_date;
            }
            Ok(job.clone())
        }

        fn delete_job(&self, id: i64) -> Result<(), ApiError> {
            let mut state = self.enter("delete_job")?;
            let before = state.jobs.len();
            state.jobs.retain(|j| j.id != id);
            if state.jobs.len() == before {
                return Err(Self::not_found());
            }
            Ok(())
        }

        fn sync_gmail(&self) -> Result<SyncReport, ApiError> {
            let mut state = self.enter("sync_gmail")?;
            let adds = std::mem::take(&mut state.sync_adds);
            let found = adds.len() as u32;
            for (company, position, status) in adds {
                let id = state.next_id;
                state.next_id += 1;
                let mut added = job(id, &company, &position, status);
                added.email_id = Some(format!("msg-{}", id));
                added.source = Some("Gmail".to_string());
                state.jobs.push(added);
            }
            Ok(SyncReport {
                message: format!(
                    "Sync complete. Found {} job emails, added {} new applications.",
                    found, found
                ),
                emails_found: Some(found),
                new_applications: Some(found),
            })
        }

        fn test_gmail(&self) -> Result<GmailProbe, ApiError> {
            let state = self.enter("test_gmail")?;
            Ok(GmailProbe {
                connected: state.auth.authenticated,
                email: state.auth.email.clone(),
                total_messages: None,
                error: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{job, MemoryBackend};
    use super::*;
    use crate::models::JobStatus;

    #[test]
    fn test_http_backend_builds_from_config() {
        let config = Config {
            api_url: "http://127.0.0.1:8000".to_string(),
            session_cookie: Some("session=abc".to_string()),
            ..Default::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.base_url().as_str(), "http://127.0.0.1:8000/");
        assert_eq!(
            backend.url("jobs/12").unwrap().as_str(),
            "http://127.0.0.1:8000/jobs/12"
        );
    }

    #[test]
    fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) is closed on any sane test host.
        let config = Config {
            api_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        let err = backend.auth_status().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
    }

    #[test]
    fn test_memory_backend_filters_like_server() {
        let backend = MemoryBackend::with_jobs(vec![
            job(1, "Google", "SRE", JobStatus::Applied),
            job(2, "Amazon", "Backend Engineer", JobStatus::Rejected),
            job(3, "Stripe", "Google Pay integrations", JobStatus::Applied),
        ]);

        let list = backend
            .list_jobs(&JobQuery {
                search: Some("GOOGLE".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(list.total, 2);

        let list = backend
            .list_jobs(&JobQuery {
                status: Some(JobStatus::Rejected),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].company, "Amazon");
    }
}
