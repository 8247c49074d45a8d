use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};

use crate::error::FormError;
use crate::models::{JobApplication, JobDraft, JobPatch, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Field {
    Company,
    Position,
    Status,
    AppliedDate,
    Location,
    Source,
    SalaryRange,
    JobUrl,
    Notes,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Company => "Company *",
            Field::Position => "Position *",
            Field::Status => "Status",
            Field::AppliedDate => "Applied Date",
            Field::Location => "Location",
            Field::Source => "Source",
            Field::SalaryRange => "Salary Range",
            Field::JobUrl => "Job URL",
            Field::Notes => "Notes",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Field::AppliedDate => "YYYY-MM-DD",
            Field::Location => "Remote, NYC, etc.",
            Field::Source => "LinkedIn, Indeed, etc.",
            Field::JobUrl => "https://...",
            Field::Notes => "Any additional notes...",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: i64 },
}

/// What a valid form turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Create(JobDraft),
    Update { id: i64, patch: JobPatch },
}

/// Create/edit form state. Every open builds a fresh value, so switching
/// targets never leaks fields from the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct JobForm {
    mode: FormMode,
    company: String,
    position: String,
    status: JobStatus,
    applied_date: String,
    location: String,
    source: String,
    salary_range: String,
    job_url: String,
    notes: String,
    focus: Field,
}

impl JobForm {
    pub fn new_entry(today: NaiveDate) -> Self {
        Self {
            mode: FormMode::Create,
            company: String::new(),
            position: String::new(),
            status: JobStatus::default(),
            applied_date: format_date(today),
            location: String::new(),
            source: String::new(),
            salary_range: String::new(),
            job_url: String::new(),
            notes: String::new(),
            focus: Field::Company,
        }
    }

    pub fn edit(job: &JobApplication) -> Self {
        Self {
            mode: FormMode::Edit { id: job.id },
            company: job.company.clone(),
            position: job.position.clone(),
            status: job.status,
            applied_date: job
                .applied_date
                .map(|d| format_date(d.date_naive()))
                .unwrap_or_default(),
            location: job.location.clone().unwrap_or_default(),
            source: job.source.clone().unwrap_or_default(),
            salary_range: job.salary_range.clone().unwrap_or_default(),
            job_url: job.job_url.clone().unwrap_or_default(),
            notes: job.notes.clone().unwrap_or_default(),
            focus: Field::Company,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Add Application",
            FormMode::Edit { .. } => "Edit Application",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Add Application",
            FormMode::Edit { .. } => "Save Changes",
        }
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Company => &self.company,
            Field::Position => &self.position,
            Field::Status => self.status.label(),
            Field::AppliedDate => &self.applied_date,
            Field::Location => &self.location,
            Field::Source => &self.source,
            Field::SalaryRange => &self.salary_range,
            Field::JobUrl => &self.job_url,
            Field::Notes => &self.notes,
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Company => Some(&mut self.company),
            Field::Position => Some(&mut self.position),
            Field::Status => None,
            Field::AppliedDate => Some(&mut self.applied_date),
            Field::Location => Some(&mut self.location),
            Field::Source => Some(&mut self.source),
            Field::SalaryRange => Some(&mut self.salary_range),
            Field::JobUrl => Some(&mut self.job_url),
            Field::Notes => Some(&mut self.notes),
        }
    }

    pub fn set_text(&mut self, field: Field, value: impl Into<String>) {
        if let Some(text) = self.text_mut(field) {
            *text = value.into();
        }
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }

    /// Status from free text; anything outside the six known values is refused.
    pub fn set_status_str(&mut self, raw: &str) -> Result<(), FormError> {
        self.status = parse_status(raw)?;
        Ok(())
    }

    pub fn input_char(&mut self, c: char) {
        let focus = self.focus;
        if let Some(text) = self.text_mut(focus) {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        let focus = self.focus;
        if let Some(text) = self.text_mut(focus) {
            text.pop();
        }
    }

    pub fn focus_next(&mut self) {
        let fields: Vec<Field> = Field::iter().collect();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields: Vec<Field> = Field::iter().collect();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + fields.len() - 1) % fields.len()];
    }

    pub fn cycle_status(&mut self, forward: bool) {
        self.status = self.status.cycle(forward);
    }

    /// Validate and normalize into the create payload.
    pub fn to_draft(&self) -> Result<JobDraft, FormError> {
        let company = required(&self.company, "Company")?;
        let position = required(&self.position, "Position")?;
        Ok(JobDraft {
            company,
            position,
            status: self.status,
            location: optional(&self.location),
            salary_range: optional(&self.salary_range),
            job_url: optional(&self.job_url),
            source: optional(&self.source),
            notes: optional(&self.notes),
            applied_date: parse_date(&self.applied_date)?,
        })
    }

    pub fn submit(&self) -> Result<Submission, FormError> {
        let draft = self.to_draft()?;
        Ok(match self.mode {
            FormMode::Create => Submission::Create(draft),
            FormMode::Edit { id } => Submission::Update {
                id,
                patch: JobPatch::from(draft),
            },
        })
    }
}

fn required(value: &str, name: &'static str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormError::MissingField(name));
    }
    Ok(trimmed.to_string())
}

/// Blank means null, never an empty string.
fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Case-insensitive; anything but the six known values is an error.
pub fn parse_status(raw: &str) -> Result<JobStatus, FormError> {
    JobStatus::from_str(raw.trim().to_lowercase().as_str())
        .map_err(|_| FormError::InvalidStatus(raw.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Calendar date to a UTC-midnight timestamp; blank clears the date.
pub fn parse_date(value: &str) -> Result<Option<DateTime<Utc>>, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| FormError::InvalidDate(trimmed.to_string()))?;
    Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))
}
