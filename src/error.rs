/// Failure talking to the job-tracker backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Backend unreachable: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}{}", detail_suffix(.detail))]
    Http { status: u16, detail: Option<String> },

    /// The response body did not match the expected shape.
    #[error("Unexpected response from backend: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text suitable for the transient status line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }

    /// Human-readable `detail` from a FastAPI error body, if there is one.
    pub fn detail_from_body(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        match value.get("detail")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default()
}

/// Input rejected before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("'{0}' is not a date (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("'{0}' is not a valid status (applied, screening, interviewing, offer, rejected, withdrawn)")]
    InvalidStatus(String),
}
