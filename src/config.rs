use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Client settings, read from `JOBTRACK_*` environment variables (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the job-tracker backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Where the backend sends the browser after the Gmail handshake.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Optional `name=value` cookie sent with every request.
    #[serde(default)]
    pub session_cookie: Option<String>,

    /// Page size for the job list (the backend caps it at 100).
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Catch the post-login redirect on the frontend address while the TUI runs.
    #[serde(default = "default_listen_for_callback")]
    pub listen_for_callback: bool,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_page_limit() -> u32 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_listen_for_callback() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            frontend_url: default_frontend_url(),
            session_cookie: None,
            page_limit: default_page_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            listen_for_callback: default_listen_for_callback(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        envy::prefixed("JOBTRACK_")
            .from_env::<Config>()
            .context("Invalid JOBTRACK_* configuration")
    }

    pub fn api_base(&self) -> Result<Url> {
        parse_base(&self.api_url).with_context(|| format!("Invalid api_url: {}", self.api_url))
    }

    pub fn frontend_base(&self) -> Result<Url> {
        parse_base(&self.frontend_url)
            .with_context(|| format!("Invalid frontend_url: {}", self.frontend_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Page size clamped to what the backend accepts.
    pub fn effective_page_limit(&self) -> u32 {
        self.page_limit.clamp(1, 100)
    }

    pub fn log_dir() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            proj_dirs.data_dir().join("logs")
        } else {
            PathBuf::from("logs")
        }
    }
}

/// Parse a base URL so that relative joins keep its path.
fn parse_base(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{}/", raw))
    }
}
