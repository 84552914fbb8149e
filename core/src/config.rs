//! Client configuration, populated from environment variables.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SOLVR_API_URL` | `https://api.solvr.dev/v1` | API base URL, resolved once per process |
//! | `SOLVR_API_TIMEOUT_SECS` | `30` | Global timeout for a single request |

use std::sync::OnceLock;
use std::time::Duration;

pub const BASE_URL_ENV: &str = "SOLVR_API_URL";
pub const TIMEOUT_ENV: &str = "SOLVR_API_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.solvr.dev/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static BASE_URL: OnceLock<String> = OnceLock::new();

/// The process-wide API base URL.
///
/// Read from `SOLVR_API_URL` on first use and never re-read afterwards.
pub fn base_url() -> &'static str {
    BASE_URL.get_or_init(|| resolve_base_url(std::env::var(BASE_URL_ENV).ok()))
}

fn resolve_base_url(value: Option<String>) -> String {
    let url = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    url.trim_end_matches('/').to_string()
}

fn resolve_timeout(value: Option<String>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// `User-Agent` sent with every client request.
pub fn user_agent() -> String {
    format!("solvr-rs/{}", env!("CARGO_PKG_VERSION"))
}

/// Runtime settings for `ApiClient` and its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash, e.g. `"https://api.solvr.dev/v1"`.
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration for an explicit base URL with default timeout.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: user_agent(),
        }
    }

    /// Populate from the environment, applying defaults where absent.
    pub fn from_env() -> Self {
        Self {
            base_url: base_url().to_string(),
            timeout: resolve_timeout(std::env::var(TIMEOUT_ENV).ok()),
            user_agent: user_agent(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
