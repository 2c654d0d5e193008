//! Server connection configuration.
//!
//! # Configuration
//!
//! - `AGRIFIELD_API_URL`: Server base URL (default: `http://127.0.0.1:8000`)
//! - `AGRIFIELD_API_TIMEOUT_SECONDS`: Per-request timeout (default: 15)
//! - `AGRIFIELD_PERMISSIONS_PATH`: Permission matrix endpoint
//! - `AGRIFIELD_DASHBOARD_PATH`: Daily attendance status endpoint
//! - `AGRIFIELD_PUNCH_IN_PATH`: Punch-in endpoint
//! - `AGRIFIELD_PUNCH_OUT_PATH`: Punch-out endpoint; `{id}` is replaced with
//!   the punch id
//!
//! # Example
//!
//! ```ignore
//! use agrifield_config::ApiConfig;
//!
//! let config = ApiConfig::from_env();
//! assert_eq!(config.punch_out_path("42"), "/api/attendance/42/punch-out/");
//! ```

use std::time::Duration;

use crate::env_string;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_PERMISSIONS_PATH: &str = "/api/permissions/my-permissions/";
pub const DEFAULT_DASHBOARD_PATH: &str = "/api/attendance/dashboard/";
pub const DEFAULT_PUNCH_IN_PATH: &str = "/api/attendance/punch-in/";
pub const DEFAULT_PUNCH_OUT_PATH: &str = "/api/attendance/{id}/punch-out/";

const PUNCH_ID_PLACEHOLDER: &str = "{id}";

/// Where and how the client talks to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without a trailing slash
    pub base_url: String,

    pub timeout_seconds: u64,

    pub permissions_path: String,

    pub dashboard_path: String,

    pub punch_in_path: String,

    /// Template containing `{id}`
    pub punch_out_path_template: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            permissions_path: DEFAULT_PERMISSIONS_PATH.to_string(),
            dashboard_path: DEFAULT_DASHBOARD_PATH.to_string(),
            punch_in_path: DEFAULT_PUNCH_IN_PATH.to_string(),
            punch_out_path_template: DEFAULT_PUNCH_OUT_PATH.to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads from environment variables, falling back to defaults for
    /// anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_string)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("AGRIFIELD_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout_seconds: lookup("AGRIFIELD_API_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.timeout_seconds),
            permissions_path: lookup("AGRIFIELD_PERMISSIONS_PATH")
                .unwrap_or(defaults.permissions_path),
            dashboard_path: lookup("AGRIFIELD_DASHBOARD_PATH").unwrap_or(defaults.dashboard_path),
            punch_in_path: lookup("AGRIFIELD_PUNCH_IN_PATH").unwrap_or(defaults.punch_in_path),
            punch_out_path_template: lookup("AGRIFIELD_PUNCH_OUT_PATH")
                .filter(|t| t.contains(PUNCH_ID_PLACEHOLDER))
                .unwrap_or(defaults.punch_out_path_template),
        }
    }

    /// Same configuration pointed at another server. Used by tests against
    /// a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Punch-out path for `punch_id`. The id is percent-encoded so it always
    /// stays a single path segment.
    pub fn punch_out_path(&self, punch_id: &str) -> String {
        self.punch_out_path_template
            .replace(PUNCH_ID_PLACEHOLDER, &urlencoding::encode(punch_id))
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}
