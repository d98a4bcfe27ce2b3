//! Client configuration loaded via OrthoConfig.
//!
//! Values come from `PULSE_*` environment variables or a configuration file.
//! Only the backend URL and anon key are required, and only by the HTTP
//! adapter.

use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{DEFAULT_SUGGESTION_PAGE, DEFAULT_USERNAME_ATTEMPTS};

/// Comments fetched per thread page unless configured otherwise.
pub const DEFAULT_COMMENT_PAGE: usize = 20;
/// HTTP timeout unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Problems turning settings into a backend connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A required key was not provided.
    #[error("missing configuration value {key}")]
    Missing { key: &'static str },
    /// The backend URL did not parse.
    #[error("invalid backend url {value:?}: {message}")]
    InvalidUrl { value: String, message: String },
}

/// Settings shared by the binary and embedding applications.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PULSE")]
pub struct PulseSettings {
    /// Project URL of the hosted backend.
    pub backend_url: Option<String>,
    /// Public anon key sent with every request.
    pub anon_key: Option<String>,
    /// Email used by the binary to sign in.
    pub email: Option<String>,
    /// Password used by the binary to sign in.
    pub password: Option<String>,
    /// Profiles per follow suggestion page.
    pub suggestion_page_size: Option<usize>,
    /// Comments per thread page.
    pub comment_page_size: Option<usize>,
    /// Username candidates tried before provisioning gives up.
    pub username_attempts: Option<u32>,
    /// Request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

impl PulseSettings {
    /// Parsed backend URL.
    pub fn backend_url(&self) -> Result<Url, SettingsError> {
        let raw = self
            .backend_url
            .as_deref()
            .ok_or(SettingsError::Missing { key: "backend_url" })?;
        Url::parse(raw).map_err(|error| SettingsError::InvalidUrl {
            value: raw.to_owned(),
            message: error.to_string(),
        })
    }

    /// Anon key for the backend.
    pub fn anon_key(&self) -> Result<&str, SettingsError> {
        self.anon_key
            .as_deref()
            .ok_or(SettingsError::Missing { key: "anon_key" })
    }

    /// Suggestion page size, falling back to the default.
    pub fn suggestion_page_size(&self) -> usize {
        self.suggestion_page_size.unwrap_or(DEFAULT_SUGGESTION_PAGE)
    }

    /// Comment page size, falling back to the default.
    pub fn comment_page_size(&self) -> usize {
        self.comment_page_size.unwrap_or(DEFAULT_COMMENT_PAGE)
    }

    /// Username attempts, falling back to the default.
    pub fn username_attempts(&self) -> u32 {
        self.username_attempts.unwrap_or(DEFAULT_USERNAME_ATTEMPTS)
    }

    /// Request timeout, falling back to the default.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

impl std::fmt::Debug for PulseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseSettings")
            .field("backend_url", &self.backend_url)
            .field("anon_key", &self.anon_key.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("suggestion_page_size", &self.suggestion_page_size)
            .field("comment_page_size", &self.comment_page_size)
            .field("username_attempts", &self.username_attempts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
