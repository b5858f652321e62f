//! Client configuration.
//!
//! Validated once in [`ClientConfig::validate`], which both client types
//! call from their constructors; per-call code never re-checks it.

use std::fmt;
use std::time::Duration;

use crate::client::has_http_scheme;
use crate::error::{ApiError, Result};

/// Endpoint used when no base URL is given.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Round-trip cap applied to every call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the watermark API.
///
/// `Debug` output never contains the API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sent as `Authorization: Bearer <key>` on every request when set.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the settings and normalize `base_url` (trailing `/` removed).
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ApiError::InvalidConfig("base_url is empty".into()));
        }
        if !has_http_scheme(trimmed) {
            return Err(ApiError::InvalidConfig(format!(
                "base_url must start with http:// or https://, got {trimmed:?}"
            )));
        }
        self.base_url = trimmed.to_string();

        if self.timeout.is_zero() {
            return Err(ApiError::InvalidConfig("timeout must be non-zero".into()));
        }
        if let Some(key) = &self.api_key {
            if key.trim().is_empty() {
                return Err(ApiError::InvalidConfig("api_key is blank".into()));
            }
        }
        Ok(self)
    }
}
