//! Process-wide configuration for the backend API client.
//!
//! # Design
//! The base URL is resolved once, normally at startup via
//! [`ApiConfig::from_env`], and then moved into the client. The client never
//! exposes a setter, so the address stays fixed for the client's lifetime.

use std::time::Duration;

/// Base URL used when no override is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Environment variable that overrides [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "BACKEND_API_BASE_URL";

/// Upper bound on a single request, from connect to the last body byte.
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Immutable settings shared by every request a client issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
    request_timeout: Duration,
}

impl ApiConfig {
    /// Build a config for `base_url` with surrounding whitespace and trailing
    /// slashes removed.
    ///
    /// A value that is empty after trimming, such as `"///"`, falls back to
    /// [`DEFAULT_BASE_URL`] rather than producing an unusable empty base.
    pub fn new(base_url: &str) -> Self {
        let trimmed = trim_trailing_slashes(base_url.trim());
        let base_url = if trimmed.is_empty() {
            DEFAULT_BASE_URL
        } else {
            trimmed
        };
        Self {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }

    /// Resolve the config from [`BASE_URL_ENV`], defaulting when unset or empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(BASE_URL_ENV) {
            Some(value) => Self::new(&value),
            None => Self::new(DEFAULT_BASE_URL),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn trim_trailing_slashes(url: &str) -> &str {
    url.trim_end_matches('/')
}
