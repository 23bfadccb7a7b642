//! Client configuration.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `LOVEVOTE_API_URL` - Base URL of the vote server (default: `http://127.0.0.1:3000`)
//! - `LOVEVOTE_CACHE_MAX_AGE_SECS` - Local cache freshness window (default: 604800, one week)
//! - `LOVEVOTE_HTTP_TIMEOUT_SECS` - Request timeout (default: none, transport default)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default freshness window of the local vote cache.
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Vote client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the vote server; the endpoint is `<base_url>/api/vote`
    pub base_url: Url,
    /// How long a cached registry is trusted for instant render
    pub cache_max_age: Duration,
    /// Request timeout; `None` leaves it to the transport
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration for the given server with default cache policy.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            timeout: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("LOVEVOTE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("LOVEVOTE_API_URL".to_string(), e.to_string()))?;

        let cache_max_age = secs(&lookup, "LOVEVOTE_CACHE_MAX_AGE_SECS")?
            .unwrap_or(DEFAULT_CACHE_MAX_AGE);
        let timeout = secs(&lookup, "LOVEVOTE_HTTP_TIMEOUT_SECS")?;

        Ok(Self {
            base_url,
            cache_max_age,
            timeout,
        })
    }
}

fn secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Duration>, ConfigError> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}
