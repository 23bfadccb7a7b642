//! Client error types.

use thiserror::Error;

/// Errors talking to the vote endpoint.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("vote endpoint returned {status}: {error}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `error` field of the JSON body, or the raw body text.
        error: String,
        /// `details` field of the JSON body, if any.
        details: Option<String>,
    },

    /// The response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The endpoint URL could not be built.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Whether the failure was the caller's fault (4xx) rather than transient.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status >= 400 && *status < 500)
    }
}

/// Errors from local persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Keys are restricted to ASCII letters, digits, `.`, `-` and `_`.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// The backing store refused the operation (e.g. quota exceeded).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
