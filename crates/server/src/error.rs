//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers should return
//! `Result<T, AppError>`. Every error is rendered as a JSON [`ErrorBody`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use lovevote_core::{ErrorBody, IdError};

use crate::db::RepositoryError;

/// Application-level error type for the vote server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required query parameter is absent.
    #[error("Missing {0}")]
    MissingParameter(&'static str),

    /// A query parameter is present but malformed.
    #[error("Invalid {param}: {reason}")]
    InvalidParameter {
        /// Wire name of the parameter.
        param: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// No vote store is bound to the server.
    #[error("Database binding missing")]
    StoreUnavailable,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),
}

impl From<IdError> for AppError {
    fn from(err: IdError) -> Self {
        Self::InvalidParameter {
            param: err.kind(),
            reason: err.to_string(),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body. Internal error details are not exposed.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::MissingParameter(param) => ErrorBody::new(format!("Missing {param}")),
            Self::InvalidParameter { param, reason } => {
                ErrorBody::new(format!("Invalid {param}")).with_details(reason.clone())
            }
            Self::StoreUnavailable => ErrorBody::new("Database binding missing"),
            Self::Database(_) => ErrorBody::new("Database error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::StoreUnavailable | Self::Database(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
