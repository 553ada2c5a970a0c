//! Error types for the worker engine
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::lifecycle::LifecycleState;
use crate::models::ErrorResponse;

// == Engine Error Enum ==
/// Unified error type for the worker engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Neither the cache nor the network could satisfy the request
    #[error("Network unavailable and no cached response for {0}")]
    NotAvailable(String),

    /// A manifest URL has no entry in the precache
    #[error("Precache miss for {0}")]
    PrecacheMiss(String),

    /// One or more manifest fetches failed during install
    #[error("Precache install failed for {} url(s): {reason}", failed.len())]
    InstallFailed { failed: Vec<String>, reason: String },

    /// The skip-wait handshake did not settle in time
    #[error("Skip waiting did not settle within {0:?}")]
    ActivationTimeout(Duration),

    /// A lifecycle transition was requested from the wrong state
    #[error("Cannot move from {from} to {to}")]
    InvalidState {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Deployment configuration could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The host runtime rejected a request
    #[error("Host error: {0}")]
    Host(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// HTTP status used when the error reaches the host binding.
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::PrecacheMiss(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::InstallFailed { .. } => StatusCode::BAD_GATEWAY,
            EngineError::ActivationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            EngineError::InvalidState { .. } => StatusCode::CONFLICT,
            EngineError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            EngineError::Host(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the worker engine.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_failed_message_counts_urls() {
        let err = EngineError::InstallFailed {
            failed: vec!["/a.js".to_string(), "/b.css".to_string()],
            reason: "status 404".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Precache install failed for 2 url(s): status 404"
        );
    }

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (
                EngineError::NotAvailable("/x".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                EngineError::PrecacheMiss("/x".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                EngineError::ActivationTimeout(Duration::from_secs(2)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                EngineError::InvalidState {
                    from: LifecycleState::Installing,
                    to: LifecycleState::Activated,
                },
                StatusCode::CONFLICT,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
