//! Error types for the gatekeeper API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use registration_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Gatekeeper error types.
#[derive(Debug, Error)]
pub enum GatekeeperError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid admin credentials.")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for GatekeeperError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatekeeperError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            GatekeeperError::Conflict(_) => (StatusCode::BAD_REQUEST, "ALREADY_EXISTS"),
            GatekeeperError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GatekeeperError::Unauthorized => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            GatekeeperError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            GatekeeperError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for GatekeeperError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(_) => {
                GatekeeperError::Conflict("User with this Computer ID already exists!".to_string())
            }
            StoreError::NotFound(id) => {
                GatekeeperError::NotFound(format!("Computer ID {} not found.", id))
            }
            StoreError::Persistence(msg) | StoreError::Encryption(msg) => {
                GatekeeperError::Storage(msg)
            }
        }
    }
}
