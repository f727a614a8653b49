//! Error types for dealhub-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Conflict (409), e.g. email already registered
    #[error("{0}")]
    Conflict(String),

    /// Caller exceeded its rate limit window (429)
    #[error("Rate limit exceeded")]
    RateLimited { reset_in: i64 },

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    /// dealhub-common error
    #[error(transparent)]
    Common(#[from] dealhub_common::Error),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        use dealhub_common::Error as CommonError;

        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ApiError::Common(err) => match err {
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                CommonError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CommonError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                other => {
                    error!("Request failed: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = match self {
            ApiError::RateLimited { reset_in } => json!({
                "error": message,
                "resetIn": reset_in,
            }),
            _ => json!({
                "error": message,
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result alias for handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
