//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Missing or invalid session token")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Already a member")]
    AlreadyMember,

    #[error("Already registered")]
    AlreadyRegistered,

    #[error("Not a member")]
    NotAMember,

    #[error("Not registered")]
    NotRegistered,

    #[error("{0} is full")]
    CapacityExceeded(&'static str),

    #[error("Idempotency conflict: same key with different request")]
    IdempotencyConflict,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Server errors (5xx)
    #[error("AI service unavailable")]
    UpstreamUnavailable,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// True if the underlying database error is a unique-constraint violation.
    /// A ledger insert that races past the membership guard surfaces here and
    /// must map to the duplicate error, never to a 500 or a double increment.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
            _ => false,
        }
    }
}

// Body/shape failures from the JSON extractor surface as plain 400s with
// the standard error body, not axum's default 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::AlreadyMember => (StatusCode::BAD_REQUEST, "already_member", None),
            AppError::AlreadyRegistered => {
                (StatusCode::BAD_REQUEST, "already_registered", None)
            }
            AppError::NotAMember => (StatusCode::BAD_REQUEST, "not_a_member", None),
            AppError::NotRegistered => (StatusCode::BAD_REQUEST, "not_registered", None),
            AppError::CapacityExceeded(resource) => (
                StatusCode::BAD_REQUEST,
                "capacity_exceeded",
                Some(resource.to_string()),
            ),

            // 401 Unauthorized
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),

            // 403 Forbidden
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, "forbidden", Some(msg.to_string()))
            }

            // 404 Not Found
            AppError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "not_found", Some(resource.to_string()))
            }

            // 409 Conflict
            AppError::IdempotencyConflict => {
                (StatusCode::CONFLICT, "idempotency_conflict", None)
            }

            // Domain validation errors
            AppError::Domain(domain_err) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                Some(domain_err.to_string()),
            ),

            // 500 Internal Server Error
            // Upstream diagnostics are logged at the call site; the client
            // only ever sees the generic message.
            AppError::UpstreamUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ai_service_unavailable", None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = AppError::NotFound("Group");
        assert_eq!(err.to_string(), "Group not found");
    }

    #[test]
    fn test_capacity_exceeded_message() {
        let err = AppError::CapacityExceeded("Workshop");
        assert_eq!(err.to_string(), "Workshop is full");
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!AppError::is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
