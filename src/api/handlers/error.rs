//! HTTP error taxonomy shared by handlers, guards, and storage.
//!
//! Storage and guard functions return `ApiError` so handlers can bubble
//! failures with `?` and let `IntoResponse` pick the status code. Database
//! and internal errors are logged server-side and surfaced as a generic 500.

use axum::{http::StatusCode, response::IntoResponse};
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid session token.
    Unauthenticated,
    /// Valid token but the user row no longer exists.
    UserNotFound,
    /// Email/password pair did not match.
    InvalidCredentials,
    ResourceNotFound(&'static str),
    Forbidden(&'static str),
    Validation(&'static str),
    Conflict(&'static str),
    /// Verification code did not match any outstanding code.
    InvalidCode,
    Expired(&'static str),
    /// Invite is deactivated, expired, or at capacity.
    Gone(&'static str),
    Database(sqlx::Error),
    Internal(anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required").into_response()
            }
            Self::UserNotFound => (StatusCode::NOT_FOUND, "User not found").into_response(),
            Self::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password").into_response()
            }
            Self::ResourceNotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message).into_response(),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Conflict(message) => (StatusCode::CONFLICT, message).into_response(),
            Self::InvalidCode => {
                (StatusCode::BAD_REQUEST, "Invalid verification code").into_response()
            }
            Self::Expired(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Gone(message) => (StatusCode::GONE, message).into_response(),
            Self::Database(err) => {
                error!("Database error: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Internal(err) => {
                error!("Internal error: {err:?}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// SQLSTATE 23505: unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(constraint);
    }
    false
}
