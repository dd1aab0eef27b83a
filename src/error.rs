use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Why a refresh attempt was refused.
///
/// Only the category reaches the client; anything more specific stays in the
/// server log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    #[error("refresh token missing")]
    Missing,
    #[error("refresh token signature invalid")]
    InvalidSignature,
    #[error("refresh token expired")]
    Expired,
    #[error("refresh token does not match the stored value")]
    Mismatch,
}

impl RefreshFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            RefreshFailure::Missing => "missing",
            RefreshFailure::InvalidSignature => "invalid_signature",
            RefreshFailure::Expired => "expired",
            RefreshFailure::Mismatch => "mismatch",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Refresh(#[from] RefreshFailure),
    #[error("forbidden")]
    Forbidden,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("token encoding error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthorized", "message": self.to_string() }),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthorized", "message": msg }),
            ),
            AppError::Refresh(failure) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthorized", "reason": failure.reason() }),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "forbidden", "message": "Insufficient role" }),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                json!({ "error": "conflict", "message": msg }),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation", "message": msg }),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "message": format!("{what} not found") }),
            ),
            AppError::Database(_) | AppError::Token(_) | AppError::PasswordHash(_) => {
                tracing::error!(error = %self, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal", "message": "An internal error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
