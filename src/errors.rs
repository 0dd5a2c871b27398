// src/errors.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    // Batch-level configuration problems: missing/invalid policy, zero
    // divisor, overlapping bonus tiers. Always aborts the whole request.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // A state-machine, uniqueness or idempotence violation. Carries the
    // authoritative current state so callers can re-probe without a fetch.
    #[error("State conflict: {reason} (current state: {current})")]
    StateConflict { reason: String, current: String },

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn conflict(reason: impl Into<String>, current: impl Into<String>) -> Self {
        AppError::StateConflict {
            reason: reason.into(),
            current: current.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StateConflict { .. } => StatusCode::CONFLICT,
            AppError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::StateConflict { reason, current } => json!({
                "error": {
                    "code": status.as_u16(),
                    "message": reason,
                    "current_state": current,
                }
            }),
            _ => json!({
                "error": {
                    "code": status.as_u16(),
                    "message": self.to_string(),
                }
            }),
        };
        (status, Json(body)).into_response()
    }
}

/// Postgres unique-constraint violation (SQLSTATE 23505). Lets callers
/// turn an index-enforced race loss into a conflict instead of a 500.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

// Convenience alias
pub type AppResult<T> = Result<T, AppError>;
