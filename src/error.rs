use axum::{Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

use crate::types::ValidationErrors;

#[derive(Debug, ThisError)]
pub enum MicroblogError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("User {follower_id} already follows user {followed_id}")]
    AlreadyFollowing { follower_id: i64, followed_id: i64 },

    #[error("User {follower_id} does not follow user {followed_id}")]
    NotFollowing { follower_id: i64, followed_id: i64 },

    #[error("Please sign in.")]
    Unauthorized,

    #[error("Invalid email/password combination")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,
}

impl From<ValidationErrors> for MicroblogError {
    fn from(errors: ValidationErrors) -> Self {
        MicroblogError::Validation(errors)
    }
}

impl From<argon2::password_hash::Error> for MicroblogError {
    fn from(e: argon2::password_hash::Error) -> Self {
        MicroblogError::PasswordHash(e.to_string())
    }
}

impl MicroblogError {
    /// The field-level messages when this is a validation failure.
    pub fn full_messages(&self) -> Vec<String> {
        match self {
            MicroblogError::Validation(errors) => errors.full_messages(),
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for MicroblogError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            MicroblogError::Validation(errors) => {
                let count = errors.len();
                let body = ApiErrorBody {
                    code: "VALIDATION_FAILED".to_string(),
                    message: format!(
                        "The form contains {count} error{}.",
                        if count == 1 { "" } else { "s" }
                    ),
                    details: errors.full_messages(),
                };
                (StatusCode::UNPROCESSABLE_ENTITY, body)
            }
            MicroblogError::InvalidBody(rejection) => (
                rejection.status(),
                ApiErrorBody::new("INVALID_BODY", rejection.body_text()),
            ),
            MicroblogError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ApiErrorBody::new("NOT_FOUND", format!("{what} not found.")),
            ),
            MicroblogError::AlreadyFollowing { .. } => (
                StatusCode::CONFLICT,
                ApiErrorBody::new("ALREADY_FOLLOWING", "Already following this user."),
            ),
            MicroblogError::NotFollowing { .. } => (
                StatusCode::NOT_FOUND,
                ApiErrorBody::new("NOT_FOLLOWING", "Not following this user."),
            ),
            MicroblogError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("UNAUTHORIZED", "Please sign in."),
            ),
            MicroblogError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("INVALID_CREDENTIALS", "Invalid email/password combination"),
            ),
            MicroblogError::Forbidden => (
                StatusCode::FORBIDDEN,
                ApiErrorBody::new("FORBIDDEN", "You are not allowed to do that."),
            ),
            e @ (MicroblogError::DatabaseError(_) | MicroblogError::PasswordHash(_)) => {
                error!(error = %e, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred."),
                )
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ApiErrorBody {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: Vec::new(),
        }
    }
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
