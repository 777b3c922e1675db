use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum VaultError {
    #[error("missing or invalid bearer token")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Authorization(String),

    #[error("invalid `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    #[error("stored ciphertext could not be decoded: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl VaultError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        VaultError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        VaultError::Authorization(reason.into())
    }
}

impl IntoResponse for VaultError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            VaultError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("UNAUTHENTICATED", "Authentication required."),
            ),
            VaultError::Authorization(reason) => (
                StatusCode::FORBIDDEN,
                ApiErrorBody::new("FORBIDDEN", reason),
            ),
            VaultError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiErrorBody {
                    code: "VALIDATION_ERROR".to_string(),
                    message,
                    field: Some(field),
                },
            ),
            VaultError::InvalidOperation(reason) => (
                StatusCode::CONFLICT,
                ApiErrorBody::new("INVALID_OPERATION", reason),
            ),
            err @ VaultError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                ApiErrorBody::new("NOT_FOUND", err.to_string()),
            ),
            VaultError::Decode(_) | VaultError::Config(_) | VaultError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred."),
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiErrorBody {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
