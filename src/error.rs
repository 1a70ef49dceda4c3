// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::content::NormalizeError;
use crate::services::ContentError;
use crate::storage::StorageError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 422 Unprocessable Entity (well-formed JSON the save pipeline cannot use)
    UnprocessableEntity {
        message: String,
        field_errors: HashMap<String, String>,
    },

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::UnprocessableEntity { .. } => 422,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::UnprocessableEntity { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::UnprocessableEntity { .. } => "UNPROCESSABLE_ENTITY",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::UnprocessableEntity { message, field_errors } => {
                json!({
                    "error": true,
                    "message": message,
                    "code": self.error_code(),
                    "field_errors": field_errors
                })
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unprocessable_entity(
        message: impl Into<String>,
        field_errors: HashMap<String, String>,
    ) -> Self {
        ApiError::UnprocessableEntity {
            message: message.into(),
            field_errors,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<NormalizeError> for ApiError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MissingLibrary => {
                let mut field_errors = HashMap::new();
                field_errors.insert(
                    "library".to_string(),
                    "unable to determine content type".to_string(),
                );
                ApiError::unprocessable_entity("Missing library", field_errors)
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ApiError::not_found(format!("Content not found: {}", what)),
            StorageError::Forbidden(what) => ApiError::forbidden(format!("Forbidden: {}", what)),
            StorageError::InvalidLibrary(e) => ApiError::bad_request(e.to_string()),
            StorageError::Corrupt { id, source } => {
                // Don't expose storage internals to clients
                tracing::error!("Corrupt content {}: {}", id, source);
                ApiError::internal_server_error("Stored content could not be read")
            }
            StorageError::Io(e) => {
                tracing::error!("Storage I/O error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Normalize(e) => e.into(),
            ContentError::Storage(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
