//! # REST API Errors
//!
//! Maps the engine's error taxonomy onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::engine::{EngineError, ErrorClass};
use crate::observability::Logger;

/// Result type for REST handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// REST-layer error.
#[derive(Debug)]
pub enum ApiError {
    /// An engine operation failed
    Engine(EngineError),
    /// The path id is not a valid record id; indistinguishable from an
    /// unknown id to the caller
    InvalidId { entity_type: String, id: String },
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Engine(err) => match err.class() {
                ErrorClass::Validation => StatusCode::BAD_REQUEST,
                ErrorClass::NotFound => StatusCode::NOT_FOUND,
                ErrorClass::Conflict => StatusCode::CONFLICT,
                ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidId { .. } => StatusCode::NOT_FOUND,
        }
    }
}

/// Standard error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

/// Conflict response body carrying the offending field and value
#[derive(Debug, Serialize)]
pub struct ConflictResponse {
    pub error: &'static str,
    pub field: String,
    pub value: Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let ApiError::Engine(err) = &self {
            if let Some((field, value)) = err.duplicate_parts() {
                let body = ConflictResponse {
                    error: "DUPLICATE_ENTITY",
                    field: field.to_string(),
                    value: value.clone(),
                };
                return (status, Json(body)).into_response();
            }
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                Logger::error("REQUEST_FAILED", &[("error", &err.to_string())]);
            }
        }

        let message = match &self {
            ApiError::Engine(err) => err.to_string(),
            ApiError::InvalidId { entity_type, id } => {
                format!("Entity '{}' not found for type '{}'", id, entity_type)
            }
        };

        let body = ErrorResponse {
            error: message,
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
