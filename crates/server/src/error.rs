//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use itrack::errors::SERVER_ERROR_MESSAGE;
use itrack::{ServiceError, ValidationError};
use serde_json::json;

/// Failure of an API handler, rendered as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Payload failed validation; field and form errors go in the body
    Validation(ValidationError),
    NotFound(String),
    BadRequest(String),
    /// Detail was logged where the fault happened
    Internal,
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(errors) => ApiError::Validation(errors),
            e @ ServiceError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            ServiceError::Server(_) => ApiError::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => {
                let mut body = json!({ "error": "Validation failed." });
                if !errors.field_errors.is_empty() {
                    body["fieldErrors"] = json!(errors.field_errors);
                }
                if !errors.form_errors.is_empty() {
                    body["formErrors"] = json!(errors.form_errors);
                }
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": SERVER_ERROR_MESSAGE }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
