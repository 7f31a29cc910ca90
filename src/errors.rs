//! API error types.
//!
//! Every variant maps to an HTTP status and a JSON body of the form
//! `{"detail": ...}`.  Validation failures carry a list of per-field
//! entries so that each offending location is reported individually.
//! The enum implements [`axum::response::IntoResponse`] so handlers can
//! simply return `Err(ApiError::ObjectNotFound)`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// One entry in a 422 validation response.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Location path of the offending input, e.g. `["header", "x-group-id"]`
    /// or `["body", "timestamp"]`.
    pub loc: Vec<String>,
    /// Human-readable description.
    pub msg: String,
    /// Machine-readable error kind, e.g. `missing` or `json_invalid`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    /// A required header was not supplied.
    pub fn missing_header(name: &str) -> Self {
        Self {
            loc: vec!["header".to_string(), name.to_string()],
            msg: "Field required".to_string(),
            kind: "missing".to_string(),
        }
    }

    /// A required body field was not supplied.
    pub fn missing_field(name: &str) -> Self {
        Self {
            loc: vec!["body".to_string(), name.to_string()],
            msg: "Field required".to_string(),
            kind: "missing".to_string(),
        }
    }

    /// A body field was present but had the wrong shape.
    pub fn invalid_field(name: &str, msg: impl Into<String>) -> Self {
        Self {
            loc: vec!["body".to_string(), name.to_string()],
            msg: msg.into(),
            kind: "value_error".to_string(),
        }
    }

    /// The request body could not be parsed as JSON at all.
    pub fn invalid_body(msg: impl Into<String>) -> Self {
        Self {
            loc: vec!["body".to_string()],
            msg: msg.into(),
            kind: "json_invalid".to_string(),
        }
    }
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more request inputs failed validation (422).
    #[error("request validation failed")]
    Validation(Vec<FieldError>),

    /// The requested blob does not exist (404).
    #[error("Object not found")]
    ObjectNotFound,

    /// A blob PUT arrived with a zero-length payload (400).
    #[error("Missing body")]
    MissingBody,

    /// Catch-all for unexpected backend faults (500).
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Return the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ObjectNotFound => StatusCode::NOT_FOUND,
            ApiError::MissingBody => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape of an error body: `detail` is either a message string or,
/// for validation errors, a list of [`FieldError`] entries.
#[derive(Serialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message { detail: String },
    Fields { detail: Vec<FieldError> },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let ApiError::Internal(ref cause) = self {
            tracing::error!("internal error serving request: {cause:#}");
        }

        let body = match self {
            ApiError::Validation(fields) => ErrorDetail::Fields { detail: fields },
            other => ErrorDetail::Message {
                detail: other.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}
