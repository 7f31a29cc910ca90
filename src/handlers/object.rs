//! Blob storage handlers.
//!
//! Blobs are addressed by arbitrary slash-delimited path keys captured
//! by a wildcard route.  Payloads are opaque byte streams; responses
//! are always served as `application/octet-stream` regardless of what
//! was uploaded.
//!
//! Failure policy: reads collapse backend errors into "not found" and
//! deletes collapse them into success, but a failed write propagates as
//! a server error.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::ApiError;
use crate::AppState;

/// `GET /api/storage/{key}` — fetch a blob.
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let data = match state.blobs.get(&key).await {
        Ok(data) => data,
        Err(e) => {
            warn!("blob read failed for key {key}, treating as absent: {e:#}");
            None
        }
    };

    match data {
        Some(data) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            data,
        )
            .into_response()),
        None => Err(ApiError::ObjectNotFound),
    }
}

/// `PUT /api/storage/{key}` — overwrite a blob.
///
/// Rejects zero-length payloads; a delete is the way to clear a key.
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::MissingBody);
    }

    state.blobs.put(&key, body).await?;

    Ok(Json(json!({"status": "success"})))
}

/// `DELETE /api/storage/{key}` — remove a blob.  Never fails: a missing
/// key and a failed backend call both report success.
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Json<Value> {
    if let Err(e) = state.blobs.delete(&key).await {
        warn!("blob delete failed for key {key}, reporting success: {e:#}");
    }

    Json(json!({"status": "success"}))
}
