//! Sync record handlers.
//!
//! A sync record is scoped by a caller-supplied group ID carried in the
//! `X-Group-ID` header and stored in the key/value store under
//! `sync:{group_id}`.  Last write wins per group.
//!
//! Validation reports every offending field in one 422 response rather
//! than stopping at the first, so a body missing both `timestamp` and
//! `device_id` lists both locations.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::{ApiError, FieldError};
use crate::AppState;

/// Header carrying the record's group ID.
pub const GROUP_ID_HEADER: &str = "x-group-id";

/// One group's sync state.
///
/// `timestamp` is encoded to an ISO-8601 string when the record is
/// serialized for storage; it is never decoded back on the read path,
/// which returns the stored JSON as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Arbitrary JSON payload keyed by client-defined names.
    pub data: serde_json::Map<String, Value>,
    /// Client-reported time of the update.
    pub timestamp: DateTime<Utc>,
    /// Identifier of the device that produced the update.
    pub device_id: String,
}

/// KV key for a group's record.
fn sync_key(group_id: &str) -> String {
    format!("sync:{group_id}")
}

/// Extract the group ID header, or a 422 naming its location.
fn require_group_id(headers: &HeaderMap) -> Result<String, FieldError> {
    headers
        .get(GROUP_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| FieldError::missing_header(GROUP_ID_HEADER))
}

/// Parse and validate a sync record body, collecting one [`FieldError`]
/// per problem.
fn parse_record(body: &[u8]) -> Result<SyncRecord, Vec<FieldError>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| vec![FieldError::invalid_body(format!("Invalid JSON: {e}"))])?;

    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return Err(vec![FieldError::invalid_body("Body must be a JSON object")]),
    };

    let mut errors = Vec::new();

    match obj.get("data") {
        None => errors.push(FieldError::missing_field("data")),
        Some(v) if !v.is_object() => {
            errors.push(FieldError::invalid_field("data", "Input should be an object"))
        }
        Some(_) => {}
    }

    let timestamp = match obj.get("timestamp") {
        None => {
            errors.push(FieldError::missing_field("timestamp"));
            None
        }
        Some(v) => match v.as_str().and_then(|s| s.parse::<DateTime<Utc>>().ok()) {
            Some(ts) => Some(ts),
            None => {
                errors.push(FieldError::invalid_field(
                    "timestamp",
                    "Input should be a valid datetime",
                ));
                None
            }
        },
    };

    let device_id = match obj.get("device_id").and_then(|v| v.as_str()) {
        Some(id) => Some(id.to_string()),
        None => {
            if obj.get("device_id").is_some() {
                errors.push(FieldError::invalid_field(
                    "device_id",
                    "Input should be a string",
                ));
            } else {
                errors.push(FieldError::missing_field("device_id"));
            }
            None
        }
    };

    match (timestamp, device_id) {
        (Some(timestamp), Some(device_id)) if errors.is_empty() => {
            let data = obj
                .get("data")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();
            Ok(SyncRecord {
                data,
                timestamp,
                device_id,
            })
        }
        _ => Err(errors),
    }
}

/// `GET /api/sync` — fetch the group's record, `{}` when absent.
///
/// Backend failures degrade to the empty response; a read can never
/// surface a KV transport error to the caller.
pub async fn get_sync(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let group_id = require_group_id(&headers).map_err(|e| ApiError::Validation(vec![e]))?;

    let record = match state.kv.get(&sync_key(&group_id)).await {
        Ok(record) => record,
        Err(e) => {
            warn!("KV read failed for group {group_id}, treating as absent: {e:#}");
            None
        }
    };

    Ok(Json(record.unwrap_or_else(|| json!({}))))
}

/// `POST /api/sync` — overwrite the group's record.
///
/// Unlike reads, a failed KV write propagates as a server error.
pub async fn update_sync(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let mut errors = Vec::new();

    let group_id = match require_group_id(&headers) {
        Ok(id) => Some(id),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let record = match parse_record(&body) {
        Ok(record) => Some(record),
        Err(mut field_errors) => {
            errors.append(&mut field_errors);
            None
        }
    };

    let (group_id, record) = match (group_id, record) {
        (Some(group_id), Some(record)) if errors.is_empty() => (group_id, record),
        _ => return Err(ApiError::Validation(errors)),
    };

    let value = serde_json::to_value(&record).map_err(anyhow::Error::from)?;

    state.kv.put(&sync_key(&group_id), value).await?;

    Ok(Json(json!({"status": "success"})))
}

// ── Tests ───────────────────────────────────────────────────────────
