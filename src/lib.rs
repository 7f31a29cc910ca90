//! SyncStore library — HTTP façade over key/value and blob storage.
//!
//! This crate provides the components for running a small sync service:
//! a uniform async storage contract, local and Cloudflare-backed
//! implementations for JSON records and raw blobs, and the axum routing
//! that maps a REST surface onto them.

use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod storage;

use crate::config::Config;
use crate::storage::backend::StorageBackend;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Key/value store for sync records (in-memory or Workers KV).
    pub kv: Arc<dyn StorageBackend<serde_json::Value>>,
    /// Blob store for raw payloads (local filesystem or R2).
    pub blobs: Arc<dyn StorageBackend<bytes::Bytes>>,
}
