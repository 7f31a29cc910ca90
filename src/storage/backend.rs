//! Abstract storage backend trait.
//!
//! Every store must implement [`StorageBackend`].  The trait is generic
//! over the value type so the same contract covers JSON records
//! (`serde_json::Value`) and raw blobs (`bytes::Bytes`).
//!
//! `get` distinguishes three outcomes explicitly: `Ok(Some(_))` found,
//! `Ok(None)` absent, `Err(_)` transport failure.  Backends never
//! conflate a missing key with a failed call; whether a failure
//! collapses into absence is decided by the caller.

use std::future::Future;
use std::pin::Pin;

/// Async get/put/delete contract, uniform across both stores.
pub trait StorageBackend<V>: Send + Sync + 'static {
    /// Read the value at `key`.  Returns `Ok(None)` when the key does
    /// not exist.
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<V>>> + Send + '_>>;

    /// Write `value` to `key`, overwriting unconditionally.
    fn put(
        &self,
        key: &str,
        value: V,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Delete the value at `key`.  Idempotent: deleting an absent key
    /// succeeds.
    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}
