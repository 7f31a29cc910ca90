//! In-memory key/value store for local development.
//!
//! Values are held as serialized JSON text in a `tokio::sync::RwLock`
//! hash map, mirroring the text-valued semantics of Workers KV so the
//! local and remote stores are observationally identical: anything that
//! goes in comes back out through a JSON encode/decode round trip.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::backend::StorageBackend;

/// Ephemeral in-process key/value table.
///
/// Per-operation atomicity only: concurrent writers to the same key may
/// interleave with no read-modify-write protection.
#[derive(Default)]
pub struct MemoryKvStore {
    /// key -> serialized JSON text.
    entries: tokio::sync::RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend<Value> for MemoryKvStore {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Value>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(text) => Ok(Some(serde_json::from_str(text)?)),
                None => Ok(None),
            }
        })
    }

    fn put(
        &self,
        key: &str,
        value: Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let text = serde_json::to_string(&value)?;
            let mut entries = self.entries.write().await;
            entries.insert(key, text);
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = self.entries.write().await;
            entries.remove(&key);
            Ok(())
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let store = MemoryKvStore::new();
        let value = json!({
            "string": "test",
            "number": 42,
            "bool": true,
            "null": null,
            "array": [1, 2, 3],
            "object": {"nested": "value"},
        });

        store.put("test-key", value.clone()).await.unwrap();
        let result = store.get("test-key").await.unwrap();
        assert_eq!(result, Some(value));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("no-such-key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_datetime_encodes_to_iso8601_string() {
        let store = MemoryKvStore::new();
        // chrono's serde impl turns the timestamp into an ISO-8601 string
        // on the write side; the read side leaves it as a string.
        let value = json!({"datetime": chrono::Utc::now()});

        store.put("stamped", value).await.unwrap();
        let result = store.get("stamped").await.unwrap().unwrap();
        let encoded = result["datetime"].as_str().unwrap();
        assert!(encoded.parse::<chrono::DateTime<chrono::Utc>>().is_ok());
    }

    #[tokio::test]
    async fn test_get_after_delete_returns_none() {
        let store = MemoryKvStore::new();
        store.put("key", json!({"a": 1})).await.unwrap();
        store.delete("key").await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_ok() {
        let store = MemoryKvStore::new();
        store.delete("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryKvStore::new();
        store.put("key", json!({"v": 1})).await.unwrap();
        store.put("key", json!({"v": 2})).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), Some(json!({"v": 2})));
    }
}
