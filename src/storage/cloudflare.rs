//! Workers KV storage backend.
//!
//! Talks to the Cloudflare Workers KV REST API via `reqwest`.  Values
//! are stored as JSON text under one namespace, selected at
//! construction time.
//!
//! Endpoint shape:
//!   `{base}/accounts/{account_id}/storage/kv/namespaces/{namespace_id}/values/{key}`
//!
//! A 404 from the API is reported as `Ok(None)` / an idempotent delete;
//! any other non-success status is a transport error and propagates.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

use super::backend::StorageBackend;

/// Cloudflare API v4 base URL.
const CF_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Key/value store backed by a Workers KV namespace.
pub struct CloudflareKvStore {
    /// HTTP client for Cloudflare API calls.
    client: reqwest::Client,
    /// API base URL.
    base_url: String,
    /// Cloudflare account identifier.
    account_id: String,
    /// KV namespace identifier.
    namespace_id: String,
    /// Bearer token with KV read/write access.
    api_token: String,
    /// Log API traffic at debug level.
    log_requests: bool,
}

impl CloudflareKvStore {
    /// Create a new Workers KV store for one namespace.
    pub fn new(
        api_token: String,
        account_id: String,
        namespace_id: String,
        log_requests: bool,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: CF_API_BASE.to_string(),
            account_id,
            namespace_id,
            api_token,
            log_requests,
        })
    }

    /// Build the value URL for `key`.
    fn values_url(&self, key: &str) -> String {
        format!(
            "{}/accounts/{}/storage/kv/namespaces/{}/values/{}",
            self.base_url, self.account_id, self.namespace_id, key
        )
    }
}

impl StorageBackend<Value> for CloudflareKvStore {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Value>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let url = self.values_url(&key);
            if self.log_requests {
                debug!("KV get: {url}");
            }

            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.api_token)
                .send()
                .await?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                anyhow::bail!("KV get for key {key} failed with status {}", resp.status());
            }

            let text = resp.text().await?;
            if text.is_empty() {
                return Ok(None);
            }
            Ok(Some(serde_json::from_str(&text)?))
        })
    }

    fn put(
        &self,
        key: &str,
        value: Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let url = self.values_url(&key);
            if self.log_requests {
                debug!("KV put: {url}");
            }

            let text = serde_json::to_string(&value)?;
            let resp = self
                .client
                .put(&url)
                .bearer_auth(&self.api_token)
                .body(text)
                .send()
                .await?;

            if !resp.status().is_success() {
                anyhow::bail!("KV put for key {key} failed with status {}", resp.status());
            }
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let url = self.values_url(&key);
            if self.log_requests {
                debug!("KV delete: {url}");
            }

            let resp = self
                .client
                .delete(&url)
                .bearer_auth(&self.api_token)
                .send()
                .await?;

            // The API answers 404 when the key never existed; delete is
            // idempotent at this layer.
            if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
                anyhow::bail!(
                    "KV delete for key {key} failed with status {}",
                    resp.status()
                );
            }
            Ok(())
        })
    }
}
