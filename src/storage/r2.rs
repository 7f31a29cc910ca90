//! R2 blob storage backend.
//!
//! Proxies blob operations to a Cloudflare R2 bucket through its
//! S3-compatible endpoint (`https://{account_id}.r2.cloudflarestorage.com`)
//! using the AWS SDK with region `auto`.
//!
//! Credentials come from explicit R2 access keys when configured,
//! otherwise the standard AWS credential chain.

use aws_sdk_s3::Client;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use super::backend::StorageBackend;

/// Blob store that forwards operations to an R2 bucket.
pub struct R2BlobStore {
    /// S3 SDK client pointed at the R2 endpoint.
    client: Client,
    /// The R2 bucket name.
    bucket: String,
}

impl R2BlobStore {
    /// Create a new R2 blob store for `bucket` under `account_id`.
    pub async fn new(
        account_id: String,
        bucket: String,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let endpoint = format!("https://{account_id}.r2.cloudflarestorage.com");

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new("auto"))
            .endpoint_url(&endpoint);

        if let (Some(ref ak), Some(ref sk)) = (&access_key_id, &secret_access_key) {
            let creds = aws_sdk_s3::config::Credentials::new(
                ak,
                sk,
                None, // session_token
                None, // expiry
                "syncstore-config",
            );
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;
        let client = Client::from_conf(aws_sdk_s3::config::Builder::from(&sdk_config).build());

        info!("R2 blob store initialized: bucket={bucket} endpoint={endpoint}");

        Ok(Self { client, bucket })
    }

    /// Map an SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("R2 {context}: {err}")
    }
}

impl StorageBackend<Bytes> for R2BlobStore {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("R2 get_object: bucket={} key={}", self.bucket, key);

            let resp = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        return Ok(None);
                    }
                    return Err(Self::map_sdk_error("get_object", service_err));
                }
            };

            let body = resp
                .body
                .collect()
                .await
                .map_err(|e| Self::map_sdk_error("get_object body", e))?
                .into_bytes();

            Ok(Some(body))
        })
    }

    fn put(
        &self,
        key: &str,
        value: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("R2 put_object: bucket={} key={}", self.bucket, key);

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(aws_sdk_s3::primitives::ByteStream::from(value))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", e))?;

            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("R2 delete_object: bucket={} key={}", self.bucket, key);

            // S3-style delete_object is idempotent -- no error for missing keys.
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("delete_object", e))?;

            Ok(())
        })
    }
}
