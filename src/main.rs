//! SyncStore -- HTTP sync service over key/value and blob storage.
//!
//! Backends are constructed once at startup from the resolved
//! configuration and injected into the router state; nothing is looked
//! up ambiently at request time.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use syncstore::config::StorageMode;
use syncstore::storage::backend::StorageBackend;

/// Command-line arguments for the SyncStore server.
#[derive(Parser, Debug)]
#[command(
    name = "syncstore",
    version,
    about = "HTTP sync service over key/value and blob storage"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "syncstore.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = syncstore::config::load_config(&cli.config)?;
    config.apply_env_overrides();

    // Initialize tracing / logging. RUST_LOG wins over the config level.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Loaded configuration from {}", cli.config);

    if config.observability.metrics {
        syncstore::metrics::init_metrics();
        syncstore::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    // Initialize storage backends based on config.
    let (kv, blobs): (
        Arc<dyn StorageBackend<serde_json::Value>>,
        Arc<dyn StorageBackend<bytes::Bytes>>,
    ) = match config.storage.mode {
        StorageMode::Remote => {
            if config.cloudflare.api_token.is_empty() {
                anyhow::bail!("storage.mode is 'remote' but cloudflare.api_token is missing");
            }
            if config.cloudflare.account_id.is_empty() {
                anyhow::bail!("storage.mode is 'remote' but cloudflare.account_id is missing");
            }
            if config.storage.kv_namespace_id.is_empty() {
                anyhow::bail!("storage.mode is 'remote' but storage.kv_namespace_id is missing");
            }
            if config.storage.bucket.is_empty() {
                anyhow::bail!("storage.mode is 'remote' but storage.bucket is missing");
            }

            let kv = syncstore::storage::cloudflare::CloudflareKvStore::new(
                config.cloudflare.api_token.clone(),
                config.cloudflare.account_id.clone(),
                config.storage.kv_namespace_id.clone(),
                config.cloudflare.debug,
            )?;
            info!(
                "Workers KV store initialized: namespace={}",
                config.storage.kv_namespace_id
            );

            let r2_key = Some(config.cloudflare.r2_access_key_id.clone())
                .filter(|k| !k.is_empty());
            let r2_secret = Some(config.cloudflare.r2_secret_access_key.clone())
                .filter(|k| !k.is_empty());
            let blobs = syncstore::storage::r2::R2BlobStore::new(
                config.cloudflare.account_id.clone(),
                config.storage.bucket.clone(),
                r2_key,
                r2_secret,
            )
            .await?;

            (Arc::new(kv), Arc::new(blobs))
        }
        StorageMode::Local => {
            let kv = syncstore::storage::memory::MemoryKvStore::new();
            info!("In-memory KV store initialized");

            let blobs = if config.storage.blob_root.is_empty() {
                let store = syncstore::storage::local::LocalBlobStore::ephemeral()?;
                info!("Local blob store initialized in ephemeral temp directory");
                store
            } else {
                let store =
                    syncstore::storage::local::LocalBlobStore::new(&config.storage.blob_root)?;
                info!(
                    "Local blob store initialized at {}",
                    config.storage.blob_root
                );
                store
            };

            (Arc::new(kv), Arc::new(blobs))
        }
    };

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Build AppState.
    let state = Arc::new(syncstore::AppState { config, kv, blobs });

    let app = syncstore::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("SyncStore listening on {}", bind_addr);

    // Graceful shutdown: on SIGTERM/SIGINT, stop accepting new connections,
    // wait for in-flight requests to complete, then exit.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SyncStore shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
