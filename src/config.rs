//! Configuration loading and types for SyncStore.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Each subsection governs a different part of the
//! system: networking, storage mode and backends, Cloudflare credentials,
//! logging, and observability.
//!
//! Cloudflare credentials and the storage mode can also be supplied via
//! environment variables; [`Config::apply_env_overrides`] resolves them
//! after the file is parsed so that deployed instances need no secrets
//! in the config file.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage mode and backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cloudflare account credentials (remote mode).
    #[serde(default)]
    pub cloudflare: CloudflareConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings (metrics).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Storage backend selection.
///
/// `local` substitutes an in-memory table for Workers KV and a local
/// directory for R2; `remote` talks to the managed services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Local,
    Remote,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend mode: `local` or `remote`.
    #[serde(default = "default_storage_mode")]
    pub mode: StorageMode,

    /// Workers KV namespace ID (remote mode).
    #[serde(default)]
    pub kv_namespace_id: String,

    /// R2 bucket name (remote mode).
    #[serde(default)]
    pub bucket: String,

    /// Root directory for locally stored blobs.  Empty selects an
    /// ephemeral temp directory that lives as long as the process.
    #[serde(default)]
    pub blob_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: default_storage_mode(),
            kv_namespace_id: String::new(),
            bucket: String::new(),
            blob_root: String::new(),
        }
    }
}

/// Cloudflare account credentials.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CloudflareConfig {
    /// API token with KV read/write access.
    #[serde(default)]
    pub api_token: String,

    /// Cloudflare account identifier.
    #[serde(default)]
    pub account_id: String,

    /// R2 access key ID (S3-compatible endpoint).
    #[serde(default)]
    pub r2_access_key_id: String,

    /// R2 secret access key.
    #[serde(default)]
    pub r2_secret_access_key: String,

    /// Log Cloudflare API traffic at debug level.
    #[serde(default)]
    pub debug: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and the `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { metrics: true }
    }
}

impl Config {
    /// Overlay environment variables onto the parsed configuration.
    ///
    /// Recognized variables: `CLOUDFLARE_API_TOKEN`, `CLOUDFLARE_ACCOUNT_ID`,
    /// `CLOUDFLARE_KV_NAMESPACE_ID`, `CLOUDFLARE_R2_BUCKET`,
    /// `R2_ACCESS_KEY_ID`, `R2_SECRET_ACCESS_KEY`, `DEBUG`, and
    /// `ENVIRONMENT` (`production` selects remote mode, anything else local).
    /// Environment values win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CLOUDFLARE_API_TOKEN") {
            self.cloudflare.api_token = v;
        }
        if let Ok(v) = std::env::var("CLOUDFLARE_ACCOUNT_ID") {
            self.cloudflare.account_id = v;
        }
        if let Ok(v) = std::env::var("CLOUDFLARE_KV_NAMESPACE_ID") {
            self.storage.kv_namespace_id = v;
        }
        if let Ok(v) = std::env::var("CLOUDFLARE_R2_BUCKET") {
            self.storage.bucket = v;
        }
        if let Ok(v) = std::env::var("R2_ACCESS_KEY_ID") {
            self.cloudflare.r2_access_key_id = v;
        }
        if let Ok(v) = std::env::var("R2_SECRET_ACCESS_KEY") {
            self.cloudflare.r2_secret_access_key = v;
        }
        if let Ok(v) = std::env::var("DEBUG") {
            self.cloudflare.debug = v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("ENVIRONMENT") {
            self.storage.mode = if v == "production" {
                StorageMode::Remote
            } else {
                StorageMode::Local
            };
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_storage_mode() -> StorageMode {
    StorageMode::Local
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}
