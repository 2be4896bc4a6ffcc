use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{KdfSettings, DEFAULT_SEARCH_LIMIT};

/// Top-level configuration (loaded from pubseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PubsealConfig {
    pub daemon: DaemonConfig,
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
    pub crypto: CryptoConfig,
    pub retry: RetryConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// HTTP listen address for the publication API (default: 127.0.0.1:8470)
    pub listen: String,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
    /// Serve Prometheus metrics on /metrics
    pub metrics: bool,
    /// Largest accepted publish request body (default: 64 MiB)
    pub max_upload_bytes: usize,
}

/// Which OpenDAL service backs the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Fs,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// Key prefix under which ciphertext blobs are written
    pub prefix: String,
    /// Enforce HTTPS for S3 connections (warn/error on HTTP endpoints)
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file holding publication records
    pub path: PathBuf,
}

/// Key derivation configuration for new publications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

impl CryptoConfig {
    pub fn kdf_settings(&self) -> KdfSettings {
        KdfSettings {
            mem_cost_kib: self.argon2_mem_cost_kib,
            time_cost: self.argon2_time_cost,
            parallelism: self.argon2_parallelism,
        }
    }
}

/// Bounded retry applied to content store calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first (default: 4)
    pub max_attempts: u32,
    /// Delay before the first retry, doubled each time (default: 200ms)
    pub initial_backoff_ms: u64,
    /// Upper bound on a single backoff delay (default: 5s)
    pub max_backoff_ms: u64,
    /// Per-attempt timeout (default: 30s)
    pub attempt_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hard cap on results per query (default: 50)
    pub max_results: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8470".into(),
            log_level: "info".into(),
            log_format: "text".into(),
            metrics: true,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: "http://localhost:9000".into(),
            region: "us-east-1".into(),
            bucket: "pubseal".into(),
            root: PathBuf::from("~/.local/share/pubseal/blobs"),
            prefix: "pubseal".into(),
            enforce_tls: false,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.local/share/pubseal/registry.json"),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        let kdf = KdfSettings::default();
        Self {
            argon2_mem_cost_kib: kdf.mem_cost_kib,
            argon2_time_cost: kdf.time_cost,
            argon2_parallelism: kdf.parallelism,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            attempt_timeout_secs: 30,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &std::path::Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}
