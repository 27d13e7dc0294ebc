// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Botfleet platform.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Deployment environment the process runs in.
///
/// Production tightens validation (non-default passphrase, HTTPS public URL)
/// and enables live webhook registration against the platform API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(s)
    }
}

/// Top-level Botfleet configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotfleetConfig {
    /// Deployment environment: development, staging, or production.
    #[serde(default)]
    pub environment: Environment,

    /// Inbound webhook gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Webhook secret encryption settings.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Bot-config cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Update deduplication settings.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Durable queue and worker pool settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Metrics exposition settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Inbound webhook gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind the HTTP server to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to bind the HTTP server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used to build per-bot webhook URLs
    /// during registration. Must be HTTPS in production (Telegram requires it).
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("botfleet").join("botfleet.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("botfleet.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Webhook secret encryption configuration.
///
/// Controls the passphrase and Argon2id key derivation parameters used to
/// protect webhook secrets at rest. KDF defaults follow OWASP recommendations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Passphrase the encryption key is derived from. The compiled default is
    /// usable for development only; production startup rejects it.
    #[serde(default = "default_passphrase")]
    pub passphrase: String,

    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            passphrase: default_passphrase(),
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

/// The development-only passphrase. Production validation rejects it.
pub const DEV_PASSPHRASE: &str = "botfleet-dev-passphrase";

fn default_passphrase() -> String {
    DEV_PASSPHRASE.to_string()
}

fn default_kdf_memory_cost() -> u32 {
    65536 // 64 MiB per OWASP recommendation
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

/// Bot-config cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Sliding idle TTL for cached bot entries, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    1800 // 30 minutes
}

/// Update deduplication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
    /// How long a seen update_id stays remembered, in seconds.
    #[serde(default = "default_dedup_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

fn default_dedup_ttl_secs() -> u64 {
    86400 // 24 hours
}

/// Durable queue and worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum delivery attempts per job before it is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// How long completed jobs are retained before purging, in seconds.
    #[serde(default = "default_completed_retention_secs")]
    pub completed_retention_secs: u64,

    /// How long failed jobs are retained before purging, in seconds.
    #[serde(default = "default_failed_retention_secs")]
    pub failed_retention_secs: u64,

    /// Number of concurrent worker tasks draining the queue.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Worker poll interval when the queue is empty, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Processing lease duration; a crashed worker's job becomes reclaimable
    /// after this many seconds.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Interval between maintenance sweeps (lease reclaim, retention purges),
    /// in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            completed_retention_secs: default_completed_retention_secs(),
            failed_retention_secs: default_failed_retention_secs(),
            worker_count: default_worker_count(),
            poll_interval_ms: default_poll_interval_ms(),
            lease_secs: default_lease_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_completed_retention_secs() -> u64 {
    3600 // 1 hour
}

fn default_failed_retention_secs() -> u64 {
    86400 // 24 hours
}

fn default_worker_count() -> usize {
    2
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_lease_secs() -> u64 {
    300 // 5 minutes
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Override for the Bot API base URL (e.g. a local test server).
    /// `None` uses the official `https://api.telegram.org`.
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Metrics exposition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics at `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
