// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./botfleet.toml` > `~/.config/botfleet/botfleet.toml` > `/etc/botfleet/botfleet.toml`
//! with environment variable overrides via `BOTFLEET_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BotfleetConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/botfleet/botfleet.toml` (system-wide)
/// 3. `~/.config/botfleet/botfleet.toml` (user XDG config)
/// 4. `./botfleet.toml` (local directory)
/// 5. `BOTFLEET_*` environment variables
pub fn load_config() -> Result<BotfleetConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a specific TOML string only (no XDG lookup).
///
/// Used by tests and anywhere a caller already holds the TOML content.
pub fn load_config_from_str(toml_content: &str) -> Result<BotfleetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BotfleetConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BotfleetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BotfleetConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BotfleetConfig::default()))
        .merge(Toml::file("/etc/botfleet/botfleet.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("botfleet/botfleet.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("botfleet.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `BOTFLEET_GATEWAY_BIND_ADDRESS` must
/// map to `gateway.bind_address`, not `gateway.bind.address`.
fn env_provider() -> Env {
    Env::prefixed("BOTFLEET_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: BOTFLEET_GATEWAY_BIND_ADDRESS -> "gateway_bind_address"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("encryption_", "encryption.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("dedup_", "dedup.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("metrics_", "metrics.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "botfleet.toml",
                r#"
[gateway]
port = 9000
"#,
            )?;
            jail.set_env("BOTFLEET_GATEWAY_PORT", "9443");
            jail.set_env("BOTFLEET_QUEUE_MAX_ATTEMPTS", "5");

            let config: BotfleetConfig = Figment::new()
                .merge(Serialized::defaults(BotfleetConfig::default()))
                .merge(Toml::file("botfleet.toml"))
                .merge(env_provider())
                .extract()?;

            assert_eq!(config.gateway.port, 9443);
            assert_eq!(config.queue.max_attempts, 5);
            Ok(())
        });
    }

    #[test]
    fn env_keys_with_underscores_map_to_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BOTFLEET_GATEWAY_PUBLIC_BASE_URL", "https://hooks.example.com");
            jail.set_env("BOTFLEET_STORAGE_DATABASE_PATH", "/var/lib/botfleet/db.sqlite");
            jail.set_env("BOTFLEET_ENVIRONMENT", "staging");

            let config: BotfleetConfig = Figment::new()
                .merge(Serialized::defaults(BotfleetConfig::default()))
                .merge(env_provider())
                .extract()?;

            assert_eq!(config.gateway.public_base_url, "https://hooks.example.com");
            assert_eq!(config.storage.database_path, "/var/lib/botfleet/db.sqlite");
            assert_eq!(config.environment.to_string(), "staging");
            Ok(())
        });
    }

    #[test]
    fn string_loader_applies_defaults() {
        let config = load_config_from_str("[cache]\nttl_secs = 60").unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
        // Untouched sections keep compiled defaults.
        assert_eq!(config.queue.max_attempts, 3);
    }
}
