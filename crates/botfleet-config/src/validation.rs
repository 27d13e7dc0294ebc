// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, sane queue parameters, and the production
//! hardening rules (no development passphrase, HTTPS public URL).

use crate::diagnostic::ConfigError;
use crate::model::{BotfleetConfig, DEV_PASSPHRASE};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BotfleetConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate bind_address is not empty
    if config.gateway.bind_address.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.bind_address must not be empty".to_string(),
        });
    }

    // Validate bind_address looks like a valid IP or hostname
    if !config.gateway.bind_address.trim().is_empty() {
        let addr = config.gateway.bind_address.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!(
                    "gateway.bind_address `{addr}` is not a valid IP address or hostname"
                ),
            });
        }
    }

    if config.gateway.port == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.port must not be 0".to_string(),
        });
    }

    // public_base_url must be an absolute http(s) URL; webhook registration
    // appends the per-bot path to it.
    let base = config.gateway.public_base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!(
                "gateway.public_base_url `{base}` must start with http:// or https://"
            ),
        });
    }

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Validate encryption KDF parameters
    if config.encryption.kdf_memory_cost < 32768 {
        errors.push(ConfigError::Validation {
            message: format!(
                "encryption.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
                config.encryption.kdf_memory_cost
            ),
        });
    }

    if config.encryption.kdf_iterations < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "encryption.kdf_iterations must be at least 2, got {}",
                config.encryption.kdf_iterations
            ),
        });
    }

    if config.encryption.kdf_parallelism < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "encryption.kdf_parallelism must be at least 1, got {}",
                config.encryption.kdf_parallelism
            ),
        });
    }

    if config.encryption.passphrase.is_empty() {
        errors.push(ConfigError::Validation {
            message: "encryption.passphrase must not be empty".to_string(),
        });
    }

    // TTLs of zero would disable caching and dedup silently; reject instead.
    if config.cache.ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.ttl_secs must be at least 1".to_string(),
        });
    }

    if config.dedup.ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dedup.ttl_secs must be at least 1".to_string(),
        });
    }

    // Validate queue parameters
    if config.queue.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.max_attempts must be at least 1, got {}",
                config.queue.max_attempts
            ),
        });
    }

    if config.queue.backoff_base_ms < 1 {
        errors.push(ConfigError::Validation {
            message: "queue.backoff_base_ms must be at least 1".to_string(),
        });
    }

    if config.queue.worker_count < 1 {
        errors.push(ConfigError::Validation {
            message: "queue.worker_count must be at least 1".to_string(),
        });
    }

    if config.queue.poll_interval_ms < 1 {
        errors.push(ConfigError::Validation {
            message: "queue.poll_interval_ms must be at least 1".to_string(),
        });
    }

    if config.queue.lease_secs < 1 {
        errors.push(ConfigError::Validation {
            message: "queue.lease_secs must be at least 1".to_string(),
        });
    }

    // Production hardening: a default passphrase or plain-HTTP public URL is
    // a misconfiguration, not a warning.
    if config.environment.is_production() {
        if config.encryption.passphrase == DEV_PASSPHRASE {
            errors.push(ConfigError::Validation {
                message: "encryption.passphrase must be changed from the development default in production"
                    .to_string(),
            });
        }

        if !config.gateway.public_base_url.trim().starts_with("https://") {
            errors.push(ConfigError::Validation {
                message: "gateway.public_base_url must use https:// in production".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
