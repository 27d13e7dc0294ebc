// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Botfleet platform.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and Elm-style diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use botfleet_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Binding to {}:{}", config.gateway.bind_address, config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{BotfleetConfig, Environment};

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to rich miette diagnostics with typo suggestions
///
/// Returns either a valid `BotfleetConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<BotfleetConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            // Read TOML source files for error source span information
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a specific TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<BotfleetConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    // Local config
    if let Ok(content) = std::fs::read_to_string("botfleet.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("botfleet.toml").display().to_string())
            .unwrap_or_else(|_| "botfleet.toml".to_string());
        sources.push((path, content));
    }

    // XDG user config
    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("botfleet/botfleet.toml");
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    // System config
    let system_path = std::path::Path::new("/etc/botfleet/botfleet.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_str_accepts_complete_config() {
        let toml = r#"
environment = "development"

[gateway]
bind_address = "0.0.0.0"
port = 8443
public_base_url = "https://hooks.example.com"

[queue]
max_attempts = 5
worker_count = 4
"#;
        let config = load_and_validate_str(toml).unwrap();
        assert_eq!(config.gateway.port, 8443);
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.queue.worker_count, 4);
    }

    #[test]
    fn validate_str_reports_unknown_key_with_suggestion() {
        let errors = load_and_validate_str("[dedup]\nttl_sec = 60\n").unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { suggestion, .. } if suggestion.as_deref() == Some("ttl_secs")
        )));
    }

    #[test]
    fn validate_str_reports_semantic_errors() {
        let errors = load_and_validate_str("[queue]\nmax_attempts = 0\n").unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::Validation { message } if message.contains("max_attempts")
        )));
    }
}
