// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Botfleet gateway.

use thiserror::Error;

/// The primary error type used across all Botfleet crates.
#[derive(Debug, Error)]
pub enum BotfleetError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Cryptographic failures: key derivation, encryption, or an authentication
    /// tag that does not verify (tampered or corrupted ciphertext).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The upstream platform explicitly rejected a request. Terminal: retrying
    /// the same request will not succeed.
    #[error("upstream rejected request: {description}")]
    UpstreamRejected { description: String },

    /// The upstream platform could not be reached or answered abnormally.
    /// Retryable per the caller's policy.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No bot exists with the given identifier.
    #[error("bot not found: {0}")]
    BotNotFound(String),

    /// A lifecycle operation was requested from an incompatible status.
    #[error("invalid lifecycle transition: {0}")]
    InvalidTransition(String),

    /// A compare-and-swap status transition lost to a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BotfleetError {
    /// True for errors that a retry may resolve. Used by the queue worker to
    /// decide between re-delivery and terminal completion.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BotfleetError::UpstreamUnavailable { .. } | BotfleetError::Storage { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_variants_construct_and_display() {
        let errors = vec![
            BotfleetError::Config("bad key".into()),
            BotfleetError::Storage {
                source: Box::new(std::io::Error::other("disk")),
            },
            BotfleetError::Crypto("tag mismatch".into()),
            BotfleetError::UpstreamRejected {
                description: "chat not found".into(),
            },
            BotfleetError::UpstreamUnavailable {
                message: "connect timeout".into(),
                source: None,
            },
            BotfleetError::BotNotFound("b-1".into()),
            BotfleetError::InvalidTransition("token change while active".into()),
            BotfleetError::Conflict("status moved".into()),
            BotfleetError::Internal("oops".into()),
        ];
        for e in &errors {
            assert!(!e.to_string().is_empty());
        }
    }

    #[test]
    fn retryable_classification() {
        assert!(
            BotfleetError::UpstreamUnavailable {
                message: "timeout".into(),
                source: None
            }
            .is_retryable()
        );
        assert!(
            BotfleetError::Storage {
                source: Box::new(std::io::Error::other("locked"))
            }
            .is_retryable()
        );
        assert!(
            !BotfleetError::UpstreamRejected {
                description: "bad request".into()
            }
            .is_retryable()
        );
        assert!(!BotfleetError::Crypto("bad tag".into()).is_retryable());
    }
}
