// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from the configured passphrase.
//!
//! Derives a 32-byte key using Argon2id (Algorithm::Argon2id, Version::V0x13)
//! with parameters from EncryptionConfig (OWASP-recommended defaults).
//!
//! The salt is a fixed deployment-wide constant: the same passphrase must
//! yield the same key across restarts, or previously stored webhook secrets
//! would become undecryptable.

use botfleet_core::BotfleetError;
use zeroize::Zeroizing;

/// Fixed 16-byte salt for webhook secret key derivation.
pub const KEY_SALT: &[u8; 16] = b"botfleet-webhook";

/// Derive a 32-byte key from passphrase using Argon2id.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8; 16],
    memory_cost: u32,
    iterations: u32,
    parallelism: u32,
) -> Result<Zeroizing<[u8; 32]>, BotfleetError> {
    let params = argon2::Params::new(memory_cost, iterations, parallelism, Some(32))
        .map_err(|e| BotfleetError::Crypto(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, output.as_mut())
        .map_err(|e| BotfleetError::Crypto(format!("Argon2id key derivation failed: {e}")))?;

    Ok(output)
}
