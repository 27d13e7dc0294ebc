// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook secret lifecycle: generation, at-rest encryption, decryption.
//!
//! Secrets are stored as `nonce:ciphertext:tag` with each segment
//! base64-encoded. The encryption key is derived once at startup from the
//! configured passphrase and shared across the process.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use botfleet_core::BotfleetError;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::crypto;
use crate::kdf;

/// AES-256-GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// Number of random bytes in a generated webhook secret (hex-encoded to 64
/// characters, well within Telegram's 1-256 char secret_token limit).
const SECRET_BYTES: usize = 32;

/// Encrypts and decrypts webhook secrets with a process-wide key.
///
/// Cheap to clone; the derived key is shared behind an [`Arc`] and zeroed
/// when the last handle drops.
#[derive(Clone)]
pub struct SecretManager {
    key: Arc<Zeroizing<[u8; 32]>>,
}

impl std::fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManager").finish_non_exhaustive()
    }
}

impl SecretManager {
    /// Build a manager from an already-derived 32-byte key.
    pub fn new(key: Zeroizing<[u8; 32]>) -> Self {
        Self { key: Arc::new(key) }
    }

    /// Derive the encryption key from a passphrase via Argon2id and build a
    /// manager around it.
    ///
    /// Derivation is deterministic (fixed salt), so the same passphrase
    /// decrypts secrets stored by earlier runs. This is also why it runs once
    /// at startup: at the default cost it is deliberately slow.
    pub fn from_passphrase(
        passphrase: &str,
        memory_cost: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, BotfleetError> {
        let key = kdf::derive_key(
            passphrase.as_bytes(),
            kdf::KEY_SALT,
            memory_cost,
            iterations,
            parallelism,
        )?;
        Ok(Self::new(key))
    }

    /// Generate a fresh webhook secret: 32 CSPRNG bytes, hex-encoded.
    pub fn generate_secret() -> Result<String, BotfleetError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; SECRET_BYTES];
        rng.fill(&mut bytes)
            .map_err(|_| BotfleetError::Crypto("failed to generate webhook secret".to_string()))?;
        Ok(hex::encode(bytes))
    }

    /// Encrypt a plaintext secret into the `nonce:ciphertext:tag` storage form.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, BotfleetError> {
        let (ct_with_tag, nonce) = crypto::seal(&self.key, plaintext.as_bytes())?;

        let tag_start = ct_with_tag
            .len()
            .checked_sub(TAG_LEN)
            .ok_or_else(|| BotfleetError::Crypto("sealed output shorter than tag".to_string()))?;
        let (ciphertext, tag) = ct_with_tag.split_at(tag_start);

        Ok(format!(
            "{}:{}:{}",
            BASE64.encode(nonce),
            BASE64.encode(ciphertext),
            BASE64.encode(tag)
        ))
    }

    /// Decrypt a stored `nonce:ciphertext:tag` value back to the plaintext
    /// secret.
    pub fn decrypt(&self, stored: &str) -> Result<SecretString, BotfleetError> {
        let parts: Vec<&str> = stored.split(':').collect();
        let [nonce_b64, ct_b64, tag_b64] = parts.as_slice() else {
            return Err(BotfleetError::Crypto(
                "malformed encrypted secret: expected nonce:ciphertext:tag".to_string(),
            ));
        };

        let nonce_bytes = BASE64
            .decode(nonce_b64)
            .map_err(|e| BotfleetError::Crypto(format!("invalid nonce encoding: {e}")))?;
        let nonce: [u8; 12] = nonce_bytes
            .try_into()
            .map_err(|_| BotfleetError::Crypto("nonce must be 12 bytes".to_string()))?;

        let mut ct_with_tag = BASE64
            .decode(ct_b64)
            .map_err(|e| BotfleetError::Crypto(format!("invalid ciphertext encoding: {e}")))?;
        let tag = BASE64
            .decode(tag_b64)
            .map_err(|e| BotfleetError::Crypto(format!("invalid tag encoding: {e}")))?;
        ct_with_tag.extend_from_slice(&tag);

        let plaintext = crypto::open(&self.key, &nonce, &ct_with_tag)?;
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| BotfleetError::Crypto("decrypted secret is not UTF-8".to_string()))?;

        Ok(SecretString::from(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use secrecy::ExposeSecret;

    fn fixed_manager() -> SecretManager {
        SecretManager::new(Zeroizing::new([42u8; 32]))
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let manager = fixed_manager();
        let stored = manager.encrypt("my-webhook-secret").unwrap();
        let decrypted = manager.decrypt(&stored).unwrap();
        assert_eq!(decrypted.expose_secret(), "my-webhook-secret");
    }

    #[test]
    fn stored_form_has_three_base64_segments() {
        let manager = fixed_manager();
        let stored = manager.encrypt("value").unwrap();
        let parts: Vec<&str> = stored.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(BASE64.decode(parts[0]).unwrap().len(), 12);
        assert_eq!(BASE64.decode(parts[2]).unwrap().len(), 16);
    }

    #[test]
    fn encrypt_same_plaintext_twice_differs() {
        let manager = fixed_manager();
        let a = manager.encrypt("same").unwrap();
        let b = manager.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_with_different_key_fails() {
        let stored = fixed_manager().encrypt("value").unwrap();
        let other = SecretManager::new(Zeroizing::new([7u8; 32]));
        assert!(other.decrypt(&stored).is_err());
    }

    #[test]
    fn malformed_segment_count_rejected() {
        let manager = fixed_manager();
        assert!(manager.decrypt("no-colons-here").is_err());
        assert!(manager.decrypt("only:two").is_err());
        assert!(manager.decrypt("a:b:c:d").is_err());
    }

    #[test]
    fn invalid_base64_rejected() {
        let manager = fixed_manager();
        assert!(manager.decrypt("!!!:AAAA:AAAA").is_err());
    }

    #[test]
    fn wrong_nonce_length_rejected() {
        let manager = fixed_manager();
        let short_nonce = BASE64.encode([0u8; 4]);
        assert!(manager.decrypt(&format!("{short_nonce}:AAAA:AAAA")).is_err());
    }

    #[test]
    fn tampered_ciphertext_segment_rejected() {
        let manager = fixed_manager();
        let stored = manager.encrypt("tamper target").unwrap();
        let parts: Vec<&str> = stored.split(':').collect();
        let mut ct = BASE64.decode(parts[1]).unwrap();
        ct[0] ^= 0x01;
        let tampered = format!("{}:{}:{}", parts[0], BASE64.encode(&ct), parts[2]);
        assert!(manager.decrypt(&tampered).is_err());
    }

    #[test]
    fn generate_secret_is_hex_and_unique() {
        let a = SecretManager::generate_secret().unwrap();
        let b = SecretManager::generate_secret().unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn from_passphrase_is_deterministic() {
        // Low cost for fast tests.
        let m1 = SecretManager::from_passphrase("passphrase", 32768, 2, 1).unwrap();
        let m2 = SecretManager::from_passphrase("passphrase", 32768, 2, 1).unwrap();
        let stored = m1.encrypt("survives restart").unwrap();
        assert_eq!(m2.decrypt(&stored).unwrap().expose_secret(), "survives restart");
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_any_string(plaintext in ".*") {
            let manager = fixed_manager();
            let stored = manager.encrypt(&plaintext).unwrap();
            let decrypted = manager.decrypt(&stored).unwrap();
            prop_assert_eq!(decrypted.expose_secret(), plaintext.as_str());
        }
    }
}
