// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook secret encryption for the Botfleet platform.
//!
//! Per-bot webhook secrets are random values generated at provisioning time,
//! encrypted with AES-256-GCM before they touch storage, and decrypted only
//! into the in-memory bot cache. The key is derived from a configured
//! passphrase via Argon2id with a fixed salt, so it is stable across restarts.

pub mod crypto;
pub mod kdf;
pub mod manager;

pub use manager::SecretManager;
