// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Botfleet workspace.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a bot. Opaque and stable (UUIDv4 at creation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotId(pub String);

impl BotId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BotId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for a tenant (the customer account owning bots).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Messaging platform a bot integrates with.
///
/// Closed set: every dispatch point (cache population, webhook registration,
/// send-message) matches exhaustively, so adding a platform is a compile-time
/// exercise rather than a runtime gap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Telegram,
    Vk,
}

/// Bot lifecycle status.
///
/// Transitions: `created -> active -> archived -> active ...`. The activation
/// path never moves `created` directly to `archived`. All transitions are
/// compare-and-swap guarded at the storage layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BotStatus {
    Created,
    Active,
    Archived,
}

/// Kind of a prompt fragment attached to a bot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromptKind {
    Context,
}

/// One named prompt fragment. Bots carry an ordered list of these; they are
/// stored as a JSON column and consumed by the reply composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub kind: PromptKind,
    pub content: String,
}

/// A persisted bot configuration row.
///
/// `token` is the platform credential and is sensitive: it must never appear
/// in logs (see [`crate::redact`]). `webhook_secret` holds the encrypted
/// at-rest form (`nonce:ct:tag`, base64 parts), present only once a telegram
/// bot has a secret provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub id: BotId,
    pub tenant_id: TenantId,
    pub name: String,
    pub platform: Platform,
    pub token: String,
    pub status: BotStatus,
    pub prompts: Vec<Prompt>,
    pub webhook_secret: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A cache entry for an active telegram bot: everything the admission path
/// needs without touching persistent storage.
#[derive(Clone)]
pub struct CachedBot {
    pub bot_id: BotId,
    pub tenant_id: TenantId,
    pub platform: Platform,
    /// Decrypted webhook secret, compared against the inbound header.
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for CachedBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedBot")
            .field("bot_id", &self.bot_id)
            .field("tenant_id", &self.tenant_id)
            .field("platform", &self.platform)
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// The payload persisted with each queued job: the admitted update plus the
/// identity context the worker needs to act on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingJob {
    pub bot_id: BotId,
    pub tenant_id: TenantId,
    pub platform: Platform,
    /// The raw platform update envelope, untouched.
    pub update: serde_json::Value,
    /// Receipt timestamp (UTC ISO-8601 with milliseconds).
    pub received_at: String,
}

/// A row in the durable work queue.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub bot_id: String,
    pub job_key: String,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub next_attempt_at: String,
    pub locked_until: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub finished_at: Option<String>,
}
