// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-through cache of active telegram bots for the admission hot path.
//!
//! Keyed by bot id, valued with the decrypted webhook secret plus the owning
//! tenant and platform. Persistent storage stays the source of truth: the
//! cache never admits a bot the database does not currently show as active,
//! and a miss always re-validates against the database.

use std::sync::Arc;
use std::time::Duration;

use botfleet_core::types::{Bot, BotId, BotStatus, CachedBot, Platform};
use botfleet_core::BotfleetError;
use botfleet_secrets::SecretManager;
use botfleet_storage::queries::bots;
use botfleet_storage::Database;
use moka::future::Cache;

/// Upper bound on cached entries; idle expiry usually evicts first.
const MAX_CAPACITY: u64 = 10_000;

/// Cache of admission entries for active telegram bots.
///
/// Reads refresh the idle timer, so bots receiving traffic stay resident and
/// quiet ones age out.
#[derive(Clone)]
pub struct BotCache {
    entries: Cache<String, Arc<CachedBot>>,
    db: Database,
    secrets: SecretManager,
}

impl BotCache {
    pub fn new(db: Database, secrets: SecretManager, ttl_secs: u64) -> Self {
        let entries = Cache::builder()
            .time_to_idle(Duration::from_secs(ttl_secs))
            .max_capacity(MAX_CAPACITY)
            .build();
        Self {
            entries,
            db,
            secrets,
        }
    }

    /// Look up a bot for admission.
    ///
    /// A miss loads from the database; only currently-active telegram bots
    /// with a decryptable secret produce (and cache) an entry. Concurrent
    /// misses for the same bot collapse into one load. Storage or decryption
    /// failures degrade to a miss rather than erroring the request path.
    pub async fn get(&self, bot_id: &BotId) -> Option<Arc<CachedBot>> {
        let db = self.db.clone();
        let secrets = self.secrets.clone();
        let id = bot_id.clone();
        self.entries
            .optionally_get_with(bot_id.as_str().to_string(), async move {
                load_entry(&db, &secrets, &id).await
            })
            .await
    }

    /// Unconditionally install an entry, resetting its idle timer. The
    /// lifecycle orchestrator calls this right after activation.
    pub async fn set(&self, entry: CachedBot) {
        self.entries
            .insert(entry.bot_id.as_str().to_string(), Arc::new(entry))
            .await;
    }

    /// Drop a bot's entry. Deactivation and deletion call this; subsequent
    /// lookups re-validate against the database.
    pub async fn invalidate(&self, bot_id: &BotId) {
        self.entries.invalidate(bot_id.as_str()).await;
    }

    /// Populate the cache with every persistently active telegram bot.
    ///
    /// Run at startup so the first webhook delivery after a restart does not
    /// pay the load penalty. A bot whose secret fails to decrypt is logged
    /// and skipped. Returns the number of entries populated.
    pub async fn warm_up(&self) -> Result<usize, BotfleetError> {
        let active = bots::list_active_bots(&self.db, Platform::Telegram).await?;
        let mut populated = 0usize;
        for bot in active {
            let id = bot.id.as_str().to_string();
            if let Some(entry) = build_entry(&self.secrets, &bot) {
                self.entries.insert(id, entry).await;
                populated += 1;
            }
        }
        tracing::info!(populated, "bot cache warmed up");
        Ok(populated)
    }
}

/// Load one admission entry from storage, degrading every failure to `None`.
async fn load_entry(
    db: &Database,
    secrets: &SecretManager,
    bot_id: &BotId,
) -> Option<Arc<CachedBot>> {
    let bot = match bots::get_bot(db, bot_id).await {
        Ok(Some(bot)) => bot,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(bot_id = %bot_id, %error, "bot lookup failed, treating as cache miss");
            return None;
        }
    };
    build_entry(secrets, &bot)
}

/// Turn a bot row into a cache entry, or `None` when it must not be admitted.
fn build_entry(secrets: &SecretManager, bot: &Bot) -> Option<Arc<CachedBot>> {
    if bot.status != BotStatus::Active || bot.platform != Platform::Telegram {
        return None;
    }
    let Some(encrypted) = &bot.webhook_secret else {
        tracing::error!(bot_id = %bot.id, "active telegram bot has no webhook secret");
        return None;
    };
    match secrets.decrypt(encrypted) {
        Ok(webhook_secret) => Some(Arc::new(CachedBot {
            bot_id: bot.id.clone(),
            tenant_id: bot.tenant_id.clone(),
            platform: bot.platform,
            webhook_secret,
        })),
        Err(error) => {
            // The bot stays un-admittable until its secret is regenerated.
            tracing::error!(bot_id = %bot.id, %error, "webhook secret decryption failed");
            None
        }
    }
}
