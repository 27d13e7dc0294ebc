// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot lifecycle orchestration: create, activate, deactivate, retoken, delete.
//!
//! Activation is the delicate path. The webhook is registered with the
//! platform before the status flips, and the status flip is a compare-and-swap
//! on the persisted row. Losing the CAS triggers a compensating webhook
//! removal so a bot can never end up registered upstream but inactive here.

use std::sync::Arc;

use botfleet_core::types::{Bot, BotId, BotStatus, CachedBot, Platform, Prompt, TenantId};
use botfleet_core::{BotfleetError, WebhookRegistrar};
use botfleet_secrets::SecretManager;
use botfleet_storage::queries::bots;
use botfleet_storage::{now_iso, Database};
use secrecy::{ExposeSecret, SecretString};

use crate::cache::BotCache;

/// Input for [`BotLifecycle::create`].
#[derive(Debug, Clone)]
pub struct CreateBot {
    pub tenant_id: TenantId,
    pub name: String,
    pub platform: Platform,
    pub token: String,
    pub prompts: Vec<Prompt>,
}

/// Coordinates bot state transitions across storage, the platform API, and
/// the admission cache.
#[derive(Clone)]
pub struct BotLifecycle {
    db: Database,
    secrets: SecretManager,
    registrar: Arc<dyn WebhookRegistrar>,
    cache: BotCache,
}

impl BotLifecycle {
    pub fn new(
        db: Database,
        secrets: SecretManager,
        registrar: Arc<dyn WebhookRegistrar>,
        cache: BotCache,
    ) -> Self {
        Self {
            db,
            secrets,
            registrar,
            cache,
        }
    }

    /// Create a bot in `created` status.
    ///
    /// Telegram bots get their webhook secret generated and encrypted
    /// immediately, so activation never has to mint one under race pressure.
    pub async fn create(&self, spec: CreateBot) -> Result<Bot, BotfleetError> {
        let name_chars = spec.name.chars().count();
        if !(2..=100).contains(&name_chars) {
            return Err(BotfleetError::Config(
                "bot name must be between 2 and 100 characters".to_string(),
            ));
        }
        if spec.token.trim().is_empty() {
            return Err(BotfleetError::Config("bot token must not be empty".to_string()));
        }

        let webhook_secret = match spec.platform {
            Platform::Telegram => {
                let secret = SecretManager::generate_secret()?;
                Some(self.secrets.encrypt(&secret)?)
            }
            Platform::Vk => None,
        };

        let now = now_iso();
        let bot = Bot {
            id: BotId::generate(),
            tenant_id: spec.tenant_id,
            name: spec.name,
            platform: spec.platform,
            token: spec.token,
            status: BotStatus::Created,
            prompts: spec.prompts,
            webhook_secret,
            created_at: now.clone(),
            updated_at: now,
        };
        bots::insert_bot(&self.db, &bot).await?;

        tracing::info!(bot_id = %bot.id, tenant_id = %bot.tenant_id, platform = %bot.platform, "bot created");
        Ok(bot)
    }

    /// Activate a bot: register its webhook, flip the status, prime the cache.
    ///
    /// Already-active bots are a no-op. Registration failure aborts with the
    /// status untouched. A lost status race after registration compensates by
    /// removing the webhook again and reports a conflict.
    pub async fn activate(&self, bot_id: &BotId) -> Result<(), BotfleetError> {
        let bot = self.load(bot_id).await?;
        if bot.status == BotStatus::Active {
            tracing::debug!(bot_id = %bot.id, "already active");
            return Ok(());
        }

        match bot.platform {
            Platform::Telegram => self.activate_telegram(bot).await,
            Platform::Vk => {
                // No webhook and no admission cache for this platform; the
                // status flip is the whole activation.
                self.cas_status(&bot.id, bot.status, BotStatus::Active).await?;
                tracing::info!(bot_id = %bot.id, "bot activated");
                Ok(())
            }
        }
    }

    async fn activate_telegram(&self, bot: Bot) -> Result<(), BotfleetError> {
        let secret = self.ensure_secret(&bot).await?;

        // Register first. If Telegram refuses, nothing here has changed.
        self.registrar
            .register(&bot.token, &bot.id, secret.expose_secret())
            .await?;

        if let Err(conflict) = self.cas_status(&bot.id, bot.status, BotStatus::Active).await {
            // Someone else moved the status while we were registering. Undo
            // the registration so upstream matches whatever they decided.
            if let Err(error) = self.registrar.unregister(&bot.token).await {
                tracing::warn!(bot_id = %bot.id, %error, "webhook compensation failed after lost activation race");
            }
            return Err(conflict);
        }

        self.cache
            .set(CachedBot {
                bot_id: bot.id.clone(),
                tenant_id: bot.tenant_id.clone(),
                platform: bot.platform,
                webhook_secret: secret,
            })
            .await;

        tracing::info!(bot_id = %bot.id, "bot activated");
        Ok(())
    }

    /// Deactivate an active bot, then best-effort remove the webhook and the
    /// cache entry. Both cleanups run even if one fails; they are independent.
    pub async fn deactivate(&self, bot_id: &BotId) -> Result<(), BotfleetError> {
        let bot = self.load(bot_id).await?;
        if bot.status != BotStatus::Active {
            tracing::debug!(bot_id = %bot.id, status = %bot.status, "not active, nothing to deactivate");
            return Ok(());
        }

        self.cas_status(&bot.id, BotStatus::Active, BotStatus::Archived)
            .await?;

        if bot.platform == Platform::Telegram {
            if let Err(error) = self.registrar.unregister(&bot.token).await {
                tracing::warn!(bot_id = %bot.id, %error, "webhook removal failed during deactivation");
            }
            self.cache.invalidate(&bot.id).await;
        }

        tracing::info!(bot_id = %bot.id, "bot deactivated");
        Ok(())
    }

    /// Replace a bot's platform token. Refused while active: the registered
    /// webhook would keep using a credential we no longer hold.
    pub async fn set_token(&self, bot_id: &BotId, token: &str) -> Result<(), BotfleetError> {
        if token.trim().is_empty() {
            return Err(BotfleetError::Config("bot token must not be empty".to_string()));
        }

        let bot = self.load(bot_id).await?;
        if bot.status == BotStatus::Active {
            return Err(BotfleetError::InvalidTransition(format!(
                "bot {} is active; deactivate it before changing the token",
                bot.id
            )));
        }

        // The UPDATE re-checks the status, closing the load/update race.
        let updated = bots::update_token(&self.db, &bot.id, token).await?;
        if !updated {
            return Err(BotfleetError::Conflict(format!(
                "bot {} became active during token change",
                bot.id
            )));
        }

        tracing::info!(bot_id = %bot.id, "bot token updated");
        Ok(())
    }

    /// Delete a bot. Active bots go through the full deactivation teardown
    /// first so the platform stops delivering updates for a missing row.
    pub async fn delete(&self, bot_id: &BotId) -> Result<(), BotfleetError> {
        let bot = self.load(bot_id).await?;

        if bot.status == BotStatus::Active {
            self.deactivate(&bot.id).await?;
        } else if bot.platform == Platform::Telegram {
            // A crash between a past status flip and its cache cleanup could
            // have left an entry behind.
            self.cache.invalidate(&bot.id).await;
        }

        let removed = bots::delete_bot(&self.db, &bot.id).await?;
        if !removed {
            return Err(BotfleetError::Conflict(format!(
                "bot {} was already removed",
                bot.id
            )));
        }

        tracing::info!(bot_id = %bot.id, "bot deleted");
        Ok(())
    }

    async fn load(&self, bot_id: &BotId) -> Result<Bot, BotfleetError> {
        bots::get_bot(&self.db, bot_id)
            .await?
            .ok_or_else(|| BotfleetError::BotNotFound(bot_id.to_string()))
    }

    async fn cas_status(
        &self,
        bot_id: &BotId,
        from: BotStatus,
        to: BotStatus,
    ) -> Result<(), BotfleetError> {
        let won = bots::update_status_cas(&self.db, bot_id, from, to).await?;
        if won {
            Ok(())
        } else {
            Err(BotfleetError::Conflict(format!(
                "bot {bot_id} changed status concurrently (expected {from})"
            )))
        }
    }

    /// Return the bot's decrypted webhook secret, generating and persisting
    /// one if the row predates secret-at-creation.
    async fn ensure_secret(&self, bot: &Bot) -> Result<SecretString, BotfleetError> {
        match &bot.webhook_secret {
            Some(encrypted) => self.secrets.decrypt(encrypted),
            None => {
                let secret = SecretManager::generate_secret()?;
                let encrypted = self.secrets.encrypt(&secret)?;
                let updated = bots::update_webhook_secret(&self.db, &bot.id, &encrypted).await?;
                if !updated {
                    return Err(BotfleetError::BotNotFound(bot.id.to_string()));
                }
                tracing::info!(bot_id = %bot.id, "webhook secret backfilled");
                Ok(SecretString::from(secret))
            }
        }
    }
}
