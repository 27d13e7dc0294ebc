// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::BotfleetError;
use crate::types::BotId;

/// Registers and removes webhooks with the messaging platform.
///
/// The lifecycle orchestrator drives this during activation and deactivation;
/// keeping it behind a trait lets lifecycle tests run against an in-memory
/// fake instead of the real platform API.
#[async_trait]
pub trait WebhookRegistrar: Send + Sync {
    /// Point the platform's webhook at our gateway endpoint for `bot_id`,
    /// attaching `secret` so inbound deliveries can be authenticated.
    async fn register(
        &self,
        token: &str,
        bot_id: &BotId,
        secret: &str,
    ) -> Result<(), BotfleetError>;

    /// Remove the webhook so the platform stops delivering updates.
    async fn unregister(&self, token: &str) -> Result<(), BotfleetError>;
}

/// Sends outbound messages on behalf of a bot.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(
        &self,
        token: &str,
        chat_id: i64,
        text: &str,
    ) -> Result<(), BotfleetError>;
}
