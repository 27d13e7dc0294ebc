// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API client for webhook registration and outbound messages.
//!
//! One shared `reqwest` client serves every managed bot; per-bot `teloxide`
//! handles are built around it on demand with the bot's own token.

use std::time::Duration;

use async_trait::async_trait;
use botfleet_core::redact::redact;
use botfleet_core::types::BotId;
use botfleet_core::{BotfleetError, Messenger, WebhookRegistrar};
use teloxide::payloads::SetWebhookSetters;
use teloxide::requests::Requester;
use teloxide::types::{AllowedUpdate, ChatId};
use teloxide::{Bot, RequestError};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The update kinds the gateway handles; everything else is filtered upstream.
const ALLOWED_UPDATES: [AllowedUpdate; 3] = [
    AllowedUpdate::Message,
    AllowedUpdate::EditedMessage,
    AllowedUpdate::CallbackQuery,
];

/// Telegram limits webhook delivery concurrency per bot.
const MAX_CONNECTIONS: u8 = 40;

/// Client for the Telegram Bot API, shared across all managed bots.
#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    public_base_url: Url,
    api_url: Option<Url>,
    live: bool,
}

impl TelegramApi {
    /// Build the client.
    ///
    /// `api_url` overrides the default `https://api.telegram.org` for
    /// self-hosted Bot API servers and tests. With `live = false`, webhook
    /// registration calls become logged no-ops: Telegram cannot reach a
    /// localhost callback URL anyway.
    pub fn new(
        public_base_url: &str,
        api_url: Option<&str>,
        live: bool,
    ) -> Result<Self, BotfleetError> {
        let public_base_url = Url::parse(public_base_url)
            .map_err(|e| BotfleetError::Config(format!("invalid public_base_url: {e}")))?;
        let api_url = api_url
            .map(Url::parse)
            .transpose()
            .map_err(|e| BotfleetError::Config(format!("invalid telegram api_url: {e}")))?;
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotfleetError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            client,
            public_base_url,
            api_url,
            live,
        })
    }

    /// A `teloxide` handle for one bot token, on the shared HTTP client.
    fn bot(&self, token: &str) -> Bot {
        let bot = Bot::with_client(token, self.client.clone());
        match &self.api_url {
            Some(url) => bot.set_api_url(url.clone()),
            None => bot,
        }
    }

    /// The public callback URL Telegram will POST updates to for `bot_id`.
    pub fn webhook_url(&self, bot_id: &BotId) -> Result<Url, BotfleetError> {
        // String-level join keeps any path prefix on the base URL intact.
        let base = self.public_base_url.as_str().trim_end_matches('/');
        let joined = format!("{base}/gateway/telegram/webhook/{}", bot_id.as_str());
        Url::parse(&joined)
            .map_err(|e| BotfleetError::Internal(format!("webhook callback url: {e}")))
    }

    /// Register the gateway as this bot's webhook endpoint.
    ///
    /// `secret` is echoed back by Telegram in the
    /// `x-telegram-bot-api-secret-token` header of every delivery.
    pub async fn register_webhook(
        &self,
        token: &str,
        bot_id: &BotId,
        secret: &str,
    ) -> Result<(), BotfleetError> {
        let url = self.webhook_url(bot_id)?;
        if !self.live {
            tracing::info!(bot_id = %bot_id, url = %url, "skipping setWebhook outside production");
            return Ok(());
        }

        self.bot(token)
            .set_webhook(url.clone())
            .secret_token(secret.to_string())
            .allowed_updates(ALLOWED_UPDATES)
            .max_connections(MAX_CONNECTIONS)
            .await
            .map_err(|e| map_request_error(e, token))?;

        tracing::info!(bot_id = %bot_id, url = %url, "webhook registered");
        Ok(())
    }

    /// Remove this bot's webhook so Telegram stops delivering updates.
    pub async fn delete_webhook(&self, token: &str) -> Result<(), BotfleetError> {
        if !self.live {
            tracing::info!("skipping deleteWebhook outside production");
            return Ok(());
        }

        self.bot(token)
            .delete_webhook()
            .await
            .map_err(|e| map_request_error(e, token))?;

        tracing::info!("webhook removed");
        Ok(())
    }

    /// Send a plain-text message from the bot identified by `token`.
    pub async fn send_message(
        &self,
        token: &str,
        chat_id: i64,
        text: &str,
    ) -> Result<(), BotfleetError> {
        self.bot(token)
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| map_request_error(e, token))?;
        Ok(())
    }
}

#[async_trait]
impl WebhookRegistrar for TelegramApi {
    async fn register(
        &self,
        token: &str,
        bot_id: &BotId,
        secret: &str,
    ) -> Result<(), BotfleetError> {
        self.register_webhook(token, bot_id, secret).await
    }

    async fn unregister(&self, token: &str) -> Result<(), BotfleetError> {
        self.delete_webhook(token).await
    }
}

#[async_trait]
impl Messenger for TelegramApi {
    async fn send_text(&self, token: &str, chat_id: i64, text: &str) -> Result<(), BotfleetError> {
        self.send_message(token, chat_id, text).await
    }
}

/// Classify a Telegram request failure.
///
/// Explicit API rejections are terminal; rate limits, network failures, and
/// malformed responses are retryable. The bot token never survives into the
/// error message.
fn map_request_error(err: RequestError, token: &str) -> BotfleetError {
    let exact = [token.to_string()];
    let detail = redact(&err.to_string(), &exact);
    match err {
        RequestError::Api(_) | RequestError::MigrateToChatId(_) => {
            BotfleetError::UpstreamRejected {
                description: detail,
            }
        }
        retryable => BotfleetError::UpstreamUnavailable {
            message: detail,
            source: Some(Box::new(retryable)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use teloxide::ApiError;

    fn api(base: &str) -> TelegramApi {
        TelegramApi::new(base, None, false).unwrap()
    }

    #[test]
    fn webhook_url_appends_gateway_path() {
        let api = api("https://bots.example.com");
        let url = api.webhook_url(&BotId("b-123".into())).unwrap();
        assert_eq!(
            url.as_str(),
            "https://bots.example.com/gateway/telegram/webhook/b-123"
        );
    }

    #[test]
    fn webhook_url_tolerates_trailing_slash() {
        let api = api("https://bots.example.com/");
        let url = api.webhook_url(&BotId("b-123".into())).unwrap();
        assert_eq!(
            url.as_str(),
            "https://bots.example.com/gateway/telegram/webhook/b-123"
        );
    }

    #[test]
    fn webhook_url_keeps_path_prefix() {
        let api = api("https://example.com/botfleet");
        let url = api.webhook_url(&BotId("b-123".into())).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/botfleet/gateway/telegram/webhook/b-123"
        );
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let result = TelegramApi::new("not a url", None, false);
        assert!(matches!(result, Err(BotfleetError::Config(_))));
    }

    #[tokio::test]
    async fn registration_is_noop_outside_production() {
        // `live = false` must short-circuit before any network I/O; a bogus
        // token would otherwise fail.
        let api = api("http://localhost:8080");
        api.register_webhook("0000:bogus", &BotId("b-1".into()), "secret")
            .await
            .unwrap();
        api.delete_webhook("0000:bogus").await.unwrap();
    }

    #[test]
    fn api_rejection_is_terminal() {
        let err = map_request_error(RequestError::Api(ApiError::ChatNotFound), "123:token");
        assert!(matches!(err, BotfleetError::UpstreamRejected { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn io_failure_is_retryable() {
        let io = Arc::new(std::io::Error::other("connection reset"));
        let err = map_request_error(RequestError::from(io), "123:token");
        assert!(matches!(err, BotfleetError::UpstreamUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn token_is_redacted_from_error_detail() {
        let token = "1234567890:AAHsomeRealLookingTokenValue1234567890x";
        let io = Arc::new(std::io::Error::other(format!(
            "POST https://api.telegram.org/bot{token}/sendMessage timed out"
        )));
        let err = map_request_error(RequestError::from(io), token);
        let detail = err.to_string();
        assert!(!detail.contains(token), "token leaked: {detail}");
        assert!(detail.contains("[REDACTED]"));
    }
}
