// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers for the gateway HTTP server.
//!
//! The webhook handler is the hot path: every Telegram delivery for every
//! bot lands here and runs the admission pipeline. Handlers stay thin;
//! policy lives in the services held by [`AppState`].

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use botfleet_core::types::{BotId, IncomingJob, Platform};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::error::AdmissionError;
use crate::metrics;
use crate::server::AppState;

/// Header Telegram echoes back with the value given at webhook registration.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Body acknowledging an admitted or duplicate update.
#[derive(Debug, Serialize)]
pub struct AckBody {
    pub ok: bool,
}

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: String,
}

/// POST /gateway/telegram/webhook/{bot_id}
///
/// Admission pipeline for Telegram webhook deliveries. Gates run in a fixed
/// order and the first failure wins: secret header present, bot known and
/// active, platform matches the route, secret matches, tenant subscribed,
/// body carries an update_id, not a duplicate. Admitted updates are written
/// to the durable queue; the 200 tells Telegram to stop redelivering.
pub async fn telegram_webhook(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AckBody>, AdmissionError> {
    let bot_id = BotId(bot_id);

    // Presence is checked before the bot lookup so a missing header is
    // distinguishable in logs from a wrong one.
    let presented = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    let Some(presented) = presented else {
        tracing::warn!(bot_id = %bot_id, "webhook delivery without secret token header");
        return Err(AdmissionError::MissingSecret);
    };

    let Some(bot) = state.cache.get(&bot_id).await else {
        tracing::warn!(bot_id = %bot_id, "webhook delivery for unknown or inactive bot");
        return Err(AdmissionError::BotNotFound);
    };

    match bot.platform {
        Platform::Telegram => {}
        Platform::Vk => {
            tracing::warn!(
                bot_id = %bot_id,
                platform = %bot.platform,
                "webhook delivery on the wrong platform route"
            );
            return Err(AdmissionError::PlatformMismatch);
        }
    }

    let expected = bot.webhook_secret.expose_secret();
    if ring::constant_time::verify_slices_are_equal(presented.as_bytes(), expected.as_bytes())
        .is_err()
    {
        tracing::warn!(bot_id = %bot_id, "webhook delivery with invalid secret token");
        return Err(AdmissionError::InvalidSecret);
    }

    match state.subscription.is_active(&bot.tenant_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(
                bot_id = %bot_id,
                tenant_id = %bot.tenant_id,
                "webhook delivery for tenant without an active subscription"
            );
            return Err(AdmissionError::SubscriptionInactive);
        }
        Err(error) => {
            tracing::error!(bot_id = %bot_id, error = %error, "subscription check failed");
            return Err(AdmissionError::Internal(error));
        }
    }

    let update: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(bot_id = %bot_id, error = %error, "webhook body is not valid JSON");
            return Err(AdmissionError::MalformedUpdate);
        }
    };
    let Some(update_id) = update.get("update_id").and_then(|value| value.as_i64()) else {
        tracing::warn!(bot_id = %bot_id, "webhook update without an update_id");
        return Err(AdmissionError::MalformedUpdate);
    };

    if state.dedup.is_duplicate(&bot_id, update_id).await {
        tracing::debug!(bot_id = %bot_id, update_id, "duplicate update acknowledged");
        metrics::record_update_duplicate();
        return Ok(Json(AckBody { ok: true }));
    }

    let job = IncomingJob {
        bot_id: bot.bot_id.clone(),
        tenant_id: bot.tenant_id.clone(),
        platform: bot.platform,
        update,
        received_at: botfleet_storage::now_iso(),
    };
    match state.queue.enqueue_update(&job, update_id).await {
        Ok(Some(job_id)) => {
            tracing::info!(bot_id = %bot_id, update_id, job_id, "update admitted and enqueued");
            metrics::record_update_admitted();
            metrics::record_job_enqueued();
        }
        Ok(None) => {
            // Dedup raced or failed open; the queue's job key caught it.
            tracing::debug!(bot_id = %bot_id, update_id, "update already queued");
            metrics::record_update_duplicate();
        }
        Err(error) => {
            // The queue write is the durable handoff. Without it the update
            // would be lost on a 200, so surface a 500 and let Telegram
            // redeliver.
            tracing::error!(bot_id = %bot_id, update_id, error = %error, "enqueue failed");
            return Err(AdmissionError::Internal(error));
        }
    }

    Ok(Json(AckBody { ok: true }))
}

/// GET /health
pub async fn get_health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
    })
}

/// GET /metrics
///
/// Renders the Prometheus exposition when a recorder is installed, 404
/// otherwise.
pub async fn get_metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (StatusCode::OK, render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
