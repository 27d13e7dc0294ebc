// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server wiring for the gateway.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use botfleet_core::traits::SubscriptionGate;
use botfleet_core::BotfleetError;
use botfleet_registry::BotCache;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::dedup::DedupService;
use crate::handlers;
use crate::queue::JobQueue;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read-through cache resolving bot ids to admission entries.
    pub cache: BotCache,
    /// Billing gate consulted after the secret check.
    pub subscription: Arc<dyn SubscriptionGate>,
    /// Duplicate-update suppression.
    pub dedup: DedupService,
    /// Durable queue for admitted updates.
    pub queue: JobQueue,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Gateway server configuration (mirrors `[gateway]` in botfleet-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_address: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway router:
/// - POST /gateway/telegram/webhook/{bot_id}
/// - GET /health
/// - GET /metrics
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/gateway/telegram/webhook/{bot_id}",
            post(handlers::telegram_webhook),
        )
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Binds the configured address and serves until `shutdown` is cancelled;
/// in-flight requests are drained before this returns.
pub async fn serve(
    config: &ServerConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), BotfleetError> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BotfleetError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;
    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| BotfleetError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use botfleet_core::traits::AlwaysActive;
    use botfleet_core::types::{
        Bot, BotId, BotStatus, CachedBot, IncomingJob, Platform, TenantId,
    };
    use botfleet_secrets::SecretManager;
    use botfleet_storage::queries::{bots, queue as queue_ops};
    use botfleet_storage::{now_iso, Database};
    use secrecy::SecretString;
    use tempfile::tempdir;
    use tower::ServiceExt;
    use zeroize::Zeroizing;

    use crate::handlers::SECRET_TOKEN_HEADER;
    use crate::queue::TELEGRAM_INCOMING_QUEUE;

    const SECRET: &str = "a3f1c9d7e5b2a3f1c9d7e5b2a3f1c9d7";

    struct Harness {
        router: Router,
        cache: BotCache,
        db: Database,
        _dir: tempfile::TempDir,
    }

    async fn harness() -> Harness {
        harness_with_gate(Arc::new(AlwaysActive)).await
    }

    async fn harness_with_gate(gate: Arc<dyn SubscriptionGate>) -> Harness {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("gw.db").to_str().unwrap(), true)
            .await
            .unwrap();
        let secrets = SecretManager::new(Zeroizing::new([42u8; 32]));

        seed_bot(&db, &secrets, "bot-live", BotStatus::Active).await;
        seed_bot(&db, &secrets, "bot-idle", BotStatus::Created).await;

        let cache = BotCache::new(db.clone(), secrets, 60);
        let state = AppState {
            cache: cache.clone(),
            subscription: gate,
            dedup: DedupService::new(db.clone(), 300),
            queue: JobQueue::new(db.clone(), 3),
            prometheus_render: None,
        };
        Harness {
            router: build_router(state),
            cache,
            db,
            _dir: dir,
        }
    }

    async fn seed_bot(db: &Database, secrets: &SecretManager, id: &str, status: BotStatus) {
        let now = now_iso();
        bots::insert_bot(
            db,
            &Bot {
                id: BotId(id.to_string()),
                tenant_id: TenantId("t1".to_string()),
                name: "support bot".to_string(),
                platform: Platform::Telegram,
                token: "12345:test-token".to_string(),
                status,
                prompts: vec![],
                webhook_secret: Some(secrets.encrypt(SECRET).unwrap()),
                created_at: now.clone(),
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    fn webhook_request(bot_id: &str, secret: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/gateway/telegram/webhook/{bot_id}"))
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(SECRET_TOKEN_HEADER, secret);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn update_body(update_id: i64) -> String {
        serde_json::json!({
            "update_id": update_id,
            "message": {
                "message_id": 10,
                "chat": {"id": 7, "type": "private"},
                "text": "hello"
            }
        })
        .to_string()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_secret_header_is_forbidden() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-live", None, &update_body(1)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"ok": false, "error": "forbidden"}));
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_bot_is_not_found() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("no-such-bot", Some(SECRET), &update_body(1)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn non_active_bot_is_not_found() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-idle", Some(SECRET), &update_body(1)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wrong_secret_is_forbidden_and_leaves_no_trace() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-live", Some("wrong"), &update_body(5)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            queue_ops::count_pending(&h.db, TELEGRAM_INCOMING_QUEUE)
                .await
                .unwrap(),
            0
        );

        // The failed attempt must not have marked dedup: the genuine
        // delivery of the same update still goes through.
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-live", Some(SECRET), &update_body(5)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            queue_ops::count_pending(&h.db, TELEGRAM_INCOMING_QUEUE)
                .await
                .unwrap(),
            1
        );
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn valid_delivery_acks_and_enqueues_one_job() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-live", Some(SECRET), &update_body(42)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"ok": true}));

        let entry = queue_ops::dequeue(&h.db, TELEGRAM_INCOMING_QUEUE, 300)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.job_key, "update:42");
        assert_eq!(entry.bot_id, "bot-live");
        let job: IncomingJob = serde_json::from_str(&entry.payload).unwrap();
        assert_eq!(job.bot_id.as_str(), "bot-live");
        assert_eq!(job.tenant_id.as_str(), "t1");
        assert_eq!(job.platform, Platform::Telegram);
        assert_eq!(job.update["update_id"], 42);
        assert_eq!(job.update["message"]["text"], "hello");
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_delivery_acks_without_second_job() {
        let h = harness().await;
        for _ in 0..3 {
            let response = h
                .router
                .clone()
                .oneshot(webhook_request("bot-live", Some(SECRET), &update_body(9)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(
            queue_ops::count_pending(&h.db, TELEGRAM_INCOMING_QUEUE)
                .await
                .unwrap(),
            1
        );
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_without_update_id_is_bad_request() {
        let h = harness().await;
        let body = serde_json::json!({"message": {"chat": {"id": 7}, "text": "hi"}}).to_string();
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-live", Some(SECRET), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_request");
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn non_json_body_is_bad_request() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-live", Some(SECRET), "not json at all"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wrong_platform_entry_is_bad_request() {
        let h = harness().await;
        // A cache entry for another platform can only come from a direct
        // set; the read-through loader never builds one for this route.
        h.cache
            .set(CachedBot {
                bot_id: BotId("bot-vk".to_string()),
                tenant_id: TenantId("t1".to_string()),
                platform: Platform::Vk,
                webhook_secret: SecretString::from(SECRET.to_string()),
            })
            .await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-vk", Some(SECRET), &update_body(1)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn inactive_subscription_is_forbidden() {
        struct DenyAll;
        #[async_trait::async_trait]
        impl SubscriptionGate for DenyAll {
            async fn is_active(&self, _tenant_id: &TenantId) -> Result<bool, BotfleetError> {
                Ok(false)
            }
        }

        let h = harness_with_gate(Arc::new(DenyAll)).await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-live", Some(SECRET), &update_body(1)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            queue_ops::count_pending(&h.db, TELEGRAM_INCOMING_QUEUE)
                .await
                .unwrap(),
            0
        );
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn subscription_backend_failure_is_internal() {
        struct BrokenGate;
        #[async_trait::async_trait]
        impl SubscriptionGate for BrokenGate {
            async fn is_active(&self, _tenant_id: &TenantId) -> Result<bool, BotfleetError> {
                Err(BotfleetError::Internal("billing backend offline".into()))
            }
        }

        let h = harness_with_gate(Arc::new(BrokenGate)).await;
        let response = h
            .router
            .clone()
            .oneshot(webhook_request("bot-live", Some(SECRET), &update_body(1)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "internal");
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"status": "ok"}));
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_not_found() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        h.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn metrics_renders_through_the_installed_closure() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("gw.db").to_str().unwrap(), true)
            .await
            .unwrap();
        let secrets = SecretManager::new(Zeroizing::new([42u8; 32]));
        let state = AppState {
            cache: BotCache::new(db.clone(), secrets, 60),
            subscription: Arc::new(AlwaysActive),
            dedup: DedupService::new(db.clone(), 300),
            queue: JobQueue::new(db.clone(), 3),
            prometheus_render: Some(Arc::new(|| "# TYPE botfleet_up gauge\n".to_string())),
        };
        let router = build_router(state);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8(bytes.to_vec())
            .unwrap()
            .contains("botfleet_up"));
        db.close().await.unwrap();
    }
}
