// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `botfleet serve` command implementation.
//!
//! Wires storage, the secret manager, the bot cache, the Telegram client,
//! metrics, the worker pool and the maintenance sweep, then runs the
//! gateway HTTP server until SIGINT/SIGTERM. Shutdown order: the server
//! drains in-flight requests, workers finish their current job, the
//! database closes last.

use std::sync::Arc;

use botfleet_config::BotfleetConfig;
use botfleet_core::traits::AlwaysActive;
use botfleet_core::BotfleetError;
use botfleet_gateway::{
    shutdown, AppState, DedupService, JobQueue, ServerConfig, SweepConfig, WorkerConfig,
    WorkerContext,
};
use botfleet_registry::BotCache;
use botfleet_secrets::SecretManager;
use botfleet_telegram::TelegramApi;
use tracing::{debug, info, warn};

/// Runs the `botfleet serve` command.
pub async fn run_serve(config: BotfleetConfig) -> Result<(), BotfleetError> {
    init_tracing(&config.log.level);

    info!(environment = %config.environment, "starting botfleet serve");

    // Derive the encryption key up front; the Argon2 work happens once.
    let secrets = SecretManager::from_passphrase(
        &config.encryption.passphrase,
        config.encryption.kdf_memory_cost,
        config.encryption.kdf_iterations,
        config.encryption.kdf_parallelism,
    )?;
    info!("encryption key derived");

    let db = crate::open_database(&config).await?;
    info!(path = config.storage.database_path.as_str(), "storage ready");

    let cache = BotCache::new(db.clone(), secrets, config.cache.ttl_secs);
    if let Err(error) = cache.warm_up().await {
        warn!(error = %error, "cache warm-up failed, continuing with a cold cache");
    }

    let telegram = TelegramApi::new(
        &config.gateway.public_base_url,
        config.telegram.api_url.as_deref(),
        config.environment.is_production(),
    )?;

    // Install the Prometheus recorder (if enabled).
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = if config
        .metrics
        .enabled
    {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                botfleet_gateway::metrics::register_metrics();
                info!("prometheus metrics enabled");
                Some(Arc::new(move || handle.render()))
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        debug!("metrics disabled by configuration");
        None
    };

    let dedup = DedupService::new(db.clone(), config.dedup.ttl_secs);
    let queue = JobQueue::new(db.clone(), config.queue.max_attempts);

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    // Worker pool draining the incoming queue.
    let worker_handles = botfleet_gateway::spawn_workers(
        WorkerContext {
            db: db.clone(),
            messenger: Arc::new(telegram),
        },
        WorkerConfig {
            count: config.queue.worker_count,
            poll_interval_ms: config.queue.poll_interval_ms,
            lease_secs: config.queue.lease_secs,
            backoff_base_ms: config.queue.backoff_base_ms,
        },
        cancel.clone(),
    );
    info!(count = config.queue.worker_count, "queue workers started");

    // Maintenance sweep: lease reclaim, retention purges, dedup expiry.
    let sweep_handle = botfleet_gateway::spawn_sweeper(
        db.clone(),
        dedup.clone(),
        SweepConfig {
            interval_secs: config.queue.sweep_interval_secs,
            completed_retention_secs: config.queue.completed_retention_secs,
            failed_retention_secs: config.queue.failed_retention_secs,
        },
        cancel.clone(),
    );
    info!(
        interval_secs = config.queue.sweep_interval_secs,
        "maintenance sweep started"
    );

    // The HTTP server blocks until the cancel token fires.
    let state = AppState {
        cache,
        subscription: Arc::new(AlwaysActive),
        dedup,
        queue,
        prometheus_render,
    };
    let server_config = ServerConfig {
        bind_address: config.gateway.bind_address.clone(),
        port: config.gateway.port,
    };
    let serve_result = botfleet_gateway::serve(&server_config, state, cancel.clone()).await;

    // The server may have exited on an error rather than a signal; background
    // tasks must see the cancellation either way.
    cancel.cancel();
    for handle in worker_handles {
        if let Err(error) = handle.await {
            warn!(error = %error, "worker task aborted");
        }
    }
    if let Err(error) = sweep_handle.await {
        warn!(error = %error, "sweep task aborted");
    }
    db.close().await?;
    serve_result?;

    info!("botfleet serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    // The workspace crates do not share a single tracing target prefix, so
    // each gets its own directive; everything else stays at warn.
    let crates = [
        "botfleet",
        "botfleet_config",
        "botfleet_gateway",
        "botfleet_registry",
        "botfleet_secrets",
        "botfleet_storage",
        "botfleet_telegram",
    ];
    let directives = crates
        .iter()
        .map(|name| format!("{name}={log_level}"))
        .collect::<Vec<_>>()
        .join(",");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{directives},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
