// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue workers and the maintenance sweep.
//!
//! Workers poll the durable queue and process jobs independently of the
//! webhook hot path, so acknowledgment latency never depends on Telegram
//! API latency. Delivery is at-least-once: a crash between send and ack
//! replays the job after its lease expires.

use std::sync::Arc;
use std::time::Duration;

use botfleet_core::traits::Messenger;
use botfleet_core::types::IncomingJob;
use botfleet_core::BotfleetError;
use botfleet_storage::queries::{bots, queue as queue_ops};
use botfleet_storage::{Database, QueueEntry};
use botfleet_telegram::UpdateEnvelope;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dedup::DedupService;
use crate::metrics;
use crate::queue::TELEGRAM_INCOMING_QUEUE;

/// Canned acknowledgments while real reply generation is not built.
const ACK_REPLIES: [&str; 5] = [
    "Got it! A smarter reply will live here soon.",
    "Message received, working on it.",
    "Still learning, but I hear you!",
    "Roger that!",
    "Hi! I'm a placeholder bot for now.",
];

/// Worker pool configuration (mirrors `[queue]` in botfleet-config).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of worker tasks.
    pub count: usize,
    /// Idle poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Processing lease per dequeued job, in seconds.
    pub lease_secs: u64,
    /// Base delay for the exponential retry backoff, in milliseconds.
    pub backoff_base_ms: u64,
}

/// Maintenance sweep configuration (mirrors `[queue]` in botfleet-config).
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Seconds between sweep runs.
    pub interval_secs: u64,
    /// Retention for completed jobs, in seconds.
    pub completed_retention_secs: u64,
    /// Retention for failed jobs, in seconds.
    pub failed_retention_secs: u64,
}

/// Everything a worker needs to process a job.
#[derive(Clone)]
pub struct WorkerContext {
    pub db: Database,
    pub messenger: Arc<dyn Messenger>,
}

enum JobOutcome {
    Completed,
    Retry(BotfleetError),
}

/// Spawn the worker pool. Workers run until `cancel` fires; a job already
/// dequeued is finished before the worker exits.
pub fn spawn_workers(
    ctx: WorkerContext,
    config: WorkerConfig,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..config.count.max(1))
        .map(|index| {
            let ctx = ctx.clone();
            let config = config.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { worker_loop(index, ctx, config, cancel).await })
        })
        .collect()
}

async fn worker_loop(
    index: usize,
    ctx: WorkerContext,
    config: WorkerConfig,
    cancel: CancellationToken,
) {
    tracing::debug!(worker = index, "queue worker started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match queue_ops::dequeue(&ctx.db, TELEGRAM_INCOMING_QUEUE, config.lease_secs).await {
            Ok(Some(entry)) => {
                // Cancellation is observed between jobs only; the one in
                // hand runs to completion.
                process_entry(&ctx, entry, config.backoff_base_ms).await;
            }
            Ok(None) => idle_wait(&config, &cancel).await,
            Err(error) => {
                tracing::warn!(worker = index, error = %error, "dequeue failed");
                idle_wait(&config, &cancel).await;
            }
        }
    }
    tracing::debug!(worker = index, "queue worker stopped");
}

async fn idle_wait(config: &WorkerConfig, cancel: &CancellationToken) {
    // Jitter de-synchronizes workers that went idle together.
    let jitter = rand::thread_rng().gen_range(0..=config.poll_interval_ms / 4);
    let wait = Duration::from_millis(config.poll_interval_ms + jitter);
    tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        _ = cancel.cancelled() => {}
    }
}

/// Process one leased entry and settle it: ack on completion, schedule a
/// retry (or final failure) otherwise.
async fn process_entry(ctx: &WorkerContext, entry: QueueEntry, backoff_base_ms: u64) {
    match process_job(ctx, &entry).await {
        JobOutcome::Completed => {
            if let Err(error) = queue_ops::ack(&ctx.db, entry.id).await {
                // The lease will expire and the sweep replays the job.
                tracing::warn!(job_id = entry.id, error = %error, "ack failed");
                return;
            }
            metrics::record_job_completed();
        }
        JobOutcome::Retry(cause) => {
            match queue_ops::fail(&ctx.db, entry.id, backoff_base_ms).await {
                Ok(true) => {
                    tracing::error!(
                        job_id = entry.id,
                        bot_id = %entry.bot_id,
                        error = %cause,
                        "job failed permanently"
                    );
                    metrics::record_jobs_failed(1);
                }
                Ok(false) => {
                    tracing::warn!(
                        job_id = entry.id,
                        bot_id = %entry.bot_id,
                        attempts = entry.attempts + 1,
                        error = %cause,
                        "job attempt failed, rescheduled"
                    );
                    metrics::record_jobs_retried(1);
                }
                Err(error) => {
                    tracing::warn!(job_id = entry.id, error = %error, "failure record failed");
                }
            }
        }
    }
}

async fn process_job(ctx: &WorkerContext, entry: &QueueEntry) -> JobOutcome {
    let job: IncomingJob = match serde_json::from_str(&entry.payload) {
        Ok(job) => job,
        Err(error) => {
            tracing::error!(job_id = entry.id, error = %error, "job payload unreadable, dropping");
            return JobOutcome::Completed;
        }
    };

    let envelope = match UpdateEnvelope::parse(&job.update) {
        Ok(envelope) => envelope,
        Err(error) => {
            tracing::warn!(
                job_id = entry.id,
                bot_id = %job.bot_id,
                error = %error,
                "update envelope unreadable, dropping"
            );
            return JobOutcome::Completed;
        }
    };
    let Some(chat_id) = envelope.chat_id() else {
        tracing::debug!(job_id = entry.id, bot_id = %job.bot_id, "update has no chat, nothing to send");
        return JobOutcome::Completed;
    };

    // Fresh row read; the bot may have been removed since admission. The
    // cache is not consulted here, it only serves the inbound secret check.
    let bot = match bots::get_bot(&ctx.db, &job.bot_id).await {
        Ok(Some(bot)) => bot,
        Ok(None) => {
            tracing::warn!(job_id = entry.id, bot_id = %job.bot_id, "bot gone, dropping job");
            return JobOutcome::Completed;
        }
        Err(error) => return JobOutcome::Retry(error),
    };

    let reply = compose_reply(envelope.text());
    match ctx.messenger.send_text(&bot.token, chat_id, &reply).await {
        Ok(()) => {
            tracing::info!(job_id = entry.id, bot_id = %job.bot_id, chat_id, "reply sent");
            JobOutcome::Completed
        }
        Err(error @ BotfleetError::UpstreamRejected { .. }) => {
            // The platform refused the message; retrying cannot help.
            tracing::warn!(
                job_id = entry.id,
                bot_id = %job.bot_id,
                chat_id,
                error = %error,
                "send rejected, not retrying"
            );
            JobOutcome::Completed
        }
        Err(error) => JobOutcome::Retry(error),
    }
}

/// Echo stub standing in for reply generation: a random acknowledgment,
/// plus a quote of the inbound text when there is one.
fn compose_reply(text: Option<&str>) -> String {
    let ack = ACK_REPLIES[rand::thread_rng().gen_range(0..ACK_REPLIES.len())];
    match text {
        Some(text) if !text.is_empty() => format!("{ack}\n\nYou wrote: \"{text}\""),
        _ => ack.to_string(),
    }
}

/// Spawn the maintenance sweep. The immediate first tick runs a sweep at
/// startup, reclaiming leases left over from a previous crash.
pub fn spawn_sweeper(
    db: Database,
    dedup: DedupService,
    config: SweepConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = interval.tick() => run_sweep_once(&db, &dedup, &config).await,
                _ = cancel.cancelled() => {
                    tracing::info!("maintenance sweep shutting down");
                    break;
                }
            }
        }
    })
}

async fn run_sweep_once(db: &Database, dedup: &DedupService, config: &SweepConfig) {
    match queue_ops::reclaim_expired(db).await {
        Ok((requeued, failed)) => {
            if requeued > 0 || failed > 0 {
                tracing::info!(requeued, failed, "reclaimed expired job leases");
            }
            metrics::record_jobs_retried(requeued);
            metrics::record_jobs_failed(failed);
        }
        Err(error) => tracing::warn!(error = %error, "lease reclaim failed"),
    }

    match queue_ops::purge_completed(db, config.completed_retention_secs).await {
        Ok(removed) if removed > 0 => tracing::debug!(removed, "purged completed jobs"),
        Ok(_) => {}
        Err(error) => tracing::warn!(error = %error, "completed-job purge failed"),
    }
    match queue_ops::purge_failed(db, config.failed_retention_secs).await {
        Ok(removed) if removed > 0 => tracing::debug!(removed, "purged failed jobs"),
        Ok(_) => {}
        Err(error) => tracing::warn!(error = %error, "failed-job purge failed"),
    }
    match dedup.purge_expired().await {
        Ok(removed) if removed > 0 => tracing::debug!(removed, "purged expired dedup markers"),
        Ok(_) => {}
        Err(error) => tracing::warn!(error = %error, "dedup purge failed"),
    }

    match queue_ops::count_pending(db, TELEGRAM_INCOMING_QUEUE).await {
        Ok(depth) => metrics::set_queue_pending(depth as f64),
        Err(error) => tracing::warn!(error = %error, "queue depth read failed"),
    }
}
