// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook gateway for the Botfleet platform.
//!
//! The hot path: Telegram posts an update to
//! `/gateway/telegram/webhook/{bot_id}`, the admission pipeline
//! authenticates it against the bot's secret, suppresses duplicates and
//! writes it to the durable queue. A worker pool drains the queue and calls
//! the Telegram API, keeping webhook acknowledgment independent of upstream
//! latency. A periodic sweep reclaims stalled jobs and purges aged state.

pub mod dedup;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod queue;
pub mod server;
pub mod shutdown;
pub mod worker;

pub use dedup::DedupService;
pub use error::AdmissionError;
pub use queue::{JobQueue, TELEGRAM_INCOMING_QUEUE};
pub use server::{build_router, serve, AppState, ServerConfig};
pub use shutdown::install_signal_handler;
pub use worker::{spawn_sweeper, spawn_workers, SweepConfig, WorkerConfig, WorkerContext};
