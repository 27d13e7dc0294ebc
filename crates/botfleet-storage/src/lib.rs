// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Botfleet platform.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for bot
//! records, webhook dedup keys, and a crash-safe job queue.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{iso_from_now_ms, now_iso, Database};
pub use models::*;
