// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enqueue policy for admitted updates.

use botfleet_core::types::IncomingJob;
use botfleet_core::BotfleetError;
use botfleet_storage::queries::queue;
use botfleet_storage::Database;

/// Queue carrying admitted Telegram updates to the worker pool.
pub const TELEGRAM_INCOMING_QUEUE: &str = "telegram:incoming";

#[derive(Clone)]
pub struct JobQueue {
    db: Database,
    max_attempts: u32,
}

impl JobQueue {
    pub fn new(db: Database, max_attempts: u32) -> Self {
        Self { db, max_attempts }
    }

    /// Write an admitted update to the queue. The job key is derived from the
    /// update id, so an update that slipped past dedup still lands at most
    /// once while its earlier row is retained. Returns the new row id, or
    /// `None` when the key already exists.
    pub async fn enqueue_update(
        &self,
        job: &IncomingJob,
        update_id: i64,
    ) -> Result<Option<i64>, BotfleetError> {
        let payload = serde_json::to_string(job)
            .map_err(|e| BotfleetError::Internal(format!("failed to serialize job: {e}")))?;
        let job_key = format!("update:{update_id}");
        queue::enqueue(
            &self.db,
            TELEGRAM_INCOMING_QUEUE,
            &job.bot_id,
            &job_key,
            &payload,
            self.max_attempts,
        )
        .await
    }

    /// Number of jobs waiting in the incoming queue.
    pub async fn pending_depth(&self) -> Result<u64, BotfleetError> {
        queue::count_pending(&self.db, TELEGRAM_INCOMING_QUEUE).await
    }
}
