// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job queue operations with retry backoff and crash recovery.
//!
//! Jobs are unique per `(queue_name, bot_id, job_key)`; re-enqueueing an
//! existing key is a no-op. Workers take a processing lease on dequeue, and
//! the maintenance sweep requeues jobs whose lease expired.

use botfleet_core::types::BotId;
use botfleet_core::BotfleetError;
use rusqlite::params;

use crate::database::{iso_from_now_ms, now_iso, Database};
use crate::models::QueueEntry;

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        bot_id: row.get(2)?,
        job_key: row.get(3)?,
        payload: row.get(4)?,
        status: row.get(5)?,
        attempts: row.get(6)?,
        max_attempts: row.get(7)?,
        next_attempt_at: row.get(8)?,
        locked_until: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        finished_at: row.get(12)?,
    })
}

/// Enqueue a job. Returns the new entry's ID, or `None` if a job with the
/// same `(queue_name, bot_id, job_key)` already exists.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    bot_id: &BotId,
    job_key: &str,
    payload: &str,
    max_attempts: u32,
) -> Result<Option<i64>, BotfleetError> {
    let queue_name = queue_name.to_string();
    let bot_id = bot_id.as_str().to_string();
    let job_key = job_key.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO jobs (queue_name, bot_id, job_key, payload, max_attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![queue_name, bot_id, job_key, payload, max_attempts],
            )?;
            if inserted > 0 {
                Ok(Some(conn.last_insert_rowid()))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Dequeue the next due pending entry from the named queue.
///
/// Atomically selects the oldest due entry and marks it "processing" with a
/// lease of `lease_secs`. Returns `None` if nothing is due.
pub async fn dequeue(
    db: &Database,
    queue_name: &str,
    lease_secs: u64,
) -> Result<Option<QueueEntry>, BotfleetError> {
    let queue_name = queue_name.to_string();
    let now = now_iso();
    let lease_until = iso_from_now_ms(lease_secs.saturating_mul(1000) as i64);
    db.connection()
        .call(move |conn| {
            use rusqlite::OptionalExtension;

            // Use a transaction to atomically find + update the next due entry.
            let tx = conn.transaction()?;

            let entry = {
                let mut stmt = tx.prepare(
                    "SELECT id, queue_name, bot_id, job_key, payload, status, attempts,
                            max_attempts, next_attempt_at, locked_until, created_at,
                            updated_at, finished_at
                     FROM jobs
                     WHERE queue_name = ?1 AND status = 'pending' AND next_attempt_at <= ?2
                     ORDER BY next_attempt_at ASC, id ASC
                     LIMIT 1",
                )?;
                stmt.query_row(params![queue_name, now], entry_from_row)
                    .optional()?
            };

            match entry {
                Some(entry) => {
                    tx.execute(
                        "UPDATE jobs SET status = 'processing', locked_until = ?1,
                         updated_at = ?2
                         WHERE id = ?3",
                        params![lease_until, now, entry.id],
                    )?;
                    tx.commit()?;

                    // Return the entry with updated status.
                    Ok(Some(QueueEntry {
                        status: "processing".to_string(),
                        locked_until: Some(lease_until),
                        ..entry
                    }))
                }
                None => {
                    tx.commit()?;
                    Ok(None)
                }
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge successful processing: marks the entry "completed" and stamps
/// `finished_at` for retention purging.
pub async fn ack(db: &Database, id: i64) -> Result<(), BotfleetError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'completed', locked_until = NULL,
                 finished_at = ?1, updated_at = ?1
                 WHERE id = ?2",
                params![now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed attempt.
///
/// Increments attempts. If attempts has reached max_attempts the entry is
/// marked "failed" and `true` is returned; otherwise it returns to "pending"
/// with the next attempt scheduled at `backoff_base_ms * 2^(attempts-1)` from
/// now and `false` is returned.
pub async fn fail(db: &Database, id: i64, backoff_base_ms: u64) -> Result<bool, BotfleetError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i64, i64) = conn.query_row(
                "SELECT attempts, max_attempts FROM jobs WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            if new_attempts >= max_attempts {
                conn.execute(
                    "UPDATE jobs SET status = 'failed', attempts = ?1,
                     locked_until = NULL, finished_at = ?2, updated_at = ?2
                     WHERE id = ?3",
                    params![new_attempts, now, id],
                )?;
                Ok(true)
            } else {
                let exponent = new_attempts.saturating_sub(1).clamp(0, 62) as u32;
                let delay_ms = backoff_base_ms
                    .saturating_mul(2u64.saturating_pow(exponent))
                    .min(i64::MAX as u64) as i64;
                let next_attempt_at = iso_from_now_ms(delay_ms);
                conn.execute(
                    "UPDATE jobs SET status = 'pending', attempts = ?1,
                     locked_until = NULL, next_attempt_at = ?2, updated_at = ?3
                     WHERE id = ?4",
                    params![new_attempts, next_attempt_at, now, id],
                )?;
                Ok(false)
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Requeue processing entries whose lease expired (worker crash or stall).
///
/// A reclaimed delivery counts as an attempt: entries already at their
/// attempt budget go straight to "failed". Returns `(requeued, failed)`.
pub async fn reclaim_expired(db: &Database) -> Result<(u64, u64), BotfleetError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let failed = tx.execute(
                "UPDATE jobs SET status = 'failed', attempts = attempts + 1,
                 locked_until = NULL, finished_at = ?1, updated_at = ?1
                 WHERE status = 'processing' AND locked_until <= ?1
                   AND attempts + 1 >= max_attempts",
                params![now],
            )?;

            let requeued = tx.execute(
                "UPDATE jobs SET status = 'pending', attempts = attempts + 1,
                 locked_until = NULL, updated_at = ?1
                 WHERE status = 'processing' AND locked_until <= ?1
                   AND attempts + 1 < max_attempts",
                params![now],
            )?;

            tx.commit()?;
            Ok((requeued as u64, failed as u64))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete completed entries older than the retention window. Returns the
/// number removed.
pub async fn purge_completed(db: &Database, retention_secs: u64) -> Result<u64, BotfleetError> {
    purge_finished(db, "completed", retention_secs).await
}

/// Delete failed entries older than the retention window. Returns the number
/// removed.
pub async fn purge_failed(db: &Database, retention_secs: u64) -> Result<u64, BotfleetError> {
    purge_finished(db, "failed", retention_secs).await
}

async fn purge_finished(
    db: &Database,
    status: &'static str,
    retention_secs: u64,
) -> Result<u64, BotfleetError> {
    let cutoff = iso_from_now_ms(-(retention_secs.saturating_mul(1000).min(i64::MAX as u64) as i64));
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM jobs
                 WHERE status = ?1 AND finished_at IS NOT NULL AND finished_at <= ?2",
                params![status, cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count pending entries in the named queue. Exposed as a gauge.
pub async fn count_pending(db: &Database, queue_name: &str) -> Result<u64, BotfleetError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM jobs WHERE queue_name = ?1 AND status = 'pending'",
                params![queue_name],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
