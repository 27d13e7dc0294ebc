// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update deduplication keyed on `(bot_id, update_id)`.
//!
//! Telegram redelivers updates whenever it does not see a timely 200, so the
//! same `update_id` can arrive more than once. Seen keys are remembered for a
//! TTL; an expired key admits the update again.

use botfleet_core::types::BotId;
use botfleet_core::BotfleetError;
use rusqlite::params;

use crate::database::{iso_from_now_ms, now_iso, Database};

/// Record `(bot_id, update_id)` as seen, unless a live record already exists.
///
/// Returns `true` when this is the first sighting (caller should process the
/// update) and `false` when a live duplicate exists. A record past its TTL is
/// replaced and counts as a first sighting.
pub async fn mark_if_absent(
    db: &Database,
    bot_id: &BotId,
    update_id: i64,
    ttl_secs: u64,
) -> Result<bool, BotfleetError> {
    let bot_id = bot_id.as_str().to_string();
    let now = now_iso();
    let expires_at = iso_from_now_ms(ttl_secs.saturating_mul(1000) as i64);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            // Drop a stale record for this key so the insert below can land.
            tx.execute(
                "DELETE FROM dedup_keys
                 WHERE bot_id = ?1 AND update_id = ?2 AND expires_at <= ?3",
                params![bot_id, update_id, now],
            )?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO dedup_keys (bot_id, update_id, expires_at)
                 VALUES (?1, ?2, ?3)",
                params![bot_id, update_id, expires_at],
            )?;

            tx.commit()?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete all expired dedup records. Returns the number removed.
pub async fn purge_expired(db: &Database) -> Result<u64, BotfleetError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM dedup_keys WHERE expires_at <= ?1",
                params![now],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
