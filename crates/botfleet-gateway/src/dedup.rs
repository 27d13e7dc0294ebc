// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duplicate-update suppression with a fail-open posture.
//!
//! Telegram redelivers updates until it sees a 2xx, so the same
//! `(bot, update_id)` can arrive more than once. First sight within the TTL
//! wins; later sightings are acknowledged without re-enqueueing. If the
//! store is unreachable the check reports "not a duplicate": an occasional
//! double delivery is acceptable, a dropped update is not.

use botfleet_core::types::BotId;
use botfleet_core::BotfleetError;
use botfleet_storage::queries::dedup;
use botfleet_storage::Database;

#[derive(Clone)]
pub struct DedupService {
    db: Database,
    ttl_secs: u64,
}

impl DedupService {
    pub fn new(db: Database, ttl_secs: u64) -> Self {
        Self { db, ttl_secs }
    }

    /// Record the update and report whether it was already seen within the
    /// TTL. Storage errors fail open.
    pub async fn is_duplicate(&self, bot_id: &BotId, update_id: i64) -> bool {
        match dedup::mark_if_absent(&self.db, bot_id, update_id, self.ttl_secs).await {
            Ok(first_sight) => !first_sight,
            Err(error) => {
                tracing::warn!(
                    bot_id = %bot_id,
                    update_id,
                    error = %error,
                    "dedup check failed, treating update as new"
                );
                false
            }
        }
    }

    /// Drop expired markers. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64, BotfleetError> {
        dedup::purge_expired(&self.db).await
    }
}
