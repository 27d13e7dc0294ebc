// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::time::Duration;

use botfleet_core::BotfleetError;
use tokio_rusqlite::Connection;

/// Timestamp format stored in all TEXT time columns.
///
/// Matches SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` so Rust-computed
/// and schema-default timestamps compare lexicographically.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in the storage timestamp format.
pub fn now_iso() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// UTC time `offset_ms` milliseconds from now (negative for a past instant),
/// in the storage timestamp format.
///
/// All cutoff and scheduling arithmetic happens in Rust; SQL only compares
/// the resulting strings.
pub fn iso_from_now_ms(offset_ms: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::milliseconds(offset_ms))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Handle to the SQLite database.
///
/// Cheap to clone; all clones share the single background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, BotfleetError> {
        let conn = Connection::open(path).await.map_err(map_tr_err)?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                // With WAL, NORMAL is durable enough and much faster than FULL.
                conn.pragma_update(None, "synchronous", "NORMAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))?;

            crate::migrations::run_migrations(conn)
                .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        tracing::debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection, for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the background connection thread gracefully.
    ///
    /// Clones of this handle become unusable afterwards; their calls return
    /// a storage error.
    pub async fn close(self) -> Result<(), BotfleetError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the shared storage error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> BotfleetError {
    BotfleetError::Storage {
        source: Box::new(e),
    }
}
