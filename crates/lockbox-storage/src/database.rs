// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: PRAGMA setup, migrations, lifecycle.
//!
//! Every statement runs on tokio-rusqlite's single background thread, which
//! makes [`Database`] the only writer. Do not open a second connection for
//! writes.

use std::path::Path;

use lockbox_core::LockboxError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Milliseconds SQLite waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// A migrated SQLite database behind a tokio-rusqlite connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database file at `path`, applies the
    /// connection PRAGMAs and runs pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, LockboxError> {
        match Path::new(path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(LockboxError::storage)?;
            }
            _ => {}
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(LockboxError::storage)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, LockboxError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(LockboxError::storage)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), LockboxError> {
        self.conn
            .call(move |conn| -> Result<(), LockboxError> {
                let journal = if wal_mode { "WAL" } else { "DELETE" };
                conn.execute_batch(&format!(
                    "PRAGMA journal_mode = {journal};
                     PRAGMA synchronous = NORMAL;
                     PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
                ))
                .map_err(LockboxError::storage)?;
                run_migrations(conn)
            })
            .await
            .map_err(unwrap_call_err)
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Folds the WAL back into the main file. Safe to call in any journal mode.
    pub async fn checkpoint(&self) -> Result<(), LockboxError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Converts a tokio-rusqlite error into [`LockboxError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LockboxError {
    LockboxError::storage(e)
}

/// Unwraps a closure that already produced a [`LockboxError`].
pub(crate) fn unwrap_call_err(e: tokio_rusqlite::Error<LockboxError>) -> LockboxError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => LockboxError::Internal(format!("database connection error: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn table_names(db: &Database) -> Vec<String> {
        db.connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_runs_migrations() {
        let db = Database::open_in_memory().await.unwrap();
        let tables = table_names(&db).await;
        for expected in ["credentials", "folders", "settings", "vault_meta"] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn open_creates_parent_directories_and_enables_wal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("vault.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        assert!(path.exists());

        let mode = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.checkpoint().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.db");
        let path = path.to_str().unwrap();
        drop(Database::open(path, true).await.unwrap());
        let db = Database::open(path, true).await.unwrap();
        assert!(table_names(&db).await.iter().any(|t| t == "credentials"));
    }
}
