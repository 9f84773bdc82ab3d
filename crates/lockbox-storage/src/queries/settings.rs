// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value settings table.

use lockbox_core::{LockboxError, Settings};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

const LOCK_TIMEOUT_KEY: &str = "lock_timeout_minutes";

/// Load persisted settings. `None` until something has been saved.
pub async fn load_settings(db: &Database) -> Result<Option<Settings>, LockboxError> {
    let value = db
        .connection()
        .call(|conn| -> Result<Option<String>, rusqlite::Error> {
            match conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![LOCK_TIMEOUT_KEY],
                |row| row.get(0),
            ) {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    value
        .map(|v| {
            v.parse::<u32>()
                .map(|lock_timeout_minutes| Settings {
                    lock_timeout_minutes,
                })
                .map_err(LockboxError::storage)
        })
        .transpose()
}

/// Persist settings, replacing previous values.
pub async fn save_settings(
    db: &Database,
    settings: &Settings,
    updated_at: i64,
) -> Result<(), LockboxError> {
    let value = settings.lock_timeout_minutes.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![LOCK_TIMEOUT_KEY, value, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
