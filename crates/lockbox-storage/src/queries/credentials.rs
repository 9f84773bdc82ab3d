// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential row operations. Payloads are stored as the serialized
//! `EncryptedBlob` and never decoded beyond that here.

use lockbox_core::{CredentialRecord, EncryptedBlob, LockboxError};
use rusqlite::{Connection, Row, params};

use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, folder_id, payload, created_at, updated_at, deleted";

/// A credential row as read from SQLite, payload still in JSON form.
pub(crate) struct CredentialRow {
    id: String,
    folder_id: Option<String>,
    payload: String,
    created_at: i64,
    updated_at: i64,
    deleted: bool,
}

impl CredentialRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            folder_id: row.get(1)?,
            payload: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            deleted: row.get(5)?,
        })
    }

    pub(crate) fn encode(record: &CredentialRecord) -> Result<Self, LockboxError> {
        Ok(Self {
            id: record.id.clone(),
            folder_id: record.folder_id.clone(),
            payload: record.encrypted_payload.to_json()?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted: record.deleted,
        })
    }

    fn into_record(self) -> Result<CredentialRecord, LockboxError> {
        Ok(CredentialRecord {
            encrypted_payload: EncryptedBlob::from_json(&self.payload)?,
            id: self.id,
            folder_id: self.folder_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted: self.deleted,
        })
    }

    /// Insert-or-replace on an open connection or transaction.
    pub(crate) fn upsert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO credentials (id, folder_id, payload, created_at, updated_at, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                folder_id = excluded.folder_id,
                payload = excluded.payload,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                deleted = excluded.deleted",
            params![
                self.id,
                self.folder_id,
                self.payload,
                self.created_at,
                self.updated_at,
                self.deleted,
            ],
        )?;
        Ok(())
    }
}

fn into_records(rows: Vec<CredentialRow>) -> Result<Vec<CredentialRecord>, LockboxError> {
    rows.into_iter().map(CredentialRow::into_record).collect()
}

/// Insert or replace a credential row.
pub async fn put_credential(db: &Database, record: &CredentialRecord) -> Result<(), LockboxError> {
    let row = CredentialRow::encode(record)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> { row.upsert(conn) })
        .await
        .map_err(map_tr_err)
}

/// Get a credential row by id, soft-deleted or not.
pub async fn get_credential(
    db: &Database,
    id: &str,
) -> Result<Option<CredentialRecord>, LockboxError> {
    let id = id.to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<CredentialRow>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM credentials WHERE id = ?1"))?;
            match stmt.query_row(params![id], CredentialRow::from_row) {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    row.map(CredentialRow::into_record).transpose()
}

/// List credential rows, optionally restricted to one folder.
///
/// Ordered by creation time, then id.
pub async fn list_credentials(
    db: &Database,
    folder_id: Option<&str>,
    include_deleted: bool,
) -> Result<Vec<CredentialRecord>, LockboxError> {
    let folder_id = folder_id.map(str::to_string);
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<CredentialRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM credentials
                 WHERE (?1 IS NULL OR folder_id = ?1) AND (?2 OR deleted = 0)
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![folder_id, include_deleted], CredentialRow::from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    into_records(rows)
}

/// List only soft-deleted credential rows.
pub async fn list_deleted_credentials(
    db: &Database,
) -> Result<Vec<CredentialRecord>, LockboxError> {
    let rows = db
        .connection()
        .call(|conn| -> Result<Vec<CredentialRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM credentials WHERE deleted = 1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], CredentialRow::from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    into_records(rows)
}

/// Physically remove a credential row. Returns whether it existed.
pub async fn delete_credential(db: &Database, id: &str) -> Result<bool, LockboxError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute("DELETE FROM credentials WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}
