// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Singleton vault metadata row.

use lockbox_core::{EncryptedBlob, KdfSettings, LockboxError, VAULT_METADATA_ID, VaultMetadata};
use rusqlite::{Connection, params};

use crate::database::{Database, map_tr_err};

pub(crate) struct MetadataRow {
    id: String,
    salt: String,
    created_at: i64,
    last_accessed_at: i64,
    schema_version: u32,
    initialized: bool,
    key_check: Option<String>,
    kdf: Option<String>,
}

impl MetadataRow {
    pub(crate) fn encode(meta: &VaultMetadata) -> Result<Self, LockboxError> {
        let kdf = meta
            .kdf
            .map(|kdf| serde_json::to_string(&kdf))
            .transpose()
            .map_err(LockboxError::storage)?;
        Ok(Self {
            id: meta.id.clone(),
            salt: meta.salt.clone(),
            created_at: meta.created_at,
            last_accessed_at: meta.last_accessed_at,
            schema_version: meta.schema_version,
            initialized: meta.initialized,
            key_check: meta.key_check.as_ref().map(EncryptedBlob::to_json).transpose()?,
            kdf,
        })
    }

    fn into_metadata(self) -> Result<VaultMetadata, LockboxError> {
        let kdf = self
            .kdf
            .as_deref()
            .map(serde_json::from_str::<KdfSettings>)
            .transpose()
            .map_err(LockboxError::storage)?;
        Ok(VaultMetadata {
            key_check: self.key_check.as_deref().map(EncryptedBlob::from_json).transpose()?,
            kdf,
            id: self.id,
            salt: self.salt,
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
            schema_version: self.schema_version,
            initialized: self.initialized,
        })
    }

    pub(crate) fn upsert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO vault_meta
                (id, salt, created_at, last_accessed_at, schema_version, initialized, key_check, kdf)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                salt = excluded.salt,
                created_at = excluded.created_at,
                last_accessed_at = excluded.last_accessed_at,
                schema_version = excluded.schema_version,
                initialized = excluded.initialized,
                key_check = excluded.key_check,
                kdf = excluded.kdf",
            params![
                self.id,
                self.salt,
                self.created_at,
                self.last_accessed_at,
                self.schema_version,
                self.initialized,
                self.key_check,
                self.kdf,
            ],
        )?;
        Ok(())
    }
}

/// Read the metadata row, if the vault has one.
pub async fn get_metadata(db: &Database) -> Result<Option<VaultMetadata>, LockboxError> {
    let row = db
        .connection()
        .call(|conn| -> Result<Option<MetadataRow>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT id, salt, created_at, last_accessed_at, schema_version,
                        initialized, key_check, kdf
                 FROM vault_meta WHERE id = ?1",
                params![VAULT_METADATA_ID],
                |row| {
                    Ok(MetadataRow {
                        id: row.get(0)?,
                        salt: row.get(1)?,
                        created_at: row.get(2)?,
                        last_accessed_at: row.get(3)?,
                        schema_version: row.get(4)?,
                        initialized: row.get(5)?,
                        key_check: row.get(6)?,
                        kdf: row.get(7)?,
                    })
                },
            );
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    row.map(MetadataRow::into_metadata).transpose()
}

/// Insert or replace the metadata row.
pub async fn put_metadata(db: &Database, metadata: &VaultMetadata) -> Result<(), LockboxError> {
    let row = MetadataRow::encode(metadata)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> { row.upsert(conn) })
        .await
        .map_err(map_tr_err)
}

/// Bump `last_accessed_at`. Does nothing when the row is absent.
pub async fn touch_metadata(db: &Database, accessed_at: i64) -> Result<(), LockboxError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE vault_meta SET last_accessed_at = ?1 WHERE id = ?2",
                params![accessed_at, VAULT_METADATA_ID],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> VaultMetadata {
        VaultMetadata {
            id: VAULT_METADATA_ID.to_string(),
            salt: "c2FsdHNhbHRzYWx0c2FsdA==".to_string(),
            created_at: 100,
            last_accessed_at: 100,
            schema_version: 1,
            initialized: true,
            key_check: Some(EncryptedBlob {
                ciphertext: vec![7; 36],
                nonce: vec![3; 24],
                created_at_ms: 100,
                version: 1,
            }),
            kdf: Some(KdfSettings {
                memory_cost: 65536,
                iterations: 3,
                parallelism: 1,
            }),
        }
    }

    #[tokio::test]
    async fn metadata_round_trips_through_columns() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_metadata(&db).await.unwrap().is_none());

        put_metadata(&db, &metadata()).await.unwrap();
        assert_eq!(get_metadata(&db).await.unwrap(), Some(metadata()));
    }

    #[tokio::test]
    async fn touch_updates_only_last_accessed() {
        let db = Database::open_in_memory().await.unwrap();
        touch_metadata(&db, 5).await.unwrap();
        assert!(get_metadata(&db).await.unwrap().is_none());

        put_metadata(&db, &metadata()).await.unwrap();
        touch_metadata(&db, 500).await.unwrap();
        let stored = get_metadata(&db).await.unwrap().unwrap();
        assert_eq!(stored.last_accessed_at, 500);
        assert_eq!(stored.created_at, 100);
    }

    #[tokio::test]
    async fn row_without_key_check_or_kdf_round_trips() {
        let db = Database::open_in_memory().await.unwrap();
        let mut bare = metadata();
        bare.key_check = None;
        bare.kdf = None;
        put_metadata(&db, &bare).await.unwrap();
        assert_eq!(get_metadata(&db).await.unwrap(), Some(bare));
    }
}
