// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the vault store traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use lockbox_config::model::StorageConfig;
use lockbox_core::{
    Clock, CredentialRecord, FolderRecord, HealthStatus, LockboxError, PersistentStore, Settings,
    SettingsStore, SystemClock, VaultMetadata,
};

use crate::database::{Database, map_tr_err, unwrap_call_err};
use crate::queries;
use crate::queries::credentials::CredentialRow;
use crate::queries::metadata::MetadataRow;

/// SQLite-backed persistent and settings store.
///
/// The database is opened lazily by [`PersistentStore::initialize`]; every
/// other method fails with a storage error until then.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the configured path. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already-open database. Mostly useful with
    /// [`Database::open_in_memory`].
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &str {
        &self.config.database_path
    }

    fn db(&self) -> Result<&Database, LockboxError> {
        self.db
            .get()
            .ok_or_else(|| LockboxError::storage(NotInitialized))
    }
}

#[derive(Debug)]
struct NotInitialized;

impl std::fmt::Display for NotInitialized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("storage not initialized -- call initialize() first")
    }
}

impl std::error::Error for NotInitialized {}

#[async_trait]
impl PersistentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<(), LockboxError> {
        let path = self.config.database_path.clone();
        let wal_mode = self.config.wal_mode;
        self.db
            .get_or_try_init(|| async move { Database::open(&path, wal_mode).await })
            .await?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, LockboxError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn close(&self) -> Result<(), LockboxError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }

    // --- Credentials ---

    async fn put_credential(&self, record: &CredentialRecord) -> Result<(), LockboxError> {
        queries::credentials::put_credential(self.db()?, record).await
    }

    async fn get_credential(&self, id: &str) -> Result<Option<CredentialRecord>, LockboxError> {
        queries::credentials::get_credential(self.db()?, id).await
    }

    async fn list_credentials(
        &self,
        folder_id: Option<&str>,
        include_deleted: bool,
    ) -> Result<Vec<CredentialRecord>, LockboxError> {
        queries::credentials::list_credentials(self.db()?, folder_id, include_deleted).await
    }

    async fn list_deleted_credentials(&self) -> Result<Vec<CredentialRecord>, LockboxError> {
        queries::credentials::list_deleted_credentials(self.db()?).await
    }

    async fn delete_credential(&self, id: &str) -> Result<bool, LockboxError> {
        queries::credentials::delete_credential(self.db()?, id).await
    }

    // --- Folders ---

    async fn put_folder(&self, folder: &FolderRecord) -> Result<(), LockboxError> {
        queries::folders::put_folder(self.db()?, folder).await
    }

    async fn get_folder(&self, id: &str) -> Result<Option<FolderRecord>, LockboxError> {
        queries::folders::get_folder(self.db()?, id).await
    }

    async fn list_folders(
        &self,
        parent_id: Option<&str>,
        include_deleted: bool,
    ) -> Result<Vec<FolderRecord>, LockboxError> {
        queries::folders::list_folders(self.db()?, parent_id, include_deleted).await
    }

    async fn delete_folder_reparenting(
        &self,
        id: &str,
        new_parent: Option<&str>,
        updated_at: i64,
    ) -> Result<bool, LockboxError> {
        queries::folders::delete_folder_reparenting(self.db()?, id, new_parent, updated_at).await
    }

    // --- Metadata ---

    async fn get_metadata(&self) -> Result<Option<VaultMetadata>, LockboxError> {
        queries::metadata::get_metadata(self.db()?).await
    }

    async fn put_metadata(&self, metadata: &VaultMetadata) -> Result<(), LockboxError> {
        queries::metadata::put_metadata(self.db()?, metadata).await
    }

    async fn touch_metadata(&self, accessed_at: i64) -> Result<(), LockboxError> {
        queries::metadata::touch_metadata(self.db()?, accessed_at).await
    }

    // --- Whole vault ---

    async fn rewrite_vault(
        &self,
        metadata: &VaultMetadata,
        credentials: &[CredentialRecord],
    ) -> Result<(), LockboxError> {
        let meta_row = MetadataRow::encode(metadata)?;
        let rows = credentials
            .iter()
            .map(CredentialRow::encode)
            .collect::<Result<Vec<_>, _>>()?;
        let count = rows.len();

        self.db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    row.upsert(&tx)?;
                }
                meta_row.upsert(&tx)?;
                tx.commit()
            })
            .await
            .map_err(map_tr_err)?;
        debug!(count, "vault rewritten");
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), LockboxError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), LockboxError> {
                let tx = conn.transaction().map_err(LockboxError::storage)?;
                tx.execute_batch(
                    "DELETE FROM credentials;
                     DELETE FROM folders;
                     DELETE FROM vault_meta;",
                )
                .map_err(LockboxError::storage)?;
                tx.commit().map_err(LockboxError::storage)
            })
            .await
            .map_err(unwrap_call_err)?;
        debug!("all vault rows removed");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn load_settings(&self) -> Result<Option<Settings>, LockboxError> {
        queries::settings::load_settings(self.db()?).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), LockboxError> {
        queries::settings::save_settings(self.db()?, settings, SystemClock.now_millis()).await
    }
}
