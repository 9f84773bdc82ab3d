// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRUD over credentials and folders with encryption at the boundary.
//!
//! Every operation first requires a live key from the [`SessionManager`]
//! and fails with `VaultLocked` otherwise. Credential payloads go through
//! the [`AuthenticatedCipher`] with the row id as associated data
//! (`lockbox:credential:<id>`), so a ciphertext copied onto another row
//! does not decrypt. The underlying [`PersistentStore`] never sees
//! plaintext; filtering and search run in memory after decryption.
//!
//! Successful operations refresh `VaultMetadata::last_accessed_at` and count
//! as session activity. The refresh is best effort: a failure there is
//! logged and never turns a committed write into an error.
//!
//! Record operations share a re-key lock that a master password change
//! takes exclusively, so no row is sealed under a key that is being
//! retired.

use std::collections::HashSet;
use std::sync::Arc;

use lockbox_core::types::{
    CredentialData, CredentialRecord, DecryptedCredential, EncryptedBlob, FolderRecord,
};
use lockbox_core::{Clock, LockboxError, PersistentStore};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::crypto::AuthenticatedCipher;
use crate::session::SessionManager;

/// Associated data binding a credential ciphertext to its row id.
pub fn credential_aad(id: &str) -> Vec<u8> {
    format!("lockbox:credential:{id}").into_bytes()
}

/// The encrypted record store.
#[derive(Clone)]
pub struct EncryptedRecordStore {
    store: Arc<dyn PersistentStore>,
    session: Arc<SessionManager>,
    cipher: AuthenticatedCipher,
    clock: Arc<dyn Clock>,
    rekey: Arc<RwLock<()>>,
}

impl EncryptedRecordStore {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        session: Arc<SessionManager>,
        cipher: AuthenticatedCipher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            session,
            cipher,
            clock,
            rekey: Arc::new(RwLock::new(())),
        }
    }

    // --- Credentials ---

    /// Encrypts `data` and stores it as a new credential.
    pub async fn create(
        &self,
        data: &CredentialData,
        folder_id: Option<&str>,
    ) -> Result<CredentialRecord, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        if let Some(folder_id) = folder_id {
            self.live_folder(folder_id).await?;
        }

        let id = uuid::Uuid::new_v4().to_string();
        let encrypted_payload = self.seal(&id, data)?;
        let now = self.clock.now_millis();
        let record = CredentialRecord {
            id,
            folder_id: folder_id.map(str::to_string),
            encrypted_payload,
            created_at: now,
            updated_at: now,
            deleted: false,
        };
        self.store.put_credential(&record).await?;
        self.finish().await;
        debug!(id = %record.id, "credential created");
        Ok(record)
    }

    /// The raw encrypted row, soft-deleted or not.
    pub async fn read(&self, id: &str) -> Result<Option<CredentialRecord>, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let record = self.store.get_credential(id).await?;
        self.finish().await;
        Ok(record)
    }

    /// Decrypts one live credential. Absent and soft-deleted ids both fail
    /// with `RecordNotFound`.
    pub async fn read_decrypted(&self, id: &str) -> Result<DecryptedCredential, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let record = self.live_credential(id).await?;
        let decrypted = self.open(&record)?;
        self.finish().await;
        Ok(decrypted)
    }

    /// Live credentials, optionally in exactly one folder (not recursive).
    pub async fn list(&self, folder_id: Option<&str>) -> Result<Vec<CredentialRecord>, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let records = self.store.list_credentials(folder_id, false).await?;
        self.finish().await;
        Ok(records)
    }

    /// [`EncryptedRecordStore::list`], decrypted.
    pub async fn list_decrypted(
        &self,
        folder_id: Option<&str>,
    ) -> Result<Vec<DecryptedCredential>, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let decrypted = self.open_live(folder_id).await?;
        self.finish().await;
        Ok(decrypted)
    }

    /// Live credentials whose title, username, url or notes contain `query`
    /// (case-insensitive). An empty query matches everything.
    pub async fn search(&self, query: &str) -> Result<Vec<DecryptedCredential>, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let mut all = self.open_live(None).await?;
        all.retain(|c| c.data.matches(query));
        self.finish().await;
        debug!(hits = all.len(), "credential search");
        Ok(all)
    }

    /// Re-encrypts `data` under a fresh nonce and bumps `updated_at`.
    pub async fn update(
        &self,
        id: &str,
        data: &CredentialData,
    ) -> Result<CredentialRecord, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let mut record = self.live_credential(id).await?;
        record.encrypted_payload = self.seal(id, data)?;
        record.updated_at = self.clock.now_millis();
        self.store.put_credential(&record).await?;
        self.finish().await;
        debug!(id = %id, "credential updated");
        Ok(record)
    }

    /// Moves a live credential to another folder (or to the root). The
    /// ciphertext is untouched.
    pub async fn move_credential(
        &self,
        id: &str,
        folder_id: Option<&str>,
    ) -> Result<CredentialRecord, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let mut record = self.live_credential(id).await?;
        if let Some(folder_id) = folder_id {
            self.live_folder(folder_id).await?;
        }
        record.folder_id = folder_id.map(str::to_string);
        record.updated_at = self.clock.now_millis();
        self.store.put_credential(&record).await?;
        self.finish().await;
        debug!(id = %id, folder_id = ?folder_id, "credential moved");
        Ok(record)
    }

    /// Marks a live credential deleted. The ciphertext is kept.
    pub async fn soft_delete(&self, id: &str) -> Result<(), LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let mut record = self.live_credential(id).await?;
        record.deleted = true;
        record.updated_at = self.clock.now_millis();
        self.store.put_credential(&record).await?;
        self.finish().await;
        debug!(id = %id, "credential moved to trash");
        Ok(())
    }

    /// Undoes a soft delete. Restoring a live credential is a no-op.
    pub async fn restore(&self, id: &str) -> Result<CredentialRecord, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let mut record = self
            .store
            .get_credential(id)
            .await?
            .ok_or_else(|| LockboxError::RecordNotFound { id: id.to_string() })?;
        if record.deleted {
            record.deleted = false;
            record.updated_at = self.clock.now_millis();
            self.store.put_credential(&record).await?;
            debug!(id = %id, "credential restored");
        }
        self.finish().await;
        Ok(record)
    }

    /// Removes the row for good.
    pub async fn permanently_delete(&self, id: &str) -> Result<(), LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        if !self.store.delete_credential(id).await? {
            return Err(LockboxError::RecordNotFound { id: id.to_string() });
        }
        self.finish().await;
        debug!(id = %id, "credential permanently deleted");
        Ok(())
    }

    /// Soft-deleted credentials, still encrypted.
    pub async fn list_trash(&self) -> Result<Vec<CredentialRecord>, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let records = self.store.list_deleted_credentials().await?;
        self.finish().await;
        Ok(records)
    }

    /// Wipes every credential, folder and the vault metadata in one
    /// all-or-nothing store call.
    pub async fn clear_all(&self) -> Result<(), LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        self.store.clear_all().await?;
        self.session.activity();
        info!("vault contents cleared");
        Ok(())
    }

    // --- Folders ---

    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<FolderRecord, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let name = folder_name(name)?;
        if let Some(parent_id) = parent_id {
            self.live_folder(parent_id).await?;
        }
        let now = self.clock.now_millis();
        let folder = FolderRecord {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id: parent_id.map(str::to_string),
            name,
            created_at: now,
            updated_at: now,
            deleted: false,
        };
        self.store.put_folder(&folder).await?;
        self.finish().await;
        debug!(id = %folder.id, "folder created");
        Ok(folder)
    }

    /// The raw folder row, soft-deleted or not.
    pub async fn get_folder(&self, id: &str) -> Result<Option<FolderRecord>, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let folder = self.store.get_folder(id).await?;
        self.finish().await;
        Ok(folder)
    }

    /// Live folders with exactly this parent, or every live folder for `None`.
    pub async fn list_folders(
        &self,
        parent_id: Option<&str>,
    ) -> Result<Vec<FolderRecord>, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let folders = self.store.list_folders(parent_id, false).await?;
        self.finish().await;
        Ok(folders)
    }

    pub async fn rename_folder(&self, id: &str, name: &str) -> Result<FolderRecord, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let name = folder_name(name)?;
        let mut folder = self.live_folder(id).await?;
        folder.name = name;
        folder.updated_at = self.clock.now_millis();
        self.store.put_folder(&folder).await?;
        self.finish().await;
        Ok(folder)
    }

    /// Re-parents a folder. Fails with `FolderCycle`, changing nothing, if
    /// the new parent is the folder itself or one of its descendants.
    pub async fn move_folder(
        &self,
        id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<FolderRecord, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let mut folder = self.live_folder(id).await?;
        if let Some(parent_id) = new_parent_id {
            self.live_folder(parent_id).await?;
            self.ensure_not_ancestor(id, parent_id).await?;
        }
        folder.parent_id = new_parent_id.map(str::to_string);
        folder.updated_at = self.clock.now_millis();
        self.store.put_folder(&folder).await?;
        self.finish().await;
        debug!(id = %id, parent_id = ?new_parent_id, "folder moved");
        Ok(folder)
    }

    /// Marks a folder deleted. Its contents are left where they are.
    pub async fn soft_delete_folder(&self, id: &str) -> Result<(), LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let mut folder = self.live_folder(id).await?;
        folder.deleted = true;
        folder.updated_at = self.clock.now_millis();
        self.store.put_folder(&folder).await?;
        self.finish().await;
        Ok(())
    }

    pub async fn restore_folder(&self, id: &str) -> Result<FolderRecord, LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let mut folder = self
            .store
            .get_folder(id)
            .await?
            .ok_or_else(|| LockboxError::FolderNotFound { id: id.to_string() })?;
        if folder.deleted {
            folder.deleted = false;
            folder.updated_at = self.clock.now_millis();
            self.store.put_folder(&folder).await?;
        }
        self.finish().await;
        Ok(folder)
    }

    /// Removes a folder row. Its direct children, folders and credentials
    /// alike (deleted ones included), move up to the removed folder's parent.
    pub async fn permanently_delete_folder(&self, id: &str) -> Result<(), LockboxError> {
        let _rekey = self.shared().await;
        self.require_unlocked()?;
        let folder = self
            .store
            .get_folder(id)
            .await?
            .ok_or_else(|| LockboxError::FolderNotFound { id: id.to_string() })?;
        let removed = self
            .store
            .delete_folder_reparenting(id, folder.parent_id.as_deref(), self.clock.now_millis())
            .await?;
        if !removed {
            return Err(LockboxError::FolderNotFound { id: id.to_string() });
        }
        self.finish().await;
        debug!(id = %id, "folder permanently deleted");
        Ok(())
    }

    // --- Internals ---

    /// Shared side of the re-key lock. Every record operation holds it for
    /// its whole run so none can straddle a master password change.
    async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.rekey.read().await
    }

    /// Exclusive side of the re-key lock, held while every row is
    /// re-encrypted under a new key.
    pub(crate) async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.rekey.write().await
    }

    async fn open_live(
        &self,
        folder_id: Option<&str>,
    ) -> Result<Vec<DecryptedCredential>, LockboxError> {
        let records = self.store.list_credentials(folder_id, false).await?;
        records.iter().map(|r| self.open(r)).collect()
    }

    fn require_unlocked(&self) -> Result<(), LockboxError> {
        self.session.with_key(|_| ())
    }

    fn seal(&self, id: &str, data: &CredentialData) -> Result<EncryptedBlob, LockboxError> {
        let aad = credential_aad(id);
        self.session
            .with_key(|key| self.cipher.encrypt_record(data, key, Some(&aad)))?
    }

    fn open(&self, record: &CredentialRecord) -> Result<DecryptedCredential, LockboxError> {
        let aad = credential_aad(&record.id);
        let data: CredentialData = self
            .session
            .with_key(|key| {
                self.cipher
                    .decrypt_record(&record.encrypted_payload, key, Some(&aad))
            })?
            .inspect_err(|e| debug!(id = %record.id, error = %e, "credential did not decrypt"))?;
        Ok(DecryptedCredential {
            id: record.id.clone(),
            folder_id: record.folder_id.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            data,
        })
    }

    async fn live_credential(&self, id: &str) -> Result<CredentialRecord, LockboxError> {
        match self.store.get_credential(id).await? {
            Some(record) if !record.deleted => Ok(record),
            _ => Err(LockboxError::RecordNotFound { id: id.to_string() }),
        }
    }

    async fn live_folder(&self, id: &str) -> Result<FolderRecord, LockboxError> {
        match self.store.get_folder(id).await? {
            Some(folder) if !folder.deleted => Ok(folder),
            _ => Err(LockboxError::FolderNotFound { id: id.to_string() }),
        }
    }

    /// Walks up from `start` and fails if `id` is on the chain. Stops on a
    /// chain that already loops instead of spinning.
    async fn ensure_not_ancestor(&self, id: &str, start: &str) -> Result<(), LockboxError> {
        let mut seen = HashSet::new();
        let mut cursor = Some(start.to_string());
        while let Some(current) = cursor {
            if current == id {
                return Err(LockboxError::FolderCycle { id: id.to_string() });
            }
            if !seen.insert(current.clone()) {
                break;
            }
            cursor = self
                .store
                .get_folder(&current)
                .await?
                .and_then(|f| f.parent_id);
        }
        Ok(())
    }

    /// Bookkeeping after a successful operation. The operation has already
    /// committed, so a failed timestamp refresh is only logged.
    async fn finish(&self) {
        if let Err(e) = self.store.touch_metadata(self.clock.now_millis()).await {
            warn!(error = %e, "could not refresh last access time");
        }
        self.session.activity();
    }
}

impl std::fmt::Debug for EncryptedRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedRecordStore")
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

fn folder_name(name: &str) -> Result<String, LockboxError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LockboxError::InvalidFolderName);
    }
    Ok(trimmed.to_string())
}
