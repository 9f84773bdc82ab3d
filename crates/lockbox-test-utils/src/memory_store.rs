// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store for deterministic testing.
//!
//! `MemoryStore` implements both `PersistentStore` and `SettingsStore` over
//! plain maps. Writes can be made to fail on demand so tests can check that
//! store errors propagate without partial effects, and a vault rewrite can
//! be held open to test what runs alongside it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use lockbox_core::types::{CredentialRecord, FolderRecord, HealthStatus, Settings, VaultMetadata};
use lockbox_core::{LockboxError, PersistentStore, SettingsStore};

#[derive(Default)]
struct Tables {
    credentials: BTreeMap<String, CredentialRecord>,
    folders: BTreeMap<String, FolderRecord>,
    metadata: Option<VaultMetadata>,
    settings: Option<Settings>,
}

/// A store that lives and dies with the test.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_touch: AtomicBool,
    rewrite_gate: Mutex<Option<Arc<RewriteGate>>>,
}

/// Pauses one `rewrite_vault` call midway so a test can act while it is
/// in flight.
#[derive(Default)]
pub struct RewriteGate {
    entered: Notify,
    release: Notify,
}

impl RewriteGate {
    /// Resolves once the gated rewrite has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the gated rewrite proceed.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every mutating call returns a storage error and changes
    /// nothing.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Holds the next `rewrite_vault` until the returned gate is released.
    pub async fn gate_next_rewrite(&self) -> Arc<RewriteGate> {
        let gate = Arc::new(RewriteGate::default());
        *self.rewrite_gate.lock().await = Some(gate.clone());
        gate
    }

    /// While set, only `touch_metadata` fails.
    pub fn set_fail_touch(&self, fail: bool) {
        self.fail_touch.store(fail, Ordering::SeqCst);
    }

    /// Every credential row, deleted or not, in id order.
    pub async fn credential_rows(&self) -> Vec<CredentialRecord> {
        self.tables.lock().await.credentials.values().cloned().collect()
    }

    pub async fn folder_rows(&self) -> Vec<FolderRecord> {
        self.tables.lock().await.folders.values().cloned().collect()
    }

    pub async fn stored_settings(&self) -> Option<Settings> {
        self.tables.lock().await.settings
    }

    fn check_writable(&self) -> Result<(), LockboxError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LockboxError::storage(std::io::Error::other(
                "injected write failure",
            )));
        }
        Ok(())
    }
}

fn sort_credentials(rows: &mut [CredentialRecord]) {
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl PersistentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialize(&self) -> Result<(), LockboxError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, LockboxError> {
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), LockboxError> {
        Ok(())
    }

    async fn put_credential(&self, record: &CredentialRecord) -> Result<(), LockboxError> {
        self.check_writable()?;
        self.tables
            .lock()
            .await
            .credentials
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_credential(&self, id: &str) -> Result<Option<CredentialRecord>, LockboxError> {
        Ok(self.tables.lock().await.credentials.get(id).cloned())
    }

    async fn list_credentials(
        &self,
        folder_id: Option<&str>,
        include_deleted: bool,
    ) -> Result<Vec<CredentialRecord>, LockboxError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<CredentialRecord> = tables
            .credentials
            .values()
            .filter(|r| include_deleted || !r.deleted)
            .filter(|r| folder_id.is_none() || r.folder_id.as_deref() == folder_id)
            .cloned()
            .collect();
        sort_credentials(&mut rows);
        Ok(rows)
    }

    async fn list_deleted_credentials(&self) -> Result<Vec<CredentialRecord>, LockboxError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<CredentialRecord> = tables
            .credentials
            .values()
            .filter(|r| r.deleted)
            .cloned()
            .collect();
        sort_credentials(&mut rows);
        Ok(rows)
    }

    async fn delete_credential(&self, id: &str) -> Result<bool, LockboxError> {
        self.check_writable()?;
        Ok(self.tables.lock().await.credentials.remove(id).is_some())
    }

    async fn put_folder(&self, folder: &FolderRecord) -> Result<(), LockboxError> {
        self.check_writable()?;
        self.tables
            .lock()
            .await
            .folders
            .insert(folder.id.clone(), folder.clone());
        Ok(())
    }

    async fn get_folder(&self, id: &str) -> Result<Option<FolderRecord>, LockboxError> {
        Ok(self.tables.lock().await.folders.get(id).cloned())
    }

    async fn list_folders(
        &self,
        parent_id: Option<&str>,
        include_deleted: bool,
    ) -> Result<Vec<FolderRecord>, LockboxError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<FolderRecord> = tables
            .folders
            .values()
            .filter(|f| include_deleted || !f.deleted)
            .filter(|f| parent_id.is_none() || f.parent_id.as_deref() == parent_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn delete_folder_reparenting(
        &self,
        id: &str,
        new_parent: Option<&str>,
        updated_at: i64,
    ) -> Result<bool, LockboxError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        if tables.folders.remove(id).is_none() {
            return Ok(false);
        }
        for folder in tables.folders.values_mut() {
            if folder.parent_id.as_deref() == Some(id) {
                folder.parent_id = new_parent.map(str::to_string);
                folder.updated_at = updated_at;
            }
        }
        for record in tables.credentials.values_mut() {
            if record.folder_id.as_deref() == Some(id) {
                record.folder_id = new_parent.map(str::to_string);
                record.updated_at = updated_at;
            }
        }
        Ok(true)
    }

    async fn get_metadata(&self) -> Result<Option<VaultMetadata>, LockboxError> {
        Ok(self.tables.lock().await.metadata.clone())
    }

    async fn put_metadata(&self, metadata: &VaultMetadata) -> Result<(), LockboxError> {
        self.check_writable()?;
        self.tables.lock().await.metadata = Some(metadata.clone());
        Ok(())
    }

    async fn touch_metadata(&self, accessed_at: i64) -> Result<(), LockboxError> {
        self.check_writable()?;
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(LockboxError::storage(std::io::Error::other(
                "injected touch failure",
            )));
        }
        if let Some(meta) = self.tables.lock().await.metadata.as_mut() {
            meta.last_accessed_at = accessed_at;
        }
        Ok(())
    }

    async fn rewrite_vault(
        &self,
        metadata: &VaultMetadata,
        credentials: &[CredentialRecord],
    ) -> Result<(), LockboxError> {
        let gate = self.rewrite_gate.lock().await.take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        tables.metadata = Some(metadata.clone());
        for record in credentials {
            tables.credentials.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), LockboxError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        tables.credentials.clear();
        tables.folders.clear();
        tables.metadata = None;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_settings(&self) -> Result<Option<Settings>, LockboxError> {
        Ok(self.tables.lock().await.settings)
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), LockboxError> {
        self.check_writable()?;
        self.tables.lock().await.settings = Some(*settings);
        Ok(())
    }
}
