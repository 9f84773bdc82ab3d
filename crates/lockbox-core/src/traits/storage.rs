// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent store trait for the three vault collections.

use async_trait::async_trait;

use crate::error::LockboxError;
use crate::types::{CredentialRecord, FolderRecord, HealthStatus, VaultMetadata};

/// Document storage for credentials, folders and vault metadata.
///
/// Implementations only ever see ciphertext for credential payloads. Every
/// method is keyed by opaque string ids; list methods filter on the
/// `folder_id`/`parent_id` and `deleted` indexes.
#[async_trait]
pub trait PersistentStore: Send + Sync + 'static {
    /// Human-readable backend name (for logs and health reports).
    fn name(&self) -> &str;

    /// Prepares the backend (migrations, connections). Idempotent.
    async fn initialize(&self) -> Result<(), LockboxError>;

    /// Reports whether the backend can serve requests.
    async fn health_check(&self) -> Result<HealthStatus, LockboxError>;

    /// Flushes pending writes and releases resources.
    async fn close(&self) -> Result<(), LockboxError>;

    // --- Credentials ---

    /// Inserts or replaces a credential row.
    async fn put_credential(&self, record: &CredentialRecord) -> Result<(), LockboxError>;

    /// Fetches a credential row, including soft-deleted ones.
    async fn get_credential(&self, id: &str) -> Result<Option<CredentialRecord>, LockboxError>;

    /// Lists credentials. `folder_id = None` means every folder; a value is
    /// an exact match. Soft-deleted rows are skipped unless `include_deleted`.
    async fn list_credentials(
        &self,
        folder_id: Option<&str>,
        include_deleted: bool,
    ) -> Result<Vec<CredentialRecord>, LockboxError>;

    /// Lists soft-deleted credentials only.
    async fn list_deleted_credentials(&self) -> Result<Vec<CredentialRecord>, LockboxError>;

    /// Physically removes a credential row. Returns whether a row existed.
    async fn delete_credential(&self, id: &str) -> Result<bool, LockboxError>;

    // --- Folders ---

    /// Inserts or replaces a folder row.
    async fn put_folder(&self, folder: &FolderRecord) -> Result<(), LockboxError>;

    /// Fetches a folder row, including soft-deleted ones.
    async fn get_folder(&self, id: &str) -> Result<Option<FolderRecord>, LockboxError>;

    /// Lists folders. `parent_id = None` means every folder; a value is an
    /// exact match on the parent.
    async fn list_folders(
        &self,
        parent_id: Option<&str>,
        include_deleted: bool,
    ) -> Result<Vec<FolderRecord>, LockboxError>;

    /// Physically removes a folder row and moves its direct children, folders
    /// and credentials alike (deleted ones included), under `new_parent`,
    /// stamping them with `updated_at`. All-or-nothing. Returns whether the
    /// folder existed; nothing changes when it did not.
    async fn delete_folder_reparenting(
        &self,
        id: &str,
        new_parent: Option<&str>,
        updated_at: i64,
    ) -> Result<bool, LockboxError>;

    // --- Metadata ---

    async fn get_metadata(&self) -> Result<Option<VaultMetadata>, LockboxError>;

    async fn put_metadata(&self, metadata: &VaultMetadata) -> Result<(), LockboxError>;

    /// Refreshes `last_accessed_at`. A no-op when no metadata exists.
    async fn touch_metadata(&self, accessed_at: i64) -> Result<(), LockboxError>;

    // --- Whole-vault operations ---

    /// Replaces the metadata and every given credential row in one
    /// transaction (password change re-encryption).
    async fn rewrite_vault(
        &self,
        metadata: &VaultMetadata,
        credentials: &[CredentialRecord],
    ) -> Result<(), LockboxError>;

    /// Removes all credentials, folders and metadata, all-or-nothing.
    async fn clear_all(&self) -> Result<(), LockboxError>;
}
