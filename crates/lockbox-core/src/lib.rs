// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the lockbox credential vault.
//!
//! This crate provides the error taxonomy, the stored data model, and the
//! traits for everything the vault consumes from its environment: secure
//! randomness, a wall clock, a document store and a settings store.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LockboxError;
pub use types::{
    CredentialData, CredentialRecord, DecryptedCredential, EncryptedBlob, FolderRecord,
    HealthStatus, KdfSettings, LockReason, STORE_SCHEMA_VERSION, SessionStatus, Settings,
    VAULT_METADATA_ID, VaultMetadata,
};

pub use traits::{
    Clock, PersistentStore, RandomSource, SettingsStore, SystemClock, random_array,
};
