// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the lockbox vault.
//!
//! No variant ever carries a password, key material, or decrypted plaintext.

use thiserror::Error;

/// The error type shared by every lockbox crate.
#[derive(Debug, Error)]
pub enum LockboxError {
    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistent store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The master password was empty.
    #[error("password must not be empty")]
    EmptyPassword,

    /// Encryption was requested for an empty plaintext.
    #[error("plaintext must not be empty")]
    EmptyPlaintext,

    /// An encrypted blob is structurally unusable (missing fields, wrong nonce
    /// length, unknown scheme version). Raised before any key is touched.
    #[error("invalid encrypted data: {0}")]
    InvalidEncryptedData(&'static str),

    /// Authentication failed. Wrong key, tampered ciphertext, and wrong or
    /// missing associated data all end up here with the same message.
    #[error("decryption failed: incorrect password or corrupted data")]
    DecryptionFailed,

    /// The plaintext authenticated but does not parse as the expected record.
    #[error("decrypted payload is malformed")]
    MalformedPayload,

    /// No derived key is held; the caller must unlock first.
    #[error("vault is locked")]
    VaultLocked,

    /// Credential id is absent (or soft-deleted, for decrypted reads).
    #[error("record not found: {id}")]
    RecordNotFound { id: String },

    /// Folder id is absent or soft-deleted.
    #[error("folder not found: {id}")]
    FolderNotFound { id: String },

    /// A folder move would make the folder its own ancestor.
    #[error("moving folder {id} there would create a cycle")]
    FolderCycle { id: String },

    /// Folder names must contain at least one non-whitespace character.
    #[error("folder name must not be empty")]
    InvalidFolderName,

    /// The CSPRNG could not supply bytes. Never silently degraded.
    #[error("secure random source failure: {0}")]
    RandomSource(String),

    /// The memory-hard KDF rejected its parameters or failed internally.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The vault has no metadata yet (never unlocked with a first password).
    #[error("vault is not initialized")]
    NotInitialized,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LockboxError {
    /// Wraps any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// True for the routine "unlock first" case.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::VaultLocked)
    }

    /// True for not-found errors on either collection.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RecordNotFound { .. } | Self::FolderNotFound { .. }
        )
    }
}
