// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lockbox vault core.
//!
//! A master password is stretched with Argon2id into a 32-byte key
//! ([`kdf`]). The key lives only inside the [`SessionManager`], which
//! discards it on explicit lock or after a period of inactivity
//! ([`session`]). Credential payloads are sealed with XChaCha20-Poly1305
//! ([`crypto`]) by the [`EncryptedRecordStore`] before they reach the
//! persistent store ([`store`]). [`Vault`] ties these together.

pub mod crypto;
pub mod kdf;
pub mod prompt;
pub mod random;
pub mod session;
pub mod store;
pub mod vault;

pub use crypto::AuthenticatedCipher;
pub use kdf::{DerivedKey, KdfParams, KeyDerivation, Salt};
pub use prompt::{
    get_new_passphrase, get_passphrase, get_passphrase_with_confirm, prompt_secret,
    read_secret_line,
};
pub use random::SystemRandomSource;
pub use session::{ListenerId, SessionManager};
pub use store::EncryptedRecordStore;
pub use vault::{Vault, VaultBuilder, mask_secret};
