// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared across the store boundary and the vault core.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use zeroize::Zeroize;

use crate::error::LockboxError;

/// Fixed key of the singleton metadata row.
pub const VAULT_METADATA_ID: &str = "vault";

/// Current version of the stored data layout (metadata + record rows).
pub const STORE_SCHEMA_VERSION: u32 = 1;

/// Health status reported by store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Store is fully operational.
    Healthy,
    /// Store is operational but experiencing issues.
    Degraded(String),
    /// Store is not operational.
    Unhealthy(String),
}

/// Ciphertext plus everything needed to decrypt it, except the key.
///
/// Serialized form is `{ciphertext: base64, nonce: base64, timestamp: ms,
/// version}` and must stay stable: old rows are decrypted by dispatching on
/// `version`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Ciphertext with the authentication tag appended.
    #[serde(with = "base64_bytes", default)]
    pub ciphertext: Vec<u8>,
    /// Per-encryption random nonce.
    #[serde(with = "base64_bytes", default)]
    pub nonce: Vec<u8>,
    /// Epoch millis at which the blob was produced.
    #[serde(rename = "timestamp")]
    pub created_at_ms: i64,
    /// Cipher scheme version.
    pub version: u32,
}

impl EncryptedBlob {
    /// Encode to the persisted JSON shape.
    pub fn to_json(&self) -> Result<String, LockboxError> {
        serde_json::to_string(self).map_err(LockboxError::storage)
    }

    /// Decode from the persisted JSON shape.
    pub fn from_json(json: &str) -> Result<Self, LockboxError> {
        serde_json::from_str(json)
            .map_err(|_| LockboxError::InvalidEncryptedData("malformed blob encoding"))
    }
}

impl std::fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedBlob")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("nonce_len", &self.nonce.len())
            .field("created_at_ms", &self.created_at_ms)
            .field("version", &self.version)
            .finish()
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// A stored credential row. The payload is opaque to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: String,
    pub folder_id: Option<String>,
    pub encrypted_payload: EncryptedBlob,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted: bool,
}

/// The cleartext side of a credential. Only exists while unlocked.
///
/// Field contents are zeroized on drop; `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialData {
    pub title: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, String>,
}

impl CredentialData {
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            username: username.into(),
            password: password.into(),
            url: None,
            notes: None,
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_fields.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive substring match over the searchable text fields.
    /// Passwords and custom field values are never matched.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let hit = |s: &str| s.to_lowercase().contains(&needle);
        hit(&self.title)
            || hit(&self.username)
            || self.url.as_deref().is_some_and(hit)
            || self.notes.as_deref().is_some_and(hit)
    }
}

impl std::fmt::Debug for CredentialData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialData")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("url", &self.url)
            .field("custom_fields", &self.custom_fields.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Drop for CredentialData {
    fn drop(&mut self) {
        self.title.zeroize();
        self.username.zeroize();
        self.password.zeroize();
        self.url.zeroize();
        self.notes.zeroize();
        for (mut name, mut value) in std::mem::take(&mut self.custom_fields) {
            name.zeroize();
            value.zeroize();
        }
    }
}

/// A credential after decryption: row metadata plus cleartext.
#[derive(Debug, Clone)]
pub struct DecryptedCredential {
    pub id: String,
    pub folder_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub data: CredentialData,
}

/// A folder in the organisation forest. Names are not secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted: bool,
}

/// Singleton vault metadata. Contains nothing secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultMetadata {
    pub id: String,
    /// Base64 of the 16-byte KDF salt.
    pub salt: String,
    pub created_at: i64,
    pub last_accessed_at: i64,
    pub schema_version: u32,
    pub initialized: bool,
    /// Known marker encrypted under the derived key; used to reject a wrong
    /// password at unlock time.
    #[serde(default)]
    pub key_check: Option<EncryptedBlob>,
    /// Argon2id cost the salt was last used with. Unlock re-derives with
    /// these so a config change cannot lock the user out.
    #[serde(default)]
    pub kdf: Option<KdfSettings>,
}

/// Persisted Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfSettings {
    /// KiB.
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// User settings persisted outside the vault payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub lock_timeout_minutes: u32,
}

/// Why a session went from unlocked to locked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// `lock()` was called.
    Manual,
    /// The inactivity timeout elapsed.
    Inactivity,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub unlocked: bool,
    pub last_activity_ms: i64,
    pub lock_timeout_minutes: u32,
    /// Millis until the inactivity lock fires; `None` while locked.
    pub remaining_ms: Option<i64>,
}
