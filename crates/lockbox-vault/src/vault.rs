// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault lifecycle: initialize, unlock, lock, change password, wipe.
//!
//! A [`Vault`] is an explicit context object wiring one store, one random
//! source, one clock and one [`SessionManager`] together. Nothing is global,
//! so tests can run many isolated vaults in one process.
//!
//! The first unlock creates the vault metadata: a fresh salt, the KDF cost
//! in use, and a key-check blob (a fixed marker encrypted under the derived
//! key). Later unlocks re-derive with the stored salt and cost and must
//! decrypt the key-check blob. A wrong password therefore fails with the
//! same `DecryptionFailed` as tampered data.

use std::sync::Arc;
use std::time::Duration;

use lockbox_config::LockboxConfig;
use lockbox_core::types::{
    CredentialRecord, KdfSettings, STORE_SCHEMA_VERSION, VAULT_METADATA_ID, VaultMetadata,
};
use lockbox_core::{Clock, LockboxError, PersistentStore, RandomSource, SettingsStore, SystemClock};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::crypto::AuthenticatedCipher;
use crate::kdf::{DerivedKey, KdfParams, KeyDerivation, Salt};
use crate::random::SystemRandomSource;
use crate::session::SessionManager;
use crate::store::{EncryptedRecordStore, credential_aad};

/// Associated data of the key-check blob.
const KEY_CHECK_AAD: &[u8] = b"lockbox:key-check";

/// Plaintext of the key-check blob.
const KEY_CHECK_MARKER: &[u8] = b"lockbox key check v1";

/// Builder for [`Vault`].
pub struct VaultBuilder {
    store: Arc<dyn PersistentStore>,
    settings: Arc<dyn SettingsStore>,
    rng: Option<Arc<dyn RandomSource>>,
    clock: Option<Arc<dyn Clock>>,
    config: LockboxConfig,
    kdf_params: Option<KdfParams>,
}

impl VaultBuilder {
    fn new(store: Arc<dyn PersistentStore>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            settings,
            rng: None,
            clock: None,
            config: LockboxConfig::default(),
            kdf_params: None,
        }
    }

    /// KDF cost and session defaults come from here.
    pub fn config(mut self, config: LockboxConfig) -> Self {
        self.config = config;
        self
    }

    pub fn random_source(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides the KDF cost taken from the config.
    pub fn kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = Some(params);
        self
    }

    pub fn build(self) -> Vault {
        let rng = self
            .rng
            .unwrap_or_else(|| Arc::new(SystemRandomSource::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let params = self
            .kdf_params
            .unwrap_or_else(|| KdfParams::from_config(&self.config.vault));

        let session = Arc::new(SessionManager::with_settings(
            clock.clone(),
            self.settings,
            Duration::from_secs(self.config.session.check_interval_secs),
            self.config.session.lock_timeout_minutes,
        ));
        let cipher = AuthenticatedCipher::new(rng.clone(), clock.clone());
        let records = EncryptedRecordStore::new(
            self.store.clone(),
            session.clone(),
            cipher.clone(),
            clock.clone(),
        );

        Vault {
            store: self.store,
            kdf: KeyDerivation::new(params, rng),
            cipher,
            session,
            records,
            clock,
        }
    }
}

/// One vault: a store plus the session holding its key.
pub struct Vault {
    store: Arc<dyn PersistentStore>,
    kdf: KeyDerivation,
    cipher: AuthenticatedCipher,
    session: Arc<SessionManager>,
    records: EncryptedRecordStore,
    clock: Arc<dyn Clock>,
}

impl Vault {
    pub fn builder(
        store: Arc<dyn PersistentStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> VaultBuilder {
        VaultBuilder::new(store, settings)
    }

    /// Whether the first unlock has happened.
    pub async fn is_initialized(&self) -> Result<bool, LockboxError> {
        Ok(self
            .store
            .get_metadata()
            .await?
            .is_some_and(|m| m.initialized))
    }

    /// Derives the key from `password` and hands it to the session.
    ///
    /// On an uninitialized vault this sets `password` as the master password.
    pub async fn unlock(&self, password: &SecretString) -> Result<(), LockboxError> {
        if password.expose_secret().is_empty() {
            return Err(LockboxError::EmptyPassword);
        }

        let metadata = self.store.get_metadata().await?;
        let key = match metadata {
            Some(meta) if meta.initialized => self.open_existing(meta, password).await?,
            _ => self.initialize(password).await?,
        };
        self.session.unlock(key)?;
        info!("vault unlocked");
        Ok(())
    }

    async fn initialize(&self, password: &SecretString) -> Result<DerivedKey, LockboxError> {
        let salt = self.kdf.generate_salt()?;
        let params = self.kdf.params();
        let key = self.kdf.derive_key_blocking(params, password, salt).await?;
        let now = self.clock.now_millis();
        let metadata = VaultMetadata {
            id: VAULT_METADATA_ID.to_string(),
            salt: salt.to_base64(),
            created_at: now,
            last_accessed_at: now,
            schema_version: STORE_SCHEMA_VERSION,
            initialized: true,
            key_check: Some(self.cipher.encrypt(KEY_CHECK_MARKER, &key, Some(KEY_CHECK_AAD))?),
            kdf: Some(params.settings()),
        };
        self.store.put_metadata(&metadata).await?;
        info!(memory_cost = params.memory_cost(), "vault initialized");
        Ok(key)
    }

    async fn open_existing(
        &self,
        mut metadata: VaultMetadata,
        password: &SecretString,
    ) -> Result<DerivedKey, LockboxError> {
        let blob = metadata
            .key_check
            .as_ref()
            .ok_or(LockboxError::InvalidEncryptedData("vault metadata has no key check"))?;
        let key = self.derive_for(&metadata, password).await?;
        self.check_key(blob, &key)?;

        metadata.last_accessed_at = self.clock.now_millis();
        self.store.put_metadata(&metadata).await?;
        Ok(key)
    }

    fn check_key(
        &self,
        blob: &lockbox_core::EncryptedBlob,
        key: &DerivedKey,
    ) -> Result<(), LockboxError> {
        let marker = self.cipher.decrypt(blob, key, Some(KEY_CHECK_AAD))?;
        if marker.as_slice() != KEY_CHECK_MARKER {
            return Err(LockboxError::DecryptionFailed);
        }
        Ok(())
    }

    async fn derive_for(
        &self,
        metadata: &VaultMetadata,
        password: &SecretString,
    ) -> Result<DerivedKey, LockboxError> {
        let salt = Salt::from_base64(&metadata.salt)?;
        let params = self.params_for(metadata.kdf);
        self.kdf.derive_key_blocking(params, password, salt).await
    }

    /// Cost recorded in the metadata, or the configured cost for vaults that
    /// predate it.
    fn params_for(&self, stored: Option<KdfSettings>) -> KdfParams {
        match stored {
            Some(settings) if settings != self.kdf.params().settings() => {
                KdfParams::from_settings(settings)
            }
            _ => self.kdf.params(),
        }
    }

    /// Explicit lock. Returns `false` if already locked.
    pub fn lock(&self) -> bool {
        self.session.lock()
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    /// Replaces the master password.
    ///
    /// Every credential (trash included) and the key-check blob are
    /// re-encrypted under a key derived from `new` with a fresh salt and the
    /// configured KDF cost, then written in one store transaction. Record
    /// operations wait for the switch to finish. The session stays unlocked
    /// with the new key.
    pub async fn change_password(
        &self,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<(), LockboxError> {
        self.session.with_key(|_| ())?;
        if new.expose_secret().is_empty() {
            return Err(LockboxError::EmptyPassword);
        }
        let metadata = self
            .store
            .get_metadata()
            .await?
            .ok_or(LockboxError::NotInitialized)?;

        let current_key = self.derive_for(&metadata, current).await?;
        if !self.session.with_key(|live| *live == current_key)? {
            warn!("password change rejected: current password mismatch");
            return Err(LockboxError::DecryptionFailed);
        }

        let salt = self.kdf.generate_salt()?;
        let params = self.kdf.params();
        let new_key = self.kdf.derive_key_blocking(params, new, salt).await?;

        // Held until the session carries the new key.
        let _rekey = self.records.exclusive().await;
        let records = self.store.list_credentials(None, true).await?;
        let rewritten = self.session.with_key(|old_key| {
            records
                .into_iter()
                .map(|record| self.reencrypt(record, old_key, &new_key))
                .collect::<Result<Vec<_>, _>>()
        })??;

        let now = self.clock.now_millis();
        let updated = VaultMetadata {
            salt: salt.to_base64(),
            last_accessed_at: now,
            key_check: Some(
                self.cipher
                    .encrypt(KEY_CHECK_MARKER, &new_key, Some(KEY_CHECK_AAD))?,
            ),
            kdf: Some(params.settings()),
            ..metadata
        };
        self.store.rewrite_vault(&updated, &rewritten).await?;
        self.session.unlock(new_key)?;
        info!(credentials = rewritten.len(), "master password changed");
        Ok(())
    }

    fn reencrypt(
        &self,
        mut record: CredentialRecord,
        old_key: &DerivedKey,
        new_key: &DerivedKey,
    ) -> Result<CredentialRecord, LockboxError> {
        let aad = credential_aad(&record.id);
        let plaintext = self
            .cipher
            .decrypt(&record.encrypted_payload, old_key, Some(&aad))?;
        record.encrypted_payload = self.cipher.encrypt(plaintext.as_slice(), new_key, Some(&aad))?;
        Ok(record)
    }

    /// Deletes every credential, folder and the metadata, then locks.
    /// Requires an unlocked session.
    pub async fn wipe(&self) -> Result<(), LockboxError> {
        self.records.clear_all().await?;
        self.session.lock();
        warn!("vault wiped");
        Ok(())
    }

    /// Vault metadata. Contains nothing secret.
    pub async fn metadata(&self) -> Result<VaultMetadata, LockboxError> {
        self.store
            .get_metadata()
            .await?
            .ok_or(LockboxError::NotInitialized)
    }

    /// Locks and closes the store.
    pub async fn close(&self) -> Result<(), LockboxError> {
        self.session.lock();
        self.store.close().await
    }

    pub fn records(&self) -> &EncryptedRecordStore {
        &self.records
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn key_derivation(&self) -> &KeyDerivation {
        &self.kdf
    }

    pub fn cipher(&self) -> &AuthenticatedCipher {
        &self.cipher
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("store", &self.store.name())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Mask a secret for display: `"hunt...er22"`. Values under ten characters
/// are fully masked.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_secret_long_value() {
        assert_eq!(mask_secret("correct-horse-battery"), "corr...tery");
    }

    #[test]
    fn mask_secret_short_value() {
        assert_eq!(mask_secret("p@ss"), "****");
    }

    #[test]
    fn mask_secret_counts_characters_not_bytes() {
        assert_eq!(mask_secret("ééééééééééé"), "éééé...éééé");
    }

    use lockbox_core::CredentialData;
    use lockbox_test_utils::{ManualClock, MemoryStore};
    use tracing_test::traced_test;

    const PASSWORD: &str = "Tr0ub4dor&3";

    fn pw(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn test_vault(store: &Arc<MemoryStore>) -> Vault {
        Vault::builder(store.clone(), store.clone())
            .clock(Arc::new(ManualClock::default()))
            .kdf_params(KdfParams::for_tests())
            .build()
    }

    #[tokio::test]
    #[traced_test]
    async fn logs_never_contain_secrets() {
        let store = Arc::new(MemoryStore::new());
        let vault = test_vault(&store);
        vault.unlock(&pw(PASSWORD)).await.unwrap();
        vault
            .records()
            .create(&CredentialData::new("Example", "a@b.com", "p@ss"), None)
            .await
            .unwrap();
        vault.lock();
        let _ = vault.unlock(&pw("wrong guess")).await;

        assert!(logs_contain("vault initialized"));
        assert!(logs_contain("credential created"));
        assert!(logs_contain("session locked"));
        for secret in [PASSWORD, "wrong guess", "p@ss", "a@b.com"] {
            assert!(!logs_contain(secret), "log leaked {secret}");
        }
    }

    #[tokio::test]
    async fn metadata_records_kdf_cost_and_schema() {
        let store = Arc::new(MemoryStore::new());
        let vault = test_vault(&store);
        vault.unlock(&pw(PASSWORD)).await.unwrap();

        let meta = vault.metadata().await.unwrap();
        assert_eq!(meta.kdf, Some(KdfParams::for_tests().settings()));
        assert_eq!(meta.schema_version, STORE_SCHEMA_VERSION);
        assert_eq!(meta.id, VAULT_METADATA_ID);
        assert_eq!(vault.params_for(meta.kdf), KdfParams::for_tests());
        assert_eq!(vault.params_for(None), KdfParams::for_tests());
        assert_eq!(
            vault.params_for(Some(KdfParams::default().settings())),
            KdfParams::default()
        );
    }

    #[tokio::test]
    async fn metadata_without_key_check_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let vault = test_vault(&store);
        vault.unlock(&pw(PASSWORD)).await.unwrap();
        vault.lock();

        let mut stripped = vault.metadata().await.unwrap();
        stripped.key_check = None;
        store.put_metadata(&stripped).await.unwrap();

        for attempt in [PASSWORD, "anything at all"] {
            assert!(matches!(
                vault.unlock(&pw(attempt)).await.unwrap_err(),
                LockboxError::InvalidEncryptedData(_)
            ));
        }
        assert!(!vault.is_unlocked());
        assert_eq!(vault.metadata().await.unwrap(), stripped);
    }

    #[tokio::test]
    async fn uninitialized_metadata_is_treated_as_new_vault() {
        let store = Arc::new(MemoryStore::new());
        let vault = test_vault(&store);
        vault.unlock(&pw(PASSWORD)).await.unwrap();
        let mut meta = vault.metadata().await.unwrap();
        meta.initialized = false;
        store.put_metadata(&meta).await.unwrap();
        vault.lock();

        assert!(!vault.is_initialized().await.unwrap());
        vault.unlock(&pw("another")).await.unwrap();
        assert!(vault.is_initialized().await.unwrap());
    }
}
