// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vault over the real SQLite store, across process-like restarts.

use std::sync::Arc;

use lockbox_config::model::StorageConfig;
use lockbox_core::{CredentialData, LockboxError, PersistentStore};
use lockbox_storage::SqliteStore;
use lockbox_vault::{KdfParams, Vault};
use secrecy::SecretString;
use tempfile::{TempDir, tempdir};

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

async fn open(dir: &TempDir) -> (Vault, Arc<SqliteStore>) {
    let path = dir.path().join("vault.db");
    let store = Arc::new(SqliteStore::new(StorageConfig {
        database_path: path.to_string_lossy().into_owned(),
        wal_mode: true,
    }));
    store.initialize().await.unwrap();
    let vault = Vault::builder(store.clone(), store.clone())
        .kdf_params(KdfParams::for_tests())
        .build();
    (vault, store)
}

#[tokio::test]
async fn credentials_survive_reopen() {
    let dir = tempdir().unwrap();
    let id = {
        let (vault, _store) = open(&dir).await;
        vault.unlock(&secret("Tr0ub4dor&3")).await.unwrap();
        let work = vault.records().create_folder("Work", None).await.unwrap();
        let created = vault
            .records()
            .create(
                &CredentialData::new("Example", "a@b.com", "p@ss").with_field("pin", "0000"),
                Some(&work.id),
            )
            .await
            .unwrap();
        vault.close().await.unwrap();
        created.id
    };

    let (vault, _store) = open(&dir).await;
    assert!(vault.is_initialized().await.unwrap());
    assert!(matches!(
        vault.unlock(&secret("wrong")).await.unwrap_err(),
        LockboxError::DecryptionFailed
    ));
    vault.unlock(&secret("Tr0ub4dor&3")).await.unwrap();

    let read = vault.records().read_decrypted(&id).await.unwrap();
    assert_eq!(read.data.title, "Example");
    assert_eq!(read.data.custom_fields.get("pin").map(String::as_str), Some("0000"));
    assert_eq!(vault.records().list_folders(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn database_file_holds_no_plaintext() {
    let dir = tempdir().unwrap();
    let (vault, _store) = open(&dir).await;
    vault.unlock(&secret("Tr0ub4dor&3")).await.unwrap();
    vault
        .records()
        .create(&CredentialData::new("Example", "a@b.com", "p@ss"), None)
        .await
        .unwrap();
    vault.close().await.unwrap();

    let bytes = std::fs::read(dir.path().join("vault.db")).unwrap();
    for needle in [&b"Example"[..], &b"a@b.com"[..], &b"p@ss"[..]] {
        assert!(!bytes.windows(needle.len()).any(|w| w == needle));
    }
}

#[tokio::test]
async fn change_password_is_durable() {
    let dir = tempdir().unwrap();
    {
        let (vault, _store) = open(&dir).await;
        vault.unlock(&secret("first")).await.unwrap();
        vault
            .records()
            .create(&CredentialData::new("Mail", "me", "pw"), None)
            .await
            .unwrap();
        vault
            .change_password(&secret("first"), &secret("second"))
            .await
            .unwrap();
        vault.close().await.unwrap();
    }

    let (vault, _store) = open(&dir).await;
    assert!(vault.unlock(&secret("first")).await.is_err());
    vault.unlock(&secret("second")).await.unwrap();
    let all = vault.records().list_decrypted(None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].data.title, "Mail");
}

#[tokio::test]
async fn lock_timeout_persists_in_settings_table() {
    let dir = tempdir().unwrap();
    {
        let (vault, _store) = open(&dir).await;
        vault.session().set_lock_timeout(42).await.unwrap();
    }
    let (vault, _store) = open(&dir).await;
    assert_eq!(vault.session().restore_settings().await.unwrap(), 42);
    assert_eq!(vault.session().lock_timeout_minutes(), 42);
}
