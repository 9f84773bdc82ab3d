// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store and vault wiring shared by every command.

use std::io::IsTerminal;
use std::sync::Arc;

use lockbox_config::LockboxConfig;
use lockbox_core::{LockboxError, PersistentStore};
use lockbox_storage::SqliteStore;
use lockbox_vault::{Vault, get_passphrase, prompt_secret, read_secret_line};
use secrecy::SecretString;
use tracing::debug;

/// Open (and migrate) the configured SQLite database.
pub async fn open_store(config: &LockboxConfig) -> Result<Arc<SqliteStore>, LockboxError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    debug!(path = store.path(), "store opened");
    Ok(store)
}

/// Build the vault over `store` and apply the persisted lock timeout.
pub async fn build_vault(
    store: Arc<SqliteStore>,
    config: &LockboxConfig,
) -> Result<Vault, LockboxError> {
    let vault = Vault::builder(store.clone(), store)
        .config(config.clone())
        .build();
    vault.session().restore_settings().await?;
    Ok(vault)
}

/// Fails with `NotInitialized` instead of letting the first unlock create
/// a vault under whatever password was typed.
pub async fn require_initialized(vault: &Vault) -> Result<(), LockboxError> {
    if vault.is_initialized().await? {
        Ok(())
    } else {
        Err(LockboxError::NotInitialized)
    }
}

/// Unlock an existing vault with the master password.
pub async fn unlock(vault: &Vault) -> Result<(), LockboxError> {
    require_initialized(vault).await?;
    let password = get_passphrase()?;
    vault.unlock(&password).await
}

/// The password to store in a credential: one line of stdin with
/// `--password-stdin`, otherwise a confirmed TTY prompt.
pub fn credential_password(from_stdin: bool) -> Result<SecretString, LockboxError> {
    if from_stdin {
        return read_secret_line(std::io::stdin().lock());
    }
    if !std::io::stdin().is_terminal() {
        return Err(LockboxError::Internal(
            "no credential password provided: use --password-stdin or run interactively"
                .to_string(),
        ));
    }
    prompt_secret("Credential password: ", true)
}
