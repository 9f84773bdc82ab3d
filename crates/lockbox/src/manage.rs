// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault-level commands: init, passwd, timeout, wipe.

use lockbox_core::LockboxError;
use lockbox_vault::{Vault, get_new_passphrase, get_passphrase, get_passphrase_with_confirm};

use crate::context;

pub async fn run_init(vault: &Vault) -> Result<(), LockboxError> {
    if vault.is_initialized().await? {
        return Err(LockboxError::Internal(
            "a vault already exists at this location".to_string(),
        ));
    }
    let password = get_passphrase_with_confirm("New master password: ")?;
    vault.unlock(&password).await?;
    println!("Vault created.");
    Ok(())
}

/// Unlocks with the current password, then re-encrypts everything under
/// the new one.
pub async fn run_passwd(vault: &Vault) -> Result<(), LockboxError> {
    context::require_initialized(vault).await?;
    let current = get_passphrase()?;
    vault.unlock(&current).await?;
    let new = get_new_passphrase()?;
    vault.change_password(&current, &new).await?;
    println!("Master password changed.");
    Ok(())
}

/// Prints the timeout, or persists a new one. Needs no password: the
/// timeout is not secret.
pub async fn run_timeout(vault: &Vault, minutes: Option<u32>) -> Result<(), LockboxError> {
    let session = vault.session();
    match minutes {
        None => println!("Lock timeout: {} minutes", session.lock_timeout_minutes()),
        Some(requested) => {
            let applied = session.set_lock_timeout(requested).await?;
            if applied == requested {
                println!("Lock timeout set to {applied} minutes");
            } else {
                println!("Lock timeout set to {applied} minutes (requested {requested})");
            }
        }
    }
    Ok(())
}

pub async fn run_wipe(vault: &Vault) -> Result<(), LockboxError> {
    vault.wipe().await?;
    println!("Vault wiped.");
    Ok(())
}
