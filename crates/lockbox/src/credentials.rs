// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential commands: add, get, list, search, edit, rm, restore, trash.

use clap::Args;
use lockbox_core::{CredentialData, DecryptedCredential, LockboxError};
use lockbox_vault::{Vault, mask_secret};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::context;
use crate::output::{format_timestamp, print_header, print_json, use_color};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Display name, usually the site or service.
    pub title: String,

    #[arg(long, short)]
    pub username: String,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Folder id to file the credential under.
    #[arg(long)]
    pub folder: Option<String>,

    /// Extra field as NAME=VALUE. Repeatable.
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Read the password from the first line of stdin.
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short)]
    pub username: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Add or replace a field as NAME=VALUE. Repeatable.
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Remove a field. Repeatable.
    #[arg(long = "remove-field", value_name = "NAME")]
    pub remove_fields: Vec<String>,

    /// Prompt for a new password.
    #[arg(long, conflicts_with = "password_stdin")]
    pub password: bool,

    /// Read the new password from the first line of stdin.
    #[arg(long)]
    pub password_stdin: bool,

    /// Move the credential into this folder.
    #[arg(long, conflicts_with = "root")]
    pub folder: Option<String>,

    /// Move the credential out of any folder.
    #[arg(long)]
    pub root: bool,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}

/// One line of `list`/`search` output. Never carries the password.
#[derive(Debug, Serialize)]
pub struct CredentialSummary {
    pub id: String,
    pub title: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub updated_at: i64,
}

impl From<&DecryptedCredential> for CredentialSummary {
    fn from(c: &DecryptedCredential) -> Self {
        Self {
            id: c.id.clone(),
            title: c.data.title.clone(),
            username: c.data.username.clone(),
            url: c.data.url.clone(),
            folder_id: c.folder_id.clone(),
            updated_at: c.updated_at,
        }
    }
}

pub async fn run_add(vault: &Vault, args: AddArgs) -> Result<(), LockboxError> {
    let password = context::credential_password(args.password_stdin)?;
    let mut data = CredentialData::new(args.title, args.username, password.expose_secret());
    data.url = args.url;
    data.notes = args.notes;
    data.custom_fields.extend(args.fields);

    let record = vault.records().create(&data, args.folder.as_deref()).await?;
    println!("{}", record.id);
    Ok(())
}

pub async fn run_get(vault: &Vault, id: &str, show: bool, plain: bool) -> Result<(), LockboxError> {
    let credential = vault.records().read_decrypted(id).await?;
    print_credential(&credential, show, use_color(plain));
    Ok(())
}

fn print_credential(credential: &DecryptedCredential, show: bool, use_color: bool) {
    let data = &credential.data;
    let reveal = |value: &str| {
        if show {
            value.to_string()
        } else {
            mask_secret(value)
        }
    };

    if use_color {
        use colored::Colorize;
        print_header(&data.title.bold().to_string());
    } else {
        print_header(&data.title);
    }
    println!("    Id:       {}", credential.id);
    println!("    Username: {}", data.username);
    println!("    Password: {}", reveal(&data.password));
    if let Some(url) = &data.url {
        println!("    URL:      {url}");
    }
    if let Some(folder) = &credential.folder_id {
        println!("    Folder:   {folder}");
    }
    if let Some(notes) = &data.notes {
        println!("    Notes:    {notes}");
    }
    for (name, value) in &data.custom_fields {
        println!("    {name}: {}", reveal(value));
    }
    println!("    Updated:  {}", format_timestamp(credential.updated_at));
    println!();
}

pub async fn run_list(vault: &Vault, folder: Option<&str>, json: bool) -> Result<(), LockboxError> {
    let credentials = vault.records().list_decrypted(folder).await?;
    print_summaries(&credentials, json)
}

pub async fn run_search(vault: &Vault, query: &str, json: bool) -> Result<(), LockboxError> {
    let credentials = vault.records().search(query).await?;
    print_summaries(&credentials, json)
}

fn print_summaries(credentials: &[DecryptedCredential], json: bool) -> Result<(), LockboxError> {
    let summaries: Vec<CredentialSummary> = credentials.iter().map(Into::into).collect();
    if json {
        return print_json(&summaries);
    }
    if summaries.is_empty() {
        println!("No credentials.");
        return Ok(());
    }
    for line in summary_lines(&summaries) {
        println!("{line}");
    }
    Ok(())
}

/// Aligned `id  title  username` rows.
fn summary_lines(summaries: &[CredentialSummary]) -> Vec<String> {
    let width = summaries
        .iter()
        .map(|s| s.title.chars().count())
        .max()
        .unwrap_or(0);
    summaries
        .iter()
        .map(|s| format!("{}  {:<width$}  {}", s.id, s.title, s.username))
        .collect()
}

pub async fn run_edit(vault: &Vault, args: EditArgs) -> Result<(), LockboxError> {
    let current = vault.records().read_decrypted(&args.id).await?;
    let mut data = current.data.clone();
    let mut changed = false;

    if let Some(title) = args.title {
        data.title = title;
        changed = true;
    }
    if let Some(username) = args.username {
        data.username = username;
        changed = true;
    }
    if let Some(url) = args.url {
        data.url = Some(url).filter(|u| !u.is_empty());
        changed = true;
    }
    if let Some(notes) = args.notes {
        data.notes = Some(notes).filter(|n| !n.is_empty());
        changed = true;
    }
    for name in &args.remove_fields {
        changed |= data.custom_fields.remove(name).is_some();
    }
    if !args.fields.is_empty() {
        data.custom_fields.extend(args.fields);
        changed = true;
    }
    if args.password || args.password_stdin {
        let password = context::credential_password(args.password_stdin)?;
        data.password = password.expose_secret().to_string();
        changed = true;
    }

    if changed {
        vault.records().update(&args.id, &data).await?;
    }

    let destination = if args.root {
        Some(None)
    } else {
        args.folder.as_deref().map(Some)
    };
    if let Some(folder) = destination {
        vault.records().move_credential(&args.id, folder).await?;
    } else if !changed {
        return Err(LockboxError::Internal("nothing to change".to_string()));
    }

    println!("Updated {}", args.id);
    Ok(())
}

pub async fn run_rm(vault: &Vault, id: &str, permanent: bool) -> Result<(), LockboxError> {
    if permanent {
        vault.records().permanently_delete(id).await?;
        println!("Deleted {id}");
    } else {
        vault.records().soft_delete(id).await?;
        println!("Moved {id} to the trash");
    }
    Ok(())
}

pub async fn run_restore(vault: &Vault, id: &str) -> Result<(), LockboxError> {
    vault.records().restore(id).await?;
    println!("Restored {id}");
    Ok(())
}

pub async fn run_trash(vault: &Vault) -> Result<(), LockboxError> {
    let trashed = vault.records().list_trash().await?;
    if trashed.is_empty() {
        println!("Trash is empty.");
        return Ok(());
    }
    for record in &trashed {
        println!("{}  deleted {}", record.id, format_timestamp(record.updated_at));
    }
    Ok(())
}
