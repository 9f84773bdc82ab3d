// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lockbox status` command implementation.
//!
//! Reads the vault metadata and store health without asking for the master
//! password. Nothing shown here is secret.

use lockbox_core::{Clock, HealthStatus, LockboxError, PersistentStore, SystemClock, VaultMetadata};
use lockbox_storage::SqliteStore;
use lockbox_vault::Vault;
use serde::Serialize;

use crate::output::{format_timestamp, print_header, print_json, use_color};

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub initialized: bool,
    pub database_path: String,
    pub store: String,
    pub lock_timeout_minutes: u32,
    pub created_at: Option<i64>,
    pub last_accessed_at: Option<i64>,
    pub last_accessed_human: Option<String>,
    pub schema_version: Option<u32>,
    pub kdf_memory_cost: Option<u32>,
    pub kdf_iterations: Option<u32>,
}

impl StatusResponse {
    fn new(
        store: &SqliteStore,
        health: &HealthStatus,
        lock_timeout_minutes: u32,
        metadata: Option<&VaultMetadata>,
        now_ms: i64,
    ) -> Self {
        let kdf = metadata.and_then(|m| m.kdf);
        Self {
            initialized: metadata.is_some(),
            database_path: store.path().to_string(),
            store: health_label(health),
            lock_timeout_minutes,
            created_at: metadata.map(|m| m.created_at),
            last_accessed_at: metadata.map(|m| m.last_accessed_at),
            last_accessed_human: metadata.map(|m| {
                let secs = u64::try_from((now_ms - m.last_accessed_at) / 1000).unwrap_or(0);
                format!("{} ago", format_elapsed(secs))
            }),
            schema_version: metadata.map(|m| m.schema_version),
            kdf_memory_cost: kdf.map(|k| k.memory_cost),
            kdf_iterations: kdf.map(|k| k.iterations),
        }
    }
}

fn health_label(health: &HealthStatus) -> String {
    match health {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(reason) => format!("degraded: {reason}"),
        HealthStatus::Unhealthy(reason) => format!("unhealthy: {reason}"),
    }
}

/// Format seconds into a human-readable duration string.
fn format_elapsed(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Run the `lockbox status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    vault: &Vault,
    store: &SqliteStore,
    json: bool,
    plain: bool,
) -> Result<(), LockboxError> {
    let health = store.health_check().await?;
    let metadata = if vault.is_initialized().await? {
        Some(vault.metadata().await?)
    } else {
        None
    };
    let status = StatusResponse::new(
        store,
        &health,
        vault.session().lock_timeout_minutes(),
        metadata.as_ref(),
        SystemClock.now_millis(),
    );

    if json {
        return print_json(&status);
    }
    print_status(&status, use_color(plain));
    Ok(())
}

fn print_status(status: &StatusResponse, use_color: bool) {
    print_header("lockbox status");

    let state = if status.initialized {
        "initialized"
    } else {
        "not initialized"
    };
    if use_color {
        use colored::Colorize;
        if status.initialized {
            println!("    Vault:    {} {}", "✓".green(), state.green());
        } else {
            println!("    Vault:    {} {}", "✗".yellow(), state.yellow());
        }
    } else if status.initialized {
        println!("    Vault:    [OK] {state}");
    } else {
        println!("    Vault:    [--] {state}");
    }

    println!("    Store:    {} ({})", status.database_path, status.store);
    println!("    Timeout:  {} minutes", status.lock_timeout_minutes);
    if let Some(created) = status.created_at {
        println!("    Created:  {}", format_timestamp(created));
    }
    if let (Some(accessed), Some(human)) = (status.last_accessed_at, &status.last_accessed_human) {
        println!("    Accessed: {} ({human})", format_timestamp(accessed));
    }
    if let (Some(memory), Some(iterations)) = (status.kdf_memory_cost, status.kdf_iterations) {
        println!("    KDF:      argon2id, {} MiB, {iterations} passes", memory / 1024);
    }
    println!();

    if !status.initialized {
        println!("  Create one with: lockbox init");
        println!();
    }
}
