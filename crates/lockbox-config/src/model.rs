// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model for the lockbox vault.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Lowest accepted Argon2 memory cost in KiB (64 MiB).
pub const MIN_KDF_MEMORY_COST: u32 = 65_536;

/// Lowest accepted Argon2 iteration count.
pub const MIN_KDF_ITERATIONS: u32 = 3;

/// Accepted bounds for the inactivity lock timeout, in minutes.
pub const LOCK_TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 1..=60;

/// Lock timeout used when neither config nor settings name one.
pub const DEFAULT_LOCK_TIMEOUT_MINUTES: u32 = 15;

/// Default cadence of the inactivity check, in seconds.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;

/// Top-level lockbox configuration.
///
/// Loaded from TOML files in the XDG hierarchy with `LOCKBOX_*` environment
/// overrides. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LockboxConfig {
    /// Key derivation cost parameters.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Session lock behavior.
    #[serde(default)]
    pub session: SessionConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Argon2id parameters used to derive the vault key.
///
/// These are floors: the vault refuses to go below them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Number of passes over memory.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Lanes. Must be 1.
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    MIN_KDF_MEMORY_COST
}

fn default_kdf_iterations() -> u32 {
    MIN_KDF_ITERATIONS
}

fn default_kdf_parallelism() -> u32 {
    1
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Minutes of inactivity before the vault locks itself.
    /// A value persisted with `lockbox timeout` takes precedence.
    #[serde(default = "default_lock_timeout_minutes")]
    pub lock_timeout_minutes: u32,

    /// How often the inactivity check runs.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lock_timeout_minutes: default_lock_timeout_minutes(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

fn default_lock_timeout_minutes() -> u32 {
    DEFAULT_LOCK_TIMEOUT_MINUTES
}

fn default_check_interval_secs() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("lockbox").join("lockbox.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("lockbox.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// One of trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
