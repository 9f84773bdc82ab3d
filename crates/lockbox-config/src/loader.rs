// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/lockbox/lockbox.toml` < `~/.config/lockbox/lockbox.toml`
//! < `./lockbox.toml` < `LOCKBOX_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LockboxConfig;

/// Config sections that `LOCKBOX_<SECTION>_<KEY>` may address.
const ENV_SECTIONS: &[&str] = &["vault", "session", "storage", "log"];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/lockbox/lockbox.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "lockbox.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("lockbox/lockbox.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<LockboxConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<LockboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LockboxConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file plus env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LockboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LockboxConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LockboxConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Maps a prefix-stripped, lowercased env key onto its dotted config path.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `session_lock_timeout_minutes` maps to `session.lock_timeout_minutes`.
/// Keys outside a known section pass through unchanged and are rejected by
/// `deny_unknown_fields`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("LOCKBOX_")
        .ignore(&["PASSPHRASE", "NEW_PASSPHRASE"])
        .map(|key| map_env_key(key.as_str()).into())
}
