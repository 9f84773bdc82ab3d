// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the lockbox vault.
//!
//! Strict TOML parsing (`deny_unknown_fields`), XDG file hierarchy lookup,
//! `LOCKBOX_*` environment overrides and miette diagnostics with typo
//! suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use lockbox_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("lock after {} minutes", config.session.lock_timeout_minutes);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::LockboxConfig;

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<LockboxConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load one explicit config file (plus env) and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<LockboxConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<LockboxConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<LockboxConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<LockboxConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Read every config file that exists, for span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG_PATH))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG_PATH.into());
    [
        local,
        loader::user_config_path(),
        std::path::PathBuf::from(loader::SYSTEM_CONFIG_PATH),
    ]
    .into_iter()
    .filter_map(|path| {
        std::fs::read_to_string(&path)
            .ok()
            .map(|content| (path.display().to_string(), content))
    })
    .collect()
}
