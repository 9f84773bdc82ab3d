// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks range constraints serde cannot express. Every failure is
//! collected; validation never stops at the first error.

use crate::diagnostic::ConfigError;
use crate::model::{LOCK_TIMEOUT_RANGE, LockboxConfig, MIN_KDF_ITERATIONS, MIN_KDF_MEMORY_COST};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &LockboxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.vault.kdf_memory_cost < MIN_KDF_MEMORY_COST {
        fail(format!(
            "vault.kdf_memory_cost must be at least {MIN_KDF_MEMORY_COST} (64 MiB), got {}",
            config.vault.kdf_memory_cost
        ));
    }

    if config.vault.kdf_iterations < MIN_KDF_ITERATIONS {
        fail(format!(
            "vault.kdf_iterations must be at least {MIN_KDF_ITERATIONS}, got {}",
            config.vault.kdf_iterations
        ));
    }

    if config.vault.kdf_parallelism != 1 {
        fail(format!(
            "vault.kdf_parallelism must be 1, got {}",
            config.vault.kdf_parallelism
        ));
    }

    if !LOCK_TIMEOUT_RANGE.contains(&config.session.lock_timeout_minutes) {
        fail(format!(
            "session.lock_timeout_minutes must be between {} and {}, got {}",
            LOCK_TIMEOUT_RANGE.start(),
            LOCK_TIMEOUT_RANGE.end(),
            config.session.lock_timeout_minutes
        ));
    }

    if config.session.check_interval_secs == 0 {
        fail("session.check_interval_secs must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let level = config.log.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &LockboxConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&LockboxConfig::default()).is_ok());
    }

    #[test]
    fn weak_kdf_parameters_fail() {
        let mut config = LockboxConfig::default();
        config.vault.kdf_memory_cost = 19_456;
        config.vault.kdf_iterations = 2;
        config.vault.kdf_parallelism = 4;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 3);
        assert!(msgs.iter().any(|m| m.contains("kdf_memory_cost")));
        assert!(msgs.iter().any(|m| m.contains("kdf_iterations")));
        assert!(msgs.iter().any(|m| m.contains("kdf_parallelism")));
    }

    #[test]
    fn stronger_kdf_parameters_pass() {
        let mut config = LockboxConfig::default();
        config.vault.kdf_memory_cost = 262_144;
        config.vault.kdf_iterations = 6;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn lock_timeout_out_of_range_fails() {
        for minutes in [0, 61] {
            let mut config = LockboxConfig::default();
            config.session.lock_timeout_minutes = minutes;
            let msgs = messages(&config);
            assert!(msgs.iter().any(|m| m.contains("lock_timeout_minutes")));
        }
    }

    #[test]
    fn zero_check_interval_fails() {
        let mut config = LockboxConfig::default();
        config.session.check_interval_secs = 0;
        assert!(messages(&config)[0].contains("check_interval_secs"));
    }

    #[test]
    fn empty_database_path_fails() {
        let mut config = LockboxConfig::default();
        config.storage.database_path = "  ".to_string();
        assert!(messages(&config)[0].contains("database_path"));
    }

    #[test]
    fn unknown_log_level_fails() {
        let mut config = LockboxConfig::default();
        config.log.level = "verbose".to_string();
        assert!(messages(&config)[0].contains("log.level"));

        config.log.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
