// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the lockbox configuration system.

use lockbox_config::diagnostic::ConfigError;
use lockbox_config::model::LockboxConfig;
use lockbox_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use serial_test::serial;

/// Every section and key deserializes.
#[test]
fn full_toml_deserializes() {
    let toml = r#"
[vault]
kdf_memory_cost = 131072
kdf_iterations = 4
kdf_parallelism = 1

[session]
lock_timeout_minutes = 5
check_interval_secs = 2

[storage]
database_path = "/tmp/vault.db"
wal_mode = false

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.vault.kdf_memory_cost, 131_072);
    assert_eq!(config.vault.kdf_iterations, 4);
    assert_eq!(config.session.lock_timeout_minutes, 5);
    assert_eq!(config.session.check_interval_secs, 2);
    assert_eq!(config.storage.database_path, "/tmp/vault.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.log.level, "debug");
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    assert_eq!(config, LockboxConfig::default());
}

/// Top-level unknown sections are rejected too.
#[test]
fn unknown_section_is_rejected() {
    let err = load_config_from_str("[network]\nport = 1\n").expect_err("unknown section");
    assert!(format!("{err}").contains("network"));
}

#[test]
fn unknown_key_reports_suggestion_and_valid_keys() {
    let toml = r#"
[session]
lock_timeout_minute = 5
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, section, suggestion, valid_keys, .. } if {
            key == "lock_timeout_minute"
                && section == "session"
                && suggestion.as_deref() == Some("lock_timeout_minutes")
                && valid_keys.contains("check_interval_secs")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn unknown_key_in_inline_source_gets_a_span() {
    let toml = "[storage]\ndatabse_path = \"x\"\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    let span = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { span, .. } => *span,
        _ => None,
    });
    let span = span.expect("span should be resolved");
    assert_eq!(&toml[span.offset()..span.offset() + span.len()], "databse_path");
}

#[test]
fn invalid_type_is_reported_with_key() {
    let errors = load_and_validate_str("[session]\ncheck_interval_secs = \"often\"\n")
        .expect_err("string where integer expected");
    assert!(
        errors
            .iter()
            .any(|e| e.to_string().contains("check_interval_secs")),
        "got: {errors:?}"
    );
}

#[test]
fn validation_errors_are_all_collected() {
    let toml = r#"
[vault]
kdf_iterations = 1

[session]
lock_timeout_minutes = 90

[log]
level = "loud"
"#;
    let errors = load_and_validate_str(toml).expect_err("three violations");
    let validations = errors
        .iter()
        .filter(|e| matches!(e, ConfigError::Validation { .. }))
        .count();
    assert_eq!(validations, 3);
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "levl".to_string(),
        section: "log".to_string(),
        suggestion: Some("level".to_string()),
        valid_keys: "level".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `level`"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("levl"));
}

#[test]
#[serial]
fn env_var_overrides_file_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lockbox.toml");
    std::fs::write(&path, "[session]\nlock_timeout_minutes = 30\n").unwrap();

    // SAFETY: serialized with the other env-mutating tests in this binary.
    unsafe { std::env::set_var("LOCKBOX_SESSION_LOCK_TIMEOUT_MINUTES", "5") };
    let result = load_and_validate_path(&path);
    unsafe { std::env::remove_var("LOCKBOX_SESSION_LOCK_TIMEOUT_MINUTES") };

    assert_eq!(result.unwrap().session.lock_timeout_minutes, 5);
}

#[test]
#[serial]
fn passphrase_env_vars_are_not_config_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");

    // SAFETY: serialized with the other env-mutating tests in this binary.
    unsafe {
        std::env::set_var("LOCKBOX_PASSPHRASE", "not-config");
        std::env::set_var("LOCKBOX_NEW_PASSPHRASE", "not-config-either");
    }
    let result = load_and_validate_path(&path);
    unsafe {
        std::env::remove_var("LOCKBOX_PASSPHRASE");
        std::env::remove_var("LOCKBOX_NEW_PASSPHRASE");
    }

    assert!(result.is_ok(), "got: {result:?}");
}

#[test]
#[serial]
fn env_database_path_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");

    // SAFETY: serialized with the other env-mutating tests in this binary.
    unsafe { std::env::set_var("LOCKBOX_STORAGE_DATABASE_PATH", "/tmp/other.db") };
    let result = load_and_validate_path(&path);
    unsafe { std::env::remove_var("LOCKBOX_STORAGE_DATABASE_PATH") };

    assert_eq!(result.unwrap().storage.database_path, "/tmp/other.db");
}
