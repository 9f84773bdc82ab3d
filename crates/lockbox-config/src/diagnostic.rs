// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with "did you mean" suggestions.
//!
//! Unknown keys are matched against the section's valid keys with
//! Jaro-Winkler similarity and, where the offending file can be found,
//! rendered with a source span.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with enough context for an Elm-style report.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no config struct declares.
    #[error("unknown configuration key `{key}`{}", section_suffix(.section))]
    #[diagnostic(
        code(lockbox::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted path of the enclosing table; empty at top level.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(lockbox::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A required key is absent.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(lockbox::config::missing_key),
        help("add `{key} = <value>` to your lockbox.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but is out of range.
    #[error("validation error: {message}")]
    #[diagnostic(code(lockbox::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(lockbox::config::other))]
    Other(String),
}

fn section_suffix(section: &str) -> String {
    if section.is_empty() {
        String::new()
    } else {
        format!(" in [{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert every error inside a `figment::Error` into a `ConfigError`.
///
/// `toml_sources` holds `(path, content)` pairs used to locate spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let valid: Vec<&str> = expected.to_vec();
                    let (span, src) = find_source_span(&error, &path, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        section: path.join("."),
                        suggestion: suggest_key(field, &valid),
                        valid_keys: valid.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.to_string(),
                },
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: path.join("."),
                    detail: format!("found {actual}, expected {expected}"),
                    expected: expected.clone(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn find_source_span(
    error: &figment::error::Error,
    path: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(p) => Some(p.display().to_string()),
            _ => None,
        });

    // Inline strings carry no file source; fall back to the only candidate.
    let source = match origin {
        Some(origin) => toml_sources.iter().find(|(p, _)| *p == origin),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    let Some((name, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, path, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside the `[path]` table of `content`.
///
/// The search starts after the table header (or at the top of the file for
/// an empty path) and stops at the next table header.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = if path.is_empty() {
        0
    } else {
        let header = format!("[{}]", path.join("."));
        content.find(&header).map(|pos| pos + header.len())?
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if !path.is_empty() && trimmed.starts_with('[') {
            break;
        }
        if let Some(after) = trimmed.strip_prefix(field) {
            let after = after.trim_start_matches([' ', '\t']);
            if after.starts_with('=') {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Closest valid key above the similarity threshold, if any.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render errors to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_session_key() {
        let valid = &["lock_timeout_minutes", "check_interval_secs"];
        assert_eq!(
            suggest_key("lock_timeout_minute", valid),
            Some("lock_timeout_minutes".to_string())
        );
    }

    #[test]
    fn suggests_database_path_for_typo() {
        let valid = &["database_path", "wal_mode"];
        assert_eq!(
            suggest_key("databse_path", valid),
            Some("database_path".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        assert_eq!(suggest_key("zzzzzz", &["level"]), None);
    }

    #[test]
    fn key_offset_is_scoped_to_its_table() {
        let content = "[log]\nlevel = \"info\"\n\n[session]\nlevl = 3\n";
        let path = vec!["session".to_string()];
        let o = find_key_offset(content, &path, "levl").unwrap();
        assert_eq!(&content[o..o + 4], "levl");

        let log = vec!["log".to_string()];
        assert!(find_key_offset(content, &log, "levl").is_none());
    }

    #[test]
    fn unknown_key_message_names_section() {
        let err = ConfigError::UnknownKey {
            key: "levl".into(),
            section: "log".into(),
            suggestion: Some("level".into()),
            valid_keys: "level".into(),
            span: None,
            src: None,
        };
        assert_eq!(err.to_string(), "unknown configuration key `levl` in [log]");
    }
}
