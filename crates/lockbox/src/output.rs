// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal output helpers.

use std::io::IsTerminal;

use lockbox_core::LockboxError;
use serde::Serialize;

/// Colors only when asked for and stdout is a terminal.
pub fn use_color(plain: bool) -> bool {
    !plain && std::io::stdout().is_terminal()
}

/// Section header in the style of `lockbox status`.
pub fn print_header(title: &str) {
    println!();
    println!("  {title}");
    println!("  {}", "-".repeat(35));
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), LockboxError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| LockboxError::Internal(format!("failed to render JSON: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Epoch millis as a UTC timestamp, `-` when out of range.
pub fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// What the user sees for an error. Decryption failures stay generic.
pub fn user_message(err: &LockboxError) -> String {
    match err {
        LockboxError::DecryptionFailed => "incorrect password or corrupted data".to_string(),
        LockboxError::NotInitialized => {
            "vault is not initialized; run `lockbox init` first".to_string()
        }
        LockboxError::Internal(msg) => msg.clone(),
        other => other.to_string(),
    }
}
