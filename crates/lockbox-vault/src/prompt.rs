// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret acquisition: environment variables, TTY prompts, or a line on
//! stdin. Secrets never come from command-line arguments.

use std::io::{BufRead, IsTerminal};

use lockbox_core::LockboxError;
use secrecy::{ExposeSecret, SecretString};

/// Master password, read before prompting.
pub const PASSPHRASE_ENV_VAR: &str = "LOCKBOX_PASSPHRASE";

/// Replacement master password for `passwd`, read before prompting.
pub const NEW_PASSPHRASE_ENV_VAR: &str = "LOCKBOX_NEW_PASSPHRASE";

fn from_env(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

fn read_tty(prompt: &str) -> Result<SecretString, LockboxError> {
    eprint!("{prompt}");
    rpassword::read_password()
        .map(SecretString::from)
        .map_err(|e| LockboxError::Internal(format!("failed to read password: {e}")))
}

fn no_source(var: &str) -> LockboxError {
    LockboxError::Internal(format!(
        "no password provided: set {var} or run interactively"
    ))
}

/// Master password from `LOCKBOX_PASSPHRASE`, or an interactive prompt.
pub fn get_passphrase() -> Result<SecretString, LockboxError> {
    if let Some(secret) = from_env(PASSPHRASE_ENV_VAR) {
        return Ok(secret);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_source(PASSPHRASE_ENV_VAR));
    }
    prompt_secret("Master password: ", false)
}

/// Like [`get_passphrase`] but asks twice on a TTY. The environment
/// variable, when set, is taken as already confirmed.
pub fn get_passphrase_with_confirm(prompt: &str) -> Result<SecretString, LockboxError> {
    if let Some(secret) = from_env(PASSPHRASE_ENV_VAR) {
        return Ok(secret);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_source(PASSPHRASE_ENV_VAR));
    }
    prompt_secret(prompt, true)
}

/// The replacement password for a password change, from
/// `LOCKBOX_NEW_PASSPHRASE` or a confirmed prompt.
pub fn get_new_passphrase() -> Result<SecretString, LockboxError> {
    if let Some(secret) = from_env(NEW_PASSPHRASE_ENV_VAR) {
        return Ok(secret);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_source(NEW_PASSPHRASE_ENV_VAR));
    }
    prompt_secret("New master password: ", true)
}

/// TTY prompt that never consults the environment. With `confirm` the
/// secret is asked for twice and both entries must match.
pub fn prompt_secret(prompt: &str, confirm: bool) -> Result<SecretString, LockboxError> {
    let first = read_tty(prompt)?;
    if first.expose_secret().is_empty() {
        return Err(LockboxError::EmptyPassword);
    }
    if confirm {
        let second = read_tty("Confirm: ")?;
        if first.expose_secret() != second.expose_secret() {
            return Err(LockboxError::Internal("passwords do not match".into()));
        }
    }
    Ok(first)
}

/// Reads one secret line (e.g. from piped stdin). The line ending is
/// stripped; an empty line is rejected.
pub fn read_secret_line(mut reader: impl BufRead) -> Result<SecretString, LockboxError> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| LockboxError::Internal(format!("failed to read secret: {e}")))?;
    let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
    zeroize::Zeroize::zeroize(&mut line);
    if trimmed.is_empty() {
        return Err(LockboxError::EmptyPassword);
    }
    Ok(SecretString::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn passphrase_from_env_var() {
        // SAFETY: env mutation is serialized across this crate's tests.
        unsafe { std::env::set_var(PASSPHRASE_ENV_VAR, "Tr0ub4dor&3") };
        let result = get_passphrase();
        unsafe { std::env::remove_var(PASSPHRASE_ENV_VAR) };

        assert_eq!(result.unwrap().expose_secret(), "Tr0ub4dor&3");
    }

    #[test]
    #[serial]
    fn confirm_accepts_env_var() {
        unsafe { std::env::set_var(PASSPHRASE_ENV_VAR, "from-env") };
        let result = get_passphrase_with_confirm("New master password: ");
        unsafe { std::env::remove_var(PASSPHRASE_ENV_VAR) };

        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn new_passphrase_uses_its_own_variable() {
        unsafe {
            std::env::set_var(PASSPHRASE_ENV_VAR, "old");
            std::env::set_var(NEW_PASSPHRASE_ENV_VAR, "new");
        }
        let result = get_new_passphrase();
        unsafe {
            std::env::remove_var(PASSPHRASE_ENV_VAR);
            std::env::remove_var(NEW_PASSPHRASE_ENV_VAR);
        }

        assert_eq!(result.unwrap().expose_secret(), "new");
    }

    #[test]
    #[serial]
    fn empty_env_var_is_ignored() {
        unsafe { std::env::set_var(PASSPHRASE_ENV_VAR, "") };
        // Test stdin is not a terminal, so there is no fallback.
        let result = get_passphrase();
        unsafe { std::env::remove_var(PASSPHRASE_ENV_VAR) };

        assert!(result.is_err());
    }

    #[test]
    fn secret_line_strips_line_ending() {
        let secret = read_secret_line("p@ss word\r\nignored\n".as_bytes()).unwrap();
        assert_eq!(secret.expose_secret(), "p@ss word");
    }

    #[test]
    fn empty_secret_line_is_rejected() {
        let err = read_secret_line("\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LockboxError::EmptyPassword));
    }
}
