// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value settings persistence.

use async_trait::async_trait;

use crate::error::LockboxError;
use crate::types::Settings;

/// Whatever settings store the environment provides.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    /// Returns the persisted settings, or `None` on first run.
    async fn load_settings(&self) -> Result<Option<Settings>, LockboxError>;

    async fn save_settings(&self, settings: &Settings) -> Result<(), LockboxError>;
}
