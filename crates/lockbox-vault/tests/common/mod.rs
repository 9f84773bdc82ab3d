// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixture: an isolated vault over an in-memory store and a manual
//! clock, with cheap KDF parameters.

#![allow(dead_code)]

use std::sync::Arc;

use lockbox_core::Clock;
use lockbox_test_utils::{ManualClock, MemoryStore};
use lockbox_vault::{KdfParams, Vault};
use secrecy::SecretString;

pub const PASSWORD: &str = "Tr0ub4dor&3";

pub struct TestVault {
    pub vault: Vault,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl TestVault {
    /// A fresh vault that has not been unlocked yet.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let vault = Vault::builder(store.clone(), store.clone())
            .clock(clock.clone())
            .kdf_params(KdfParams::for_tests())
            .build();
        Self {
            vault,
            store,
            clock,
        }
    }

    /// A vault already unlocked with [`PASSWORD`].
    pub async fn unlocked() -> Self {
        let harness = Self::new();
        harness.vault.unlock(&secret(PASSWORD)).await.unwrap();
        harness
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// A second vault over the same store and clock, as after a restart.
    pub fn reopen(&self) -> Vault {
        Vault::builder(self.store.clone(), self.store.clone())
            .clock(self.clock.clone())
            .kdf_params(KdfParams::for_tests())
            .build()
    }
}

pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}
