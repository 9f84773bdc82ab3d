// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for lockbox integration tests.
//!
//! Provides in-memory stand-ins for every external boundary of the vault so
//! tests can build isolated vaults without touching disk or the real clock.
//!
//! # Components
//!
//! - [`MemoryStore`] - In-memory `PersistentStore` + `SettingsStore` with write-failure injection
//! - [`RewriteGate`] - Holds a `MemoryStore` vault rewrite open mid-call
//! - [`ManualClock`] - Settable, advanceable clock
//! - [`SequenceRandom`] - Deterministic byte source

pub mod clock;
pub mod memory_store;
pub mod random;

pub use clock::ManualClock;
pub use memory_store::{MemoryStore, RewriteGate};
pub use random::SequenceRandom;
