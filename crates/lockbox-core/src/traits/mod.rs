// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits for everything the vault core consumes from its environment.
//!
//! Store traits use `#[async_trait]` so they can sit behind `Arc<dyn _>`.

pub mod clock;
pub mod random;
pub mod settings;
pub mod storage;

pub use clock::{Clock, SystemClock};
pub use random::{RandomSource, random_array};
pub use settings::SettingsStore;
pub use storage::PersistentStore;
