// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the lockbox vault.
//!
//! WAL-mode SQLite with embedded refinery migrations and a single writer
//! thread via `tokio-rusqlite`. Credential payloads arrive already
//! encrypted; this crate never sees a key or plaintext.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
