// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! The SQL files under `migrations/` are compiled in with refinery's
//! `embed_migrations!` and applied every time a database is opened.

use lockbox_core::LockboxError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies every pending migration. Applied versions are tracked in
/// `refinery_schema_history`, so re-running is a no-op.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), LockboxError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(LockboxError::storage)?;
    Ok(())
}
