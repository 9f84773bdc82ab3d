// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source of cryptographically secure random bytes.

use crate::error::LockboxError;

/// A CSPRNG. Implementations must fail rather than fall back to a weaker
/// generator.
pub trait RandomSource: Send + Sync + 'static {
    /// Fills `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), LockboxError>;
}

/// Draws a fixed-size array from `rng`.
pub fn random_array<const N: usize>(rng: &dyn RandomSource) -> Result<[u8; N], LockboxError> {
    let mut out = [0u8; N];
    rng.fill(&mut out)?;
    Ok(out)
}
