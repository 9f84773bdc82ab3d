// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operating-system CSPRNG.

use lockbox_core::{LockboxError, RandomSource};
use ring::rand::{SecureRandom, SystemRandom};

/// [`RandomSource`] backed by ring's `SystemRandom` (getrandom on Linux).
#[derive(Debug)]
pub struct SystemRandomSource {
    inner: SystemRandom,
}

impl SystemRandomSource {
    pub fn new() -> Self {
        Self {
            inner: SystemRandom::new(),
        }
    }
}

impl Default for SystemRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandomSource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), LockboxError> {
        self.inner
            .fill(dest)
            .map_err(|_| LockboxError::RandomSource("system random source unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_draws_differ() {
        let rng = SystemRandomSource::new();
        let a: [u8; 24] = lockbox_core::random_array(&rng).unwrap();
        let b: [u8; 24] = lockbox_core::random_array(&rng).unwrap();
        assert_ne!(a, b);
    }
}
