// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic byte source.
//!
//! Never a CSPRNG. Only useful for asserting how callers react to known
//! bytes (repeated nonces, fixed salts) or to a failing source.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use lockbox_core::{LockboxError, RandomSource};

/// Emits an incrementing byte counter, or a fixed pattern when constructed
/// with [`SequenceRandom::repeating`].
#[derive(Debug)]
pub struct SequenceRandom {
    state: Mutex<SequenceState>,
    fail: AtomicBool,
}

#[derive(Debug)]
enum SequenceState {
    Counter(u8),
    Repeating(u8),
}

impl SequenceRandom {
    /// Counter starting at `start`, wrapping at 255.
    pub fn counter(start: u8) -> Self {
        Self {
            state: Mutex::new(SequenceState::Counter(start)),
            fail: AtomicBool::new(false),
        }
    }

    /// Every byte is `byte`, every call.
    pub fn repeating(byte: u8) -> Self {
        Self {
            state: Mutex::new(SequenceState::Repeating(byte)),
            fail: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `fill` fail.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

impl RandomSource for SequenceRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), LockboxError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LockboxError::RandomSource("injected failure".into()));
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| LockboxError::RandomSource("poisoned".into()))?;
        for byte in dest.iter_mut() {
            match &mut *state {
                SequenceState::Counter(next) => {
                    *byte = *next;
                    *next = next.wrapping_add(1);
                }
                SequenceState::Repeating(b) => *byte = *b,
            }
        }
        Ok(())
    }
}
