// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from the master password.
//!
//! Derives a 32-byte key with Argon2id (Version::V0x13). Cost parameters
//! are clamped up to fixed floors: 64 MiB of memory, 3 passes, 1 lane.
//! Only test builds can go below them, through [`KdfParams::for_tests`].

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lockbox_config::model::{self, VaultConfig};
use lockbox_core::{KdfSettings, LockboxError, RandomSource, random_array};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;

/// Memory cost floor in KiB (64 MiB).
pub const MIN_MEMORY_COST_KIB: u32 = model::MIN_KDF_MEMORY_COST;

/// Iteration floor.
pub const MIN_ITERATIONS: u32 = model::MIN_KDF_ITERATIONS;

/// Lane count. Fixed.
pub const PARALLELISM: u32 = 1;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    memory_cost: u32,
    iterations: u32,
    parallelism: u32,
}

impl KdfParams {
    /// Clamps both costs up to their floors.
    pub fn new(memory_cost: u32, iterations: u32) -> Self {
        Self {
            memory_cost: memory_cost.max(MIN_MEMORY_COST_KIB),
            iterations: iterations.max(MIN_ITERATIONS),
            parallelism: PARALLELISM,
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.kdf_memory_cost, config.kdf_iterations)
    }

    /// Parameters recorded in vault metadata. Clamped like [`KdfParams::new`].
    pub fn from_settings(settings: KdfSettings) -> Self {
        Self::new(settings.memory_cost, settings.iterations)
    }

    /// Minimal cost parameters for unit and integration tests.
    #[cfg(any(test, feature = "test-kdf"))]
    pub fn for_tests() -> Self {
        Self {
            memory_cost: 8,
            iterations: 1,
            parallelism: PARALLELISM,
        }
    }

    pub fn memory_cost(&self) -> u32 {
        self.memory_cost
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn settings(&self) -> KdfSettings {
        KdfSettings {
            memory_cost: self.memory_cost,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(MIN_MEMORY_COST_KIB, MIN_ITERATIONS)
    }
}

/// A 32-byte symmetric key. Zeroed on drop and on [`DerivedKey::clear`].
///
/// Equality is constant-time. `Debug` never prints key bytes.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Overwrites the key with zeros. Safe to call repeatedly.
    pub fn clear(&mut self) {
        self.0.zeroize();
    }

    pub fn is_cleared(&self) -> bool {
        bool::from(self.0[..].ct_eq(&[0u8; KEY_LEN][..]))
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.0[..].ct_eq(&other.0[..]))
    }
}

impl Eq for DerivedKey {}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// A per-vault KDF salt. Not secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, LockboxError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| LockboxError::KeyDerivation("salt is not valid base64".into()))?;
        let bytes: [u8; SALT_LEN] = bytes
            .try_into()
            .map_err(|_| LockboxError::KeyDerivation(format!("salt must be {SALT_LEN} bytes")))?;
        Ok(Self(bytes))
    }
}

/// Password-to-key derivation bound to a random source for salts.
#[derive(Clone)]
pub struct KeyDerivation {
    params: KdfParams,
    rng: Arc<dyn RandomSource>,
}

impl KeyDerivation {
    pub fn new(params: KdfParams, rng: Arc<dyn RandomSource>) -> Self {
        Self { params, rng }
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Draws a fresh salt from the random source.
    pub fn generate_salt(&self) -> Result<Salt, LockboxError> {
        random_array::<SALT_LEN>(self.rng.as_ref()).map(Salt)
    }

    /// Derives the key for `password`. Without a salt a fresh one is drawn
    /// first; the salt used is always returned alongside the key.
    pub fn derive_key(
        &self,
        password: &SecretString,
        salt: Option<Salt>,
    ) -> Result<(DerivedKey, Salt), LockboxError> {
        if password.expose_secret().is_empty() {
            return Err(LockboxError::EmptyPassword);
        }
        let salt = match salt {
            Some(salt) => salt,
            None => self.generate_salt()?,
        };
        let key = derive_with(self.params, password, &salt)?;
        Ok((key, salt))
    }

    /// Like [`KeyDerivation::derive_key`] with explicit cost parameters.
    pub fn derive_key_with(
        &self,
        params: KdfParams,
        password: &SecretString,
        salt: &Salt,
    ) -> Result<DerivedKey, LockboxError> {
        if password.expose_secret().is_empty() {
            return Err(LockboxError::EmptyPassword);
        }
        derive_with(params, password, salt)
    }

    /// Runs [`KeyDerivation::derive_key_with`] on the blocking thread pool.
    pub async fn derive_key_blocking(
        &self,
        params: KdfParams,
        password: &SecretString,
        salt: Salt,
    ) -> Result<DerivedKey, LockboxError> {
        let this = self.clone();
        let password = SecretString::from(password.expose_secret().to_owned());
        tokio::task::spawn_blocking(move || this.derive_key_with(params, &password, &salt))
            .await
            .map_err(|e| LockboxError::Internal(format!("key derivation task failed: {e}")))?
    }

    /// Re-derives from `password` and `salt` (base64) and compares with
    /// `expected` in constant time. Every failure reads as `false`.
    pub fn verify_password(
        &self,
        password: &SecretString,
        salt: &str,
        expected: &DerivedKey,
    ) -> bool {
        let Ok(salt) = Salt::from_base64(salt) else {
            return false;
        };
        match self.derive_key(password, Some(salt)) {
            Ok((key, _)) => key == *expected,
            Err(_) => false,
        }
    }

    /// Zeroes `key` in place. Idempotent.
    pub fn clear_key(key: &mut DerivedKey) {
        key.clear();
    }
}

impl std::fmt::Debug for KeyDerivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDerivation")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn derive_with(
    params: KdfParams,
    password: &SecretString,
    salt: &Salt,
) -> Result<DerivedKey, LockboxError> {
    let argon_params = argon2::Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| LockboxError::KeyDerivation(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 =
        argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, argon_params);

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(
            password.expose_secret().as_bytes(),
            salt.as_bytes(),
            output.as_mut(),
        )
        .map_err(|e| LockboxError::KeyDerivation(format!("Argon2id failed: {e}")))?;

    debug!(
        memory_cost = params.memory_cost,
        iterations = params.iterations,
        "derived vault key"
    );
    Ok(DerivedKey(output))
}
