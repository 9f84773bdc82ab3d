// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! XChaCha20-Poly1305 seal/open for vault payloads.
//!
//! Every [`AuthenticatedCipher::encrypt`] call draws a fresh 192-bit nonce
//! from the random source. Nonces are never derived from content, counters
//! or time. Every authentication failure (wrong key, modified ciphertext or
//! nonce, wrong or missing associated data) surfaces as the single
//! [`LockboxError::DecryptionFailed`].

use std::sync::Arc;

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use lockbox_core::types::EncryptedBlob;
use lockbox_core::{Clock, LockboxError, RandomSource, random_array};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use zeroize::Zeroizing;

use crate::kdf::DerivedKey;

/// XChaCha20 nonce length.
pub const NONCE_LEN: usize = 24;

/// Poly1305 tag length appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Scheme version written into every new blob.
pub const CIPHER_VERSION: u32 = 1;

/// AEAD over the vault's derived key.
#[derive(Clone)]
pub struct AuthenticatedCipher {
    rng: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl AuthenticatedCipher {
    pub fn new(rng: Arc<dyn RandomSource>, clock: Arc<dyn Clock>) -> Self {
        Self { rng, clock }
    }

    /// Encrypts `plaintext` under `key`, binding `aad` if given.
    pub fn encrypt(
        &self,
        plaintext: impl AsRef<[u8]>,
        key: &DerivedKey,
        aad: Option<&[u8]>,
    ) -> Result<EncryptedBlob, LockboxError> {
        let plaintext = plaintext.as_ref();
        if plaintext.is_empty() {
            return Err(LockboxError::EmptyPlaintext);
        }

        let nonce: [u8; NONCE_LEN] = random_array(self.rng.as_ref())?;
        let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
            .map_err(|_| LockboxError::Internal("cipher key length mismatch".into()))?;
        let ciphertext = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: aad.unwrap_or_default(),
                },
            )
            .map_err(|_| LockboxError::Internal("encryption failed".into()))?;

        Ok(EncryptedBlob {
            ciphertext,
            nonce: nonce.to_vec(),
            created_at_ms: self.clock.now_millis(),
            version: CIPHER_VERSION,
        })
    }

    /// Verifies and decrypts `blob`. No plaintext is returned unless the
    /// tag verifies.
    ///
    /// Structural problems (missing fields, nonce length, unknown version)
    /// fail with `InvalidEncryptedData` before the key is used.
    pub fn decrypt(
        &self,
        blob: &EncryptedBlob,
        key: &DerivedKey,
        aad: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, LockboxError> {
        if blob.ciphertext.is_empty() {
            return Err(LockboxError::InvalidEncryptedData("missing ciphertext"));
        }
        if blob.nonce.is_empty() {
            return Err(LockboxError::InvalidEncryptedData("missing nonce"));
        }
        match blob.version {
            1 => open_v1(blob, key, aad.unwrap_or_default()),
            _ => Err(LockboxError::InvalidEncryptedData("unsupported cipher version")),
        }
    }

    /// Serializes `value` to JSON and encrypts it. The serialized bytes are
    /// zeroed once sealed.
    pub fn encrypt_record<T: Serialize>(
        &self,
        value: &T,
        key: &DerivedKey,
        aad: Option<&[u8]>,
    ) -> Result<EncryptedBlob, LockboxError> {
        let bytes = Zeroizing::new(
            serde_json::to_vec(value)
                .map_err(|_| LockboxError::Internal("payload serialization failed".into()))?,
        );
        self.encrypt(bytes.as_slice(), key, aad)
    }

    /// Decrypts `blob` and parses the plaintext as `T`.
    pub fn decrypt_record<T: DeserializeOwned>(
        &self,
        blob: &EncryptedBlob,
        key: &DerivedKey,
        aad: Option<&[u8]>,
    ) -> Result<T, LockboxError> {
        let plaintext = self.decrypt(blob, key, aad)?;
        serde_json::from_slice(&plaintext).map_err(|_| {
            debug!("authenticated payload did not parse");
            LockboxError::MalformedPayload
        })
    }
}

impl std::fmt::Debug for AuthenticatedCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedCipher")
            .field("scheme", &"xchacha20poly1305")
            .field("version", &CIPHER_VERSION)
            .finish()
    }
}

fn open_v1(
    blob: &EncryptedBlob,
    key: &DerivedKey,
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, LockboxError> {
    if blob.nonce.len() != NONCE_LEN {
        return Err(LockboxError::InvalidEncryptedData("nonce length mismatch"));
    }
    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|_| LockboxError::Internal("cipher key length mismatch".into()))?;
    cipher
        .decrypt(
            XNonce::from_slice(&blob.nonce),
            Payload {
                msg: &blob.ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| LockboxError::DecryptionFailed)
}
