// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for key derivation and the authenticated cipher.

use std::collections::HashSet;
use std::sync::Arc;

use lockbox_core::{LockboxError, SystemClock};
use lockbox_test_utils::SequenceRandom;
use lockbox_vault::{
    AuthenticatedCipher, DerivedKey, KdfParams, KeyDerivation, Salt, SystemRandomSource,
};
use proptest::prelude::*;
use secrecy::SecretString;

fn cipher() -> AuthenticatedCipher {
    AuthenticatedCipher::new(Arc::new(SystemRandomSource::new()), Arc::new(SystemClock))
}

fn kdf() -> KeyDerivation {
    KeyDerivation::new(KdfParams::for_tests(), Arc::new(SystemRandomSource::new()))
}

fn key(byte: u8) -> DerivedKey {
    DerivedKey::from_bytes([byte; 32])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn round_trip_returns_plaintext(
        plaintext in proptest::collection::vec(any::<u8>(), 1..512),
        key_byte in any::<u8>(),
        aad in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..32)),
    ) {
        let c = cipher();
        let k = key(key_byte);
        let blob = c.encrypt(&plaintext, &k, aad.as_deref()).unwrap();
        let opened = c.decrypt(&blob, &k, aad.as_deref()).unwrap();
        prop_assert_eq!(opened.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn flipping_any_ciphertext_byte_fails(
        plaintext in proptest::collection::vec(any::<u8>(), 1..128),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let c = cipher();
        let k = key(7);
        let mut blob = c.encrypt(&plaintext, &k, None).unwrap();
        let i = index.index(blob.ciphertext.len());
        blob.ciphertext[i] ^= mask;
        let err = c.decrypt(&blob, &k, None).unwrap_err();
        prop_assert!(matches!(err, LockboxError::DecryptionFailed));
    }

    #[test]
    fn flipping_any_nonce_byte_fails(
        index in 0usize..24,
        mask in 1u8..=255,
    ) {
        let c = cipher();
        let k = key(9);
        let mut blob = c.encrypt(b"nonce tamper", &k, None).unwrap();
        blob.nonce[index] ^= mask;
        let err = c.decrypt(&blob, &k, None).unwrap_err();
        prop_assert!(matches!(err, LockboxError::DecryptionFailed));
    }

    #[test]
    fn altered_associated_data_fails(
        aad in proptest::collection::vec(any::<u8>(), 1..32),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let c = cipher();
        let k = key(3);
        let blob = c.encrypt(b"bound", &k, Some(&aad)).unwrap();
        let mut other = aad.clone();
        let i = index.index(other.len());
        other[i] ^= mask;
        let err = c.decrypt(&blob, &k, Some(&other)).unwrap_err();
        prop_assert!(matches!(err, LockboxError::DecryptionFailed));
        let err = c.decrypt(&blob, &k, None).unwrap_err();
        prop_assert!(matches!(err, LockboxError::DecryptionFailed));
    }

    #[test]
    fn wrong_key_fails(a in any::<u8>(), b in any::<u8>()) {
        prop_assume!(a != b);
        let c = cipher();
        let blob = c.encrypt(b"secret", &key(a), None).unwrap();
        let err = c.decrypt(&blob, &key(b), None).unwrap_err();
        prop_assert!(matches!(err, LockboxError::DecryptionFailed));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn derivation_is_deterministic(password in "[ -~]{1,24}", salt in any::<[u8; 16]>()) {
        let kdf = kdf();
        let password = SecretString::from(password);
        let salt = Salt::from_bytes(salt);
        let (first, _) = kdf.derive_key(&password, Some(salt)).unwrap();
        let (second, used) = kdf.derive_key(&password, Some(salt)).unwrap();
        prop_assert_eq!(used.as_bytes(), salt.as_bytes());
        prop_assert!(first == second);
    }
}

#[test]
fn thousand_encryptions_use_distinct_nonces_and_ciphertexts() {
    let c = cipher();
    let k = key(42);
    let mut nonces = HashSet::new();
    let mut ciphertexts = HashSet::new();
    for _ in 0..1000 {
        let blob = c.encrypt(b"same plaintext", &k, None).unwrap();
        nonces.insert(blob.nonce);
        ciphertexts.insert(blob.ciphertext);
    }
    assert_eq!(nonces.len(), 1000);
    assert_eq!(ciphertexts.len(), 1000);
}

#[test]
fn different_salts_give_different_keys() {
    let kdf = kdf();
    let password = SecretString::from("Tr0ub4dor&3".to_string());
    let (a, salt_a) = kdf.derive_key(&password, None).unwrap();
    let (b, salt_b) = kdf.derive_key(&password, None).unwrap();
    assert_ne!(salt_a.as_bytes(), salt_b.as_bytes());
    assert!(a != b);
}

#[test]
fn failing_random_source_is_never_papered_over() {
    let rng = Arc::new(SequenceRandom::counter(0));
    rng.set_failing(true);
    let c = AuthenticatedCipher::new(rng.clone(), Arc::new(SystemClock));
    let err = c.encrypt(b"data", &key(1), None).unwrap_err();
    assert!(matches!(err, LockboxError::RandomSource(_)));

    let kdf = KeyDerivation::new(KdfParams::for_tests(), rng);
    assert!(matches!(
        kdf.generate_salt().unwrap_err(),
        LockboxError::RandomSource(_)
    ));
}

#[test]
fn structural_problems_are_reported_before_authentication() {
    let c = cipher();
    let k = key(5);
    let blob = c.encrypt(b"structure", &k, None).unwrap();

    let mut short_nonce = blob.clone();
    short_nonce.nonce.truncate(12);
    assert!(matches!(
        c.decrypt(&short_nonce, &k, None).unwrap_err(),
        LockboxError::InvalidEncryptedData(_)
    ));

    let mut future = blob.clone();
    future.version = 2;
    assert!(matches!(
        c.decrypt(&future, &k, None).unwrap_err(),
        LockboxError::InvalidEncryptedData(_)
    ));

    let mut empty = blob;
    empty.ciphertext.clear();
    assert!(matches!(
        c.decrypt(&empty, &k, None).unwrap_err(),
        LockboxError::InvalidEncryptedData(_)
    ));
}
