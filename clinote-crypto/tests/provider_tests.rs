//! AES-256-GCM provider behavior: import, seal/open, tamper detection.

use clinote_crypto::{
    AesGcmProvider, CryptoError, CryptoProvider, RawKeyBytes, IV_SIZE, KEY_SIZE, TAG_SIZE,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn random_key(provider: &AesGcmProvider) -> <AesGcmProvider as CryptoProvider>::Key {
    let mut bytes = vec![0u8; KEY_SIZE];
    provider.fill_random(&mut bytes).unwrap();
    provider.import_key(RawKeyBytes::new(bytes)).unwrap()
}

// ── Key import ──

#[test]
fn import_accepts_32_byte_key() {
    let provider = AesGcmProvider::new();
    assert!(provider.import_key(RawKeyBytes::new(vec![7u8; KEY_SIZE])).is_ok());
}

#[test]
fn import_rejects_short_key() {
    let provider = AesGcmProvider::new();
    let err = provider.import_key(RawKeyBytes::new(vec![7u8; 16])).unwrap_err();
    assert_eq!(
        err,
        CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: 16
        }
    );
}

#[test]
fn import_rejects_empty_key() {
    let provider = AesGcmProvider::new();
    assert!(matches!(
        provider.import_key(RawKeyBytes::new(Vec::new())),
        Err(CryptoError::InvalidKeyLength { actual: 0, .. })
    ));
}

#[test]
fn imported_key_debug_is_redacted() {
    let provider = AesGcmProvider::new();
    let key = provider.import_key(RawKeyBytes::new(vec![0x5A; KEY_SIZE])).unwrap();
    assert_eq!(format!("{key:?}"), "AesKey([REDACTED])");
}

// ── Seal / open ──

#[test]
fn encrypt_decrypt_roundtrip() {
    let provider = AesGcmProvider::new();
    let key = random_key(&provider);
    let iv = provider.random_iv().unwrap();

    let ciphertext = provider.encrypt(&key, &iv, b"patient reports improved sleep").unwrap();
    assert_eq!(ciphertext.len(), 30 + TAG_SIZE);

    let plaintext = provider.decrypt(&key, &iv, &ciphertext).unwrap();
    assert_eq!(plaintext, b"patient reports improved sleep");
}

#[test]
fn empty_plaintext_still_carries_tag() {
    let provider = AesGcmProvider::new();
    let key = random_key(&provider);
    let iv = provider.random_iv().unwrap();

    let ciphertext = provider.encrypt(&key, &iv, b"").unwrap();
    assert_eq!(ciphertext.len(), TAG_SIZE);
    assert!(provider.decrypt(&key, &iv, &ciphertext).unwrap().is_empty());
}

#[test]
fn random_ivs_differ() {
    let provider = AesGcmProvider::new();
    let a = provider.random_iv().unwrap();
    let b = provider.random_iv().unwrap();
    assert_eq!(a.len(), IV_SIZE);
    assert_ne!(a, b);
}

#[test]
fn wrong_key_fails() {
    let provider = AesGcmProvider::new();
    let key_a = random_key(&provider);
    let key_b = random_key(&provider);
    let iv = provider.random_iv().unwrap();

    let ciphertext = provider.encrypt(&key_a, &iv, b"secret").unwrap();
    assert!(matches!(
        provider.decrypt(&key_b, &iv, &ciphertext),
        Err(CryptoError::Decryption(_))
    ));
}

#[test]
fn truncated_below_tag_fails() {
    let provider = AesGcmProvider::new();
    let key = random_key(&provider);
    let iv = provider.random_iv().unwrap();

    let err = provider.decrypt(&key, &iv, &[0u8; TAG_SIZE - 1]).unwrap_err();
    assert!(matches!(err, CryptoError::Decryption(_)));
}

#[test]
fn every_ciphertext_bit_flip_detected() {
    let provider = AesGcmProvider::new();
    let key = random_key(&provider);
    let iv = provider.random_iv().unwrap();
    let ciphertext = provider.encrypt(&key, &iv, b"integrity").unwrap();

    for byte in 0..ciphertext.len() {
        for bit in 0..8 {
            let mut tampered = ciphertext.clone();
            tampered[byte] ^= 1 << bit;
            assert!(
                provider.decrypt(&key, &iv, &tampered).is_err(),
                "flip at byte {byte} bit {bit} must be rejected"
            );
        }
    }
}

#[test]
fn every_iv_bit_flip_detected() {
    let provider = AesGcmProvider::new();
    let key = random_key(&provider);
    let iv = provider.random_iv().unwrap();
    let ciphertext = provider.encrypt(&key, &iv, b"integrity").unwrap();

    for byte in 0..IV_SIZE {
        for bit in 0..8 {
            let mut tampered = iv;
            tampered[byte] ^= 1 << bit;
            assert!(provider.decrypt(&key, &tampered, &ciphertext).is_err());
        }
    }
}

proptest! {
    #[test]
    fn roundtrip_arbitrary_bytes(plaintext in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let provider = AesGcmProvider::new();
        let key = random_key(&provider);
        let iv = provider.random_iv().unwrap();

        let ciphertext = provider.encrypt(&key, &iv, &plaintext).unwrap();
        prop_assert_eq!(provider.decrypt(&key, &iv, &ciphertext).unwrap(), plaintext);
    }
}
