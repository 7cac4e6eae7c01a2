//! The platform crypto seam and its AES-256-GCM implementation.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{RawKeyBytes, KEY_SIZE};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::TryRngCore;
use rand::rngs::OsRng;

/// Algorithm tag carried by every payload this crate produces.
pub const ALGORITHM: &str = "AES-256-GCM";

/// AES-GCM IV size in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Random bytes, key import and AEAD seal/open.
///
/// `Key` is an opaque handle. Implementations must not offer a way to read
/// the imported material back out of it.
pub trait CryptoProvider: Send + Sync + 'static {
    type Key: Send + Sync + 'static;

    /// Fills `buf` from a cryptographically secure source.
    fn fill_random(&self, buf: &mut [u8]) -> CryptoResult<()>;

    /// Imports raw bytes as a non-exportable 256-bit AEAD key.
    /// `raw` is consumed and wiped.
    fn import_key(&self, raw: RawKeyBytes) -> CryptoResult<Self::Key>;

    /// Seals `plaintext`. The returned ciphertext carries the tag.
    fn encrypt(
        &self,
        key: &Self::Key,
        iv: &[u8; IV_SIZE],
        plaintext: &[u8],
    ) -> CryptoResult<Vec<u8>>;

    /// Opens `ciphertext`. Fails without returning any bytes if the tag does not verify.
    fn decrypt(
        &self,
        key: &Self::Key,
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
    ) -> CryptoResult<Vec<u8>>;

    /// Generates a fresh IV.
    fn random_iv(&self) -> CryptoResult<[u8; IV_SIZE]> {
        let mut iv = [0u8; IV_SIZE];
        self.fill_random(&mut iv)?;
        Ok(iv)
    }
}

/// Imported AES-256-GCM key. The key schedule is wiped on drop.
pub struct AesKey {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AesKey([REDACTED])")
    }
}

/// [`CryptoProvider`] backed by RustCrypto `aes-gcm` and the OS RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmProvider;

impl AesGcmProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for AesGcmProvider {
    type Key = AesKey;

    fn fill_random(&self, buf: &mut [u8]) -> CryptoResult<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| CryptoError::Random(e.to_string()))
    }

    fn import_key(&self, raw: RawKeyBytes) -> CryptoResult<AesKey> {
        if raw.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: raw.len(),
            });
        }

        let cipher = Aes256Gcm::new_from_slice(raw.expose_secret()).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: raw.len(),
            }
        })?;

        Ok(AesKey { cipher })
    }

    fn encrypt(&self, key: &AesKey, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        key.cipher
            .encrypt(Nonce::from_slice(iv.as_slice()), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    fn decrypt(&self, key: &AesKey, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.len() < TAG_SIZE {
            return Err(CryptoError::Decryption(format!(
                "ciphertext shorter than the {TAG_SIZE}-byte tag"
            )));
        }

        key.cipher
            .decrypt(Nonce::from_slice(iv.as_slice()), ciphertext)
            .map_err(|_| CryptoError::Decryption("wrong key or tampered data".to_string()))
    }
}
