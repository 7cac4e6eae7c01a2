//! Note encryption with the loaded session key.
//!
//! No additional authenticated data is bound into the tag, so existing
//! ciphertext stays readable by any holder of the matching key version.

use crate::error::{KeyError, KeyResult};
use crate::session::SessionKeyManager;
use crate::types::{DecryptedResult, EncryptedPayload};
use chrono::Utc;
use clinote_crypto::{
    decode_base64, encode_base64, AesGcmProvider, CryptoProvider, ALGORITHM, IV_SIZE,
};
use std::sync::Arc;
use zeroize::Zeroize;

/// Encrypts and decrypts note text with the key held by a [`SessionKeyManager`].
///
/// Cheap to clone. Safe to use from many tasks at once; both operations
/// are synchronous and fail with [`KeyError::KeyNotLoaded`] unless the
/// manager is ready.
pub struct EnvelopeCipher<C: CryptoProvider = AesGcmProvider> {
    keys: Arc<SessionKeyManager<C>>,
}

impl<C: CryptoProvider> Clone for EnvelopeCipher<C> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<C: CryptoProvider> EnvelopeCipher<C> {
    pub fn new(keys: Arc<SessionKeyManager<C>>) -> Self {
        Self { keys }
    }

    /// Encrypts the UTF-8 bytes of `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> KeyResult<EncryptedPayload> {
        self.keys.with_key(|crypto, key| {
            let iv = crypto.random_iv()?;
            let ciphertext = crypto.encrypt(&key.handle, &iv, plaintext.as_bytes())?;

            Ok(EncryptedPayload {
                ciphertext: encode_base64(&ciphertext),
                iv: encode_base64(&iv),
                algorithm: ALGORITHM.to_string(),
                key_version: key.key_version.clone(),
            })
        })
    }

    /// Decrypts a payload produced under the currently loaded key version.
    ///
    /// A version mismatch is rejected before any decryption is attempted.
    /// Any authentication failure yields [`KeyError::Integrity`] and no content.
    pub fn decrypt(&self, payload: &EncryptedPayload) -> KeyResult<DecryptedResult> {
        self.keys.with_key(|crypto, key| {
            if payload.key_version != key.key_version {
                return Err(KeyError::VersionMismatch {
                    payload: payload.key_version.clone(),
                    loaded: key.key_version.clone(),
                });
            }
            if payload.algorithm != ALGORITHM {
                return Err(KeyError::UnsupportedAlgorithm(payload.algorithm.clone()));
            }

            let iv_bytes = decode_base64(&payload.iv)
                .map_err(|e| KeyError::Integrity(format!("iv: {e}")))?;
            let iv: [u8; IV_SIZE] = iv_bytes.as_slice().try_into().map_err(|_| {
                KeyError::Integrity(format!(
                    "iv must be {IV_SIZE} bytes, got {}",
                    iv_bytes.len()
                ))
            })?;
            let ciphertext = decode_base64(&payload.ciphertext)
                .map_err(|e| KeyError::Integrity(format!("ciphertext: {e}")))?;

            let plaintext = crypto
                .decrypt(&key.handle, &iv, &ciphertext)
                .map_err(|e| KeyError::Integrity(e.to_string()))?;

            let content = String::from_utf8(plaintext).map_err(|e| {
                e.into_bytes().zeroize();
                KeyError::Integrity("decrypted content is not valid UTF-8".to_string())
            })?;

            Ok(DecryptedResult {
                content,
                decrypted_at: Utc::now(),
            })
        })
    }
}
