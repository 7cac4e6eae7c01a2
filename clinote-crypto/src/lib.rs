//! AEAD primitives for clinical note encryption.
//!
//! Everything the session key lifecycle needs from the platform lives behind
//! [`CryptoProvider`]:
//! - CSPRNG bytes for per-message IVs
//! - Import of unwrapped key bytes into a non-exportable key handle
//! - AES-256-GCM seal/open
//!
//! Raw key material only ever exists as [`RawKeyBytes`], which zeroizes on
//! drop and is consumed by [`CryptoProvider::import_key`].

pub mod encoding;
mod error;
mod key;
mod provider;

pub use encoding::{
    canonicalize_base64url, decode_base64, decode_base64url_lenient, encode_base64,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{RawKeyBytes, KEY_SIZE};
pub use provider::{AesGcmProvider, AesKey, CryptoProvider, ALGORITHM, IV_SIZE, TAG_SIZE};
