//! Session key lifecycle for end-to-end encrypted clinical notes.
//!
//! Envelope encryption with a KMS-held wrapping key:
//! - [`WrappedKeyFetcher`] pulls the wrapped DEK record from the backend
//! - [`KeyUnwrapClient`] unwraps it at the key-management service under the
//!   principal's own delegated token
//! - [`SessionKeyManager`] owns the `Unloaded → Loading → Loaded` lifecycle
//!   and keeps the key in memory only
//! - [`EnvelopeCipher`] encrypts and decrypts note text with the loaded key,
//!   binding every payload to the key version that produced it
//!
//! Nothing here falls back to plaintext. Every failure during a load
//! surfaces to the caller, and encrypt/decrypt fail closed once the session
//! is cleared.

pub mod cipher;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod kms;
pub mod session;
pub mod token;
pub mod types;

pub use cipher::EnvelopeCipher;
pub use config::KeyServiceConfig;
pub use error::{KeyError, KeyResult};
pub use fetcher::WrappedKeyFetcher;
pub use kms::KeyUnwrapClient;
pub use session::{SessionGuard, SessionKeyManager};
pub use token::{AccessToken, TokenProvider};
pub use types::*;
