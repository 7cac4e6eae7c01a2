//! Key lifecycle error types.

use clinote_crypto::CryptoError;
use std::time::Duration;
use thiserror::Error;

/// Result type for key lifecycle and envelope operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors from loading, using or clearing the session key.
///
/// "Feature not enabled" is deliberately absent: it is a successful
/// [`LoadOutcome::NotEnabled`](crate::LoadOutcome::NotEnabled).
///
/// `Clone` so that every caller joined onto one in-flight load receives
/// the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("wrapped key fetch failed with status {status}")]
    Fetch { status: u16 },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("key-management service rejected authorization (status {status})")]
    KmsAuth { status: u16 },

    #[error("key-management service error (status {status})")]
    Kms { status: u16 },

    #[error("session key not loaded")]
    KeyNotLoaded,

    #[error("key version mismatch: payload has {payload}, loaded key is {loaded}")]
    VersionMismatch { payload: String, loaded: String },

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("key load timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("session cleared while the key was loading")]
    Cleared,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KeyError {
    /// The user should be prompted to sign in again.
    pub fn is_reauth_required(&self) -> bool {
        matches!(self, KeyError::Auth(_) | KeyError::KmsAuth { .. })
    }

    /// The record can never be decrypted with this session; retrying is pointless.
    pub fn is_record_unrecoverable(&self) -> bool {
        matches!(
            self,
            KeyError::Integrity(_)
                | KeyError::VersionMismatch { .. }
                | KeyError::UnsupportedAlgorithm(_)
        )
    }
}

impl From<reqwest::Error> for KeyError {
    fn from(err: reqwest::Error) -> Self {
        KeyError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for KeyError {
    fn from(err: serde_json::Error) -> Self {
        KeyError::Decode(err.to_string())
    }
}
