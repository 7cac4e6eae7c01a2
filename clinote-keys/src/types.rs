//! Wire and lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapped DEK record served by the backend encryption-key endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKeyRecord {
    #[serde(with = "base64_bytes")]
    pub wrapped_key: Vec<u8>,
    pub key_name: String,
    pub key_version: String,
}

impl std::fmt::Debug for WrappedKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappedKeyRecord")
            .field("wrapped_key", &format_args!("[{} bytes]", self.wrapped_key.len()))
            .field("key_name", &self.key_name)
            .field("key_version", &self.key_version)
            .finish()
    }
}

/// Encrypted note as stored and transmitted. Binary fields are standard base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    pub ciphertext: String,
    pub iv: String,
    pub algorithm: String,
    pub key_version: String,
}

/// Plaintext handed back by a successful decrypt. Never cached.
pub struct DecryptedResult {
    pub content: String,
    pub decrypted_at: DateTime<Utc>,
}

impl std::fmt::Debug for DecryptedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedResult")
            .field("content", &format_args!("[{} bytes]", self.content.len()))
            .field("decrypted_at", &self.decrypted_at)
            .finish()
    }
}

/// Successful result of `load_key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A key is loaded and ready.
    Loaded { key_version: String },
    /// The backend has no key for this principal; encryption is off.
    NotEnabled,
}

/// Session key lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    Unloaded,
    Loading,
    Loaded,
}

/// Point-in-time view of a manager for status displays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatus {
    pub state: KeyState,
    pub key_version: Option<String>,
}

mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&clinote_crypto::encode_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        clinote_crypto::decode_base64(&encoded).map_err(serde::de::Error::custom)
    }
}
