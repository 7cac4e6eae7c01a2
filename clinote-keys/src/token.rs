//! Identity collaborator seam.
//!
//! The core never talks to an identity provider directly. It asks a
//! [`TokenProvider`] for bearer tokens for two audiences: the application
//! API and the key-management service.

use crate::error::KeyResult;
use async_trait::async_trait;
use zeroize::Zeroize;

/// Bearer credential for one audience. Wiped on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl Drop for AccessToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken([REDACTED])")
    }
}

/// Supplies tokens for the current principal.
///
/// Failures should be reported as [`KeyError::Auth`](crate::KeyError::Auth).
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a cached or silently refreshed token. No user interaction.
    async fn acquire_silent(&self, scope: &str) -> KeyResult<AccessToken>;

    /// Acquires a fresh token, prompting the user if needed.
    async fn acquire_interactive(&self, scope: &str) -> KeyResult<AccessToken>;
}
