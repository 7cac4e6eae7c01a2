//! Key service configuration.

use crate::error::{KeyError, KeyResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound callers may put on a whole key load.
pub const MAX_LOAD_TIMEOUT_SECS: u64 = 30;

/// Endpoints, token audiences and timeouts for the session key lifecycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyServiceConfig {
    /// Base URL of the application backend (e.g., "https://api.example-health.app").
    pub api_base_url: String,

    /// Base URL of the key-management service vault.
    pub kms_base_url: String,

    /// Value sent as the `api-version` query parameter on unwrap.
    pub kms_api_version: String,

    /// Token scope for the application API audience.
    pub api_scope: String,

    /// Token scope for the key-management audience.
    pub kms_scope: String,

    /// Algorithm the DEK was originally wrapped with.
    pub wrap_algorithm: String,

    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,

    /// Bound on a whole `load_key` call, in seconds.
    pub load_timeout_secs: u64,
}

impl Default for KeyServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.example-health.app".to_string(),
            kms_base_url: "https://notes-vault.vault.azure.net".to_string(),
            kms_api_version: "7.4".to_string(),
            api_scope: "api://clinical-notes/.default".to_string(),
            kms_scope: "https://vault.azure.net/.default".to_string(),
            wrap_algorithm: "RSA-OAEP-256".to_string(),
            http_timeout_secs: 30,
            load_timeout_secs: 20,
        }
    }
}

impl KeyServiceConfig {
    /// Rejects configurations that could never load a key.
    pub fn validate(&self) -> KeyResult<()> {
        let required = [
            ("api_base_url", &self.api_base_url),
            ("kms_base_url", &self.kms_base_url),
            ("kms_api_version", &self.kms_api_version),
            ("api_scope", &self.api_scope),
            ("kms_scope", &self.kms_scope),
            ("wrap_algorithm", &self.wrap_algorithm),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(KeyError::Config(format!("{name} must not be empty")));
            }
        }

        if self.http_timeout_secs == 0 {
            return Err(KeyError::Config("http_timeout_secs must be positive".to_string()));
        }
        if self.load_timeout_secs == 0 || self.load_timeout_secs > MAX_LOAD_TIMEOUT_SECS {
            return Err(KeyError::Config(format!(
                "load_timeout_secs must be between 1 and {MAX_LOAD_TIMEOUT_SECS}, got {}",
                self.load_timeout_secs
            )));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    /// Builds the HTTP client shared by the fetcher and the unwrap client.
    pub fn http_client(&self) -> KeyResult<Client> {
        Client::builder()
            .timeout(self.http_timeout())
            .build()
            .map_err(|e| KeyError::Config(format!("failed to build HTTP client: {e}")))
    }
}
