//! Backend client for the wrapped key record.

use crate::config::KeyServiceConfig;
use crate::error::{KeyError, KeyResult};
use crate::token::AccessToken;
use crate::types::WrappedKeyRecord;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

/// Backend route serving the principal's wrapped key.
pub const ENCRYPTION_KEY_PATH: &str = "/clinical-notes/encryption-key";

/// Fetches the wrapped DEK record with an API-audience token.
pub struct WrappedKeyFetcher {
    client: Client,
    api_base_url: String,
}

impl WrappedKeyFetcher {
    pub fn new(client: Client, config: &KeyServiceConfig) -> Self {
        Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns `None` when the backend answers 404: encryption is not
    /// enabled for this principal, which is not an error.
    pub async fn fetch(&self, api_token: &AccessToken) -> KeyResult<Option<WrappedKeyRecord>> {
        let url = format!("{}{}", self.api_base_url, ENCRYPTION_KEY_PATH);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(api_token.secret())
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!("no wrapped key on backend, encryption not enabled");
            return Ok(None);
        }
        if !status.is_success() {
            warn!("wrapped key fetch failed: {status}");
            return Err(KeyError::Fetch {
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        let record: WrappedKeyRecord = serde_json::from_slice(&body)?;
        validate_record(&record)?;

        debug!(
            "fetched wrapped key {} version {}",
            record.key_name, record.key_version
        );
        Ok(Some(record))
    }
}

/// Name and version become KMS path segments, so they must be single, non-empty segments.
fn validate_record(record: &WrappedKeyRecord) -> KeyResult<()> {
    if record.wrapped_key.is_empty() {
        return Err(KeyError::Decode("wrappedKey is empty".to_string()));
    }
    for (field, value) in [
        ("keyName", &record.key_name),
        ("keyVersion", &record.key_version),
    ] {
        if value.is_empty()
            || value == "."
            || value == ".."
            || value.contains(['/', '\\', '?', '#', '%'])
        {
            return Err(KeyError::Decode(format!(
                "{field} is not a valid path segment: {value:?}"
            )));
        }
    }
    Ok(())
}
