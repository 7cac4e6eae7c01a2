//! Key-management service unwrap client.
//!
//! Sends `POST {kms}/keys/{name}/{version}/unwrapkey?api-version=..` with
//! the wrapped DEK. The service answers in base64url, which is
//! canonicalized to standard base64 before decoding.

use crate::config::KeyServiceConfig;
use crate::error::{KeyError, KeyResult};
use crate::token::AccessToken;
use clinote_crypto::{decode_base64url_lenient, encode_base64, RawKeyBytes};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroize;

#[derive(Serialize)]
struct UnwrapRequest<'a> {
    alg: &'a str,
    value: String,
}

#[derive(Deserialize)]
struct UnwrapResponse {
    value: String,
}

/// Executes unwrap operations under the principal's KMS-audience token.
pub struct KeyUnwrapClient {
    client: Client,
    kms_base_url: String,
    api_version: String,
    wrap_algorithm: String,
}

impl KeyUnwrapClient {
    pub fn new(client: Client, config: &KeyServiceConfig) -> Self {
        Self {
            client,
            kms_base_url: config.kms_base_url.trim_end_matches('/').to_string(),
            api_version: config.kms_api_version.clone(),
            wrap_algorithm: config.wrap_algorithm.clone(),
        }
    }

    /// Unwraps `wrapped_key` with key `key_name` at `key_version`.
    ///
    /// 401/403 map to [`KeyError::KmsAuth`] so the caller can reauthorize;
    /// this client never retries on its own.
    pub async fn unwrap(
        &self,
        kms_token: &AccessToken,
        key_name: &str,
        key_version: &str,
        wrapped_key: &[u8],
    ) -> KeyResult<RawKeyBytes> {
        let url = format!(
            "{}/keys/{}/{}/unwrapkey",
            self.kms_base_url, key_name, key_version
        );
        let request = UnwrapRequest {
            alg: &self.wrap_algorithm,
            value: encode_base64(wrapped_key),
        };

        let resp = self
            .client
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(kms_token.secret())
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("unwrap of {key_name}/{key_version} not authorized: {status}");
            return Err(KeyError::KmsAuth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            warn!("unwrap of {key_name}/{key_version} failed: {status}");
            return Err(KeyError::Kms {
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        let mut response: UnwrapResponse = serde_json::from_slice(&body)?;
        let decoded = decode_base64url_lenient(&response.value);
        response.value.zeroize();
        let bytes = decoded
            .map_err(|e| KeyError::Decode(format!("unwrapped key value: {e}")))?;

        debug!("unwrapped {key_name}/{key_version} ({} bytes)", bytes.len());
        Ok(RawKeyBytes::new(bytes))
    }
}
