//! Shared helpers: mock backend/KMS servers and a scripted token provider.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use clinote_keys::{
    AccessToken, KeyError, KeyResult, KeyServiceConfig, LoadOutcome, SessionKeyManager,
    TokenProvider,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_SCOPE: &str = "api-scope";
pub const KMS_SCOPE: &str = "kms-scope";
pub const WRAPPED_KEY_B64: &str = "QmFzZTY0V3JhcHBlZA==";
pub const KEY_NAME: &str = "notes-key";
pub const KEY_VERSION: &str = "v3";

/// 0xFB bytes encode to `-` and `_` in base64url, so every unwrap
/// response exercises canonicalization.
pub const FIXED_KEY: [u8; 32] = [0xFB; 32];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn test_config(api: &MockServer, kms: &MockServer) -> KeyServiceConfig {
    KeyServiceConfig {
        api_base_url: api.uri(),
        kms_base_url: kms.uri(),
        kms_api_version: "7.4".into(),
        api_scope: API_SCOPE.into(),
        kms_scope: KMS_SCOPE.into(),
        wrap_algorithm: "RSA-OAEP-256".into(),
        http_timeout_secs: 5,
        load_timeout_secs: 10,
    }
}

pub fn unwrap_path() -> String {
    format!("/keys/{KEY_NAME}/{KEY_VERSION}/unwrapkey")
}

pub fn wrapped_key_body() -> serde_json::Value {
    serde_json::json!({
        "wrappedKey": WRAPPED_KEY_B64,
        "keyName": KEY_NAME,
        "keyVersion": KEY_VERSION,
    })
}

/// What the KMS returns for [`FIXED_KEY`]: unpadded base64url.
pub fn unwrapped_body() -> serde_json::Value {
    serde_json::json!({
        "kid": format!("https://vault.test/keys/{KEY_NAME}/{KEY_VERSION}"),
        "value": URL_SAFE_NO_PAD.encode(FIXED_KEY),
    })
}

pub async fn mount_wrapped_key(api: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/clinical-notes/encryption-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wrapped_key_body()))
        .mount(api)
        .await;
}

pub async fn mount_unwrap(kms: &MockServer) {
    Mock::given(method("POST"))
        .and(path(unwrap_path()))
        .and(query_param("api-version", "7.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(unwrapped_body()))
        .mount(kms)
        .await;
}

/// Starts both servers with the happy-path routes mounted.
pub async fn happy_servers() -> (MockServer, MockServer) {
    let api = MockServer::start().await;
    let kms = MockServer::start().await;
    mount_wrapped_key(&api).await;
    mount_unwrap(&kms).await;
    (api, kms)
}

pub fn manager(
    api: &MockServer,
    kms: &MockServer,
    tokens: Arc<ScriptedTokenProvider>,
) -> Arc<SessionKeyManager> {
    Arc::new(SessionKeyManager::new(test_config(api, kms), tokens).unwrap())
}

/// A manager that has already loaded [`FIXED_KEY`] at [`KEY_VERSION`].
/// The servers are returned so they outlive the test body.
pub async fn loaded_manager() -> (MockServer, MockServer, Arc<SessionKeyManager>) {
    init_tracing();
    let (api, kms) = happy_servers().await;
    let keys = manager(&api, &kms, ScriptedTokenProvider::new());
    assert_eq!(
        keys.load_key().await.unwrap(),
        LoadOutcome::Loaded {
            key_version: KEY_VERSION.into()
        }
    );
    (api, kms, keys)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquire {
    Silent,
    Interactive,
}

/// Token provider that records every request.
///
/// Silent tokens look like `silent-{scope}`, interactive ones like
/// `interactive-{scope}`.
pub struct ScriptedTokenProvider {
    silent_fails: bool,
    interactive_fails: bool,
    calls: Mutex<Vec<(Acquire, String)>>,
}

impl ScriptedTokenProvider {
    pub fn new() -> Arc<Self> {
        Self::build(false, false)
    }

    pub fn silent_unavailable() -> Arc<Self> {
        Self::build(true, false)
    }

    pub fn signed_out() -> Arc<Self> {
        Self::build(true, true)
    }

    fn build(silent_fails: bool, interactive_fails: bool) -> Arc<Self> {
        Arc::new(Self {
            silent_fails,
            interactive_fails,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(Acquire, String)> {
        self.calls.lock().clone()
    }

    pub fn count(&self, kind: Acquire, scope: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(k, s)| *k == kind && s == scope)
            .count()
    }
}

#[async_trait]
impl TokenProvider for ScriptedTokenProvider {
    async fn acquire_silent(&self, scope: &str) -> KeyResult<AccessToken> {
        self.calls.lock().push((Acquire::Silent, scope.to_string()));
        if self.silent_fails {
            return Err(KeyError::Auth("no cached account".into()));
        }
        Ok(AccessToken::new(format!("silent-{scope}")))
    }

    async fn acquire_interactive(&self, scope: &str) -> KeyResult<AccessToken> {
        self.calls
            .lock()
            .push((Acquire::Interactive, scope.to_string()));
        if self.interactive_fails {
            return Err(KeyError::Auth("user cancelled sign-in".into()));
        }
        Ok(AccessToken::new(format!("interactive-{scope}")))
    }
}

pub fn slow(template: ResponseTemplate, delay_ms: u64) -> ResponseTemplate {
    template.set_delay(Duration::from_millis(delay_ms))
}
