//! Session key lifecycle.
//!
//! `Unloaded → Loading → Loaded`, back to `Unloaded` on any load failure
//! or on [`SessionKeyManager::clear`]. There is no terminal state; a
//! cleared session may load again.
//!
//! The key slot sits behind a synchronous lock with one writer path
//! (`load_key` commit and `clear`) and many readers (encrypt/decrypt).
//! Loads are serialized by an async mutex. A generation counter lets a
//! caller that waited on the mutex pick up the outcome of the load that
//! ran meanwhile instead of starting a second one.

use crate::config::KeyServiceConfig;
use crate::error::{KeyError, KeyResult};
use crate::fetcher::WrappedKeyFetcher;
use crate::kms::KeyUnwrapClient;
use crate::token::{AccessToken, TokenProvider};
use crate::types::{KeyState, KeyStatus, LoadOutcome};
use clinote_crypto::{AesGcmProvider, CryptoProvider};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Imported key handle plus the version it was unwrapped at.
pub(crate) struct SessionKey<K> {
    pub(crate) handle: K,
    pub(crate) key_version: String,
}

struct KeySlot<K> {
    state: KeyState,
    key: Option<SessionKey<K>>,
    /// Bumped by every `clear`. A load whose epoch is stale is discarded.
    epoch: u64,
    /// Bumped every time a load finishes, successfully or not.
    load_generation: u64,
    /// Outcome of the most recent load and the epoch it started in.
    /// Only callers from that same epoch may join it.
    last_outcome: Option<(u64, KeyResult<LoadOutcome>)>,
}

/// Owns the in-memory session key for one authenticated principal.
///
/// The principal is whoever the [`TokenProvider`] acquires tokens for.
/// Construct one manager per authenticated context and share it by `Arc`.
pub struct SessionKeyManager<C: CryptoProvider = AesGcmProvider> {
    config: KeyServiceConfig,
    fetcher: WrappedKeyFetcher,
    kms: KeyUnwrapClient,
    tokens: Arc<dyn TokenProvider>,
    crypto: C,
    slot: RwLock<KeySlot<C::Key>>,
    load_lock: tokio::sync::Mutex<()>,
}

impl SessionKeyManager<AesGcmProvider> {
    pub fn new(config: KeyServiceConfig, tokens: Arc<dyn TokenProvider>) -> KeyResult<Self> {
        Self::with_crypto(config, tokens, AesGcmProvider::new())
    }
}

impl<C: CryptoProvider> SessionKeyManager<C> {
    pub fn with_crypto(
        config: KeyServiceConfig,
        tokens: Arc<dyn TokenProvider>,
        crypto: C,
    ) -> KeyResult<Self> {
        config.validate()?;
        let client = config.http_client()?;

        Ok(Self {
            fetcher: WrappedKeyFetcher::new(client.clone(), &config),
            kms: KeyUnwrapClient::new(client, &config),
            config,
            tokens,
            crypto,
            slot: RwLock::new(KeySlot {
                state: KeyState::Unloaded,
                key: None,
                epoch: 0,
                load_generation: 0,
                last_outcome: None,
            }),
            load_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &KeyServiceConfig {
        &self.config
    }

    /// Loads the session key: fetch the wrapped record, unwrap it at the
    /// KMS, import it.
    ///
    /// Concurrent callers share one load. An already loaded key is
    /// returned without network traffic; call [`clear`](Self::clear) first
    /// to force a reload. The whole operation is bounded by
    /// `load_timeout_secs`.
    pub async fn load_key(&self) -> KeyResult<LoadOutcome> {
        let (pre_gen, caller_epoch) = {
            let slot = self.slot.read();
            if let Some(key) = &slot.key {
                return Ok(LoadOutcome::Loaded {
                    key_version: key.key_version.clone(),
                });
            }
            (slot.load_generation, slot.epoch)
        };

        let _flight = self.load_lock.lock().await;

        let epoch = {
            let mut slot = self.slot.write();
            if slot.epoch != caller_epoch {
                debug!("session cleared while waiting to load");
                return Err(KeyError::Cleared);
            }
            if slot.load_generation > pre_gen {
                if let Some((outcome_epoch, outcome)) = &slot.last_outcome {
                    if *outcome_epoch == caller_epoch {
                        debug!("joined key load completed by another caller");
                        return outcome.clone();
                    }
                }
            }
            if let Some(key) = &slot.key {
                return Ok(LoadOutcome::Loaded {
                    key_version: key.key_version.clone(),
                });
            }
            slot.state = KeyState::Loading;
            slot.epoch
        };

        // Puts the slot back to Unloaded if this future is dropped mid-load.
        let mut reset = LoadingReset {
            slot: &self.slot,
            armed: true,
        };

        let timeout = self.config.load_timeout();
        let result = match tokio::time::timeout(timeout, self.run_load()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("key load timed out after {timeout:?}");
                Err(KeyError::Timeout(timeout))
            }
        };

        let outcome = self.commit(epoch, result);
        reset.armed = false;
        outcome
    }

    async fn run_load(&self) -> KeyResult<Option<SessionKey<C::Key>>> {
        let api_token = self.acquire_token(&self.config.api_scope).await?;
        let Some(record) = self.fetcher.fetch(&api_token).await? else {
            info!("clinical note encryption not enabled for this principal");
            return Ok(None);
        };

        let kms_token = self.acquire_token(&self.config.kms_scope).await?;
        let unwrapped = self
            .kms
            .unwrap(
                &kms_token,
                &record.key_name,
                &record.key_version,
                &record.wrapped_key,
            )
            .await;

        let raw = match unwrapped {
            Err(KeyError::KmsAuth { status }) => {
                info!("KMS rejected token ({status}), reauthorizing interactively");
                let fresh = self
                    .tokens
                    .acquire_interactive(&self.config.kms_scope)
                    .await?;
                self.kms
                    .unwrap(
                        &fresh,
                        &record.key_name,
                        &record.key_version,
                        &record.wrapped_key,
                    )
                    .await?
            }
            other => other?,
        };

        let handle = self.crypto.import_key(raw)?;
        Ok(Some(SessionKey {
            handle,
            key_version: record.key_version,
        }))
    }

    /// Silent first, then one interactive attempt.
    async fn acquire_token(&self, scope: &str) -> KeyResult<AccessToken> {
        match self.tokens.acquire_silent(scope).await {
            Ok(token) => Ok(token),
            Err(e) => {
                debug!("silent token for {scope} unavailable ({e}), trying interactive");
                self.tokens.acquire_interactive(scope).await
            }
        }
    }

    fn commit(
        &self,
        epoch: u64,
        result: KeyResult<Option<SessionKey<C::Key>>>,
    ) -> KeyResult<LoadOutcome> {
        let mut slot = self.slot.write();

        let outcome = if slot.epoch != epoch {
            // cleared while loading: whatever was unwrapped is dropped here
            warn!("session cleared during key load, discarding result");
            slot.state = KeyState::Unloaded;
            Err(KeyError::Cleared)
        } else {
            match result {
                Ok(Some(key)) => {
                    let key_version = key.key_version.clone();
                    slot.key = Some(key);
                    slot.state = KeyState::Loaded;
                    info!("session key loaded, version {key_version}");
                    Ok(LoadOutcome::Loaded { key_version })
                }
                Ok(None) => {
                    slot.state = KeyState::Unloaded;
                    Ok(LoadOutcome::NotEnabled)
                }
                Err(e) => {
                    slot.key = None;
                    slot.state = KeyState::Unloaded;
                    warn!("session key load failed: {e}");
                    Err(e)
                }
            }
        };

        slot.load_generation += 1;
        slot.last_outcome = Some((epoch, outcome.clone()));
        outcome
    }

    /// True iff a key is loaded.
    pub fn is_ready(&self) -> bool {
        self.slot.read().state == KeyState::Loaded
    }

    pub fn state(&self) -> KeyState {
        self.slot.read().state
    }

    /// Version of the loaded key, if any.
    pub fn key_version(&self) -> Option<String> {
        self.slot
            .read()
            .key
            .as_ref()
            .map(|key| key.key_version.clone())
    }

    pub fn status(&self) -> KeyStatus {
        let slot = self.slot.read();
        KeyStatus {
            state: slot.state,
            key_version: slot.key.as_ref().map(|key| key.key_version.clone()),
        }
    }

    /// Drops the key and returns to `Unloaded`. Idempotent.
    ///
    /// Waits for in-flight encrypt/decrypt calls to release the key, so
    /// any operation issued after `clear` returns fails with
    /// [`KeyError::KeyNotLoaded`]. A load in progress, and any call queued
    /// behind it, is invalidated and ends with [`KeyError::Cleared`].
    pub fn clear(&self) {
        let mut slot = self.slot.write();
        let had_key = slot.key.take().is_some();
        slot.state = KeyState::Unloaded;
        slot.epoch += 1;
        slot.last_outcome = None;
        if had_key {
            info!("session key cleared");
        }
    }

    /// Runs `f` with the loaded key while holding the read lock.
    pub(crate) fn with_key<R>(
        &self,
        f: impl FnOnce(&C, &SessionKey<C::Key>) -> KeyResult<R>,
    ) -> KeyResult<R> {
        let slot = self.slot.read();
        let key = slot.key.as_ref().ok_or(KeyError::KeyNotLoaded)?;
        f(&self.crypto, key)
    }
}

struct LoadingReset<'a, K> {
    slot: &'a RwLock<KeySlot<K>>,
    armed: bool,
}

impl<K> Drop for LoadingReset<'_, K> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.slot.write();
        if slot.state == KeyState::Loading {
            debug!("key load abandoned, returning to unloaded");
            slot.state = KeyState::Unloaded;
        }
    }
}

/// Clears the session key when dropped.
///
/// Hold one for the lifetime of a logical session so the key never
/// outlives it, whichever way the session ends.
pub struct SessionGuard<C: CryptoProvider = AesGcmProvider> {
    keys: Arc<SessionKeyManager<C>>,
}

impl<C: CryptoProvider> SessionGuard<C> {
    pub fn new(keys: Arc<SessionKeyManager<C>>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &Arc<SessionKeyManager<C>> {
        &self.keys
    }

    /// Cipher bound to this session's manager.
    pub fn cipher(&self) -> crate::cipher::EnvelopeCipher<C> {
        crate::cipher::EnvelopeCipher::new(Arc::clone(&self.keys))
    }
}

impl<C: CryptoProvider> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        self.keys.clear();
    }
}
