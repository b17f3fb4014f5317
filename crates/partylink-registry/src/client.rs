//! The registry client: fetch, verify, downgrade-check, cache.
//!
//! Central policy: never worse than last known good. Every failure mode —
//! network error, tampered payload, schema mismatch, downgrade — resolves to
//! the cached snapshot plus a status describing the failure. No error
//! escapes [`RegistryClient::fetch_registry`].

use crate::fetch::{FetchOutcome, RegistryFetch};
use crate::schema::{validate_registry, RegistryChannel, WalletRegistry};
use crate::signature::{parse_trusted_key, verify_registry_bytes, DetachedSignature};
use crate::status::{CachedRegistry, LastFetchAttempt, RegistrySource, RegistryStatus};
use ed25519_dalek::VerifyingKey;
use partylink_core::{Clock, EventEmitter, KeyValueStore, PartyLinkError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where to find one channel's registry and its detached signature.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEndpoints {
    /// URL of the registry JSON.
    pub registry_url: String,
    /// URL of the detached signature JSON.
    pub signature_url: String,
}

/// Registry client configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Per-channel document locations.
    pub endpoints: HashMap<RegistryChannel, RegistryEndpoints>,
    /// Base64-encoded raw Ed25519 public keys accepted as signers.
    pub trusted_keys: Vec<String>,
    /// Age past which a cached registry is reported stale, milliseconds.
    pub ttl_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoints: HashMap::new(),
            trusted_keys: Vec::new(),
            ttl_ms: 60 * 60 * 1000,
        }
    }
}

/// What a fetch attempt produced: a best-effort registry plus its status.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryFetchResult {
    /// The registry to use, possibly from cache; `None` when nothing has
    /// ever been accepted for the channel.
    pub registry: Option<WalletRegistry>,
    /// How the registry was obtained.
    pub status: RegistryStatus,
}

struct ChannelState {
    cache: Option<CachedRegistry>,
    cache_loaded: bool,
    status: Option<RegistryStatus>,
    last_attempt: Option<LastFetchAttempt>,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            cache: None,
            cache_loaded: false,
            status: None,
            last_attempt: None,
        }
    }
}

/// Trust registry client for one set of endpoints and trust anchors.
pub struct RegistryClient {
    config: RegistryConfig,
    keys: Vec<VerifyingKey>,
    fetcher: Arc<dyn RegistryFetch>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    channels: Mutex<HashMap<RegistryChannel, ChannelState>>,
    status_events: EventEmitter<RegistryStatus>,
}

impl RegistryClient {
    /// Build a client; fails only on malformed trust anchors.
    pub fn new(
        config: RegistryConfig,
        fetcher: Arc<dyn RegistryFetch>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let keys = config
            .trusted_keys
            .iter()
            .map(|encoded| parse_trusted_key(encoded))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config,
            keys,
            fetcher,
            store,
            clock,
            channels: Mutex::new(HashMap::new()),
            status_events: EventEmitter::new(),
        })
    }

    /// Status events, one per fetch attempt (success or degradation).
    pub fn status_events(&self) -> EventEmitter<RegistryStatus> {
        self.status_events.clone()
    }

    fn cache_key(channel: RegistryChannel) -> String {
        format!("partylink:registry:{channel}")
    }

    /// Fetch the registry for `channel`.
    ///
    /// Never returns an error: all failures degrade to the cached snapshot
    /// with `status.error` describing what went wrong.
    pub async fn fetch_registry(&self, channel: RegistryChannel) -> RegistryFetchResult {
        let mut channels = self.channels.lock().await;
        let state = channels.entry(channel).or_insert_with(ChannelState::new);
        self.ensure_cache_loaded(channel, state).await;

        let now = self.clock.now_ms();
        let result = match self.fetch_and_verify(channel, state, now).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(
                    channel = %channel,
                    code = error.code(),
                    "registry fetch degraded to cache: {error}"
                );
                self.from_cache(channel, state, now, Some(error))
            }
        };

        state.last_attempt = Some(LastFetchAttempt {
            fetched_at: now,
            error_code: result.status.error.as_ref().map(|e| e.code().to_owned()),
        });
        state.status = Some(result.status.clone());
        self.status_events.emit(&result.status);
        result
    }

    /// The current status for `channel`, without triggering a fetch.
    ///
    /// Before any fetch this reflects the persisted cache, when one exists.
    pub async fn get_status(&self, channel: RegistryChannel) -> Option<RegistryStatus> {
        let mut channels = self.channels.lock().await;
        let state = channels.entry(channel).or_insert_with(ChannelState::new);
        self.ensure_cache_loaded(channel, state).await;

        if let Some(status) = &state.status {
            return Some(status.clone());
        }
        let now = self.clock.now_ms();
        state.cache.as_ref().map(|cache| RegistryStatus {
            source: RegistrySource::Cache,
            verified: cache.verified,
            channel,
            sequence: cache.sequence,
            stale: self.is_stale(cache.fetched_at, now),
            fetched_at: cache.fetched_at,
            etag: cache.etag.clone(),
            error: None,
        })
    }

    /// The most recent fetch attempt for `channel`, if any.
    pub async fn last_fetch_attempt(&self, channel: RegistryChannel) -> Option<LastFetchAttempt> {
        let channels = self.channels.lock().await;
        channels
            .get(&channel)
            .and_then(|state| state.last_attempt.clone())
    }

    async fn ensure_cache_loaded(&self, channel: RegistryChannel, state: &mut ChannelState) {
        if state.cache_loaded {
            return;
        }
        state.cache_loaded = true;
        match self.store.get(&Self::cache_key(channel)).await {
            Ok(Some(raw)) => match serde_json::from_str::<CachedRegistry>(&raw) {
                Ok(cache) => state.cache = Some(cache),
                Err(err) => {
                    tracing::warn!(channel = %channel, "discarding unreadable registry cache: {err}");
                }
            },
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(channel = %channel, "registry cache read failed: {err}");
            }
        }
    }

    fn is_stale(&self, fetched_at: u64, now: u64) -> bool {
        now.saturating_sub(fetched_at) > self.config.ttl_ms
    }

    fn from_cache(
        &self,
        channel: RegistryChannel,
        state: &ChannelState,
        now: u64,
        error: Option<PartyLinkError>,
    ) -> RegistryFetchResult {
        match &state.cache {
            Some(cache) => RegistryFetchResult {
                registry: Some(cache.registry.clone()),
                status: RegistryStatus {
                    source: RegistrySource::Cache,
                    verified: cache.verified,
                    channel,
                    sequence: cache.sequence,
                    stale: self.is_stale(cache.fetched_at, now),
                    fetched_at: cache.fetched_at,
                    etag: cache.etag.clone(),
                    error,
                },
            },
            None => RegistryFetchResult {
                registry: None,
                status: RegistryStatus {
                    source: RegistrySource::Cache,
                    verified: false,
                    channel,
                    sequence: 0,
                    stale: true,
                    fetched_at: 0,
                    etag: None,
                    error,
                },
            },
        }
    }

    /// The happy path; any `Err` falls back to cache in the caller.
    async fn fetch_and_verify(
        &self,
        channel: RegistryChannel,
        state: &mut ChannelState,
        now: u64,
    ) -> Result<RegistryFetchResult> {
        let endpoints = self.config.endpoints.get(&channel).ok_or_else(|| {
            PartyLinkError::internal(format!("no endpoints configured for channel '{channel}'"))
        })?;

        let cached_etag = state.cache.as_ref().and_then(|c| c.etag.clone());
        let outcome = self
            .fetcher
            .fetch(&endpoints.registry_url, cached_etag.as_deref())
            .await?;

        let document = match outcome {
            FetchOutcome::NotModified => {
                // The server confirmed the snapshot is current; refresh its
                // age without re-verifying.
                let cache = state.cache.as_mut().ok_or_else(|| {
                    PartyLinkError::transport("not-modified response without a cached registry")
                })?;
                cache.fetched_at = now;
                let snapshot = cache.clone();
                self.persist_cache(channel, &snapshot).await;
                return Ok(RegistryFetchResult {
                    registry: Some(snapshot.registry),
                    status: RegistryStatus {
                        source: RegistrySource::Network,
                        verified: snapshot.verified,
                        channel,
                        sequence: snapshot.sequence,
                        stale: false,
                        fetched_at: now,
                        etag: snapshot.etag,
                        error: None,
                    },
                });
            }
            FetchOutcome::Fetched(document) => document,
        };

        let signature_doc = match self.fetcher.fetch(&endpoints.signature_url, None).await? {
            FetchOutcome::Fetched(doc) => doc,
            FetchOutcome::NotModified => {
                return Err(PartyLinkError::transport(
                    "unexpected not-modified response for signature document",
                ))
            }
        };
        let detached: DetachedSignature = serde_json::from_slice(&signature_doc.body)
            .map_err(|err| PartyLinkError::tampered(format!("unreadable signature file: {err}")))?;

        // Verify the exact fetched bytes before parsing anything out of them.
        verify_registry_bytes(&document.body, &detached, &self.keys)?;

        let registry: WalletRegistry = serde_json::from_slice(&document.body)
            .map_err(|err| PartyLinkError::serialization(format!("registry parse: {err}")))?;
        validate_registry(&registry)?;

        if let Some(cache) = &state.cache {
            if registry.sequence() < cache.sequence {
                return Err(PartyLinkError::downgrade(cache.sequence, registry.sequence()));
            }
        }

        let cache = CachedRegistry {
            sequence: registry.sequence(),
            registry,
            verified: true,
            fetched_at: now,
            etag: document.etag,
        };
        self.persist_cache(channel, &cache).await;
        let status = RegistryStatus {
            source: RegistrySource::Network,
            verified: true,
            channel,
            sequence: cache.sequence,
            stale: false,
            fetched_at: now,
            etag: cache.etag.clone(),
            error: None,
        };
        let registry = cache.registry.clone();
        state.cache = Some(cache);

        tracing::debug!(
            channel = %channel,
            sequence = status.sequence,
            "accepted verified registry"
        );
        Ok(RegistryFetchResult {
            registry: Some(registry),
            status,
        })
    }

    async fn persist_cache(&self, channel: RegistryChannel, cache: &CachedRegistry) {
        let serialized = match serde_json::to_string(cache) {
            Ok(serialized) => serialized,
            Err(err) => {
                tracing::warn!(channel = %channel, "registry cache serialize failed: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(&Self::cache_key(channel), &serialized).await {
            // Persistence is best-effort; the in-memory cache still serves.
            tracing::warn!(channel = %channel, "registry cache write failed: {err}");
        }
    }
}
