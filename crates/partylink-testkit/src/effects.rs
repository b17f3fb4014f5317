//! Deterministic implementations of the injected collaborator traits.

use async_trait::async_trait;
use parking_lot::Mutex;
use partylink_core::{Clock, KeyValueStore, PartyLinkError, Result};
use partylink_registry::{FetchOutcome, FetchedDocument, RegistryFetch};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A clock that only moves when a test advances it.
///
/// `sleep_ms` resolves once the manual time passes the deadline, checked on
/// a short real-time cadence so racing futures interleave naturally.
#[derive(Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// A clock starting at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock starting at `now_ms`.
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Advance the clock by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    async fn sleep_ms(&self, ms: u64) {
        let deadline = self.now_ms.load(Ordering::SeqCst).saturating_add(ms);
        while self.now_ms.load(Ordering::SeqCst) < deadline {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

/// In-memory [`KeyValueStore`].
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored key, for assertions.
    pub fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.values.lock().clear();
        Ok(())
    }
}

enum Route {
    Document { body: Vec<u8>, etag: Option<String> },
    NotModified,
    Fail(PartyLinkError),
}

/// Scriptable [`RegistryFetch`] serving programmed routes.
#[derive(Default)]
pub struct StaticFetcher {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl StaticFetcher {
    /// A fetcher with no routes; unknown URLs fail as transport errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` (with optional etag) at `url`.
    pub fn serve_document(&self, url: &str, body: Vec<u8>, etag: Option<String>) {
        self.routes
            .lock()
            .insert(url.to_owned(), Route::Document { body, etag });
    }

    /// Answer `url` with HTTP 304.
    pub fn serve_not_modified(&self, url: &str) {
        self.routes.lock().insert(url.to_owned(), Route::NotModified);
    }

    /// Fail `url` with `error`.
    pub fn serve_error(&self, url: &str, error: PartyLinkError) {
        self.routes.lock().insert(url.to_owned(), Route::Fail(error));
    }

    /// Every `(url, etag)` request observed, in order.
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RegistryFetch for StaticFetcher {
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchOutcome> {
        self.requests
            .lock()
            .push((url.to_owned(), etag.map(str::to_owned)));
        let routes = self.routes.lock();
        match routes.get(url) {
            Some(Route::Document { body, etag }) => Ok(FetchOutcome::Fetched(FetchedDocument {
                body: body.clone(),
                etag: etag.clone(),
            })),
            Some(Route::NotModified) => Ok(FetchOutcome::NotModified),
            Some(Route::Fail(error)) => Err(error.clone()),
            None => Err(PartyLinkError::transport(format!("no route for {url}"))),
        }
    }
}
