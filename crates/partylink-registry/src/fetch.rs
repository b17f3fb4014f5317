//! Fetch abstraction for registry documents.
//!
//! The client never talks to the network directly; it goes through
//! [`RegistryFetch`] so tests can substitute deterministic fetchers. The
//! bundled [`HttpFetcher`] is the production implementation.

use async_trait::async_trait;
use partylink_core::{PartyLinkError, Result};
use std::time::Duration;

/// A fetched document plus its validator, when the server provides one.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    /// Raw response bytes, exactly as served.
    pub body: Vec<u8>,
    /// ETag header, used for conditional re-fetches.
    pub etag: Option<String>,
}

/// Outcome of a conditional fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The server returned a (possibly new) document.
    Fetched(FetchedDocument),
    /// The server confirmed the cached document is current (HTTP 304).
    NotModified,
}

/// Registry HTTP fetch primitive.
#[async_trait]
pub trait RegistryFetch: Send + Sync {
    /// Fetch `url`, passing `etag` as `If-None-Match` when present.
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchOutcome>;
}

/// Production fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PartyLinkError::transport(format!("http client: {err}")))?;
        Ok(Self { client })
    }

    /// Build a fetcher with a 10 second timeout.
    pub fn with_defaults() -> Result<Self> {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl RegistryFetch for HttpFetcher {
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchOutcome> {
        let mut request = self.client.get(url);
        if let Some(etag) = etag {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }

        let response = request
            .send()
            .await
            .map_err(|err| PartyLinkError::transport(format!("fetch {url}: {err}")))?;

        if response.status() == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }
        if !response.status().is_success() {
            return Err(PartyLinkError::transport(format!(
                "fetch {url}: status {}",
                response.status()
            )));
        }

        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|err| PartyLinkError::transport(format!("read {url}: {err}")))?
            .to_vec();

        Ok(FetchOutcome::Fetched(FetchedDocument { body, etag }))
    }
}
