//! Registry status reporting and the last-known-good cache snapshot.

use crate::schema::{RegistryChannel, WalletRegistry};
use partylink_core::PartyLinkError;
use serde::{Deserialize, Serialize};

/// Where the registry the caller received came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrySource {
    /// Fresh from the network this fetch.
    Network,
    /// Served from the last-known-good cache.
    Cache,
}

/// How the most recent fetch attempt resolved.
///
/// Derived, recomputed on every fetch attempt; never persisted apart from
/// the cache it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    /// Where the served registry came from.
    pub source: RegistrySource,
    /// Whether the served registry passed signature verification.
    pub verified: bool,
    /// The channel this status describes.
    pub channel: RegistryChannel,
    /// Sequence of the served registry; 0 when nothing is available.
    pub sequence: u64,
    /// Whether the served registry is past its TTL.
    pub stale: bool,
    /// When the served registry was fetched, epoch milliseconds.
    pub fetched_at: u64,
    /// ETag of the served registry, when the server provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Why the live fetch did not produce a fresh registry, when it didn't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PartyLinkError>,
}

/// Last-known-good snapshot, persisted across restarts.
///
/// Written only after successful verification of a registry whose sequence
/// is greater than or equal to the cached sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRegistry {
    /// The verified registry document.
    pub registry: WalletRegistry,
    /// Whether the snapshot passed signature verification (always true for
    /// snapshots written by this client; kept for forward compatibility).
    pub verified: bool,
    /// When the snapshot was fetched, epoch milliseconds.
    pub fetched_at: u64,
    /// ETag at fetch time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Sequence of the snapshot, the downgrade floor for the channel.
    pub sequence: u64,
}

/// Record of the most recent fetch attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastFetchAttempt {
    /// When the attempt happened, epoch milliseconds.
    pub fetched_at: u64,
    /// Machine code of the failure, if the attempt failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}
