//! Trust registry client.
//!
//! Obtains the signed catalog of known wallets for a channel, guarantees it
//! is authentic and never older than anything previously accepted, and
//! degrades to the last known good snapshot when the network or the payload
//! cannot be trusted. No failure mode escapes as an error: callers always
//! receive a best-effort registry plus a status describing how it was
//! obtained.

pub mod client;
pub mod fetch;
pub mod schema;
pub mod signature;
pub mod status;

pub use client::{RegistryClient, RegistryConfig, RegistryEndpoints, RegistryFetchResult};
pub use fetch::{FetchOutcome, FetchedDocument, HttpFetcher, RegistryFetch};
pub use schema::{
    validate_registry, AdapterLocator, RegistryChannel, RegistryMetadata, WalletEntry,
    WalletInfo, WalletRegistry, REGISTRY_SCHEMA_VERSION,
};
pub use signature::{key_fingerprint, parse_trusted_key, verify_registry_bytes, DetachedSignature};
pub use status::{CachedRegistry, LastFetchAttempt, RegistrySource, RegistryStatus};
