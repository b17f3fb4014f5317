//! Registry document schema and structural validation.

use partylink_core::{CapabilitySet, PartyLinkError, Result, WalletId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Schema version this client understands.
pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

/// A registry distribution track with its own independent sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryChannel {
    /// Production track.
    Stable,
    /// Pre-release track.
    Beta,
}

impl RegistryChannel {
    /// The wire name of the channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryChannel::Stable => "stable",
            RegistryChannel::Beta => "beta",
        }
    }
}

impl fmt::Display for RegistryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegistryChannel {
    type Err = PartyLinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stable" => Ok(RegistryChannel::Stable),
            "beta" => Ok(RegistryChannel::Beta),
            other => Err(PartyLinkError::serialization(format!(
                "unknown registry channel: {other}"
            ))),
        }
    }
}

/// Registry document header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMetadata {
    /// Human-facing content version (e.g. `"1.4.0"`).
    pub version: String,
    /// Schema version; must equal [`REGISTRY_SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Monotonically non-decreasing publication counter for the channel.
    pub sequence: u64,
    /// Publication time, epoch milliseconds.
    pub timestamp: u64,
}

/// How to reach a wallet listed in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterLocator {
    /// Adapter variant identifier (e.g. `"injected"`, `"deeplink"`, `"remote"`).
    #[serde(rename = "type")]
    pub adapter_type: String,
    /// Request endpoint for transport-routed adapters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Job-status endpoint for asynchronous approval flows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_endpoint: Option<String>,
}

/// One wallet in the catalog. Identity key: `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletEntry {
    /// Registry-wide unique wallet identifier.
    pub id: WalletId,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Project homepage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Networks the wallet supports.
    pub supported_networks: Vec<String>,
    /// Capabilities the wallet declares.
    pub capabilities: CapabilitySet,
    /// How to reach the wallet.
    pub adapter: AdapterLocator,
    /// Documentation link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

/// The signed wallet catalog. Immutable once verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRegistry {
    /// Document header.
    pub metadata: RegistryMetadata,
    /// The catalog.
    pub wallets: Vec<WalletEntry>,
}

impl WalletRegistry {
    /// The channel-scoped publication counter.
    pub fn sequence(&self) -> u64 {
        self.metadata.sequence
    }

    /// Look up a wallet by id.
    pub fn find(&self, id: &WalletId) -> Option<&WalletEntry> {
        self.wallets.iter().find(|entry| &entry.id == id)
    }
}

/// Summary of a wallet entry for the discovery layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    /// Wallet identifier.
    pub id: WalletId,
    /// Display name.
    pub name: String,
    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Declared capabilities.
    pub capabilities: CapabilitySet,
    /// Supported networks.
    pub supported_networks: Vec<String>,
}

impl From<&WalletEntry> for WalletInfo {
    fn from(entry: &WalletEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            icon: entry.icon.clone(),
            capabilities: entry.capabilities.clone(),
            supported_networks: entry.supported_networks.clone(),
        }
    }
}

/// Structural validation of a parsed registry document.
///
/// Checks the schema version, that every entry carries a non-empty id and
/// name, and that ids are unique. Signature verification happens before
/// parsing and is out of scope here.
pub fn validate_registry(registry: &WalletRegistry) -> Result<()> {
    if registry.metadata.schema_version != REGISTRY_SCHEMA_VERSION {
        return Err(PartyLinkError::serialization(format!(
            "unsupported registry schema version {} (expected {})",
            registry.metadata.schema_version, REGISTRY_SCHEMA_VERSION
        )));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(registry.wallets.len());
    for entry in &registry.wallets {
        if entry.id.as_str().is_empty() {
            return Err(PartyLinkError::serialization("wallet entry with empty id"));
        }
        if entry.name.is_empty() {
            return Err(PartyLinkError::serialization(format!(
                "wallet entry '{}' has an empty name",
                entry.id
            )));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(PartyLinkError::serialization(format!(
                "duplicate wallet id '{}'",
                entry.id
            )));
        }
    }
    Ok(())
}
