//! Capability model for wallet adapters.
//!
//! A capability is a named operation a wallet claims to support. Dispatch is
//! always on the declared capability set, never on the runtime shape of the
//! adapter object.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A named operation a wallet adapter claims to support.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Capability {
    /// Establish a session with the wallet.
    Connect,
    /// Tear down an established session.
    Disconnect,
    /// Re-validate and resume a persisted session.
    Restore,
    /// Sign an arbitrary message.
    SignMessage,
    /// Sign a prepared transaction without submitting it.
    SignTransaction,
    /// Submit a signed transaction to the ledger.
    SubmitTransaction,
    /// Query the status of a submitted transaction.
    TransactionStatus,
    /// Switch the active network.
    SwitchNetwork,
    /// Multi-party authorization flows.
    MultiParty,
    /// Proxy raw ledger API requests through the wallet.
    LedgerApi,
    /// Push event notifications from the wallet.
    Events,
    /// Wallet is reachable through an injected in-context provider.
    Injected,
}

impl Capability {
    /// The camelCase wire key for this capability.
    pub fn key(&self) -> &'static str {
        match self {
            Capability::Connect => "connect",
            Capability::Disconnect => "disconnect",
            Capability::Restore => "restore",
            Capability::SignMessage => "signMessage",
            Capability::SignTransaction => "signTransaction",
            Capability::SubmitTransaction => "submitTransaction",
            Capability::TransactionStatus => "transactionStatus",
            Capability::SwitchNetwork => "switchNetwork",
            Capability::MultiParty => "multiParty",
            Capability::LedgerApi => "ledgerApi",
            Capability::Events => "events",
            Capability::Injected => "injected",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(Capability::Connect),
            "disconnect" => Ok(Capability::Disconnect),
            "restore" => Ok(Capability::Restore),
            "signMessage" => Ok(Capability::SignMessage),
            "signTransaction" => Ok(Capability::SignTransaction),
            "submitTransaction" => Ok(Capability::SubmitTransaction),
            "transactionStatus" => Ok(Capability::TransactionStatus),
            "switchNetwork" => Ok(Capability::SwitchNetwork),
            "multiParty" => Ok(Capability::MultiParty),
            "ledgerApi" => Ok(Capability::LedgerApi),
            "events" => Ok(Capability::Events),
            "injected" => Ok(Capability::Injected),
            other => Err(UnknownCapability(other.to_owned())),
        }
    }
}

/// Parse error for capability keys not present in this version of the model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability key: {0}")]
pub struct UnknownCapability(pub String);

/// An ordered, deduplicated set of capabilities.
///
/// Serialized as an array of camelCase keys. Iteration order is stable so
/// snapshots compare deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// The empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set contains `capability`.
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Add a capability; returns `true` if it was newly inserted.
    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    /// The first capability in `required` that this set is missing, if any.
    pub fn first_missing(&self, required: &[Capability]) -> Option<Capability> {
        required.iter().copied().find(|c| !self.0.contains(c))
    }

    /// Number of capabilities in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the capabilities in stable order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(capabilities: Vec<Capability>) -> Self {
        capabilities.into_iter().collect()
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(capabilities: [Capability; N]) -> Self {
        capabilities.into_iter().collect()
    }
}
