//! CIP-0103 payload shapes.

use partylink_core::Session;
use serde::{Deserialize, Serialize};

/// Event names the bridge emits.
pub mod events {
    /// Full snapshot on any session change.
    pub const STATUS_CHANGED: &str = "statusChanged";
    /// Account list derived from the session party.
    pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
    /// Simple connected/disconnected boolean.
    pub const CONNECTED: &str = "connected";
    /// Transaction lifecycle stream.
    pub const TX_CHANGED: &str = "txChanged";
}

/// Identity of this provider implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Provider identifier.
    pub id: String,
    /// Provider version.
    pub version: String,
    /// Provider flavor (e.g. `"kit"`, `"extension"`).
    pub provider_type: String,
}

impl Default for ProviderInfo {
    fn default() -> Self {
        Self {
            id: "partylink".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            provider_type: "kit".to_owned(),
        }
    }
}

/// Connection flag inside a status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Whether a session is active.
    pub is_connected: bool,
}

/// Active network in CAIP-2 form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// Network identifier, `canton:<network>`.
    pub network_id: String,
}

impl NetworkInfo {
    /// CAIP-2 identifier for a session network name.
    pub fn for_network(network: &str) -> Self {
        Self {
            network_id: format!("canton:{network}"),
        }
    }
}

/// Session description inside a status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// The authenticated user (party) identifier.
    pub user_id: String,
}

/// Full provider/connection/session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// Connection flag.
    pub connection: ConnectionStatus,
    /// Provider identity.
    pub provider: ProviderInfo,
    /// Active network, when connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkInfo>,
    /// Session description, when connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
}

impl StatusEvent {
    /// Snapshot for an active session.
    pub fn connected(provider: ProviderInfo, session: &Session) -> Self {
        Self {
            connection: ConnectionStatus { is_connected: true },
            provider,
            network: Some(NetworkInfo::for_network(&session.network)),
            session: Some(SessionInfo {
                user_id: session.party_id.to_string(),
            }),
        }
    }

    /// Snapshot with no active session.
    pub fn disconnected(provider: ProviderInfo) -> Self {
        Self {
            connection: ConnectionStatus {
                is_connected: false,
            },
            provider,
            network: None,
            session: None,
        }
    }
}

/// Result of `connect` and `isConnected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
    /// Whether a session is active.
    pub is_connected: bool,
    /// Why not, when disconnected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Allocation state of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Party allocation in progress.
    Initializing,
    /// Party fully allocated.
    Allocated,
}

/// One account visible through the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Whether this is the primary account.
    pub primary: bool,
    /// The ledger party.
    pub party_id: String,
    /// Allocation state.
    pub status: AccountStatus,
    /// Human hint for the account.
    pub hint: String,
    /// Public key backing the party, when known.
    pub public_key: String,
    /// Namespace of the party identifier.
    pub namespace: String,
    /// Network the account lives on, CAIP-2 form.
    pub network_id: String,
    /// The signing provider behind the account.
    pub signing_provider_id: String,
}

impl Account {
    /// The primary account derived from a session.
    pub fn primary_from_session(session: &Session) -> Self {
        Self {
            primary: true,
            party_id: session.party_id.to_string(),
            status: AccountStatus::Allocated,
            hint: session.wallet_id.to_string(),
            public_key: String::new(),
            namespace: "canton".to_owned(),
            network_id: NetworkInfo::for_network(&session.network).network_id,
            signing_provider_id: session.wallet_id.to_string(),
        }
    }
}

/// Signature payload of a `signed` lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    /// The transaction signature.
    pub signature: String,
    /// The signing authority.
    pub signed_by: String,
    /// The signing party.
    pub party: String,
}

/// Ledger payload of an `executed` lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedPayload {
    /// Ledger update identifier.
    pub update_id: String,
    /// Completion offset on the ledger.
    pub completion_offset: u64,
}

/// Failure payload of a `failed` lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPayload {
    /// Why the transaction failed.
    pub reason: String,
}

/// Transaction lifecycle event; all events of one logical transaction share
/// one `command_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TxChangedEvent {
    /// Command accepted, not yet signed.
    Pending {
        /// The command identifier spanning the walk.
        command_id: String,
    },
    /// Signed, not yet submitted.
    Signed {
        /// The command identifier spanning the walk.
        command_id: String,
        /// Signature details.
        payload: SignedPayload,
    },
    /// Submitted and executed on the ledger.
    Executed {
        /// The command identifier spanning the walk.
        command_id: String,
        /// Ledger identifiers.
        payload: ExecutedPayload,
    },
    /// Failed at signing or submission; terminal.
    Failed {
        /// The command identifier spanning the walk.
        command_id: String,
        /// Failure details.
        payload: FailedPayload,
    },
}

impl TxChangedEvent {
    /// The command identifier this event belongs to.
    pub fn command_id(&self) -> &str {
        match self {
            TxChangedEvent::Pending { command_id }
            | TxChangedEvent::Signed { command_id, .. }
            | TxChangedEvent::Executed { command_id, .. }
            | TxChangedEvent::Failed { command_id, .. } => command_id,
        }
    }

    /// The discriminant string (`pending`, `signed`, `executed`, `failed`).
    pub fn status(&self) -> &'static str {
        match self {
            TxChangedEvent::Pending { .. } => "pending",
            TxChangedEvent::Signed { .. } => "signed",
            TxChangedEvent::Executed { .. } => "executed",
            TxChangedEvent::Failed { .. } => "failed",
        }
    }
}
