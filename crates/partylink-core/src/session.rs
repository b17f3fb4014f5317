//! Session object representing an authenticated relationship with a party.
//!
//! The capability snapshot is frozen at creation. If a wallet later changes
//! its declared capabilities, a new session must be created; the snapshot is
//! never mutated in place.

use crate::capability::CapabilitySet;
use crate::identifiers::{PartyId, SessionId, WalletId};
use serde::{Deserialize, Serialize};

/// An authenticated relationship between the application and a party.
///
/// This is also the persisted form: a session read back from storage is
/// structurally identical, but must pass expiry and adapter liveness checks
/// before it becomes active again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Locally generated session identifier.
    pub session_id: SessionId,
    /// The wallet this session was established through.
    pub wallet_id: WalletId,
    /// The ledger party the session is authenticated as.
    pub party_id: PartyId,
    /// Network the session is scoped to.
    pub network: String,
    /// Creation time, epoch milliseconds.
    pub created_at: u64,
    /// Absolute expiry, epoch milliseconds; `None` means no expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Origin of the application that created the session.
    pub origin: String,
    /// Capabilities the wallet declared at creation time, frozen.
    pub capabilities_snapshot: CapabilitySet,
}

impl Session {
    /// Create a session starting now.
    pub fn new(
        wallet_id: WalletId,
        party_id: PartyId,
        network: impl Into<String>,
        origin: impl Into<String>,
        capabilities: CapabilitySet,
        now_ms: u64,
        expires_in_ms: Option<u64>,
    ) -> Self {
        Self {
            session_id: SessionId::generate(),
            wallet_id,
            party_id,
            network: network.into(),
            created_at: now_ms,
            expires_at: expires_in_ms.map(|ttl| now_ms + ttl),
            origin: origin.into(),
            capabilities_snapshot: capabilities,
        }
    }

    /// Whether the session has reached its expiry at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires_at) => now_ms >= expires_at,
            None => false,
        }
    }
}
