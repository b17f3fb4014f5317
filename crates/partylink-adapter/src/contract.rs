//! The capability-polymorphic contract every wallet integration satisfies.
//!
//! Dispatch is on the declared capability set, never on the runtime shape of
//! the adapter. Capability-specific operations carry default implementations
//! that reject, so an adapter only implements what it declares.

use async_trait::async_trait;
use partylink_core::{
    Capability, CapabilitySet, PartyId, PartyLinkError, Result, Session, Signature,
    TransactionHash, WalletId,
};
use serde::{Deserialize, Serialize};

/// Application-side context passed to every adapter call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterContext {
    /// Requesting application's display name.
    pub app_name: String,
    /// Network operations are scoped to.
    pub network: String,
    /// Requesting application's origin.
    pub origin: String,
}

/// Result of probing whether a wallet is reachable in this environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResult {
    /// Whether the wallet can be reached.
    pub installed: bool,
    /// Human-readable explanation, surfaced on `WALLET_NOT_INSTALLED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DetectResult {
    /// A positive detection.
    pub fn installed() -> Self {
        Self {
            installed: true,
            reason: None,
        }
    }

    /// A negative detection with its reason.
    pub fn missing(reason: impl Into<String>) -> Self {
        Self {
            installed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Options for a connect attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// Override the transport timeout for this attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Ask the wallet for a specific party.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
}

/// What a successful adapter connect yields; the session object itself is
/// created by the session manager.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConnectResult {
    /// The party the wallet authenticated as.
    pub party_id: PartyId,
    /// Wallet-imposed session expiry, epoch milliseconds.
    pub expires_at: Option<u64>,
    /// Capabilities granted for this session.
    pub capabilities: CapabilitySet,
}

/// Parameters for message signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageParams {
    /// The message to sign.
    pub message: String,
    /// Anti-replay nonce chosen by the application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Domain separator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// A signed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    /// The signature.
    pub signature: Signature,
    /// The signing party.
    pub party_id: PartyId,
    /// Echo of the signed message.
    pub message: String,
}

/// Parameters for transaction signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignTransactionParams {
    /// The prepared transaction payload.
    pub transaction: serde_json::Value,
}

/// A signed, not yet submitted, transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    /// Hash identifying the signed transaction.
    pub transaction_hash: TransactionHash,
    /// The signed payload, ready for submission.
    pub signed_tx: serde_json::Value,
    /// The signing party.
    pub party_id: PartyId,
    /// The signature over the transaction.
    pub signature: Signature,
    /// Identifier of the signing authority (key or provider).
    pub signed_by: String,
}

/// Parameters for transaction submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionParams {
    /// The signed payload to submit.
    pub signed_tx: serde_json::Value,
}

/// Receipt for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    /// Hash identifying the transaction.
    pub transaction_hash: TransactionHash,
    /// When the submission was accepted, epoch milliseconds.
    pub submitted_at: u64,
    /// Ledger command identifier, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    /// Ledger update identifier, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_id: Option<String>,
    /// Completion offset on the ledger, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_offset: Option<u64>,
}

/// Parameters for a proxied ledger API request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerApiParams {
    /// HTTP method of the proxied request.
    pub request_method: String,
    /// Ledger API resource path.
    pub resource: String,
    /// Request body, when the method carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Response to a proxied ledger API request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerApiResult {
    /// Raw response body.
    pub response: String,
}

/// The contract every wallet integration implements.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Stable wallet identifier, matching the registry entry.
    fn wallet_id(&self) -> &WalletId;

    /// Display name.
    fn name(&self) -> &str;

    /// Capabilities this adapter declares.
    fn capabilities(&self) -> CapabilitySet;

    /// Probe whether the wallet is reachable in this environment.
    async fn detect_installed(&self, ctx: &AdapterContext) -> DetectResult;

    /// Establish a session with the wallet.
    async fn connect(
        &self,
        ctx: &AdapterContext,
        opts: &ConnectOptions,
    ) -> Result<AdapterConnectResult>;

    /// Tear down a session with the wallet.
    async fn disconnect(&self, ctx: &AdapterContext, session: &Session) -> Result<()>;

    /// Re-validate a persisted session with the wallet.
    ///
    /// Implementations must independently confirm liveness rather than
    /// trusting the persisted record; expired records are rejected by the
    /// session manager before this is ever called.
    async fn restore(&self, _ctx: &AdapterContext, _persisted: &Session) -> Result<Option<Session>> {
        Ok(None)
    }

    /// Sign a message. Requires [`Capability::SignMessage`].
    async fn sign_message(
        &self,
        _ctx: &AdapterContext,
        _session: &Session,
        _params: &SignMessageParams,
    ) -> Result<SignedMessage> {
        Err(PartyLinkError::capability_not_supported(
            self.wallet_id(),
            Capability::SignMessage,
        ))
    }

    /// Sign a transaction. Requires [`Capability::SignTransaction`].
    async fn sign_transaction(
        &self,
        _ctx: &AdapterContext,
        _session: &Session,
        _params: &SignTransactionParams,
    ) -> Result<SignedTransaction> {
        Err(PartyLinkError::capability_not_supported(
            self.wallet_id(),
            Capability::SignTransaction,
        ))
    }

    /// Submit a signed transaction. Requires [`Capability::SubmitTransaction`].
    async fn submit_transaction(
        &self,
        _ctx: &AdapterContext,
        _session: &Session,
        _params: &SubmitTransactionParams,
    ) -> Result<TxReceipt> {
        Err(PartyLinkError::capability_not_supported(
            self.wallet_id(),
            Capability::SubmitTransaction,
        ))
    }

    /// Proxy a raw ledger API request. Requires [`Capability::LedgerApi`].
    async fn ledger_api(
        &self,
        _ctx: &AdapterContext,
        _session: &Session,
        _params: &LedgerApiParams,
    ) -> Result<LedgerApiResult> {
        Err(PartyLinkError::capability_not_supported(
            self.wallet_id(),
            Capability::LedgerApi,
        ))
    }
}
