//! Wire types and the shared transport contract.

use async_trait::async_trait;
use partylink_core::{Capability, PartyId, PartyLinkError, Result};
use serde::{Deserialize, Serialize};

/// Options governing one transport exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportOptions {
    /// Hard upper bound for the exchange, milliseconds.
    pub timeout_ms: u64,
    /// Origins a callback may come from. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Origin of the requesting application.
    pub origin: String,
}

impl TransportOptions {
    /// Options for `origin` with the default 60 second timeout.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            timeout_ms: 60_000,
            allowed_origins: Vec::new(),
            origin: origin.into(),
        }
    }

    /// Replace the timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Replace the origin allow-list.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

/// Wallet-reported error payload inside a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Wallet-defined error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Connection request carried to the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    /// Requesting application's display name.
    pub app_name: String,
    /// Requesting application's origin.
    pub origin: String,
    /// Network the session should be scoped to.
    pub network: String,
    /// Capabilities the application intends to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_capabilities: Option<Vec<Capability>>,
    /// CSRF nonce; generated by the transport when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Where the wallet should send the callback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

/// Wallet's answer to a connection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    /// Echo of the request nonce.
    pub state: String,
    /// The party the wallet authenticated as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
    /// Opaque wallet session token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Session expiry, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Capabilities the wallet granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<Capability>>,
    /// Wallet-reported failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

/// Signing request carried to the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Message to sign, for message-signing flows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Transaction payload, for transaction flows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<serde_json::Value>,
    /// CSRF nonce; generated by the transport when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Where the wallet should send the callback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

/// Wallet's answer to a signing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    /// Echo of the request nonce.
    pub state: String,
    /// Signature, when produced synchronously.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Hash of the submitted transaction, when the wallet also submits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    /// Job handle for asynchronous human-approval flows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Wallet-reported failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

/// State of an asynchronous approval job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Awaiting human approval.
    Pending,
    /// Approved; the result payload is populated.
    Approved,
    /// Denied by the approver.
    Denied,
    /// The approval window elapsed.
    Expired,
}

/// Result payload of an approved job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    /// Signature, when the job produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Transaction hash, when the job submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

/// Status of an asynchronous approval job, obtained by polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Job handle.
    pub job_id: String,
    /// Current state.
    pub status: JobState,
    /// Result payload, present once approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutcome>,
    /// Wallet-reported failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

/// The contract every transport variant satisfies.
///
/// Callers cannot distinguish variants structurally; a mocked transport
/// honors the same asynchronous timing contract as a live one.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Carry a connection request to `endpoint` and await the correlated
    /// response.
    async fn open_connect_request(
        &self,
        endpoint: &str,
        request: ConnectRequest,
        options: &TransportOptions,
    ) -> Result<ConnectResponse>;

    /// Carry a signing request to `endpoint` and await the correlated
    /// response.
    async fn open_sign_request(
        &self,
        endpoint: &str,
        request: SignRequest,
        options: &TransportOptions,
    ) -> Result<SignResponse>;

    /// Poll the status of an asynchronous approval job.
    ///
    /// Variants that have no out-of-band approval flow keep the default.
    async fn poll_job_status(
        &self,
        job_id: &str,
        _endpoint: &str,
        _options: &TransportOptions,
    ) -> Result<JobStatus> {
        Err(PartyLinkError::unsupported_method(format!(
            "job polling (job '{job_id}')"
        )))
    }
}
