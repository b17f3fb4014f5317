//! Generic adapter for wallets reached through a transport.
//!
//! Covers deep-link, popup, and custodial wallets alike: the transport
//! variant is injected, and asynchronous human-approval flows are handled by
//! polling the wallet's job endpoint until a terminal state.

use crate::contract::{
    AdapterConnectResult, AdapterContext, ConnectOptions, DetectResult, SignMessageParams,
    SignTransactionParams, SignedMessage, SignedTransaction, SubmitTransactionParams, TxReceipt,
    WalletAdapter,
};
use async_trait::async_trait;
use partylink_core::{
    CapabilitySet, Clock, ErrorContext, OperationPhase, PartyLinkError, Result, Session,
    Signature, TransactionHash, TransportKind, WalletId,
};
use partylink_transport::{
    ConnectRequest, JobState, ResponseError, SignRequest, SignResponse, Transport,
    TransportOptions,
};
use std::sync::Arc;
use uuid::Uuid;

/// Configuration for one transport-routed wallet.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWalletConfig {
    /// Wallet identifier, matching its registry entry.
    pub wallet_id: WalletId,
    /// Display name.
    pub name: String,
    /// Connect/sign request endpoint.
    pub endpoint: String,
    /// Job-status endpoint for asynchronous approval flows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_endpoint: Option<String>,
    /// Capabilities the wallet declares.
    pub capabilities: CapabilitySet,
    /// Origins wallet callbacks may come from.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Exchange timeout, milliseconds.
    pub timeout_ms: u64,
    /// Transport variant, recorded in error context.
    pub transport_kind: TransportKind,
    /// Delay between job-status polls, milliseconds.
    pub poll_interval_ms: u64,
    /// Upper bound on job-status polls before giving up.
    pub max_polls: u32,
}

/// Adapter for a wallet reached through any [`Transport`].
pub struct RemoteWalletAdapter {
    config: RemoteWalletConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl RemoteWalletAdapter {
    /// Build an adapter over `transport`.
    pub fn new(
        config: RemoteWalletConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            transport,
            clock,
        }
    }

    fn transport_options(&self, ctx: &AdapterContext, timeout_ms: Option<u64>) -> TransportOptions {
        TransportOptions {
            timeout_ms: timeout_ms.unwrap_or(self.config.timeout_ms),
            allowed_origins: self.config.allowed_origins.clone(),
            origin: ctx.origin.clone(),
        }
    }

    fn normalize(&self, error: PartyLinkError, phase: OperationPhase) -> PartyLinkError {
        error.or_context(
            ErrorContext::for_adapter(self.config.wallet_id.clone(), phase)
                .via(self.config.transport_kind),
        )
    }

    fn map_response_error(error: ResponseError) -> PartyLinkError {
        match error.code.as_str() {
            "USER_REJECTED" | "REJECTED" => PartyLinkError::user_rejected(error.message),
            "TIMEOUT" => PartyLinkError::new(partylink_core::ErrorKind::Timeout, error.message),
            other => PartyLinkError::transport(format!("wallet error {other}: {}", error.message)),
        }
    }

    /// Drive an asynchronous approval job to a terminal state.
    async fn await_job(
        &self,
        job_id: &str,
        options: &TransportOptions,
        operation: &str,
    ) -> Result<SignResponse> {
        let status_endpoint = self.config.status_endpoint.as_deref().ok_or_else(|| {
            PartyLinkError::transport(format!(
                "wallet returned job '{job_id}' but no status endpoint is configured"
            ))
        })?;

        for _ in 0..self.config.max_polls {
            let status = self
                .transport
                .poll_job_status(job_id, status_endpoint, options)
                .await?;
            match status.status {
                JobState::Pending => {
                    self.clock.sleep_ms(self.config.poll_interval_ms).await;
                }
                JobState::Approved => {
                    let outcome = status.result.unwrap_or_default();
                    return Ok(SignResponse {
                        state: String::new(),
                        signature: outcome.signature,
                        transaction_hash: outcome.transaction_hash,
                        job_id: Some(job_id.to_owned()),
                        error: None,
                    });
                }
                JobState::Denied => {
                    return Err(PartyLinkError::user_rejected(format!(
                        "{operation} denied by approver"
                    )))
                }
                JobState::Expired => {
                    return Err(PartyLinkError::timeout(
                        format!("{operation} approval"),
                        self.config.timeout_ms,
                    ))
                }
            }
        }
        Err(PartyLinkError::timeout(
            format!("{operation} approval polling"),
            self.config.poll_interval_ms * u64::from(self.config.max_polls),
        ))
    }

    async fn open_sign(
        &self,
        ctx: &AdapterContext,
        request: SignRequest,
        operation: &str,
    ) -> Result<SignResponse> {
        let options = self.transport_options(ctx, None);
        let mut response = self
            .transport
            .open_sign_request(&self.config.endpoint, request, &options)
            .await?;
        if let Some(error) = response.error.take() {
            return Err(Self::map_response_error(error));
        }
        // A job id instead of a result means a human must approve
        // out-of-band; poll until the job settles.
        if let Some(job_id) = response.job_id.clone() {
            if response.signature.is_none() && response.transaction_hash.is_none() {
                return self.await_job(&job_id, &options, operation).await;
            }
        }
        Ok(response)
    }
}

#[async_trait]
impl WalletAdapter for RemoteWalletAdapter {
    fn wallet_id(&self) -> &WalletId {
        &self.config.wallet_id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> CapabilitySet {
        self.config.capabilities.clone()
    }

    async fn detect_installed(&self, _ctx: &AdapterContext) -> DetectResult {
        // A transport-routed wallet has nothing to install locally.
        DetectResult::installed()
    }

    async fn connect(
        &self,
        ctx: &AdapterContext,
        opts: &ConnectOptions,
    ) -> Result<AdapterConnectResult> {
        let request = ConnectRequest {
            app_name: ctx.app_name.clone(),
            origin: ctx.origin.clone(),
            network: ctx.network.clone(),
            requested_capabilities: Some(self.config.capabilities.iter().collect()),
            state: None,
            redirect_uri: None,
        };
        let options = self.transport_options(ctx, opts.timeout_ms);

        let response = self
            .transport
            .open_connect_request(&self.config.endpoint, request, &options)
            .await
            .map_err(|err| self.normalize(err, OperationPhase::Connect))?;

        if let Some(error) = response.error {
            return Err(self.normalize(Self::map_response_error(error), OperationPhase::Connect));
        }
        let party_id = response.party_id.ok_or_else(|| {
            self.normalize(
                PartyLinkError::transport("connect response carried no party id"),
                OperationPhase::Connect,
            )
        })?;

        let capabilities = match response.capabilities {
            Some(granted) => granted.into_iter().collect(),
            None => self.config.capabilities.clone(),
        };
        Ok(AdapterConnectResult {
            party_id,
            expires_at: response.expires_at,
            capabilities,
        })
    }

    async fn disconnect(&self, _ctx: &AdapterContext, session: &Session) -> Result<()> {
        // The wallet side holds no revocable local state; dropping the
        // session locally is the whole teardown.
        tracing::debug!(session_id = %session.session_id, "remote session dropped");
        Ok(())
    }

    async fn sign_message(
        &self,
        ctx: &AdapterContext,
        session: &Session,
        params: &SignMessageParams,
    ) -> Result<SignedMessage> {
        let request = SignRequest {
            message: Some(params.message.clone()),
            transaction: None,
            state: None,
            redirect_uri: None,
        };
        let response = self
            .open_sign(ctx, request, "signMessage")
            .await
            .map_err(|err| self.normalize(err, OperationPhase::SignMessage))?;

        let signature = response.signature.ok_or_else(|| {
            self.normalize(
                PartyLinkError::transport("sign response carried no signature"),
                OperationPhase::SignMessage,
            )
        })?;
        Ok(SignedMessage {
            signature: Signature::new(signature),
            party_id: session.party_id.clone(),
            message: params.message.clone(),
        })
    }

    async fn sign_transaction(
        &self,
        ctx: &AdapterContext,
        session: &Session,
        params: &SignTransactionParams,
    ) -> Result<SignedTransaction> {
        let request = SignRequest {
            message: None,
            transaction: Some(params.transaction.clone()),
            state: None,
            redirect_uri: None,
        };
        let response = self
            .open_sign(ctx, request, "signTransaction")
            .await
            .map_err(|err| self.normalize(err, OperationPhase::SignTransaction))?;

        let signature = response.signature.ok_or_else(|| {
            self.normalize(
                PartyLinkError::transport("sign response carried no signature"),
                OperationPhase::SignTransaction,
            )
        })?;
        let transaction_hash = response
            .transaction_hash
            .unwrap_or_else(|| format!("tx_{}", Uuid::new_v4().simple()));

        Ok(SignedTransaction {
            transaction_hash: TransactionHash::new(transaction_hash),
            signed_tx: serde_json::json!({
                "transaction": params.transaction,
                "signature": signature.clone(),
            }),
            party_id: session.party_id.clone(),
            signature: Signature::new(signature),
            signed_by: session.party_id.to_string(),
        })
    }

    async fn submit_transaction(
        &self,
        ctx: &AdapterContext,
        session: &Session,
        params: &SubmitTransactionParams,
    ) -> Result<TxReceipt> {
        let request = SignRequest {
            message: None,
            transaction: Some(params.signed_tx.clone()),
            state: None,
            redirect_uri: None,
        };
        let response = self
            .open_sign(ctx, request, "submitTransaction")
            .await
            .map_err(|err| self.normalize(err, OperationPhase::SubmitTransaction))?;

        let transaction_hash = response
            .transaction_hash
            .or(response.signature)
            .unwrap_or_else(|| format!("tx_{}", Uuid::new_v4().simple()));
        tracing::debug!(
            session_id = %session.session_id,
            transaction_hash = %transaction_hash,
            "transaction submitted"
        );
        Ok(TxReceipt {
            transaction_hash: TransactionHash::new(transaction_hash),
            submitted_at: self.clock.now_ms(),
            command_id: None,
            update_id: None,
            completion_offset: None,
        })
    }

    async fn restore(&self, ctx: &AdapterContext, persisted: &Session) -> Result<Option<Session>> {
        // Liveness is re-validated with the wallet by issuing a fresh
        // connect for the persisted party; a wallet that no longer holds the
        // session answers with an error and the record is dropped.
        let request = ConnectRequest {
            app_name: ctx.app_name.clone(),
            origin: ctx.origin.clone(),
            network: ctx.network.clone(),
            requested_capabilities: None,
            state: None,
            redirect_uri: None,
        };
        let options = self.transport_options(ctx, None);
        match self
            .transport
            .open_connect_request(&self.config.endpoint, request, &options)
            .await
        {
            Ok(response) if response.error.is_none() => {
                match response.party_id {
                    Some(party_id) if party_id == persisted.party_id => {
                        Ok(Some(persisted.clone()))
                    }
                    _ => Ok(None),
                }
            }
            Ok(_) => Ok(None),
            Err(err) => {
                tracing::debug!(wallet_id = %self.config.wallet_id, "restore probe failed: {err}");
                Ok(None)
            }
        }
    }
}
