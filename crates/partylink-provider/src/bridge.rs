//! The provider bridge: `request` dispatch, the transaction lifecycle state
//! machine, and session-event fan-out.

use crate::errors::ProviderRpcError;
use crate::methods::Method;
use crate::types::{
    events, Account, ConnectResult, NetworkInfo, ProviderInfo, SignedPayload, StatusEvent,
    TxChangedEvent,
};
use async_trait::async_trait;
use partylink_adapter::{
    LedgerApiParams, LedgerApiResult, SignMessageParams, SignTransactionParams, SignedMessage,
    SignedTransaction, SubmitTransactionParams, TxReceipt,
};
use partylink_core::{
    CommandId, EventEmitter, HandlerId, Result, Session, SessionEvent, TopicEmitter,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

/// A provider request: `{ method, params? }`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct RpcRequest {
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

impl RpcRequest {
    /// A request without parameters.
    pub fn method(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
        }
    }

    /// A request with parameters.
    pub fn with_params(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            params: Some(params),
        }
    }
}

/// The client surface the bridge drives.
#[async_trait]
pub trait BridgeableClient: Send + Sync {
    /// Establish a session.
    async fn connect(&self) -> Result<Session>;

    /// Tear the session down.
    async fn disconnect(&self) -> Result<()>;

    /// The active session, if any.
    async fn active_session(&self) -> Option<Session>;

    /// Sign a message within the active session.
    async fn sign_message(&self, params: SignMessageParams) -> Result<SignedMessage>;

    /// Sign a transaction within the active session.
    async fn sign_transaction(&self, params: SignTransactionParams) -> Result<SignedTransaction>;

    /// Submit a signed transaction within the active session.
    async fn submit_transaction(&self, params: SubmitTransactionParams) -> Result<TxReceipt>;

    /// Whether the underlying wallet declares the ledger API capability.
    fn supports_ledger_api(&self) -> bool;

    /// Proxy a raw ledger API request.
    async fn ledger_api(&self, params: LedgerApiParams) -> Result<LedgerApiResult>;

    /// The session event stream the bridge fans out.
    fn session_events(&self) -> EventEmitter<SessionEvent>;
}

/// CIP-0103 provider over a [`BridgeableClient`].
pub struct ProviderBridge {
    client: Arc<dyn BridgeableClient>,
    emitter: TopicEmitter,
    provider: ProviderInfo,
    session_handler: HandlerId,
}

impl ProviderBridge {
    /// Bridge `client` with the default provider identity.
    pub fn new(client: Arc<dyn BridgeableClient>) -> Self {
        Self::with_provider(client, ProviderInfo::default())
    }

    /// Bridge `client` announcing `provider` as its identity.
    pub fn with_provider(client: Arc<dyn BridgeableClient>, provider: ProviderInfo) -> Self {
        let emitter = TopicEmitter::new();
        let fan_out_emitter = emitter.clone();
        let fan_out_provider = provider.clone();
        let session_handler = client.session_events().on(move |event| {
            fan_out(&fan_out_emitter, &fan_out_provider, event);
        });
        Self {
            client,
            emitter,
            provider,
            session_handler,
        }
    }

    /// Register an event handler; returns `self` for chaining.
    pub fn on(&self, event: &str, handler: impl Fn(&serde_json::Value) + Send + Sync + 'static) -> &Self {
        self.emitter.on(event, handler);
        self
    }

    /// Register an event handler, keeping the id for removal.
    pub fn subscribe(
        &self,
        event: &str,
        handler: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> HandlerId {
        self.emitter.on(event, handler)
    }

    /// Remove a handler registered with [`Self::subscribe`]; returns `self`
    /// for chaining.
    pub fn remove_listener(&self, event: &str, id: HandlerId) -> &Self {
        self.emitter.off(event, id);
        self
    }

    /// Emit an event to registered handlers.
    pub fn emit(&self, event: &str, payload: &serde_json::Value) {
        self.emitter.emit(event, payload);
    }

    /// Dispatch a provider request.
    ///
    /// Resolves to a well-formed result or rejects with a typed RPC error;
    /// a raw error never crosses this boundary.
    pub async fn request(
        &self,
        request: RpcRequest,
    ) -> std::result::Result<serde_json::Value, ProviderRpcError> {
        let method = Method::from_str(&request.method)
            .map_err(|_| ProviderRpcError::unsupported_method(&request.method))?;
        let params = request.params.unwrap_or(serde_json::Value::Null);

        match method {
            Method::Status => {
                let status = match self.client.active_session().await {
                    Some(session) => StatusEvent::connected(self.provider.clone(), &session),
                    None => StatusEvent::disconnected(self.provider.clone()),
                };
                to_json(&status)
            }
            Method::Connect => {
                self.client.connect().await?;
                to_json(&ConnectResult {
                    is_connected: true,
                    reason: None,
                })
            }
            Method::IsConnected => {
                let result = match self.client.active_session().await {
                    Some(_) => ConnectResult {
                        is_connected: true,
                        reason: None,
                    },
                    None => ConnectResult {
                        is_connected: false,
                        reason: Some("no active session".to_owned()),
                    },
                };
                to_json(&result)
            }
            Method::Disconnect => {
                self.client.disconnect().await?;
                Ok(serde_json::Value::Null)
            }
            Method::GetActiveNetwork => {
                let session = self.require_session("getActiveNetwork").await?;
                to_json(&NetworkInfo::for_network(&session.network))
            }
            Method::ListAccounts => {
                let session = self.require_session("listAccounts").await?;
                to_json(&vec![Account::primary_from_session(&session)])
            }
            Method::GetPrimaryAccount => {
                let session = self.require_session("getPrimaryAccount").await?;
                to_json(&Account::primary_from_session(&session))
            }
            Method::SignMessage => {
                self.require_session("signMessage").await?;
                let message = params
                    .get("message")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        ProviderRpcError::invalid_params("signMessage requires 'message'")
                    })?;
                let signed = self
                    .client
                    .sign_message(SignMessageParams {
                        message: message.to_owned(),
                        nonce: params
                            .get("nonce")
                            .and_then(|v| v.as_str())
                            .map(str::to_owned),
                        domain: params
                            .get("domain")
                            .and_then(|v| v.as_str())
                            .map(str::to_owned),
                    })
                    .await?;
                Ok(serde_json::Value::String(signed.signature.to_string()))
            }
            Method::PrepareExecute => {
                let session = self.require_session("prepareExecute").await?;
                let transaction = params
                    .get("tx")
                    .or_else(|| params.get("transaction"))
                    .cloned()
                    .ok_or_else(|| {
                        ProviderRpcError::invalid_params("prepareExecute requires 'tx'")
                    })?;
                self.prepare_execute(&session, transaction).await
            }
            Method::LedgerApi => {
                if !self.client.supports_ledger_api() {
                    return Err(ProviderRpcError::unsupported_method("ledgerApi"));
                }
                self.require_session("ledgerApi").await?;
                let ledger_params: LedgerApiParams = serde_json::from_value(params)
                    .map_err(|err| {
                        ProviderRpcError::invalid_params(format!("ledgerApi params: {err}"))
                    })?;
                let result = self.client.ledger_api(ledger_params).await?;
                to_json(&result)
            }
        }
    }

    async fn require_session(&self, operation: &str) -> std::result::Result<Session, ProviderRpcError> {
        self.client
            .active_session()
            .await
            .ok_or_else(|| ProviderRpcError::disconnected(operation))
    }

    /// Drive `pending → signed → executed`, or fail terminally at either
    /// step. Every emitted event carries the same command id, and a failure
    /// aborts all subsequent transitions.
    async fn prepare_execute(
        &self,
        session: &Session,
        transaction: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ProviderRpcError> {
        let command_id = CommandId::generate().to_string();

        self.emit_tx(&TxChangedEvent::Pending {
            command_id: command_id.clone(),
        });

        let signed = match self
            .client
            .sign_transaction(SignTransactionParams { transaction })
            .await
        {
            Ok(signed) => signed,
            Err(err) => {
                self.emit_tx(&TxChangedEvent::Failed {
                    command_id,
                    payload: crate::types::FailedPayload {
                        reason: err.to_string(),
                    },
                });
                return Err(err.into());
            }
        };

        self.emit_tx(&TxChangedEvent::Signed {
            command_id: command_id.clone(),
            payload: SignedPayload {
                signature: signed.signature.to_string(),
                signed_by: signed.signed_by.clone(),
                party: signed.party_id.to_string(),
            },
        });

        let receipt = match self
            .client
            .submit_transaction(SubmitTransactionParams {
                signed_tx: signed.signed_tx.clone(),
            })
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                self.emit_tx(&TxChangedEvent::Failed {
                    command_id,
                    payload: crate::types::FailedPayload {
                        reason: err.to_string(),
                    },
                });
                return Err(err.into());
            }
        };

        self.emit_tx(&TxChangedEvent::Executed {
            command_id,
            payload: crate::types::ExecutedPayload {
                update_id: receipt
                    .update_id
                    .clone()
                    .unwrap_or_else(|| receipt.transaction_hash.to_string()),
                completion_offset: receipt.completion_offset.unwrap_or(0),
            },
        });

        tracing::debug!(party = %session.party_id, "transaction executed");
        to_json(&receipt)
    }

    fn emit_tx(&self, event: &TxChangedEvent) {
        match serde_json::to_value(event) {
            Ok(payload) => self.emitter.emit(events::TX_CHANGED, &payload),
            Err(err) => tracing::warn!("txChanged serialize failed: {err}"),
        }
    }
}

impl Drop for ProviderBridge {
    fn drop(&mut self) {
        self.client.session_events().off(self.session_handler);
    }
}

/// Translate one session event into the three bridge notifications, in
/// order: status snapshot, account list, connection flag.
fn fan_out(emitter: &TopicEmitter, provider: &ProviderInfo, event: &SessionEvent) {
    match event {
        SessionEvent::Connected { session } => {
            emit_json(
                emitter,
                events::STATUS_CHANGED,
                &StatusEvent::connected(provider.clone(), session),
            );
            emit_json(
                emitter,
                events::ACCOUNTS_CHANGED,
                &vec![Account::primary_from_session(session)],
            );
            emit_json(
                emitter,
                events::CONNECTED,
                &ConnectResult {
                    is_connected: true,
                    reason: None,
                },
            );
        }
        SessionEvent::Disconnected { .. } | SessionEvent::Expired { .. } => {
            emit_json(
                emitter,
                events::STATUS_CHANGED,
                &StatusEvent::disconnected(provider.clone()),
            );
            emit_json(emitter, events::ACCOUNTS_CHANGED, &Vec::<Account>::new());
            emit_json(
                emitter,
                events::CONNECTED,
                &ConnectResult {
                    is_connected: false,
                    reason: Some("session ended".to_owned()),
                },
            );
        }
        SessionEvent::Error { error } => {
            tracing::debug!(code = error.code(), "client error event: {error}");
        }
        _ => {}
    }
}

fn emit_json<T: Serialize>(emitter: &TopicEmitter, event: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(payload) => emitter.emit(event, &payload),
        Err(err) => tracing::warn!(event = event, "event serialize failed: {err}"),
    }
}

fn to_json<T: Serialize>(value: &T) -> std::result::Result<serde_json::Value, ProviderRpcError> {
    serde_json::to_value(value).map_err(|err| {
        ProviderRpcError::new(crate::errors::CODE_INTERNAL, format!("serialize: {err}"))
    })
}
