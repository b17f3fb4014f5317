//! Client orchestration: guarded connect/disconnect and capability
//! operations over registered adapters.

use crate::contract::{
    AdapterContext, ConnectOptions, LedgerApiParams, LedgerApiResult, SignMessageParams,
    SignTransactionParams, SignedMessage, SignedTransaction, SubmitTransactionParams, TxReceipt,
    WalletAdapter,
};
use crate::guards::{capability_guard, install_guard, normalize_adapter_error};
use crate::session_manager::SessionManager;
use parking_lot::RwLock;
use partylink_core::{
    Capability, Clock, EventEmitter, KeyValueStore, OperationPhase, PartyLinkError, Result,
    Session, SessionEvent, WalletId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Application display name, shown by wallets in approval prompts.
    pub app_name: String,
    /// Network sessions are scoped to.
    pub network: String,
    /// Application origin.
    pub origin: String,
    /// Session lifetime when the wallet does not impose one, milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl_ms: Option<u64>,
}

/// The application-facing client tying adapters and sessions together.
pub struct WalletClient {
    config: ClientConfig,
    adapters: RwLock<HashMap<WalletId, Arc<dyn WalletAdapter>>>,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
}

impl WalletClient {
    /// Build a client over the injected store and clock.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            adapters: RwLock::new(HashMap::new()),
            sessions: SessionManager::new(store, Arc::clone(&clock)),
            clock,
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session event stream.
    pub fn events(&self) -> EventEmitter<SessionEvent> {
        self.sessions.events()
    }

    /// Register an adapter, replacing any previous one with the same id.
    pub fn register_adapter(&self, adapter: Arc<dyn WalletAdapter>) {
        self.adapters
            .write()
            .insert(adapter.wallet_id().clone(), adapter);
    }

    /// Ids of every registered adapter.
    pub fn registered_wallets(&self) -> Vec<WalletId> {
        self.adapters.read().keys().cloned().collect()
    }

    fn adapter(&self, wallet_id: &WalletId) -> Result<Arc<dyn WalletAdapter>> {
        self.adapters.read().get(wallet_id).cloned().ok_or_else(|| {
            PartyLinkError::internal(format!("no adapter registered for wallet '{wallet_id}'"))
        })
    }

    fn context(&self) -> AdapterContext {
        AdapterContext {
            app_name: self.config.app_name.clone(),
            network: self.config.network.clone(),
            origin: self.config.origin.clone(),
        }
    }

    /// Announce a surfaced failure on the event stream and pass it through.
    fn surface_error(&self, error: PartyLinkError) -> PartyLinkError {
        self.events().emit(&SessionEvent::Error {
            error: error.clone(),
        });
        error
    }

    /// Connect to `wallet_id`, creating a session.
    ///
    /// Runs the install guard, the connect capability guard, then the
    /// adapter. A previous session for the same wallet is fully torn down
    /// before the new one is installed.
    pub async fn connect(&self, wallet_id: &WalletId, opts: ConnectOptions) -> Result<Session> {
        let adapter = self.adapter(wallet_id)?;
        let ctx = self.context();

        install_guard(adapter.as_ref(), &ctx)
            .await
            .map_err(|err| self.surface_error(err))?;
        capability_guard(adapter.as_ref(), &[Capability::Connect])
            .map_err(|err| self.surface_error(err))?;

        let connected = adapter.connect(&ctx, &opts).await.map_err(|err| {
            self.surface_error(normalize_adapter_error(
                err,
                wallet_id,
                OperationPhase::Connect,
                None,
            ))
        })?;

        // Reconnect: tear the previous session down before installing the
        // replacement, so listeners never observe two live sessions.
        if let Some(previous) = self.sessions.remove(wallet_id).await {
            if let Err(err) = adapter.disconnect(&ctx, &previous).await {
                tracing::warn!(wallet_id = %wallet_id, "stale session disconnect failed: {err}");
            }
            self.events().emit(&SessionEvent::Disconnected {
                session: Some(previous),
            });
        }

        let now = self.clock.now_ms();
        let expires_at = connected
            .expires_at
            .or_else(|| self.config.session_ttl_ms.map(|ttl| now + ttl));
        let session = Session {
            session_id: partylink_core::SessionId::generate(),
            wallet_id: wallet_id.clone(),
            party_id: connected.party_id,
            network: self.config.network.clone(),
            created_at: now,
            expires_at,
            origin: self.config.origin.clone(),
            capabilities_snapshot: connected.capabilities,
        };

        self.sessions.install(session.clone()).await;
        self.events().emit(&SessionEvent::Connected {
            session: session.clone(),
        });
        tracing::info!(wallet_id = %wallet_id, party_id = %session.party_id, "session connected");
        Ok(session)
    }

    /// Disconnect the active session for `wallet_id`, if any.
    pub async fn disconnect(&self, wallet_id: &WalletId) -> Result<()> {
        let Some(session) = self.sessions.remove(wallet_id).await else {
            return Ok(());
        };
        let ctx = self.context();
        if let Ok(adapter) = self.adapter(wallet_id) {
            if let Err(err) = adapter.disconnect(&ctx, &session).await {
                // Local teardown proceeds regardless.
                tracing::warn!(wallet_id = %wallet_id, "wallet disconnect failed: {err}");
            }
        }
        self.events().emit(&SessionEvent::Disconnected {
            session: Some(session),
        });
        Ok(())
    }

    /// The active session for `wallet_id`, enforcing expiry.
    pub async fn active_session(&self, wallet_id: &WalletId) -> Option<Session> {
        self.sessions.active_session(wallet_id).await
    }

    /// Every active session.
    pub async fn active_sessions(&self) -> Vec<Session> {
        self.sessions.active_sessions().await
    }

    /// Restore persisted sessions through their owning adapters.
    pub async fn restore_sessions(&self) -> Vec<Session> {
        let adapters = self.adapters.read().clone();
        self.sessions
            .restore_sessions(&adapters, &self.context())
            .await
    }

    /// Sweep expired sessions, emitting `session:expired` for each.
    pub async fn expire_due_sessions(&self) -> Vec<Session> {
        self.sessions.expire_due_sessions().await
    }

    async fn session_for(
        &self,
        wallet_id: &WalletId,
        operation: &str,
    ) -> Result<Session> {
        self.sessions.active_session(wallet_id).await.ok_or_else(|| {
            PartyLinkError::disconnected(format!(
                "{operation} requires an active session with '{wallet_id}'"
            ))
        })
    }

    /// Sign a message through the wallet's adapter.
    pub async fn sign_message(
        &self,
        wallet_id: &WalletId,
        params: SignMessageParams,
    ) -> Result<SignedMessage> {
        let adapter = self.adapter(wallet_id)?;
        capability_guard(adapter.as_ref(), &[Capability::SignMessage])?;
        let session = self.session_for(wallet_id, "signMessage").await?;
        adapter
            .sign_message(&self.context(), &session, &params)
            .await
            .map_err(|err| {
                self.surface_error(normalize_adapter_error(
                    err,
                    wallet_id,
                    OperationPhase::SignMessage,
                    None,
                ))
            })
    }

    /// Sign a transaction through the wallet's adapter.
    pub async fn sign_transaction(
        &self,
        wallet_id: &WalletId,
        params: SignTransactionParams,
    ) -> Result<SignedTransaction> {
        let adapter = self.adapter(wallet_id)?;
        capability_guard(adapter.as_ref(), &[Capability::SignTransaction])?;
        let session = self.session_for(wallet_id, "signTransaction").await?;
        adapter
            .sign_transaction(&self.context(), &session, &params)
            .await
            .map_err(|err| {
                self.surface_error(normalize_adapter_error(
                    err,
                    wallet_id,
                    OperationPhase::SignTransaction,
                    None,
                ))
            })
    }

    /// Submit a signed transaction through the wallet's adapter.
    pub async fn submit_transaction(
        &self,
        wallet_id: &WalletId,
        params: SubmitTransactionParams,
    ) -> Result<TxReceipt> {
        let adapter = self.adapter(wallet_id)?;
        capability_guard(adapter.as_ref(), &[Capability::SubmitTransaction])?;
        let session = self.session_for(wallet_id, "submitTransaction").await?;
        adapter
            .submit_transaction(&self.context(), &session, &params)
            .await
            .map_err(|err| {
                self.surface_error(normalize_adapter_error(
                    err,
                    wallet_id,
                    OperationPhase::SubmitTransaction,
                    None,
                ))
            })
    }

    /// Whether the wallet's adapter declares the ledger API capability.
    pub fn supports_ledger_api(&self, wallet_id: &WalletId) -> bool {
        self.adapters
            .read()
            .get(wallet_id)
            .map(|adapter| adapter.capabilities().contains(Capability::LedgerApi))
            .unwrap_or(false)
    }

    /// Proxy a raw ledger API request through the wallet's adapter.
    pub async fn ledger_api(
        &self,
        wallet_id: &WalletId,
        params: LedgerApiParams,
    ) -> Result<LedgerApiResult> {
        let adapter = self.adapter(wallet_id)?;
        capability_guard(adapter.as_ref(), &[Capability::LedgerApi])?;
        let session = self.session_for(wallet_id, "ledgerApi").await?;
        adapter
            .ledger_api(&self.context(), &session, &params)
            .await
            .map_err(|err| {
                self.surface_error(normalize_adapter_error(
                    err,
                    wallet_id,
                    OperationPhase::Other,
                    None,
                ))
            })
    }
}
