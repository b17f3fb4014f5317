//! [`BridgeableClient`] implementation binding a [`WalletClient`] to one
//! chosen wallet.

use crate::bridge::BridgeableClient;
use async_trait::async_trait;
use partylink_adapter::{
    ConnectOptions, LedgerApiParams, LedgerApiResult, SignMessageParams, SignTransactionParams,
    SignedMessage, SignedTransaction, SubmitTransactionParams, TxReceipt, WalletClient,
};
use partylink_core::{EventEmitter, Result, Session, SessionEvent, WalletId};
use std::sync::Arc;

/// A wallet client bound to one wallet selection.
pub struct BoundClient {
    client: Arc<WalletClient>,
    wallet_id: WalletId,
    connect_options: ConnectOptions,
}

impl BoundClient {
    /// Bind `client` to `wallet_id`.
    pub fn new(client: Arc<WalletClient>, wallet_id: WalletId) -> Self {
        Self {
            client,
            wallet_id,
            connect_options: ConnectOptions::default(),
        }
    }

    /// Override the options used for bridge-initiated connects.
    pub fn with_connect_options(mut self, connect_options: ConnectOptions) -> Self {
        self.connect_options = connect_options;
        self
    }

    /// The bound wallet.
    pub fn wallet_id(&self) -> &WalletId {
        &self.wallet_id
    }
}

#[async_trait]
impl BridgeableClient for BoundClient {
    async fn connect(&self) -> Result<Session> {
        self.client
            .connect(&self.wallet_id, self.connect_options.clone())
            .await
    }

    async fn disconnect(&self) -> Result<()> {
        self.client.disconnect(&self.wallet_id).await
    }

    async fn active_session(&self) -> Option<Session> {
        self.client.active_session(&self.wallet_id).await
    }

    async fn sign_message(&self, params: SignMessageParams) -> Result<SignedMessage> {
        self.client.sign_message(&self.wallet_id, params).await
    }

    async fn sign_transaction(&self, params: SignTransactionParams) -> Result<SignedTransaction> {
        self.client.sign_transaction(&self.wallet_id, params).await
    }

    async fn submit_transaction(&self, params: SubmitTransactionParams) -> Result<TxReceipt> {
        self.client
            .submit_transaction(&self.wallet_id, params)
            .await
    }

    fn supports_ledger_api(&self) -> bool {
        self.client.supports_ledger_api(&self.wallet_id)
    }

    async fn ledger_api(&self, params: LedgerApiParams) -> Result<LedgerApiResult> {
        self.client.ledger_api(&self.wallet_id, params).await
    }

    fn session_events(&self) -> EventEmitter<SessionEvent> {
        self.client.events()
    }
}
