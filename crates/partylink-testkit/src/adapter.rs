//! Scriptable wallet adapter with a call recorder.

use async_trait::async_trait;
use parking_lot::Mutex;
use partylink_adapter::{
    AdapterConnectResult, AdapterContext, ConnectOptions, DetectResult, LedgerApiParams,
    LedgerApiResult, SignMessageParams, SignTransactionParams, SignedMessage, SignedTransaction,
    SubmitTransactionParams, TxReceipt, WalletAdapter,
};
use partylink_core::{
    Capability, CapabilitySet, PartyId, PartyLinkError, Result, Session, Signature,
    TransactionHash, WalletId,
};

/// A wallet adapter whose behavior tests script call by call.
///
/// Every invocation is appended to the call log, so tests can assert not
/// only outcomes but also that guards prevented calls from happening.
pub struct MockAdapter {
    wallet_id: WalletId,
    party_id: PartyId,
    installed: Mutex<(bool, Option<String>)>,
    capabilities: Mutex<CapabilitySet>,
    connect_error: Mutex<Option<PartyLinkError>>,
    restore_live: Mutex<bool>,
    expires_at: Mutex<Option<u64>>,
    calls: Mutex<Vec<String>>,
}

impl MockAdapter {
    /// A mock wallet `id` authenticated as `party::<id>`.
    pub fn new(id: &str) -> Self {
        Self {
            wallet_id: WalletId::new(id),
            party_id: PartyId::new(format!("party::{id}")),
            installed: Mutex::new((true, None)),
            capabilities: Mutex::new(CapabilitySet::from([
                Capability::Connect,
                Capability::Disconnect,
                Capability::SignMessage,
                Capability::SignTransaction,
                Capability::SubmitTransaction,
            ])),
            connect_error: Mutex::new(None),
            restore_live: Mutex::new(true),
            expires_at: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script the install probe.
    pub fn set_installed(&self, installed: bool, reason: Option<&str>) {
        *self.installed.lock() = (installed, reason.map(str::to_owned));
    }

    /// Replace the declared capability set.
    pub fn set_capabilities(&self, capabilities: impl Into<CapabilitySet>) {
        *self.capabilities.lock() = capabilities.into();
    }

    /// Make the next connect attempts fail with `error`.
    pub fn set_connect_error(&self, error: Option<PartyLinkError>) {
        *self.connect_error.lock() = error;
    }

    /// Script whether the wallet still reports persisted sessions live.
    pub fn set_restore_live(&self, live: bool) {
        *self.restore_live.lock() = live;
    }

    /// Script the wallet-imposed session expiry.
    pub fn set_expires_at(&self, expires_at: Option<u64>) {
        *self.expires_at.lock() = expires_at;
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_owned());
    }
}

#[async_trait]
impl WalletAdapter for MockAdapter {
    fn wallet_id(&self) -> &WalletId {
        &self.wallet_id
    }

    fn name(&self) -> &str {
        "Mock Wallet"
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities.lock().clone()
    }

    async fn detect_installed(&self, _ctx: &AdapterContext) -> DetectResult {
        self.record("detectInstalled");
        let (installed, reason) = self.installed.lock().clone();
        DetectResult { installed, reason }
    }

    async fn connect(
        &self,
        _ctx: &AdapterContext,
        _opts: &ConnectOptions,
    ) -> Result<AdapterConnectResult> {
        self.record("connect");
        if let Some(error) = self.connect_error.lock().clone() {
            return Err(error);
        }
        Ok(AdapterConnectResult {
            party_id: self.party_id.clone(),
            expires_at: *self.expires_at.lock(),
            capabilities: self.capabilities.lock().clone(),
        })
    }

    async fn disconnect(&self, _ctx: &AdapterContext, _session: &Session) -> Result<()> {
        self.record("disconnect");
        Ok(())
    }

    async fn restore(&self, _ctx: &AdapterContext, persisted: &Session) -> Result<Option<Session>> {
        self.record("restore");
        if *self.restore_live.lock() {
            Ok(Some(persisted.clone()))
        } else {
            Ok(None)
        }
    }

    async fn sign_message(
        &self,
        _ctx: &AdapterContext,
        session: &Session,
        params: &SignMessageParams,
    ) -> Result<SignedMessage> {
        self.record("signMessage");
        Ok(SignedMessage {
            signature: Signature::new(format!("mock-sig({})", params.message)),
            party_id: session.party_id.clone(),
            message: params.message.clone(),
        })
    }

    async fn sign_transaction(
        &self,
        _ctx: &AdapterContext,
        session: &Session,
        params: &SignTransactionParams,
    ) -> Result<SignedTransaction> {
        self.record("signTransaction");
        Ok(SignedTransaction {
            transaction_hash: TransactionHash::new("tx-mock-hash"),
            signed_tx: serde_json::json!({
                "transaction": params.transaction,
                "signature": "mock-tx-sig",
            }),
            party_id: session.party_id.clone(),
            signature: Signature::new("mock-tx-sig"),
            signed_by: session.party_id.to_string(),
        })
    }

    async fn submit_transaction(
        &self,
        _ctx: &AdapterContext,
        _session: &Session,
        _params: &SubmitTransactionParams,
    ) -> Result<TxReceipt> {
        self.record("submitTransaction");
        Ok(TxReceipt {
            transaction_hash: TransactionHash::new("tx-mock-hash"),
            submitted_at: 0,
            command_id: Some("cmd-mock".to_owned()),
            update_id: Some("update-mock".to_owned()),
            completion_offset: Some(42),
        })
    }

    async fn ledger_api(
        &self,
        _ctx: &AdapterContext,
        _session: &Session,
        params: &LedgerApiParams,
    ) -> Result<LedgerApiResult> {
        self.record("ledgerApi");
        Ok(LedgerApiResult {
            response: serde_json::json!({
                "method": params.request_method,
                "resource": params.resource,
            })
            .to_string(),
        })
    }
}
