//! CIP-0103 conformance gate.
//!
//! Intentionally strict: if any of these fail, the provider surface is not
//! compliant. Exercises exact payload shapes, the numeric error model, the
//! transaction-lifecycle discriminated union, and event wiring.

use partylink_adapter::{
    LedgerApiParams, LedgerApiResult, SignMessageParams, SignTransactionParams, SignedMessage,
    SignedTransaction, SubmitTransactionParams, TxReceipt,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use partylink_core::{
    Capability, CapabilitySet, EventEmitter, PartyId, PartyLinkError, Result, Session,
    SessionEvent, Signature, TransactionHash, WalletId,
};
use partylink_provider::{
    events, BridgeableClient, Method, ProviderBridge, ProviderRpcError, RpcRequest,
    CODE_DISCONNECTED, CODE_UNSUPPORTED_METHOD, MANDATORY_METHODS,
};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

fn sample_session() -> Session {
    Session::new(
        WalletId::new("console"),
        PartyId::new("party-gate-abc"),
        "devnet",
        "https://app.example",
        CapabilitySet::from([
            Capability::Connect,
            Capability::SignMessage,
            Capability::SignTransaction,
            Capability::SubmitTransaction,
            Capability::LedgerApi,
        ]),
        1_000,
        Some(3_600_000),
    )
}

#[derive(Default)]
struct Script {
    connect_error: Option<PartyLinkError>,
    sign_tx_error: Option<PartyLinkError>,
    submit_error: Option<PartyLinkError>,
    no_ledger_api: bool,
    start_disconnected: bool,
}

struct ScriptedClient {
    session: Mutex<Option<Session>>,
    script: Script,
    events: EventEmitter<SessionEvent>,
}

impl ScriptedClient {
    fn new(script: Script) -> Arc<Self> {
        let session = if script.start_disconnected {
            None
        } else {
            Some(sample_session())
        };
        Arc::new(Self {
            session: Mutex::new(session),
            script,
            events: EventEmitter::new(),
        })
    }
}

#[async_trait]
impl BridgeableClient for ScriptedClient {
    async fn connect(&self) -> Result<Session> {
        if let Some(error) = self.script.connect_error.clone() {
            return Err(error);
        }
        let session = sample_session();
        *self.session.lock() = Some(session.clone());
        Ok(session)
    }

    async fn disconnect(&self) -> Result<()> {
        *self.session.lock() = None;
        Ok(())
    }

    async fn active_session(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    async fn sign_message(&self, _params: SignMessageParams) -> Result<SignedMessage> {
        Ok(SignedMessage {
            signature: Signature::new("sig-gate-xyz"),
            party_id: PartyId::new("party-gate-abc"),
            message: "test".into(),
        })
    }

    async fn sign_transaction(&self, params: SignTransactionParams) -> Result<SignedTransaction> {
        if let Some(error) = self.script.sign_tx_error.clone() {
            return Err(error);
        }
        Ok(SignedTransaction {
            transaction_hash: TransactionHash::new("tx-gate-hash"),
            signed_tx: json!({ "transaction": params.transaction, "signature": "sig-tx" }),
            party_id: PartyId::new("party-gate-abc"),
            signature: Signature::new("sig-tx"),
            signed_by: "key-gate-1".into(),
        })
    }

    async fn submit_transaction(&self, _params: SubmitTransactionParams) -> Result<TxReceipt> {
        if let Some(error) = self.script.submit_error.clone() {
            return Err(error);
        }
        Ok(TxReceipt {
            transaction_hash: TransactionHash::new("tx-gate-hash"),
            submitted_at: 2_000,
            command_id: Some("cmd-gate-1".into()),
            update_id: Some("update-gate-1".into()),
            completion_offset: Some(7),
        })
    }

    fn supports_ledger_api(&self) -> bool {
        !self.script.no_ledger_api
    }

    async fn ledger_api(&self, params: LedgerApiParams) -> Result<LedgerApiResult> {
        Ok(LedgerApiResult {
            response: json!({
                "method": params.request_method,
                "resource": params.resource,
            })
            .to_string(),
        })
    }

    fn session_events(&self) -> EventEmitter<SessionEvent> {
        self.events.clone()
    }
}

fn bridge(script: Script) -> (ProviderBridge, Arc<ScriptedClient>) {
    let client = ScriptedClient::new(script);
    let bridge = ProviderBridge::new(Arc::clone(&client) as Arc<dyn BridgeableClient>);
    (bridge, client)
}

fn tx_events(bridge: &ProviderBridge) -> Arc<Mutex<Vec<serde_json::Value>>> {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&collected);
    bridge.on(events::TX_CHANGED, move |payload| {
        sink.lock().push(payload.clone());
    });
    collected
}

// ─── Mandatory methods ──────────────────────────────────────────────────────

#[tokio::test]
async fn every_mandatory_method_resolves_or_rejects_typed() {
    for method in MANDATORY_METHODS {
        let (bridge, _client) = bridge(Script::default());
        match bridge.request(RpcRequest::with_params(method, json!({
            "message": "m",
            "tx": {},
            "requestMethod": "GET",
            "resource": "/v1/state/acs",
        }))).await {
            Ok(_) => {}
            Err(err) => {
                // Typed error with a numeric code; never a raw failure.
                let _: i64 = err.code;
                assert!(!err.message.is_empty(), "{method} error has a message");
            }
        }
    }
    // And every mandatory name parses to a method.
    for method in MANDATORY_METHODS {
        assert!(Method::from_str(method).is_ok());
    }
}

// ─── Payload shapes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_yields_is_connected_true() {
    let (bridge, _client) = bridge(Script {
        start_disconnected: true,
        ..Script::default()
    });
    let result = bridge
        .request(RpcRequest::method("connect"))
        .await
        .expect("connect");
    assert_eq!(result["isConnected"], json!(true));
}

#[tokio::test]
async fn is_connected_reports_reason_when_disconnected() {
    let (bridge, _client) = bridge(Script {
        start_disconnected: true,
        ..Script::default()
    });
    let result = bridge
        .request(RpcRequest::method("isConnected"))
        .await
        .expect("isConnected");
    assert_eq!(result["isConnected"], json!(false));
    assert!(result["reason"].is_string());
}

#[tokio::test]
async fn status_carries_all_required_fields() {
    let (bridge, _client) = bridge(Script::default());
    let result = bridge
        .request(RpcRequest::method("status"))
        .await
        .expect("status");

    assert_eq!(result["connection"]["isConnected"], json!(true));
    assert!(result["provider"]["id"].is_string());
    assert!(result["provider"]["version"].is_string());
    assert!(result["provider"]["providerType"].is_string());
    assert!(result["network"]["networkId"]
        .as_str()
        .expect("networkId")
        .starts_with("canton:"));
    assert!(result["session"]["userId"].is_string());
}

#[tokio::test]
async fn get_active_network_is_caip2() {
    let (bridge, _client) = bridge(Script::default());
    let result = bridge
        .request(RpcRequest::method("getActiveNetwork"))
        .await
        .expect("network");
    assert_eq!(result["networkId"], json!("canton:devnet"));
}

#[tokio::test]
async fn list_accounts_yields_fully_populated_accounts() {
    let (bridge, _client) = bridge(Script::default());
    let result = bridge
        .request(RpcRequest::method("listAccounts"))
        .await
        .expect("accounts");
    let accounts = result.as_array().expect("array");
    assert!(!accounts.is_empty());
    let account = &accounts[0];
    assert!(account["primary"].is_boolean());
    assert!(account["partyId"].is_string());
    assert!(matches!(
        account["status"].as_str(),
        Some("initializing") | Some("allocated")
    ));
    assert!(account["hint"].is_string());
    assert!(account["publicKey"].is_string());
    assert!(account["namespace"].is_string());
    assert!(account["networkId"].is_string());
    assert!(account["signingProviderId"].is_string());
}

#[tokio::test]
async fn get_primary_account_is_primary() {
    let (bridge, _client) = bridge(Script::default());
    let result = bridge
        .request(RpcRequest::method("getPrimaryAccount"))
        .await
        .expect("primary account");
    assert_eq!(result["primary"], json!(true));
    assert!(!result["partyId"].as_str().expect("partyId").is_empty());
}

#[tokio::test]
async fn sign_message_yields_a_signature_string() {
    let (bridge, _client) = bridge(Script::default());
    let result = bridge
        .request(RpcRequest::with_params("signMessage", json!({ "message": "test" })))
        .await
        .expect("signature");
    assert!(!result.as_str().expect("string").is_empty());
}

#[tokio::test]
async fn disconnect_yields_null() {
    let (bridge, _client) = bridge(Script::default());
    let result = bridge
        .request(RpcRequest::method("disconnect"))
        .await
        .expect("disconnect");
    assert!(result.is_null());
}

// ─── Transaction lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn prepare_execute_emits_pending_signed_executed() {
    let (bridge, _client) = bridge(Script::default());
    let collected = tx_events(&bridge);

    bridge
        .request(RpcRequest::with_params("prepareExecute", json!({ "tx": { "dummy": true } })))
        .await
        .expect("executed");

    let events = collected.lock().clone();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["status"], "pending");
    assert_eq!(events[1]["status"], "signed");
    assert_eq!(events[2]["status"], "executed");

    // Shapes.
    assert!(!events[0]["commandId"].as_str().expect("commandId").is_empty());
    assert!(!events[1]["payload"]["signature"]
        .as_str()
        .expect("signature")
        .is_empty());
    assert_eq!(events[1]["payload"]["signedBy"], "key-gate-1");
    assert_eq!(events[1]["payload"]["party"], "party-gate-abc");
    assert_eq!(events[2]["payload"]["updateId"], "update-gate-1");
    assert!(events[2]["payload"]["completionOffset"].is_number());

    // One command id spans the walk.
    let command_id = events[0]["commandId"].clone();
    assert_eq!(events[1]["commandId"], command_id);
    assert_eq!(events[2]["commandId"], command_id);
}

#[tokio::test]
async fn sign_failure_emits_pending_then_failed() {
    let (bridge, _client) = bridge(Script {
        sign_tx_error: Some(PartyLinkError::user_rejected("user rejected")),
        ..Script::default()
    });
    let collected = tx_events(&bridge);

    let err = bridge
        .request(RpcRequest::with_params("prepareExecute", json!({ "tx": {} })))
        .await
        .expect_err("sign failed");
    let _: ProviderRpcError = err;

    let statuses: Vec<String> = collected
        .lock()
        .iter()
        .map(|e| e["status"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(statuses, vec!["pending", "failed"]);
}

#[tokio::test]
async fn submit_failure_emits_pending_signed_failed() {
    let (bridge, _client) = bridge(Script {
        submit_error: Some(PartyLinkError::transport("network error")),
        ..Script::default()
    });
    let collected = tx_events(&bridge);

    bridge
        .request(RpcRequest::with_params("prepareExecute", json!({ "tx": {} })))
        .await
        .expect_err("submit failed");

    let statuses: Vec<String> = collected
        .lock()
        .iter()
        .map(|e| e["status"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(statuses, vec!["pending", "signed", "failed"]);
}

// ─── Error model ────────────────────────────────────────────────────────────

#[tokio::test]
async fn raw_client_failures_become_typed_rpc_errors() {
    let (bridge, _client) = bridge(Script {
        connect_error: Some(PartyLinkError::internal("generic failure")),
        start_disconnected: true,
        ..Script::default()
    });
    let err = bridge
        .request(RpcRequest::method("connect"))
        .await
        .expect_err("connect failed");
    let _: i64 = err.code;
    assert!(!err.message.is_empty());
}

#[tokio::test]
async fn unknown_method_is_4200() {
    let (bridge, _client) = bridge(Script::default());
    let err = bridge
        .request(RpcRequest::method("__nonexistent__"))
        .await
        .expect_err("unknown method");
    assert_eq!(err.code, CODE_UNSUPPORTED_METHOD);
}

#[tokio::test]
async fn disconnected_account_access_is_4900() {
    let (bridge, _client) = bridge(Script {
        start_disconnected: true,
        ..Script::default()
    });
    let err = bridge
        .request(RpcRequest::method("getPrimaryAccount"))
        .await
        .expect_err("disconnected");
    assert_eq!(err.code, CODE_DISCONNECTED);
}

// ─── Event wiring ───────────────────────────────────────────────────────────

#[tokio::test]
async fn session_connected_fans_out_in_order() {
    let (bridge, client) = bridge(Script::default());
    let order = Arc::new(Mutex::new(Vec::new()));
    for event in [events::STATUS_CHANGED, events::ACCOUNTS_CHANGED, events::CONNECTED] {
        let order = Arc::clone(&order);
        bridge.on(event, move |payload| {
            order.lock().push((event, payload.clone()));
        });
    }

    client.events.emit(&SessionEvent::Connected {
        session: sample_session(),
    });

    let observed = order.lock().clone();
    assert_eq!(observed.len(), 3);
    assert_eq!(observed[0].0, events::STATUS_CHANGED);
    assert_eq!(observed[0].1["connection"]["isConnected"], json!(true));
    assert!(observed[0].1["provider"]["id"].is_string());
    assert_eq!(observed[1].0, events::ACCOUNTS_CHANGED);
    assert_eq!(observed[1].1[0]["primary"], json!(true));
    assert_eq!(observed[1].1[0]["partyId"], "party-gate-abc");
    assert_eq!(observed[2].0, events::CONNECTED);
    assert_eq!(observed[2].1["isConnected"], json!(true));
}

#[tokio::test]
async fn session_disconnected_fans_out_disconnected_snapshot() {
    let (bridge, client) = bridge(Script::default());
    let statuses = Arc::new(Mutex::new(Vec::new()));
    {
        let statuses = Arc::clone(&statuses);
        bridge.on(events::STATUS_CHANGED, move |payload| {
            statuses.lock().push(payload.clone());
        });
    }

    client.events.emit(&SessionEvent::Disconnected { session: None });

    let observed = statuses.lock().clone();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0]["connection"]["isConnected"], json!(false));
}

// ─── LedgerApi ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn ledger_api_proxies_when_supported() {
    let (bridge, _client) = bridge(Script::default());
    let result = bridge
        .request(RpcRequest::with_params(
            "ledgerApi",
            json!({ "requestMethod": "GET", "resource": "/v1/state/acs" }),
        ))
        .await
        .expect("proxied");
    assert!(result["response"].is_string());
}

#[tokio::test]
async fn ledger_api_without_support_is_4200() {
    let (bridge, _client) = bridge(Script {
        no_ledger_api: true,
        ..Script::default()
    });
    let err = bridge
        .request(RpcRequest::with_params(
            "ledgerApi",
            json!({ "requestMethod": "GET", "resource": "/" }),
        ))
        .await
        .expect_err("unsupported");
    assert_eq!(err.code, CODE_UNSUPPORTED_METHOD);
}
