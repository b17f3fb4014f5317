//! Injected transport: structured hand-off with the same correlation rules.

use partylink_transport::{
    ConnectRequest, InjectedProvider, InjectedTransport, Transport, TransportOptions,
};
use async_trait::async_trait;
use partylink_core::{Clock, PartyLinkError, Result};
use partylink_testkit::ManualClock;
use serde_json::json;
use std::sync::Arc;

enum Script {
    EchoParty(&'static str),
    WrongStateEcho,
    Fail,
}

struct ScriptedProvider {
    script: Script,
}

#[async_trait]
impl InjectedProvider for ScriptedProvider {
    async fn handle_connect(&self, request: serde_json::Value) -> Result<serde_json::Value> {
        let state = request["state"].as_str().unwrap_or_default().to_owned();
        match self.script {
            Script::EchoParty(party) => Ok(json!({ "state": state, "partyId": party })),
            Script::WrongStateEcho => Ok(json!({ "state": "not-the-nonce", "partyId": "party::x" })),
            Script::Fail => Err(PartyLinkError::user_rejected("declined in wallet")),
        }
    }

    async fn handle_sign(&self, request: serde_json::Value) -> Result<serde_json::Value> {
        let state = request["state"].as_str().unwrap_or_default().to_owned();
        Ok(json!({ "state": state, "signature": "sig-injected" }))
    }
}

fn rig(script: Script) -> (Arc<InjectedTransport>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let transport = Arc::new(InjectedTransport::new(
        Arc::new(ScriptedProvider { script }),
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    (transport, clock)
}

fn request() -> ConnectRequest {
    ConnectRequest {
        app_name: "Demo".into(),
        origin: "https://app.example".into(),
        network: "devnet".into(),
        requested_capabilities: None,
        state: None,
        redirect_uri: None,
    }
}

fn options(timeout_ms: u64) -> TransportOptions {
    TransportOptions::new("https://app.example").with_timeout_ms(timeout_ms)
}

#[tokio::test]
async fn structured_response_resolves() {
    let (transport, _clock) = rig(Script::EchoParty("party::alice"));
    let response = transport
        .open_connect_request("", request(), &options(60_000))
        .await
        .expect("response");
    assert_eq!(
        response.party_id.map(|p| p.to_string()),
        Some("party::alice".to_owned())
    );
}

#[tokio::test]
async fn wrong_state_echo_is_dropped_and_the_wait_times_out() {
    let (transport, clock) = rig(Script::WrongStateEcho);
    let pending = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            transport
                .open_connect_request("", request(), &options(300))
                .await
        })
    };
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert!(!pending.is_finished());

    clock.advance(300);
    let err = pending.await.expect("task").expect_err("timed out");
    assert_eq!(err.code(), "TIMEOUT");
}

#[tokio::test]
async fn provider_failure_surfaces_as_a_response_error() {
    let (transport, _clock) = rig(Script::Fail);
    let response = transport
        .open_connect_request("", request(), &options(60_000))
        .await
        .expect("response with error payload");
    let error = response.error.expect("wallet-reported error");
    assert_eq!(error.code, "USER_REJECTED");
}

#[tokio::test]
async fn sign_request_round_trips() {
    let (transport, _clock) = rig(Script::EchoParty("party::alice"));
    let response = transport
        .open_sign_request(
            "",
            partylink_transport::SignRequest {
                message: Some("hello".into()),
                transaction: None,
                state: None,
                redirect_uri: None,
            },
            &options(60_000),
        )
        .await
        .expect("response");
    assert_eq!(response.signature.as_deref(), Some("sig-injected"));
}
