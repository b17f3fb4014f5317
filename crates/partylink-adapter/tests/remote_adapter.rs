//! Transport-routed adapter: connect mapping, wallet-reported errors, and
//! asynchronous approval jobs driven by polling.

use partylink_adapter::{
    AdapterContext, ConnectOptions, RemoteWalletAdapter, RemoteWalletConfig, SignMessageParams,
    WalletAdapter,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use partylink_core::{
    Capability, CapabilitySet, Clock, PartyId, Result, Session, TransportKind, WalletId,
};
use partylink_testkit::ManualClock;
use partylink_transport::{
    ConnectRequest, ConnectResponse, JobOutcome, JobState, JobStatus, ResponseError, SignRequest,
    SignResponse, Transport, TransportOptions,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// Transport scripted per call, independent of generated state nonces.
#[derive(Default)]
struct ScriptedTransport {
    connect_script: Mutex<Option<ConnectResponse>>,
    sign_script: Mutex<Option<SignResponse>>,
    job_script: Mutex<VecDeque<JobStatus>>,
    polls: Mutex<u32>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open_connect_request(
        &self,
        _endpoint: &str,
        request: ConnectRequest,
        _options: &TransportOptions,
    ) -> Result<ConnectResponse> {
        let state = request.state.unwrap_or_default();
        let mut response = self
            .connect_script
            .lock()
            .clone()
            .unwrap_or(ConnectResponse {
                state: String::new(),
                party_id: Some(PartyId::new("party::remote")),
                session_token: None,
                expires_at: None,
                capabilities: None,
                error: None,
            });
        response.state = state;
        Ok(response)
    }

    async fn open_sign_request(
        &self,
        _endpoint: &str,
        request: SignRequest,
        _options: &TransportOptions,
    ) -> Result<SignResponse> {
        let state = request.state.unwrap_or_default();
        let mut response = self.sign_script.lock().clone().unwrap_or(SignResponse {
            state: String::new(),
            signature: Some("sig-remote".into()),
            transaction_hash: None,
            job_id: None,
            error: None,
        });
        response.state = state;
        Ok(response)
    }

    async fn poll_job_status(
        &self,
        job_id: &str,
        _endpoint: &str,
        _options: &TransportOptions,
    ) -> Result<JobStatus> {
        *self.polls.lock() += 1;
        let mut script = self.job_script.lock();
        if script.len() > 1 {
            Ok(script.pop_front().unwrap_or_else(|| JobStatus {
                job_id: job_id.to_owned(),
                status: JobState::Expired,
                result: None,
                error: None,
            }))
        } else {
            script.front().cloned().ok_or_else(|| {
                partylink_core::PartyLinkError::transport("no job script")
            })
        }
    }
}

fn remote_config() -> RemoteWalletConfig {
    RemoteWalletConfig {
        wallet_id: WalletId::new("custodial"),
        name: "Custodial Wallet".into(),
        endpoint: "https://custodial.example/connect".into(),
        status_endpoint: Some("https://custodial.example/jobs".into()),
        capabilities: CapabilitySet::from([
            Capability::Connect,
            Capability::Disconnect,
            Capability::SignMessage,
        ]),
        allowed_origins: vec!["https://custodial.example".into()],
        timeout_ms: 60_000,
        transport_kind: TransportKind::Popup,
        poll_interval_ms: 10,
        max_polls: 10,
    }
}

fn ctx() -> AdapterContext {
    AdapterContext {
        app_name: "Demo".into(),
        network: "devnet".into(),
        origin: "https://app.example".into(),
    }
}

fn session(adapter: &RemoteWalletAdapter) -> Session {
    Session::new(
        adapter.wallet_id().clone(),
        PartyId::new("party::remote"),
        "devnet",
        "https://app.example",
        adapter.capabilities(),
        1_000,
        None,
    )
}

fn rig(transport: ScriptedTransport) -> (RemoteWalletAdapter, Arc<ScriptedTransport>, Arc<ManualClock>) {
    let transport = Arc::new(transport);
    let clock = Arc::new(ManualClock::new());
    let adapter = RemoteWalletAdapter::new(
        remote_config(),
        transport.clone() as Arc<dyn Transport>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    (adapter, transport, clock)
}

#[tokio::test]
async fn connect_maps_the_transport_response() {
    let (adapter, _transport, _clock) = rig(ScriptedTransport::default());
    let connected = adapter
        .connect(&ctx(), &ConnectOptions::default())
        .await
        .expect("connected");
    assert_eq!(connected.party_id.as_str(), "party::remote");
    assert!(connected.capabilities.contains(Capability::SignMessage));
}

#[tokio::test]
async fn wallet_reported_rejection_maps_to_user_rejected() {
    let transport = ScriptedTransport::default();
    *transport.connect_script.lock() = Some(ConnectResponse {
        state: String::new(),
        party_id: None,
        session_token: None,
        expires_at: None,
        capabilities: None,
        error: Some(ResponseError {
            code: "USER_REJECTED".into(),
            message: "declined".into(),
        }),
    });
    let (adapter, _transport, _clock) = rig(transport);

    let err = adapter
        .connect(&ctx(), &ConnectOptions::default())
        .await
        .expect_err("rejected");
    assert_eq!(err.code(), "USER_REJECTED");
    let context = err.context.expect("context");
    assert_eq!(context.transport, Some(TransportKind::Popup));
}

#[tokio::test]
async fn sign_returns_the_signature_synchronously() {
    let (adapter, _transport, _clock) = rig(ScriptedTransport::default());
    let session = session(&adapter);
    let signed = adapter
        .sign_message(
            &ctx(),
            &session,
            &SignMessageParams {
                message: "hello".into(),
                nonce: None,
                domain: None,
            },
        )
        .await
        .expect("signed");
    assert_eq!(signed.signature.as_str(), "sig-remote");
}

#[tokio::test]
async fn approval_job_is_polled_to_completion() {
    let transport = ScriptedTransport::default();
    *transport.sign_script.lock() = Some(SignResponse {
        state: String::new(),
        signature: None,
        transaction_hash: None,
        job_id: Some("job-7".into()),
        error: None,
    });
    transport.job_script.lock().extend([
        JobStatus {
            job_id: "job-7".into(),
            status: JobState::Pending,
            result: None,
            error: None,
        },
        JobStatus {
            job_id: "job-7".into(),
            status: JobState::Pending,
            result: None,
            error: None,
        },
        JobStatus {
            job_id: "job-7".into(),
            status: JobState::Approved,
            result: Some(JobOutcome {
                signature: Some("sig-approved".into()),
                transaction_hash: None,
            }),
            error: None,
        },
    ]);
    let (adapter, transport, clock) = rig(transport);
    let session = session(&adapter);

    let pending = tokio::spawn(async move {
        adapter
            .sign_message(
                &ctx(),
                &session,
                &SignMessageParams {
                    message: "hello".into(),
                    nonce: None,
                    domain: None,
                },
            )
            .await
    });
    // Walk the manual clock so the poll delays elapse.
    for _ in 0..10 {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        clock.advance(10);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let signed = pending.await.expect("task").expect("approved");
    assert_eq!(signed.signature.as_str(), "sig-approved");
    assert!(*transport.polls.lock() >= 3);
}

#[tokio::test]
async fn denied_job_maps_to_user_rejected() {
    let transport = ScriptedTransport::default();
    *transport.sign_script.lock() = Some(SignResponse {
        state: String::new(),
        signature: None,
        transaction_hash: None,
        job_id: Some("job-8".into()),
        error: None,
    });
    transport.job_script.lock().push_back(JobStatus {
        job_id: "job-8".into(),
        status: JobState::Denied,
        result: None,
        error: None,
    });
    let (adapter, _transport, _clock) = rig(transport);
    let session = session(&adapter);

    let err = adapter
        .sign_message(
            &ctx(),
            &session,
            &SignMessageParams {
                message: "hello".into(),
                nonce: None,
                domain: None,
            },
        )
        .await
        .expect_err("denied");
    assert_eq!(err.code(), "USER_REJECTED");
}
