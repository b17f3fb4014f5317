//! Deep-link transport: navigation, the best-effort secondary-window
//! fallback, and callback correlation.

use partylink_transport::{
    CallbackMessage, DeepLinkTransport, LinkLauncher, SignRequest, Transport, TransportOptions,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use partylink_core::{Clock, PartyLinkError, Result};
use partylink_testkit::ManualClock;
use serde_json::json;
use std::sync::Arc;

#[derive(Default)]
struct FakeLauncher {
    navigate_fails: bool,
    window_fails: bool,
    navigations: Mutex<Vec<String>>,
    windows: Mutex<Vec<String>>,
}

#[async_trait]
impl LinkLauncher for FakeLauncher {
    async fn navigate(&self, url: &str) -> Result<()> {
        if self.navigate_fails {
            return Err(PartyLinkError::transport("navigation blocked"));
        }
        self.navigations.lock().push(url.to_owned());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        if self.window_fails {
            return Err(PartyLinkError::transport("window blocked"));
        }
        self.windows.lock().push(url.to_owned());
        Ok(())
    }
}

fn rig(launcher: FakeLauncher) -> (Arc<DeepLinkTransport>, Arc<FakeLauncher>, Arc<ManualClock>) {
    let launcher = Arc::new(launcher);
    let clock = Arc::new(ManualClock::new());
    let transport = Arc::new(DeepLinkTransport::new(
        launcher.clone() as Arc<dyn LinkLauncher>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    (transport, launcher, clock)
}

fn sign_request(state: &str) -> SignRequest {
    SignRequest {
        message: Some("approve this".into()),
        transaction: None,
        state: Some(state.into()),
        redirect_uri: Some("https://app.example/callback".into()),
    }
}

fn options() -> TransportOptions {
    TransportOptions::new("https://app.example").with_timeout_ms(60_000)
}

async fn settled() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn navigates_and_resolves_on_callback() {
    let (transport, launcher, _clock) = rig(FakeLauncher::default());
    let sink = transport.callback_sink();

    let pending = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            transport
                .open_sign_request("wallet://sign", sign_request("s1"), &options())
                .await
        })
    };
    settled().await;

    let navigations = launcher.navigations.lock().clone();
    assert_eq!(navigations.len(), 1);
    assert!(navigations[0].starts_with("wallet://sign?"));
    assert!(navigations[0].contains("state=s1"));
    assert!(launcher.windows.lock().is_empty());

    sink.deliver(CallbackMessage {
        origin: "https://wallet.example".into(),
        payload: json!({ "state": "s1", "signature": "sig-1" }),
    });
    let response = pending.await.expect("task").expect("response");
    assert_eq!(response.signature.as_deref(), Some("sig-1"));
}

#[tokio::test]
async fn launcher_failure_falls_back_to_secondary_window() {
    let (transport, launcher, _clock) = rig(FakeLauncher {
        navigate_fails: true,
        ..FakeLauncher::default()
    });
    let sink = transport.callback_sink();

    let pending = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            transport
                .open_sign_request("wallet://sign", sign_request("s1"), &options())
                .await
        })
    };
    settled().await;

    assert_eq!(launcher.windows.lock().len(), 1);

    sink.deliver(CallbackMessage {
        origin: "https://wallet.example".into(),
        payload: json!({ "state": "s1", "signature": "sig-1" }),
    });
    assert!(pending.await.expect("task").is_ok());
}

#[tokio::test]
async fn hard_launch_failure_rejects_and_invalidates() {
    let (transport, _launcher, _clock) = rig(FakeLauncher {
        navigate_fails: true,
        window_fails: true,
        ..FakeLauncher::default()
    });

    let err = transport
        .open_sign_request("wallet://sign", sign_request("s1"), &options())
        .await
        .expect_err("launch failed");
    assert_eq!(err.code(), "TRANSPORT");

    // The nonce was invalidated with the failed launch.
    let outcome = transport.callback_sink().deliver(CallbackMessage {
        origin: "https://wallet.example".into(),
        payload: json!({ "state": "s1", "signature": "sig-1" }),
    });
    assert_eq!(outcome, partylink_transport::Delivery::Replayed);
}

#[tokio::test]
async fn generates_a_state_when_the_caller_supplies_none() {
    let (transport, launcher, _clock) = rig(FakeLauncher::default());
    let sink = transport.callback_sink();

    let pending = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let request = SignRequest {
                state: None,
                ..sign_request("ignored")
            };
            transport
                .open_sign_request("wallet://sign", request, &options())
                .await
        })
    };
    settled().await;

    // Recover the generated nonce from the launched URL.
    let url = launcher.navigations.lock()[0].clone();
    let parsed = url::Url::parse(&url).expect("launched url");
    let state = parsed
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state present");
    assert_eq!(state.len(), 64);

    sink.deliver(CallbackMessage {
        origin: "https://wallet.example".into(),
        payload: json!({ "state": state, "signature": "sig-1" }),
    });
    assert!(pending.await.expect("task").is_ok());
}
