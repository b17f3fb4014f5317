//! Popup transport: spawn a wallet window and race its callback against the
//! timeout and the user closing the window.

use crate::exchange::{self, CallbackSink, CorrelationTable};
use crate::types::{
    ConnectRequest, ConnectResponse, SignRequest, SignResponse, Transport, TransportOptions,
};
use async_trait::async_trait;
use partylink_core::{Clock, PartyLinkError, Result};
use serde::Serialize;
use std::sync::Arc;

/// Cadence of the closed-window poll, milliseconds.
const CLOSED_POLL_MS: u64 = 500;

/// A spawned wallet window.
pub trait PopupHandle: Send + Sync {
    /// Whether the window has been closed.
    fn is_closed(&self) -> bool;

    /// Close the window.
    fn close(&self);
}

/// Host hook that spawns wallet windows.
#[async_trait]
pub trait PopupOpener: Send + Sync {
    /// Open `url` in a new window and return its handle.
    async fn open(&self, url: &str) -> Result<Arc<dyn PopupHandle>>;
}

/// Transport reaching wallets through a spawned window.
pub struct PopupTransport {
    opener: Arc<dyn PopupOpener>,
    table: Arc<CorrelationTable>,
    clock: Arc<dyn Clock>,
    closed_poll_ms: u64,
}

impl PopupTransport {
    /// Build a transport over `opener`.
    pub fn new(opener: Arc<dyn PopupOpener>, clock: Arc<dyn Clock>) -> Self {
        Self {
            opener,
            table: Arc::new(CorrelationTable::new()),
            clock,
            closed_poll_ms: CLOSED_POLL_MS,
        }
    }

    /// Override the closed-window poll cadence.
    pub fn with_closed_poll_ms(mut self, closed_poll_ms: u64) -> Self {
        self.closed_poll_ms = closed_poll_ms;
        self
    }

    /// Handle the host uses to feed observed callbacks in.
    pub fn callback_sink(&self) -> CallbackSink {
        CallbackSink::new(Arc::clone(&self.table))
    }

    async fn exchange<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &Req,
        state: &str,
        options: &TransportOptions,
        operation: &str,
    ) -> Result<Resp> {
        let value = serde_json::to_value(request)
            .map_err(|err| PartyLinkError::serialization(err.to_string()))?;
        let url = exchange::encode_request_url(endpoint, &value)?;

        // Register before opening so an immediate callback cannot be lost.
        let mut receiver = self
            .table
            .register(state, options.allowed_origins.clone())?;

        let popup = match self.opener.open(&url).await {
            Ok(popup) => popup,
            Err(err) => {
                self.table.invalidate(state);
                return Err(PartyLinkError::transport(format!(
                    "failed to open popup window: {err}"
                )));
            }
        };

        // Three terminal sources are armed at once; exactly one resolves the
        // exchange and the other two are dropped with the select.
        tokio::select! {
            payload = &mut receiver => {
                popup.close();
                match payload {
                    Ok(payload) => exchange::decode_response(payload),
                    Err(_) => Err(PartyLinkError::internal(format!(
                        "{operation}: exchange dropped without resolution"
                    ))),
                }
            }
            _ = self.clock.sleep_ms(options.timeout_ms) => {
                self.table.invalidate(state);
                popup.close();
                Err(PartyLinkError::timeout(operation, options.timeout_ms))
            }
            _ = watch_closed(popup.as_ref(), self.clock.as_ref(), self.closed_poll_ms) => {
                self.table.invalidate(state);
                Err(PartyLinkError::user_closed())
            }
        }
    }
}

async fn watch_closed(popup: &dyn PopupHandle, clock: &dyn Clock, poll_ms: u64) {
    loop {
        if popup.is_closed() {
            return;
        }
        clock.sleep_ms(poll_ms).await;
    }
}

#[async_trait]
impl Transport for PopupTransport {
    async fn open_connect_request(
        &self,
        endpoint: &str,
        mut request: ConnectRequest,
        options: &TransportOptions,
    ) -> Result<ConnectResponse> {
        let state = request
            .state
            .take()
            .unwrap_or_else(exchange::generate_state);
        request.state = Some(state.clone());
        self.exchange(endpoint, &request, &state, options, "popup connect")
            .await
    }

    async fn open_sign_request(
        &self,
        endpoint: &str,
        mut request: SignRequest,
        options: &TransportOptions,
    ) -> Result<SignResponse> {
        let state = request
            .state
            .take()
            .unwrap_or_else(exchange::generate_state);
        request.state = Some(state.clone());
        self.exchange(endpoint, &request, &state, options, "popup sign")
            .await
    }
}
