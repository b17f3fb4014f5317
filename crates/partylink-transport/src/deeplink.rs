//! Deep-link transport: navigate to a wallet URL and await the callback.
//!
//! There is no reliable in-context signal that a deep-link navigation
//! failed, so the secondary-window fallback fires only when the launcher
//! itself reports a hard failure. Success is only ever observed through the
//! correlated callback.

use crate::exchange::{self, CallbackSink, CorrelationTable};
use crate::types::{
    ConnectRequest, ConnectResponse, SignRequest, SignResponse, Transport, TransportOptions,
};
use async_trait::async_trait;
use partylink_core::{Clock, PartyLinkError, Result};
use serde::Serialize;
use std::sync::Arc;

/// Host hook that performs the actual navigation.
#[async_trait]
pub trait LinkLauncher: Send + Sync {
    /// Navigate the current context to `url`.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Open `url` in a secondary window, the best-effort fallback.
    async fn open_window(&self, url: &str) -> Result<()>;
}

/// Transport reaching wallets through deep-link URLs.
pub struct DeepLinkTransport {
    launcher: Arc<dyn LinkLauncher>,
    table: Arc<CorrelationTable>,
    clock: Arc<dyn Clock>,
}

impl DeepLinkTransport {
    /// Build a transport over `launcher`.
    pub fn new(launcher: Arc<dyn LinkLauncher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            launcher,
            table: Arc::new(CorrelationTable::new()),
            clock,
        }
    }

    /// Handle the host uses to feed observed callbacks in.
    pub fn callback_sink(&self) -> CallbackSink {
        CallbackSink::new(Arc::clone(&self.table))
    }

    async fn launch(&self, url: &str) -> Result<()> {
        if let Err(err) = self.launcher.navigate(url).await {
            tracing::warn!("deep link navigation failed, trying secondary window: {err}");
            return self.launcher.open_window(url).await;
        }
        Ok(())
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

        // Register before navigating so an immediate callback cannot be lost.
        let receiver = self
            .table
            .register(state, options.allowed_origins.clone())?;

        if let Err(err) = self.launch(&url).await {
            self.table.invalidate(state);
            return Err(PartyLinkError::transport(format!(
                "failed to open deep link: {err}"
            )));
        }

        exchange::await_response(
            &self.table,
            state,
            receiver,
            options.timeout_ms,
            self.clock.as_ref(),
            operation,
        )
        .await
    }
}

#[async_trait]
impl Transport for DeepLinkTransport {
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
        self.exchange(endpoint, &request, &state, options, "deep link connect")
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
        self.exchange(endpoint, &request, &state, options, "deep link sign")
            .await
    }
}
