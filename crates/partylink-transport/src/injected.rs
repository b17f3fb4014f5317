//! Injected transport: hand the structured request to an in-context
//! provider object.
//!
//! No URL encoding is involved; the provider receives and returns structured
//! payloads. Responses still flow through the correlation table, so the
//! state-echo and single-use-nonce rules are identical to the windowed
//! variants.

use crate::exchange::{self, CallbackMessage, CorrelationTable};
use crate::types::{
    ConnectRequest, ConnectResponse, SignRequest, SignResponse, Transport, TransportOptions,
};
use async_trait::async_trait;
use partylink_core::{Clock, PartyLinkError, Result};
use serde::Serialize;
use std::sync::Arc;

/// An in-context wallet provider object.
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    /// Handle a connect request, returning the structured response payload.
    async fn handle_connect(&self, request: serde_json::Value) -> Result<serde_json::Value>;

    /// Handle a sign request, returning the structured response payload.
    async fn handle_sign(&self, request: serde_json::Value) -> Result<serde_json::Value>;
}

enum RequestKind {
    Connect,
    Sign,
}

/// Transport reaching wallets through an injected provider object.
pub struct InjectedTransport {
    provider: Arc<dyn InjectedProvider>,
    table: Arc<CorrelationTable>,
    clock: Arc<dyn Clock>,
}

impl InjectedTransport {
    /// Build a transport over `provider`.
    pub fn new(provider: Arc<dyn InjectedProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            table: Arc::new(CorrelationTable::new()),
            clock,
        }
    }

    async fn exchange<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        request: &Req,
        state: &str,
        kind: RequestKind,
        options: &TransportOptions,
        operation: &str,
    ) -> Result<Resp> {
        let value = serde_json::to_value(request)
            .map_err(|err| PartyLinkError::serialization(err.to_string()))?;

        let receiver = self
            .table
            .register(state, options.allowed_origins.clone())?;

        // The provider runs concurrently with the wait; its answer is routed
        // through the correlation table so a wrong state echo is dropped
        // rather than trusted.
        let provider = Arc::clone(&self.provider);
        let table = Arc::clone(&self.table);
        let origin = options.origin.clone();
        let state_owned = state.to_owned();
        tokio::spawn(async move {
            let result = match kind {
                RequestKind::Connect => provider.handle_connect(value).await,
                RequestKind::Sign => provider.handle_sign(value).await,
            };
            let payload = match result {
                Ok(payload) => payload,
                Err(err) => serde_json::json!({
                    "state": state_owned,
                    "error": { "code": err.code(), "message": err.message },
                }),
            };
            table.deliver(CallbackMessage { origin, payload });
        });

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
impl Transport for InjectedTransport {
    async fn open_connect_request(
        &self,
        _endpoint: &str,
        mut request: ConnectRequest,
        options: &TransportOptions,
    ) -> Result<ConnectResponse> {
        let state = request
            .state
            .take()
            .unwrap_or_else(exchange::generate_state);
        request.state = Some(state.clone());
        self.exchange(
            &request,
            &state,
            RequestKind::Connect,
            options,
            "injected connect",
        )
        .await
    }

    async fn open_sign_request(
        &self,
        _endpoint: &str,
        mut request: SignRequest,
        options: &TransportOptions,
    ) -> Result<SignResponse> {
        let state = request
            .state
            .take()
            .unwrap_or_else(exchange::generate_state);
        request.state = Some(state.clone());
        self.exchange(&request, &state, RequestKind::Sign, options, "injected sign")
            .await
    }
}
