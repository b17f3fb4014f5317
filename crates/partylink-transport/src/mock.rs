//! Deterministic mock transport for tests and demos.
//!
//! Returns pre-programmed or synthesized responses while preserving the
//! asynchronous timing contract, so callers cannot distinguish it
//! structurally from a live transport.

use crate::exchange;
use crate::types::{
    ConnectRequest, ConnectResponse, JobState, JobStatus, SignRequest, SignResponse, Transport,
    TransportOptions,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use partylink_core::{PartyId, PartyLinkError, Result};
use std::collections::{HashMap, VecDeque};

/// Scriptable transport with deterministic responses.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, serde_json::Value>>,
    jobs: Mutex<HashMap<String, VecDeque<JobStatus>>>,
    latency_ms: u64,
}

impl MockTransport {
    /// A mock with no programmed responses and no artificial latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add artificial latency before each response.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Program the response payload for a given state nonce.
    pub fn set_mock_response(&self, state: impl Into<String>, response: serde_json::Value) {
        self.responses.lock().insert(state.into(), response);
    }

    /// Program the status sequence for a job; the last entry repeats.
    pub fn set_job_statuses(&self, job_id: impl Into<String>, statuses: Vec<JobStatus>) {
        self.jobs.lock().insert(job_id.into(), statuses.into());
    }

    async fn settle(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        } else {
            // Stay asynchronous even at zero latency.
            tokio::task::yield_now().await;
        }
    }

    fn programmed(&self, state: &str) -> Option<serde_json::Value> {
        self.responses.lock().get(state).cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open_connect_request(
        &self,
        _endpoint: &str,
        mut request: ConnectRequest,
        _options: &TransportOptions,
    ) -> Result<ConnectResponse> {
        let state = request
            .state
            .take()
            .unwrap_or_else(exchange::generate_state);
        self.settle().await;

        match self.programmed(&state) {
            Some(payload) => serde_json::from_value(payload)
                .map_err(|err| PartyLinkError::serialization(format!("mock response: {err}"))),
            None => Ok(ConnectResponse {
                state,
                party_id: Some(PartyId::new("party::mock")),
                session_token: Some("mock-session-token".to_owned()),
                expires_at: None,
                capabilities: None,
                error: None,
            }),
        }
    }

    async fn open_sign_request(
        &self,
        _endpoint: &str,
        mut request: SignRequest,
        _options: &TransportOptions,
    ) -> Result<SignResponse> {
        let state = request
            .state
            .take()
            .unwrap_or_else(exchange::generate_state);
        self.settle().await;

        match self.programmed(&state) {
            Some(payload) => serde_json::from_value(payload)
                .map_err(|err| PartyLinkError::serialization(format!("mock response: {err}"))),
            None => Ok(SignResponse {
                state,
                signature: Some("mock-signature".to_owned()),
                transaction_hash: None,
                job_id: None,
                error: None,
            }),
        }
    }

    async fn poll_job_status(
        &self,
        job_id: &str,
        _endpoint: &str,
        _options: &TransportOptions,
    ) -> Result<JobStatus> {
        self.settle().await;
        let mut jobs = self.jobs.lock();
        let queue = jobs.get_mut(job_id).ok_or_else(|| {
            PartyLinkError::transport(format!("unknown mock job '{job_id}'"))
        })?;
        let status = if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| JobStatus {
                job_id: job_id.to_owned(),
                status: JobState::Expired,
                result: None,
                error: None,
            })
        } else {
            queue.front().cloned().ok_or_else(|| {
                PartyLinkError::transport(format!("mock job '{job_id}' has no statuses"))
            })?
        };
        Ok(status)
    }
}
