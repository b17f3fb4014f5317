//! Per-call exchange mechanics: state nonces, correlation, replay defense.
//!
//! Every in-flight exchange owns one entry in the [`CorrelationTable`],
//! keyed by its state nonce. An entry is removed exactly once — on match,
//! timeout, or window close — and its nonce moves to the consumed set, so a
//! duplicate of an already-handled response can never resolve a later
//! exchange. Delivery that matches nothing is logged and dropped; attack
//! traffic produces no caller-visible failure.

use parking_lot::Mutex;
use partylink_core::{Clock, PartyLinkError, Result};
use rand::RngCore;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Generate a cryptographically random state nonce (32 bytes, hex).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// A callback observed by the host environment, with its observed origin.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackMessage {
    /// Origin the message arrived from, as observed by the host.
    pub origin: String,
    /// The response payload.
    pub payload: serde_json::Value,
}

/// How a delivered callback was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Resolved a pending exchange.
    Matched,
    /// Carried no string `state` field.
    MissingState,
    /// State matches no pending exchange.
    UnknownState,
    /// State was already consumed by an earlier exchange.
    Replayed,
    /// Origin not in the exchange's allow-list; the exchange keeps waiting.
    OriginDenied,
}

struct PendingEntry {
    sender: oneshot::Sender<serde_json::Value>,
    allowed_origins: Vec<String>,
}

#[derive(Default)]
struct TableInner {
    pending: HashMap<String, PendingEntry>,
    consumed: HashSet<String>,
}

/// Pending-exchange table shared by a transport and its callback sink.
#[derive(Default)]
pub struct CorrelationTable {
    inner: Mutex<TableInner>,
}

impl CorrelationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exchange for `state`; the receiver resolves on match.
    ///
    /// Fails if the nonce is already pending or already consumed — a nonce
    /// is single-use by construction.
    pub fn register(
        &self,
        state: &str,
        allowed_origins: Vec<String>,
    ) -> Result<oneshot::Receiver<serde_json::Value>> {
        let mut inner = self.inner.lock();
        if inner.consumed.contains(state) || inner.pending.contains_key(state) {
            return Err(PartyLinkError::internal(format!(
                "state nonce reuse: {state}"
            )));
        }
        let (sender, receiver) = oneshot::channel();
        inner.pending.insert(
            state.to_owned(),
            PendingEntry {
                sender,
                allowed_origins,
            },
        );
        Ok(receiver)
    }

    /// Deliver a callback observed by the host environment.
    ///
    /// Mismatches are deliberately silent toward the pending exchange: a
    /// spoofed message must not short-circuit a legitimate wait.
    pub fn deliver(&self, message: CallbackMessage) -> Delivery {
        let state = match message.payload.get("state").and_then(|v| v.as_str()) {
            Some(state) => state.to_owned(),
            None => {
                tracing::debug!(origin = %message.origin, "dropping callback without state");
                return Delivery::MissingState;
            }
        };

        let mut inner = self.inner.lock();
        if inner.consumed.contains(&state) {
            tracing::warn!(origin = %message.origin, "dropping replayed callback");
            return Delivery::Replayed;
        }

        let Some(entry) = inner.pending.get(&state) else {
            tracing::debug!(origin = %message.origin, "dropping uncorrelated callback");
            return Delivery::UnknownState;
        };

        if !entry.allowed_origins.is_empty()
            && !entry.allowed_origins.iter().any(|o| o == &message.origin)
        {
            // Not my response: keep the exchange pending.
            tracing::warn!(origin = %message.origin, "dropping callback from disallowed origin");
            return Delivery::OriginDenied;
        }

        // Single removal point for a matched exchange.
        let entry = match inner.pending.remove(&state) {
            Some(entry) => entry,
            None => return Delivery::UnknownState,
        };
        inner.consumed.insert(state);
        drop(inner);

        // The waiter may have raced a timeout and dropped its receiver;
        // nothing left to do in that case.
        let _ = entry.sender.send(message.payload);
        Delivery::Matched
    }

    /// Invalidate a pending exchange (timeout or window close).
    ///
    /// The nonce is consumed: a response arriving afterwards is replay.
    pub fn invalidate(&self, state: &str) {
        let mut inner = self.inner.lock();
        inner.pending.remove(state);
        inner.consumed.insert(state.to_owned());
    }

    /// Whether `state` has been consumed.
    pub fn is_consumed(&self, state: &str) -> bool {
        self.inner.lock().consumed.contains(state)
    }

    /// Number of exchanges currently in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

/// Cloneable handle the host environment uses to feed callbacks in.
#[derive(Clone)]
pub struct CallbackSink {
    table: Arc<CorrelationTable>,
}

impl CallbackSink {
    /// Wrap a correlation table.
    pub fn new(table: Arc<CorrelationTable>) -> Self {
        Self { table }
    }

    /// Deliver one observed callback.
    pub fn deliver(&self, message: CallbackMessage) -> Delivery {
        self.table.deliver(message)
    }
}

/// Race a registered exchange against its timeout.
///
/// Exactly one branch resolves; the losing branch is torn down with the
/// future. On timeout the nonce is invalidated so a late response cannot
/// match anything.
pub(crate) async fn await_response<T: DeserializeOwned>(
    table: &CorrelationTable,
    state: &str,
    receiver: oneshot::Receiver<serde_json::Value>,
    timeout_ms: u64,
    clock: &dyn Clock,
    operation: &str,
) -> Result<T> {
    tokio::select! {
        payload = receiver => match payload {
            Ok(payload) => decode_response(payload),
            Err(_) => Err(PartyLinkError::internal(format!(
                "{operation}: exchange dropped without resolution"
            ))),
        },
        _ = clock.sleep_ms(timeout_ms) => {
            table.invalidate(state);
            Err(PartyLinkError::timeout(operation, timeout_ms))
        }
    }
}

pub(crate) fn decode_response<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|err| PartyLinkError::serialization(format!("malformed response: {err}")))
}

/// Encode a request as URL query parameters on `endpoint`.
///
/// Strings go through verbatim; arrays and objects are JSON-stringified,
/// matching what deep-link and popup wallets parse on the other side.
pub(crate) fn encode_request_url(endpoint: &str, request: &serde_json::Value) -> Result<String> {
    let mut url = url::Url::parse(endpoint)
        .map_err(|err| PartyLinkError::transport(format!("bad endpoint '{endpoint}': {err}")))?;
    let object = request
        .as_object()
        .ok_or_else(|| PartyLinkError::internal("request did not serialize to an object"))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in object {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    pairs.append_pair(key, s);
                }
                serde_json::Value::Bool(b) => {
                    pairs.append_pair(key, if *b { "true" } else { "false" });
                }
                serde_json::Value::Number(n) => {
                    pairs.append_pair(key, &n.to_string());
                }
                other => {
                    pairs.append_pair(key, &other.to_string());
                }
            }
        }
    }
    Ok(url.into())
}
