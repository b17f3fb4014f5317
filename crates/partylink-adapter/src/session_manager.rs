//! Session store: one active session per wallet, persisted across restarts.
//!
//! Expiry is enforced lazily on access plus an explicit sweep; no background
//! task is spawned. Restoration rejects expired records without contacting
//! the owning adapter, then requires the adapter to independently confirm
//! liveness.

use crate::contract::{AdapterContext, WalletAdapter};
use parking_lot::Mutex;
use partylink_core::{Clock, EventEmitter, KeyValueStore, Session, SessionEvent, WalletId};
use std::collections::HashMap;
use std::sync::Arc;

const SESSIONS_KEY: &str = "partylink:sessions";

/// Store and lifecycle authority for active sessions.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    active: Mutex<HashMap<WalletId, Session>>,
    events: EventEmitter<SessionEvent>,
}

impl SessionManager {
    /// Build a manager over the injected store and clock.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            active: Mutex::new(HashMap::new()),
            events: EventEmitter::new(),
        }
    }

    /// The session event stream (connected / disconnected / expired).
    pub fn events(&self) -> EventEmitter<SessionEvent> {
        self.events.clone()
    }

    /// The active session for `wallet_id`, enforcing expiry on access.
    pub async fn active_session(&self, wallet_id: &WalletId) -> Option<Session> {
        let now = self.clock.now_ms();
        let expired = {
            let mut active = self.active.lock();
            let session = active.get(wallet_id)?;
            if !session.is_expired(now) {
                return Some(session.clone());
            }
            active.remove(wallet_id)
        };
        if let Some(session) = expired {
            self.persist().await;
            self.events.emit(&SessionEvent::Expired { session });
        }
        None
    }

    /// Every currently active, unexpired session.
    pub async fn active_sessions(&self) -> Vec<Session> {
        let expired = self.take_expired();
        let sessions: Vec<Session> = self.active.lock().values().cloned().collect();
        if !expired.is_empty() {
            self.persist().await;
            for session in expired {
                self.events.emit(&SessionEvent::Expired { session });
            }
        }
        sessions
    }

    /// Install a session, returning the one it displaced, if any.
    ///
    /// The displaced session is fully removed before the new one is
    /// installed; the caller tears down its listeners first.
    pub async fn install(&self, session: Session) -> Option<Session> {
        let previous = {
            let mut active = self.active.lock();
            active.insert(session.wallet_id.clone(), session)
        };
        self.persist().await;
        previous
    }

    /// Remove the active session for `wallet_id`.
    pub async fn remove(&self, wallet_id: &WalletId) -> Option<Session> {
        let removed = self.active.lock().remove(wallet_id);
        if removed.is_some() {
            self.persist().await;
        }
        removed
    }

    /// Sweep expired sessions, emitting `session:expired` for each.
    pub async fn expire_due_sessions(&self) -> Vec<Session> {
        let expired = self.take_expired();
        if !expired.is_empty() {
            self.persist().await;
            for session in &expired {
                self.events.emit(&SessionEvent::Expired {
                    session: session.clone(),
                });
            }
        }
        expired
    }

    /// Restore persisted sessions through their owning adapters.
    ///
    /// Expired records are dropped without contacting any adapter. For the
    /// rest, the adapter's `restore` must independently confirm liveness; a
    /// `None` or an error drops the record. Each restored session is
    /// installed and announced with `session:connected`.
    pub async fn restore_sessions(
        &self,
        adapters: &HashMap<WalletId, Arc<dyn WalletAdapter>>,
        ctx: &AdapterContext,
    ) -> Vec<Session> {
        let persisted = self.load_persisted().await;
        let now = self.clock.now_ms();
        let mut restored = Vec::new();

        for session in persisted {
            if session.is_expired(now) {
                tracing::debug!(
                    session_id = %session.session_id,
                    "dropping expired persisted session"
                );
                continue;
            }
            let Some(adapter) = adapters.get(&session.wallet_id) else {
                tracing::debug!(
                    wallet_id = %session.wallet_id,
                    "dropping persisted session without a registered adapter"
                );
                continue;
            };
            match adapter.restore(ctx, &session).await {
                Ok(Some(live)) => {
                    self.active.lock().insert(live.wallet_id.clone(), live.clone());
                    restored.push(live);
                }
                Ok(None) => {
                    tracing::debug!(
                        wallet_id = %session.wallet_id,
                        "wallet no longer reports the session live"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        wallet_id = %session.wallet_id,
                        "session restore failed: {err}"
                    );
                }
            }
        }

        self.persist().await;
        for session in &restored {
            self.events.emit(&SessionEvent::Connected {
                session: session.clone(),
            });
        }
        restored
    }

    fn take_expired(&self) -> Vec<Session> {
        let now = self.clock.now_ms();
        let mut active = self.active.lock();
        let expired_ids: Vec<WalletId> = active
            .iter()
            .filter(|(_, session)| session.is_expired(now))
            .map(|(wallet_id, _)| wallet_id.clone())
            .collect();
        expired_ids
            .into_iter()
            .filter_map(|wallet_id| active.remove(&wallet_id))
            .collect()
    }

    async fn load_persisted(&self) -> Vec<Session> {
        match self.store.get(SESSIONS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Session>>(&raw) {
                Ok(sessions) => sessions,
                Err(err) => {
                    tracing::warn!("discarding unreadable persisted sessions: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!("persisted session read failed: {err}");
                Vec::new()
            }
        }
    }

    async fn persist(&self) {
        let sessions: Vec<Session> = self.active.lock().values().cloned().collect();
        let serialized = match serde_json::to_string(&sessions) {
            Ok(serialized) => serialized,
            Err(err) => {
                tracing::warn!("session serialize failed: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(SESSIONS_KEY, &serialized).await {
            tracing::warn!("session persist failed: {err}");
        }
    }
}
