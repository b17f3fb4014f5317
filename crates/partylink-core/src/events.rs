//! Event emitters with snapshot dispatch.
//!
//! Both emitters take a snapshot of the registered handlers at the start of
//! each dispatch, so a handler may unsubscribe itself (or any other handler)
//! mid-dispatch without disturbing delivery for that dispatch.

use crate::error::PartyLinkError;
use crate::session::Session;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Handle identifying a registered handler, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct EmitterInner<T> {
    next_id: u64,
    handlers: Vec<(HandlerId, Handler<T>)>,
}

/// A typed event emitter for a single event stream.
///
/// Cloning shares the handler table.
pub struct EventEmitter<T> {
    inner: Arc<Mutex<EmitterInner<T>>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventEmitter<T> {
    /// Create an emitter with no handlers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmitterInner {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Register a handler; the returned id unsubscribes it.
    pub fn on(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> HandlerId {
        let mut inner = self.inner.lock();
        let id = HandlerId(inner.next_id);
        inner.next_id += 1;
        inner.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler; returns `true` if it was registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.handlers.len();
        inner.handlers.retain(|(handler_id, _)| *handler_id != id);
        inner.handlers.len() != before
    }

    /// Dispatch `event` to a snapshot of the current handlers.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Handler<T>> = {
            let inner = self.inner.lock();
            inner.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    /// Remove every handler.
    pub fn clear(&self) {
        self.inner.lock().handlers.clear();
    }
}

/// An emitter keyed by event name, carrying JSON payloads.
///
/// Used at surfaces that expose a stringly-named event protocol. The same
/// snapshot discipline applies per event name.
pub struct TopicEmitter {
    inner: Arc<Mutex<TopicInner>>,
}

struct TopicInner {
    next_id: u64,
    topics: HashMap<String, Vec<(HandlerId, Handler<serde_json::Value>)>>,
}

impl Clone for TopicEmitter {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for TopicEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicEmitter {
    /// Create an emitter with no topics.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TopicInner {
                next_id: 0,
                topics: HashMap::new(),
            })),
        }
    }

    /// Register a handler for `event`; the returned id unsubscribes it.
    pub fn on(
        &self,
        event: &str,
        handler: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> HandlerId {
        let mut inner = self.inner.lock();
        let id = HandlerId(inner.next_id);
        inner.next_id += 1;
        inner
            .topics
            .entry(event.to_owned())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler from `event`; returns `true` if it was registered.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut inner = self.inner.lock();
        match inner.topics.get_mut(event) {
            Some(handlers) => {
                let before = handlers.len();
                handlers.retain(|(handler_id, _)| *handler_id != id);
                handlers.len() != before
            }
            None => false,
        }
    }

    /// Dispatch `payload` to a snapshot of the handlers for `event`.
    pub fn emit(&self, event: &str, payload: &serde_json::Value) {
        let snapshot: Vec<Handler<serde_json::Value>> = {
            let inner = self.inner.lock();
            inner
                .topics
                .get(event)
                .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        for handler in snapshot {
            handler(payload);
        }
    }

    /// Number of handlers registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner
            .lock()
            .topics
            .get(event)
            .map_or(0, |handlers| handlers.len())
    }
}

/// Lifecycle events the client surface exposes.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SessionEvent {
    /// A session was established.
    Connected {
        /// The newly created session.
        session: Session,
    },
    /// A session ended by explicit disconnect or teardown.
    Disconnected {
        /// The session that ended, when one existed.
        session: Option<Session>,
    },
    /// A session reached its expiry.
    Expired {
        /// The expired session.
        session: Session,
    },
    /// A surfaced (non-silent) failure.
    Error {
        /// The normalized error.
        error: PartyLinkError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emits_to_all_handlers() {
        let emitter: EventEmitter<u32> = EventEmitter::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            emitter.on(move |value| {
                count.fetch_add(*value as usize, Ordering::SeqCst);
            });
        }
        emitter.emit(&2);
        assert_eq!(count.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn handler_can_unsubscribe_itself_during_dispatch() {
        let emitter: EventEmitter<()> = EventEmitter::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let slot: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));
        let id = {
            let emitter = emitter.clone();
            let slot = Arc::clone(&slot);
            let fired = Arc::clone(&fired);
            emitter.clone().on(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *slot.lock() {
                    emitter.off(id);
                }
            })
        };
        *slot.lock() = Some(id);

        let fired_other = Arc::new(AtomicUsize::new(0));
        {
            let fired_other = Arc::clone(&fired_other);
            emitter.on(move |_| {
                fired_other.fetch_add(1, Ordering::SeqCst);
            });
        }

        // First dispatch reaches both handlers even though the first one
        // removes itself mid-iteration.
        emitter.emit(&());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(fired_other.load(Ordering::SeqCst), 1);

        // Second dispatch only reaches the surviving handler.
        emitter.emit(&());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(fired_other.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn topic_emitter_routes_by_event_name() {
        let emitter = TopicEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let hits = Arc::clone(&hits);
            emitter.on("connected", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        emitter.emit("connected", &serde_json::json!({"isConnected": true}));
        emitter.emit("disconnected", &serde_json::Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_removes_topic_handler() {
        let emitter = TopicEmitter::new();
        let id = emitter.on("statusChanged", |_| {});
        assert_eq!(emitter.handler_count("statusChanged"), 1);
        assert!(emitter.off("statusChanged", id));
        assert!(!emitter.off("statusChanged", id));
        assert_eq!(emitter.handler_count("statusChanged"), 0);
    }
}
