//! Core types shared by every PartyLink crate.
//!
//! This crate carries the vocabulary of the wallet-connection layer: the
//! identifier newtypes, the capability model, the session object, the unified
//! error taxonomy, the snapshot-dispatch event emitter, and the traits for
//! injected collaborators (clock, key-value storage). It has no protocol
//! logic of its own.

pub mod capability;
pub mod effects;
pub mod error;
pub mod events;
pub mod identifiers;
pub mod session;

pub use capability::{Capability, CapabilitySet};
pub use effects::{Clock, KeyValueStore, SystemClock};
pub use error::{ErrorContext, ErrorKind, OperationPhase, PartyLinkError, Result, TransportKind};
pub use events::{EventEmitter, HandlerId, SessionEvent, TopicEmitter};
pub use identifiers::{
    CommandId, PartyId, SessionId, Signature, TransactionHash, WalletId,
};
pub use session::Session;
