//! Provider bridge: re-exposes the internal client as the standardized
//! CIP-0103 request/event surface.
//!
//! Any code written against the CIP-0103 provider specification can drive a
//! PartyLink client transparently: every mandatory method resolves to a
//! well-formed result or rejects with a typed RPC error carrying a numeric
//! code, and the transaction lifecycle is surfaced as an ordered discriminated
//! event stream.

pub mod bound;
pub mod bridge;
pub mod errors;
pub mod methods;
pub mod types;

pub use bound::BoundClient;
pub use bridge::{BridgeableClient, ProviderBridge, RpcRequest};
pub use errors::{
    ProviderRpcError, CODE_DISCONNECTED, CODE_INTERNAL, CODE_INVALID_PARAMS, CODE_NOT_CONNECTED,
    CODE_UNSUPPORTED_METHOD, CODE_USER_REJECTED,
};
pub use methods::{Method, MANDATORY_METHODS};
pub use types::{
    events, Account, AccountStatus, ConnectResult, ConnectionStatus, ExecutedPayload,
    FailedPayload, NetworkInfo, ProviderInfo, SessionInfo, SignedPayload, StatusEvent,
    TxChangedEvent,
};
