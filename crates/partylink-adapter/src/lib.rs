//! Adapter contract and session lifecycle.
//!
//! Defines the capability-polymorphic surface every wallet integration
//! implements, the guards enforced before any operation reaches a concrete
//! adapter, the session store, and the [`WalletClient`] orchestration that
//! ties them together. Errors are normalized into the shared taxonomy
//! exactly once, at this boundary.

pub mod client;
pub mod contract;
pub mod guards;
pub mod remote;
pub mod session_manager;

pub use client::{ClientConfig, WalletClient};
pub use contract::{
    AdapterConnectResult, AdapterContext, ConnectOptions, DetectResult, LedgerApiParams,
    LedgerApiResult, SignMessageParams, SignTransactionParams, SignedMessage, SignedTransaction,
    SubmitTransactionParams, TxReceipt, WalletAdapter,
};
pub use guards::{capability_guard, install_guard, normalize_adapter_error};
pub use remote::{RemoteWalletAdapter, RemoteWalletConfig};
pub use session_manager::SessionManager;
