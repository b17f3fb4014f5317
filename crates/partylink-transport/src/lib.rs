//! Transport layer: carry a request to an out-of-process wallet and
//! correlate exactly one matching response.
//!
//! All variants share the same algorithm: generate a single-use state nonce,
//! encode the request for the variant's addressing mechanism, open the
//! channel, then race the correlated response against the timeout (and, for
//! popups, against the user closing the window). Responses from disallowed
//! origins or with unknown state nonces are logged and ignored — an attacker
//! cannot short-circuit a pending wait, only fail to match it.

pub mod deeplink;
pub mod exchange;
pub mod injected;
pub mod mock;
pub mod popup;
pub mod types;

pub use deeplink::{DeepLinkTransport, LinkLauncher};
pub use exchange::{generate_state, CallbackMessage, CallbackSink, CorrelationTable, Delivery};
pub use injected::{InjectedProvider, InjectedTransport};
pub use mock::MockTransport;
pub use popup::{PopupHandle, PopupOpener, PopupTransport};
pub use types::{
    ConnectRequest, ConnectResponse, JobOutcome, JobState, JobStatus, ResponseError,
    SignRequest, SignResponse, Transport, TransportOptions,
};
