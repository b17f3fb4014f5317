//! Unified error taxonomy for the wallet-connection layer.
//!
//! Every surfaced failure carries a stable machine code plus a human
//! message. Errors raised below the adapter boundary are normalized into
//! this taxonomy exactly once and never re-wrapped further up.

use crate::capability::Capability;
use crate::identifiers::WalletId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// The wallet is not installed or not reachable in this environment.
    WalletNotInstalled,
    /// The adapter does not declare the capability the operation requires.
    CapabilityNotSupported,
    /// The user declined the request in the wallet.
    UserRejected,
    /// The operation did not complete within its deadline.
    Timeout,
    /// The user dismissed the wallet window before responding.
    UserClosed,
    /// A response arrived from an origin outside the allow-list.
    OriginNotAllowed,
    /// A response carried a state nonce that does not match the request.
    StateMismatch,
    /// Registry bytes failed signature verification.
    Tampered,
    /// A validly signed registry older than the accepted one was offered.
    Downgrade,
    /// The provider bridge was asked for a method it does not implement.
    UnsupportedMethod,
    /// The operation requires an active session and none exists.
    Disconnected,
    /// A transport-level failure (network, channel, malformed payload).
    Transport,
    /// The persisted store rejected an operation.
    Storage,
    /// A payload could not be encoded or decoded.
    Serialization,
    /// Any other internal failure.
    Internal,
}

impl ErrorKind {
    /// The stable machine code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::WalletNotInstalled => "WALLET_NOT_INSTALLED",
            ErrorKind::CapabilityNotSupported => "CAPABILITY_NOT_SUPPORTED",
            ErrorKind::UserRejected => "USER_REJECTED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::UserClosed => "USER_CLOSED",
            ErrorKind::OriginNotAllowed => "ORIGIN_NOT_ALLOWED",
            ErrorKind::StateMismatch => "STATE_MISMATCH",
            ErrorKind::Tampered => "TAMPERED",
            ErrorKind::Downgrade => "DOWNGRADE",
            ErrorKind::UnsupportedMethod => "UNSUPPORTED_METHOD",
            ErrorKind::Disconnected => "DISCONNECTED",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Storage => "STORAGE",
            ErrorKind::Serialization => "SERIALIZATION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The protocol phase an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum OperationPhase {
    Connect,
    Disconnect,
    Restore,
    SignMessage,
    SignTransaction,
    SubmitTransaction,
    Registry,
    Other,
}

/// The transport variant an error travelled through, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum TransportKind {
    DeepLink,
    Popup,
    Injected,
    Mock,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::DeepLink => "deeplink",
            TransportKind::Popup => "popup",
            TransportKind::Injected => "injected",
            TransportKind::Mock => "mock",
        };
        write!(f, "{name}")
    }
}

/// Where and how an error happened, attached at the adapter boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    /// The wallet the failed operation targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<WalletId>,
    /// The protocol phase that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<OperationPhase>,
    /// The transport variant in use, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    /// Free-form structured details (origins, session ids, sequences).
    #[serde(skip_serializing_if = "serde_json::Value::is_null", default)]
    pub details: serde_json::Value,
}

impl ErrorContext {
    /// Context naming a wallet and phase, the common adapter case.
    pub fn for_adapter(wallet_id: WalletId, phase: OperationPhase) -> Self {
        Self {
            wallet_id: Some(wallet_id),
            phase: Some(phase),
            transport: None,
            details: serde_json::Value::Null,
        }
    }

    /// Attach the transport variant.
    pub fn via(mut self, transport: TransportKind) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// The single error type every PartyLink operation surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyLinkError {
    /// Machine-readable classification.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Boundary context, present once normalized at the adapter layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Box<ErrorContext>>,
}

impl fmt::Display for PartyLinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for PartyLinkError {}

impl PartyLinkError {
    /// Build an error of `kind` with a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// The stable machine code for this error.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Attach boundary context, replacing any previous context.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(Box::new(context));
        self
    }

    /// Attach boundary context only if none is present yet.
    ///
    /// Normalization happens once; an error that already carries context
    /// passes through unchanged.
    pub fn or_context(mut self, context: ErrorContext) -> Self {
        if self.context.is_none() {
            self.context = Some(Box::new(context));
        }
        self
    }

    /// Wallet not installed, with the adapter's human-readable reason.
    pub fn wallet_not_installed(wallet_id: &WalletId, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::WalletNotInstalled, reason.into()).with_context(
            ErrorContext::for_adapter(wallet_id.clone(), OperationPhase::Connect),
        )
    }

    /// Required capability missing from the adapter's declared set.
    pub fn capability_not_supported(wallet_id: &WalletId, capability: Capability) -> Self {
        Self::new(
            ErrorKind::CapabilityNotSupported,
            format!("wallet '{wallet_id}' does not support '{capability}'"),
        )
        .with_context(ErrorContext {
            wallet_id: Some(wallet_id.clone()),
            phase: None,
            transport: None,
            details: serde_json::json!({ "capability": capability.key() }),
        })
    }

    /// The user declined the request.
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UserRejected, message)
    }

    /// Deadline elapsed before a correlated response arrived.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("{} timed out after {timeout_ms}ms", operation.into()),
        )
    }

    /// The wallet window was dismissed before responding.
    pub fn user_closed() -> Self {
        Self::new(ErrorKind::UserClosed, "window closed before a response arrived")
    }

    /// Response origin outside the allow-list.
    pub fn origin_not_allowed(origin: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::OriginNotAllowed,
            format!("origin '{}' is not in the allow-list", origin.into()),
        )
    }

    /// Response state nonce does not match the request.
    pub fn state_mismatch() -> Self {
        Self::new(ErrorKind::StateMismatch, "callback state does not match request")
    }

    /// Registry bytes failed signature verification.
    pub fn tampered(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Tampered, message)
    }

    /// A stale-but-valid registry was offered after a newer one was accepted.
    pub fn downgrade(cached_sequence: u64, offered_sequence: u64) -> Self {
        Self::new(
            ErrorKind::Downgrade,
            format!(
                "registry sequence {offered_sequence} is older than accepted sequence {cached_sequence}"
            ),
        )
    }

    /// Bridge method not implemented.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::UnsupportedMethod,
            format!("method '{}' is not supported", method.into()),
        )
    }

    /// No active session for an operation that requires one.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Disconnected, message)
    }

    /// Transport-level failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Persisted-store failure.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Encode/decode failure.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Unclassified internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<serde_json::Error> for PartyLinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Standard result type for PartyLink operations.
pub type Result<T> = std::result::Result<T, PartyLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(PartyLinkError::state_mismatch().code(), "STATE_MISMATCH");
        assert_eq!(PartyLinkError::downgrade(5, 4).code(), "DOWNGRADE");
        assert_eq!(
            PartyLinkError::tampered("bad signature").code(),
            "TAMPERED"
        );
    }

    #[test]
    fn or_context_does_not_rewrap() {
        let wallet = WalletId::new("mock");
        let original = PartyLinkError::user_rejected("declined").with_context(
            ErrorContext::for_adapter(wallet.clone(), OperationPhase::SignMessage),
        );
        let passed = original.clone().or_context(ErrorContext::for_adapter(
            wallet,
            OperationPhase::Connect,
        ));
        assert_eq!(passed, original);
    }

    #[test]
    fn display_carries_code_and_message() {
        let err = PartyLinkError::origin_not_allowed("https://evil.example");
        let text = err.to_string();
        assert!(text.starts_with("ORIGIN_NOT_ALLOWED:"));
        assert!(text.contains("evil.example"));
    }
}
