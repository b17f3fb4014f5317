//! Typed RPC errors for the provider surface.
//!
//! A raw, uncoded error must never surface through `request`; everything
//! maps onto a numeric code here.

use partylink_core::{ErrorKind, PartyLinkError};
use serde::{Deserialize, Serialize};

/// Connect was required but the provider is not authorized/connected.
pub const CODE_NOT_CONNECTED: i64 = 4100;
/// The requested method is not supported by this provider.
pub const CODE_UNSUPPORTED_METHOD: i64 = 4200;
/// The provider is disconnected from the wallet.
pub const CODE_DISCONNECTED: i64 = 4900;
/// The user rejected the request.
pub const CODE_USER_REJECTED: i64 = 4001;
/// Malformed request parameters.
pub const CODE_INVALID_PARAMS: i64 = -32602;
/// Any other internal failure.
pub const CODE_INTERNAL: i64 = -32603;

/// The error shape every rejected `request` carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("provider rpc error {code}: {message}")]
pub struct ProviderRpcError {
    /// Numeric provider error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Structured details, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProviderRpcError {
    /// Build an error with no structured details.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// `4200` for a method this provider does not implement.
    pub fn unsupported_method(method: &str) -> Self {
        Self::new(
            CODE_UNSUPPORTED_METHOD,
            format!("method '{method}' is not supported"),
        )
    }

    /// `4900` for operations that need an active session.
    pub fn disconnected(operation: &str) -> Self {
        Self::new(
            CODE_DISCONNECTED,
            format!("'{operation}' requires an active session"),
        )
    }

    /// `-32602` for malformed parameters.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(CODE_INVALID_PARAMS, message)
    }
}

impl From<PartyLinkError> for ProviderRpcError {
    fn from(error: PartyLinkError) -> Self {
        let code = match error.kind {
            ErrorKind::UserRejected | ErrorKind::UserClosed => CODE_USER_REJECTED,
            ErrorKind::UnsupportedMethod | ErrorKind::CapabilityNotSupported => {
                CODE_UNSUPPORTED_METHOD
            }
            ErrorKind::Disconnected => CODE_DISCONNECTED,
            ErrorKind::WalletNotInstalled => CODE_NOT_CONNECTED,
            _ => CODE_INTERNAL,
        };
        let data = error
            .context
            .as_deref()
            .and_then(|context| serde_json::to_value(context).ok());
        Self {
            code,
            message: error.to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partylink_core::{Capability, WalletId};

    #[test]
    fn taxonomy_maps_to_numeric_codes() {
        let wallet = WalletId::new("mock");
        let cases = [
            (PartyLinkError::user_rejected("no"), CODE_USER_REJECTED),
            (
                PartyLinkError::capability_not_supported(&wallet, Capability::LedgerApi),
                CODE_UNSUPPORTED_METHOD,
            ),
            (PartyLinkError::disconnected("x"), CODE_DISCONNECTED),
            (
                PartyLinkError::wallet_not_installed(&wallet, "missing"),
                CODE_NOT_CONNECTED,
            ),
            (PartyLinkError::timeout("op", 100), CODE_INTERNAL),
        ];
        for (error, expected) in cases {
            assert_eq!(ProviderRpcError::from(error).code, expected);
        }
    }
}
