//! The fixed method set of the provider surface.

use std::str::FromStr;

/// Every method name the provider must handle.
pub const MANDATORY_METHODS: [&str; 10] = [
    "status",
    "connect",
    "isConnected",
    "disconnect",
    "getActiveNetwork",
    "listAccounts",
    "getPrimaryAccount",
    "signMessage",
    "prepareExecute",
    "ledgerApi",
];

/// Parsed provider method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Full provider/connection/session snapshot.
    Status,
    /// Establish a session.
    Connect,
    /// Connection predicate.
    IsConnected,
    /// Tear the session down.
    Disconnect,
    /// Active network in CAIP-2 form.
    GetActiveNetwork,
    /// Accounts derived from the session party.
    ListAccounts,
    /// The primary account.
    GetPrimaryAccount,
    /// Sign a message.
    SignMessage,
    /// Sign and submit a transaction, driving the lifecycle events.
    PrepareExecute,
    /// Proxy a raw ledger API request.
    LedgerApi,
}

/// Unknown method marker; surfaces as code 4200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Method::Status),
            "connect" => Ok(Method::Connect),
            "isConnected" => Ok(Method::IsConnected),
            "disconnect" => Ok(Method::Disconnect),
            "getActiveNetwork" => Ok(Method::GetActiveNetwork),
            "listAccounts" => Ok(Method::ListAccounts),
            "getPrimaryAccount" => Ok(Method::GetPrimaryAccount),
            "signMessage" => Ok(Method::SignMessage),
            // The transaction slot answers to both published names.
            "prepareExecute" | "signTransaction" => Ok(Method::PrepareExecute),
            "ledgerApi" => Ok(Method::LedgerApi),
            other => Err(UnknownMethod(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mandatory_method_parses() {
        for name in MANDATORY_METHODS {
            assert!(name.parse::<Method>().is_ok(), "method {name} must parse");
        }
    }

    #[test]
    fn sign_transaction_is_an_alias_for_prepare_execute() {
        assert_eq!(
            "signTransaction".parse::<Method>().ok(),
            Some(Method::PrepareExecute)
        );
    }

    #[test]
    fn unknown_methods_are_rejected() {
        assert!("__nonexistent__".parse::<Method>().is_err());
    }
}
