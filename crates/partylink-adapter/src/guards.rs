//! Cross-cutting guards applied before any operation reaches an adapter.

use crate::contract::{AdapterContext, WalletAdapter};
use partylink_core::{
    Capability, ErrorContext, OperationPhase, PartyLinkError, Result, TransportKind, WalletId,
};

/// Fail with `WALLET_NOT_INSTALLED` unless the wallet is reachable.
///
/// Runs before every connect; the adapter's human-readable reason is carried
/// on the error.
pub async fn install_guard(adapter: &dyn WalletAdapter, ctx: &AdapterContext) -> Result<()> {
    let detected = adapter.detect_installed(ctx).await;
    if detected.installed {
        return Ok(());
    }
    let reason = detected
        .reason
        .unwrap_or_else(|| format!("wallet '{}' is not installed", adapter.wallet_id()));
    Err(PartyLinkError::wallet_not_installed(adapter.wallet_id(), reason))
}

/// Fail with `CAPABILITY_NOT_SUPPORTED` unless every required capability is
/// declared.
///
/// This runs against the declared set only — the adapter implementation is
/// never invoked when a capability is missing.
pub fn capability_guard(adapter: &dyn WalletAdapter, required: &[Capability]) -> Result<()> {
    let declared = adapter.capabilities();
    match declared.first_missing(required) {
        None => Ok(()),
        Some(missing) => Err(PartyLinkError::capability_not_supported(
            adapter.wallet_id(),
            missing,
        )),
    }
}

/// Attach boundary context to an adapter failure, once.
///
/// Errors that already carry context pass through unchanged; nothing is ever
/// re-wrapped above this boundary.
pub fn normalize_adapter_error(
    error: PartyLinkError,
    wallet_id: &WalletId,
    phase: OperationPhase,
    transport: Option<TransportKind>,
) -> PartyLinkError {
    let mut context = ErrorContext::for_adapter(wallet_id.clone(), phase);
    if let Some(transport) = transport {
        context = context.via(transport);
    }
    error.or_context(context)
}
