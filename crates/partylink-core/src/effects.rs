//! Traits for injected collaborators.
//!
//! The protocol layer never reaches for ambient authority: wall-clock time,
//! persistence, and (in the transport/registry crates) network access all
//! arrive through these traits at construction time. Tests substitute
//! deterministic implementations.

use crate::error::Result;
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time and cooperative delay.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time as epoch milliseconds.
    fn now_ms(&self) -> u64;

    /// Suspend for `ms` milliseconds.
    async fn sleep_ms(&self, ms: u64);
}

/// The process clock, backed by `SystemTime` and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

/// Key-value persisted storage owned by the host application.
///
/// Used for the registry cache and persisted sessions. Values are opaque
/// strings; callers handle their own serialization.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value at `key`, if present.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` at `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value at `key`, if present.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Delete every value.
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_clock_advances() {
        let clock = SystemClock;
        let before = clock.now_ms();
        clock.sleep_ms(5).await;
        assert!(clock.now_ms() >= before);
    }
}
