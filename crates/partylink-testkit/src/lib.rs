//! Test fixtures and deterministic collaborator implementations.
//!
//! Everything here exists so protocol tests can run without wall-clock time,
//! real storage, a network, or a real wallet: a manually advanced clock, an
//! in-memory store, scriptable registry fetchers, a signed-registry fixture
//! builder with tamper/downgrade mutators, and a scriptable wallet adapter
//! with a call recorder.

pub mod adapter;
pub mod effects;
pub mod fixtures;

pub use adapter::MockAdapter;
pub use effects::{ManualClock, MemoryStore, StaticFetcher};
pub use fixtures::{sample_registry, sample_wallet_entry, RegistryFixture, SignedFixture};
