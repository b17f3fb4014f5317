//! Signed-registry fixture builder with adversarial mutators.
//!
//! Mirrors what the registry publishing pipeline produces: a registry JSON
//! document plus a detached Ed25519 signature over its exact bytes. The
//! mutators build the attack fixtures — a tampered byte, a validly signed
//! older sequence — that the verification and downgrade tests feed in.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use partylink_core::{Capability, CapabilitySet, WalletId};
use partylink_registry::{
    key_fingerprint, AdapterLocator, DetachedSignature, RegistryMetadata, WalletEntry,
    WalletRegistry, REGISTRY_SCHEMA_VERSION,
};
use rand::rngs::OsRng;

/// A wallet entry with sensible defaults for tests.
pub fn sample_wallet_entry(id: &str) -> WalletEntry {
    WalletEntry {
        id: WalletId::new(id),
        name: format!("{id} Wallet"),
        description: Some(format!("Test wallet '{id}'")),
        homepage: None,
        icon: None,
        supported_networks: vec!["devnet".to_owned(), "mainnet".to_owned()],
        capabilities: CapabilitySet::from([
            Capability::Connect,
            Capability::Disconnect,
            Capability::SignMessage,
            Capability::SignTransaction,
            Capability::SubmitTransaction,
        ]),
        adapter: AdapterLocator {
            adapter_type: "remote".to_owned(),
            endpoint: Some(format!("https://{id}.example/connect")),
            status_endpoint: None,
        },
        docs: None,
    }
}

/// A registry at `sequence` carrying two sample wallets.
pub fn sample_registry(sequence: u64) -> WalletRegistry {
    WalletRegistry {
        metadata: RegistryMetadata {
            version: format!("1.0.{sequence}"),
            schema_version: REGISTRY_SCHEMA_VERSION,
            sequence,
            timestamp: 1_700_000_000_000 + sequence,
        },
        wallets: vec![sample_wallet_entry("alpha"), sample_wallet_entry("beta")],
    }
}

/// Registry bytes plus their detached signature, ready to serve.
#[derive(Debug, Clone)]
pub struct SignedFixture {
    /// The exact bytes the signature covers.
    pub bytes: Vec<u8>,
    /// The detached signature document.
    pub signature: DetachedSignature,
}

impl SignedFixture {
    /// The signature document serialized for serving.
    pub fn signature_json(&self) -> Vec<u8> {
        serde_json::to_vec(&self.signature).unwrap_or_default()
    }

    /// The same fixture with one registry byte flipped after signing.
    pub fn tampered(&self) -> SignedFixture {
        let mut bytes = self.bytes.clone();
        // Flip a byte in the middle of the document.
        let position = bytes.len() / 2;
        if let Some(byte) = bytes.get_mut(position) {
            *byte ^= 0x01;
        }
        SignedFixture {
            bytes,
            signature: self.signature.clone(),
        }
    }
}

/// Signing-key fixture for registry tests.
pub struct RegistryFixture {
    signing_key: SigningKey,
}

impl Default for RegistryFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryFixture {
    /// Generate a fresh signing key.
    pub fn new() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// The verifying key for this fixture.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The verifying key encoded the way client config expects it.
    pub fn trusted_key_base64(&self) -> String {
        BASE64.encode(self.verifying_key().as_bytes())
    }

    /// Sign `registry`, producing servable bytes plus detached signature.
    pub fn sign(&self, registry: &WalletRegistry) -> SignedFixture {
        let bytes = serde_json::to_vec(registry).unwrap_or_default();
        let signature = self.signing_key.sign(&bytes);
        SignedFixture {
            bytes,
            signature: DetachedSignature {
                algorithm: "ed25519".to_owned(),
                signature: BASE64.encode(signature.to_bytes()),
                key_fingerprint: key_fingerprint(&self.verifying_key()),
                signed_at: Utc::now(),
            },
        }
    }

    /// Sign the sample registry at `sequence`.
    ///
    /// Signing a sequence lower than one already accepted produces the
    /// downgrade fixture: validly signed, but stale.
    pub fn signed_with_sequence(&self, sequence: u64) -> SignedFixture {
        self.sign(&sample_registry(sequence))
    }
}
