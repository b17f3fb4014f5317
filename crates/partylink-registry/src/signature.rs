//! Detached-signature verification and key fingerprinting.
//!
//! The signature is computed over the exact UTF-8 bytes of the registry
//! JSON. Verification therefore happens on the raw fetched bytes, before any
//! parsing; a registry that fails verification is discarded wholesale, never
//! partially trusted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature as Ed25519Signature, VerifyingKey};
use partylink_core::{PartyLinkError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Signature algorithm accepted by this client.
pub const SIGNATURE_ALGORITHM: &str = "ed25519";

/// Length of the fingerprint in hex characters.
const FINGERPRINT_LEN: usize = 16;

/// The detached signature document published next to the registry JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedSignature {
    /// Signature algorithm; only `"ed25519"` is accepted.
    pub algorithm: String,
    /// Base64-encoded 64-byte signature over the registry bytes.
    pub signature: String,
    /// Fingerprint of the signing key, for operator diagnostics.
    pub key_fingerprint: String,
    /// When the registry was signed.
    pub signed_at: DateTime<Utc>,
}

/// Fingerprint of a public key: first 16 hex characters of its SHA-256.
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut fp = hex::encode(digest);
    fp.truncate(FINGERPRINT_LEN);
    fp
}

/// Parse a base64-encoded raw Ed25519 public key.
pub fn parse_trusted_key(key_base64: &str) -> Result<VerifyingKey> {
    let bytes = BASE64
        .decode(key_base64.trim())
        .map_err(|err| PartyLinkError::serialization(format!("bad public key encoding: {err}")))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| PartyLinkError::serialization("public key must be 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|err| PartyLinkError::serialization(format!("invalid public key: {err}")))
}

/// Verify registry bytes against the configured trust anchors.
///
/// Keys are tried in order; the first match wins and its fingerprint is
/// returned. Any failure — unsupported algorithm, malformed signature, or no
/// key matching — is reported as `TAMPERED`.
pub fn verify_registry_bytes(
    bytes: &[u8],
    detached: &DetachedSignature,
    trusted_keys: &[VerifyingKey],
) -> Result<String> {
    if detached.algorithm != SIGNATURE_ALGORITHM {
        return Err(PartyLinkError::tampered(format!(
            "unsupported signature algorithm '{}'",
            detached.algorithm
        )));
    }

    let raw = BASE64
        .decode(detached.signature.trim())
        .map_err(|err| PartyLinkError::tampered(format!("bad signature encoding: {err}")))?;
    let signature = Ed25519Signature::from_slice(&raw)
        .map_err(|err| PartyLinkError::tampered(format!("malformed signature: {err}")))?;

    for key in trusted_keys {
        if key.verify_strict(bytes, &signature).is_ok() {
            return Ok(key_fingerprint(key));
        }
    }

    Err(PartyLinkError::tampered(
        "registry signature does not verify against any trusted key",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn keypair() -> (SigningKey, VerifyingKey) {
        let signing = SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    fn detached(signing: &SigningKey, verifying: &VerifyingKey, bytes: &[u8]) -> DetachedSignature {
        DetachedSignature {
            algorithm: SIGNATURE_ALGORITHM.into(),
            signature: BASE64.encode(signing.sign(bytes).to_bytes()),
            key_fingerprint: key_fingerprint(verifying),
            signed_at: Utc::now(),
        }
    }

    #[test]
    fn verifies_with_matching_key() {
        let (signing, verifying) = keypair();
        let bytes = br#"{"metadata":{"sequence":1}}"#;
        let sig = detached(&signing, &verifying, bytes);
        let fp = verify_registry_bytes(bytes, &sig, &[verifying]).unwrap();
        assert_eq!(fp, key_fingerprint(&verifying));
        assert_eq!(fp.len(), 16);
    }

    #[test]
    fn first_matching_key_wins() {
        let (signing, verifying) = keypair();
        let (_, other) = keypair();
        let bytes = b"registry";
        let sig = detached(&signing, &verifying, bytes);
        // Non-matching key first; the matching key is still found.
        let fp = verify_registry_bytes(bytes, &sig, &[other, verifying]).unwrap();
        assert_eq!(fp, key_fingerprint(&verifying));
    }

    #[test]
    fn any_byte_mutation_fails_verification() {
        let (signing, verifying) = keypair();
        let bytes = br#"{"metadata":{"sequence":5},"wallets":[]}"#.to_vec();
        let sig = detached(&signing, &verifying, &bytes);

        for position in 0..bytes.len() {
            let mut mutated = bytes.clone();
            mutated[position] ^= 0x01;
            let err = verify_registry_bytes(&mutated, &sig, &[verifying]).unwrap_err();
            assert_eq!(err.code(), "TAMPERED");
        }
    }

    #[test]
    fn unknown_algorithm_is_tampered() {
        let (signing, verifying) = keypair();
        let bytes = b"registry";
        let mut sig = detached(&signing, &verifying, bytes);
        sig.algorithm = "rsa-pss".into();
        let err = verify_registry_bytes(bytes, &sig, &[verifying]).unwrap_err();
        assert_eq!(err.code(), "TAMPERED");
    }

    #[test]
    fn trusted_key_round_trips_through_base64() {
        let (_, verifying) = keypair();
        let encoded = BASE64.encode(verifying.as_bytes());
        let parsed = parse_trusted_key(&encoded).unwrap();
        assert_eq!(parsed.as_bytes(), verifying.as_bytes());
    }
}
