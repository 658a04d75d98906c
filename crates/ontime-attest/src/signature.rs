//! # secp256k1 signer recovery
//!
//! Recovers the 20-byte [`Address`] that produced a 65-byte `r ‖ s ‖ v`
//! signature over a 32-byte digest.
//!
//! ## Security Notes
//!
//! - Recovery never aborts: a malformed signature (bad `v`, zero or
//!   out-of-range scalars, high-S, no valid point) recovers to
//!   [`Address::ZERO`]. Callers must reject that sentinel.
//! - High-S signatures are rejected by `k256` verification (malleability).
//! - Length is validated once at the boundary by
//!   [`RecoverableSignature::from_slice`]; everything past that point works on
//!   the fixed-size type.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use ontime_types::{Address, OntimeError, Result, constants};
use sha3::{Digest, Keccak256};

use crate::digest::Hash32;

/// A fixed-length recoverable ECDSA signature: `r (32) ‖ s (32) ‖ v (1)`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; constants::SIGNATURE_LEN]);

impl RecoverableSignature {
    #[must_use]
    pub fn from_bytes(bytes: [u8; constants::SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Validate the length of an untrusted byte string.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; constants::SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| OntimeError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; constants::SIGNATURE_LEN] {
        &self.0
    }

    /// The 64-byte `r ‖ s` part.
    #[must_use]
    pub fn rs(&self) -> &[u8] {
        &self.0[..64]
    }

    #[must_use]
    pub fn v(&self) -> u8 {
        self.0[64]
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature(0x{}…)", hex::encode(&self.0[..8]))
    }
}

/// Recovers signer identities. No side effects.
pub trait SignatureVerifier {
    /// Recover the signer of `digest`, or [`Address::ZERO`] if the signature
    /// is malformed or recovery fails.
    fn recover(&self, digest: &Hash32, signature: &RecoverableSignature) -> Address;
}

/// `k256`-backed secp256k1 recovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn recover(&self, digest: &Hash32, signature: &RecoverableSignature) -> Address {
        try_recover(digest, signature).unwrap_or(Address::ZERO)
    }
}

fn try_recover(digest: &Hash32, signature: &RecoverableSignature) -> Option<Address> {
    let recovery_id = parse_recovery_id(signature.v())?;
    let sig = Signature::from_slice(signature.rs()).ok()?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id).ok()?;
    Some(address_from_key(&key))
}

/// Valid `v` values: 0, 1, 27, 28.
fn parse_recovery_id(v: u8) -> Option<RecoveryId> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return None,
    };
    RecoveryId::from_byte(id)
}

/// Keccak-256 of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    finish(hasher)
}

/// Legacy encoding: `keccak256("\x19Ethereum Signed Message:\n32" ‖ digest)`.
#[must_use]
pub fn legacy_digest(digest: &Hash32) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(constants::LEGACY_MESSAGE_PREFIX);
    hasher.update(digest);
    finish(hasher)
}

pub(crate) fn finish(hasher: Keccak256) -> Hash32 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Address of a public key: last 20 bytes of Keccak-256 over the
/// uncompressed point without its `0x04` tag.
#[must_use]
pub fn address_from_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}
