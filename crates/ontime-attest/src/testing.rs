//! Test signers producing real recoverable signatures.
//!
//! **Never use in production**: keys are either random or derived from a
//! one-byte seed.

use k256::ecdsa::SigningKey;
use ontime_types::Address;

use crate::digest::Hash32;
use crate::signature::{RecoverableSignature, address_from_key, legacy_digest};

/// A secp256k1 key that signs digests the way a participant's wallet would.
#[derive(Clone)]
pub struct TestSigner {
    key: SigningKey,
}

impl TestSigner {
    pub fn random() -> Self {
        Self {
            key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Deterministic key whose scalar is `[seed; 32]`. `seed` must be non-zero.
    pub fn from_seed(seed: u8) -> Self {
        assert!(seed != 0, "seed must be non-zero");
        Self {
            key: SigningKey::from_slice(&[seed; 32])
                .expect("small repeated-byte scalars are valid"),
        }
    }

    pub fn address(&self) -> Address {
        address_from_key(self.key.verifying_key())
    }

    /// Sign `digest` directly (typed-data style).
    pub fn sign(&self, digest: &Hash32) -> RecoverableSignature {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(digest)
            .expect("signing a 32-byte prehash");
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recid.to_byte() + 27;
        RecoverableSignature::from_bytes(bytes)
    }

    /// Sign the legacy signed-message encoding of `digest`.
    pub fn sign_legacy(&self, digest: &Hash32) -> RecoverableSignature {
        self.sign(&legacy_digest(digest))
    }
}
