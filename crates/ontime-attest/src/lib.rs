//! # ontime-attest
//!
//! **Attestation Plane**: canonical digests for arrival statements and
//! recovery of the witnesses who signed them.
//!
//! ## Architecture
//!
//! 1. **AttestationDigestBuilder**: domain-separated typed-data digests for
//!    single-arrival and mutual-arrival statements
//! 2. **SignatureVerifier**: recovers a signer [`Address`] from a digest and a
//!    65-byte `r ‖ s ‖ v` signature; failure yields [`Address::ZERO`]
//! 3. **Witness checks**: order-agnostic two-witness verification with the
//!    legacy signed-message fallback
//!
//! ```text
//! (arriver, witnesses, ts) → AttestationDigestBuilder → digest
//!     → SignatureVerifier.recover(digest | legacy(digest), sig) → {A, B}?
//! ```
//!
//! [`Address`]: ontime_types::Address
//! [`Address::ZERO`]: ontime_types::Address::ZERO

pub mod digest;
pub mod signature;
pub mod witness;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use digest::{AttestationDigestBuilder, Hash32};
pub use signature::{RecoverableSignature, Secp256k1Verifier, SignatureVerifier};
pub use witness::{verify_counterparty, verify_witness_pair};
