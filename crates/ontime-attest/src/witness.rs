//! Witness signature checks.
//!
//! Every signature is first recovered against the raw digest. Only when the
//! recovered identity is none of the expected signers is it recovered again
//! against the legacy signed-message encoding of the same digest. Wallets
//! that sign with the legacy prefix and wallets that sign typed data
//! directly are therefore both accepted, and may be mixed within one claim.

use ontime_types::{Address, OntimeError, Result};

use crate::digest::Hash32;
use crate::signature::{RecoverableSignature, SignatureVerifier, legacy_digest};

/// Recover `signature` over `digest`, falling back to the legacy encoding
/// when the raw recovery matches none of `expected`.
pub fn recover_expecting<V: SignatureVerifier + ?Sized>(
    verifier: &V,
    digest: &Hash32,
    signature: &RecoverableSignature,
    expected: &[Address],
) -> Address {
    let raw = verifier.recover(digest, signature);
    if !raw.is_zero() && expected.contains(&raw) {
        return raw;
    }
    verifier.recover(&legacy_digest(digest), signature)
}

/// Check that two signatures over `digest`, taken as a set, recover to
/// exactly `{witness_a, witness_b}`, regardless of which slot each came from.
///
/// # Errors
/// - `InvalidWitnesses` if the two witnesses are the same identity
/// - `SignerMismatch` if either signature is malformed or the recovered set
///   differs from the expected set
pub fn verify_witness_pair<V: SignatureVerifier + ?Sized>(
    verifier: &V,
    digest: &Hash32,
    witness_a: &Address,
    witness_b: &Address,
    sig_a: &RecoverableSignature,
    sig_b: &RecoverableSignature,
) -> Result<()> {
    if witness_a == witness_b {
        return Err(OntimeError::InvalidWitnesses {
            reason: format!("both witnesses are {witness_a}"),
        });
    }
    let expected = [*witness_a, *witness_b];
    let first = recover_expecting(verifier, digest, sig_a, &expected);
    let second = recover_expecting(verifier, digest, sig_b, &expected);

    if first.is_zero() || second.is_zero() {
        tracing::warn!(
            witness_a = %witness_a,
            witness_b = %witness_b,
            "Malformed witness signature"
        );
        return Err(OntimeError::SignerMismatch {
            reason: "malformed signature".into(),
        });
    }

    let straight = first == *witness_a && second == *witness_b;
    let swapped = first == *witness_b && second == *witness_a;
    if straight || swapped {
        Ok(())
    } else {
        tracing::warn!(
            witness_a = %witness_a,
            witness_b = %witness_b,
            recovered_first = %first,
            recovered_second = %second,
            "Witness signatures recovered to unexpected signers"
        );
        Err(OntimeError::SignerMismatch {
            reason: format!(
                "recovered {{{first}, {second}}}, expected {{{witness_a}, {witness_b}}}"
            ),
        })
    }
}

/// Check that `signature` over `digest` recovers to `expected`.
///
/// # Errors
/// Returns `SignerMismatch` if the signature is malformed or recovers to
/// anyone else.
pub fn verify_counterparty<V: SignatureVerifier + ?Sized>(
    verifier: &V,
    digest: &Hash32,
    expected: &Address,
    signature: &RecoverableSignature,
) -> Result<()> {
    let recovered = recover_expecting(verifier, digest, signature, std::slice::from_ref(expected));
    if recovered.is_zero() {
        return Err(OntimeError::SignerMismatch {
            reason: "malformed signature".into(),
        });
    }
    if recovered != *expected {
        tracing::warn!(
            expected = %expected,
            recovered = %recovered,
            "Counterparty signature mismatch"
        );
        return Err(OntimeError::SignerMismatch {
            reason: format!("recovered {recovered}, expected {expected}"),
        });
    }
    Ok(())
}
