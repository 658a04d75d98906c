//! Canonical, domain-separated digests for arrival statements.
//!
//! Digests follow the typed structured-data layout:
//!
//! ```text
//! domainSeparator = keccak256(DOMAIN_TYPEHASH ‖ keccak(name) ‖ keccak(version)
//!                             ‖ chainId ‖ instance)
//! structHash      = keccak256(TYPEHASH ‖ field₁ ‖ … ‖ fieldₙ)      (every field one 32-byte word)
//! digest          = keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)
//! ```
//!
//! Binding the chain id and the instance address into the domain separator
//! stops a signature collected for one commitment from verifying on another.
//!
//! The two witnesses of a single-arrival statement are sorted before hashing,
//! so the digest does not depend on which slot each witness was passed in.
//! Mutual statements are directional: `mutual(a, b, t) != mutual(b, a, t)`.

use ontime_types::{Address, DomainConfig, constants};
use sha3::{Digest, Keccak256};

use crate::signature::{finish, keccak256};

/// A 32-byte Keccak-256 output.
pub type Hash32 = [u8; 32];

/// Builds digests for one deployed commitment instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestationDigestBuilder {
    domain_separator: Hash32,
}

impl AttestationDigestBuilder {
    /// Precompute the domain separator for `domain` under the current
    /// protocol name and version.
    #[must_use]
    pub fn new(domain: &DomainConfig) -> Self {
        Self::with_protocol(
            domain,
            constants::PROTOCOL_NAME,
            constants::PROTOCOL_VERSION,
        )
    }

    /// Build for an explicit protocol name / version.
    #[must_use]
    pub fn with_protocol(domain: &DomainConfig, name: &str, version: &str) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(keccak256(constants::DOMAIN_TYPE.as_bytes()));
        hasher.update(keccak256(name.as_bytes()));
        hasher.update(keccak256(version.as_bytes()));
        hasher.update(u64_word(domain.chain_id));
        hasher.update(address_word(&domain.instance));
        Self {
            domain_separator: finish(hasher),
        }
    }

    #[must_use]
    pub fn domain_separator(&self) -> &Hash32 {
        &self.domain_separator
    }

    /// Digest the two witnesses sign to attest that `arriver` arrived at
    /// `timestamp`.
    #[must_use]
    pub fn arrival_digest(
        &self,
        arriver: &Address,
        witness_a: &Address,
        witness_b: &Address,
        timestamp: u64,
    ) -> Hash32 {
        let (low, high) = if witness_a <= witness_b {
            (witness_a, witness_b)
        } else {
            (witness_b, witness_a)
        };
        let mut hasher = Keccak256::new();
        hasher.update(keccak256(constants::ARRIVAL_TYPE.as_bytes()));
        hasher.update(address_word(arriver));
        hasher.update(address_word(low));
        hasher.update(address_word(high));
        hasher.update(u64_word(timestamp));
        self.typed(&finish(hasher))
    }

    /// Digest `counterparty` signs to attest that `arriver` arrived at
    /// `timestamp`. One mutual exchange needs one digest per direction.
    #[must_use]
    pub fn mutual_digest(
        &self,
        arriver: &Address,
        counterparty: &Address,
        timestamp: u64,
    ) -> Hash32 {
        let mut hasher = Keccak256::new();
        hasher.update(keccak256(constants::MUTUAL_ARRIVAL_TYPE.as_bytes()));
        hasher.update(address_word(arriver));
        hasher.update(address_word(counterparty));
        hasher.update(u64_word(timestamp));
        self.typed(&finish(hasher))
    }

    fn typed(&self, struct_hash: &Hash32) -> Hash32 {
        let mut hasher = Keccak256::new();
        hasher.update([0x19_u8, 0x01]);
        hasher.update(self.domain_separator);
        hasher.update(struct_hash);
        finish(hasher)
    }
}

/// Left-pad an address into a 32-byte word.
fn address_word(addr: &Address) -> Hash32 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_bytes());
    word
}

/// Big-endian `u64` in a 32-byte word.
fn u64_word(value: u64) -> Hash32 {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}
