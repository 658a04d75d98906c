//! Arrival registry and proof references.
//!
//! An arrival timestamp is write-once: the first valid attestation wins and
//! later attestations for the same participant are no-ops. Proof references
//! are a separate column where the most recent write wins.

use std::collections::HashMap;

use ontime_types::Address;

/// First valid arrival timestamp per participant.
#[derive(Debug, Clone, Default)]
pub struct ArrivalRegistry {
    arrivals: HashMap<Address, u64>,
}

impl ArrivalRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `timestamp` for `who` unless an arrival is already recorded.
    ///
    /// Returns `true` only when this call set the timestamp, so the caller
    /// knows whether to emit a notification. A zero timestamp is never
    /// stored, since zero means "unset".
    pub fn record_arrival(&mut self, who: Address, timestamp: u64) -> bool {
        if timestamp == 0 || self.arrivals.contains_key(&who) {
            return false;
        }
        self.arrivals.insert(who, timestamp);
        true
    }

    /// Recorded arrival timestamp, `0` if unset.
    #[must_use]
    pub fn arrival_of(&self, who: &Address) -> u64 {
        self.arrivals.get(who).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_arrived(&self, who: &Address) -> bool {
        self.arrivals.contains_key(who)
    }

    /// Number of participants with a recorded arrival.
    #[must_use]
    pub fn count_recorded(&self) -> usize {
        self.arrivals.len()
    }

    pub(crate) fn entries(&self) -> &HashMap<Address, u64> {
        &self.arrivals
    }

    pub(crate) fn from_entries(arrivals: HashMap<Address, u64>) -> Self {
        Self {
            arrivals: arrivals.into_iter().filter(|(_, ts)| *ts != 0).collect(),
        }
    }
}

/// Opaque content handles, stored verbatim.
#[derive(Debug, Clone, Default)]
pub struct ProofReferences {
    proofs: HashMap<Address, String>,
}

impl ProofReferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `proof_ref` for `who`, replacing any earlier reference.
    pub fn store(&mut self, who: Address, proof_ref: &str) {
        self.proofs.insert(who, proof_ref.to_owned());
    }

    #[must_use]
    pub fn proof_of(&self, who: &Address) -> Option<&str> {
        self.proofs.get(who).map(String::as_str)
    }

    pub(crate) fn entries(&self) -> &HashMap<Address, String> {
        &self.proofs
    }

    pub(crate) fn from_entries(proofs: HashMap<Address, String>) -> Self {
        Self { proofs }
    }
}
