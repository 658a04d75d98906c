//! The commitment facade: one escrow instance and every operation on it.
//!
//! ```text
//! deposit ──▶ confirm_arrival / confirm_mutual_arrival ──▶ finalize ──▶ withdraw
//!        └──▶ report_only_arrived ────────────────────────┘
//!        └──▶ cancel_before_arrivals ─────────────────────┘
//! ```
//!
//! Every mutating call takes `&mut self` for its whole duration, so calls on
//! one instance are totally ordered and a payout can never re-enter the
//! commitment. Every rejection happens before the first write, except a
//! failed payout (see [`crate::withdraw`]).

use std::collections::{BTreeMap, HashMap};

use ontime_attest::{
    AttestationDigestBuilder, RecoverableSignature, Secp256k1Verifier, verify_counterparty,
    verify_witness_pair,
};
use ontime_types::{
    Address, Clock, CommitmentConfig, CommitmentEvent, CommitmentState, OntimeError, Result,
    Roster, SettlementOutcome, SystemClock,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::arrival::{ArrivalRegistry, ProofReferences};
use crate::finalize::{FinalizationEngine, Settlement};
use crate::ledger::DepositLedger;
use crate::supply_conservation::SupplyConservation;
use crate::voting::{ReportingWindow, VotingResolver};
use crate::withdraw::{Payout, WithdrawalGateway};

/// A witnessed claim that the caller arrived at `timestamp`.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalAttestation<'a> {
    pub witness_a: Address,
    pub witness_b: Address,
    pub timestamp: u64,
    pub sig_a: &'a [u8],
    pub sig_b: &'a [u8],
    pub proof_ref: &'a str,
}

/// A two-way claim that the caller and `other` both arrived at `timestamp`.
#[derive(Debug, Clone, Copy)]
pub struct MutualAttestation<'a> {
    pub other: Address,
    pub timestamp: u64,
    /// Signed by `other` over `mutual(caller, other, timestamp)`.
    pub sig_other_for_caller: &'a [u8],
    /// Signed by the caller over `mutual(other, caller, timestamp)`.
    pub sig_caller_for_other: &'a [u8],
    pub proof_ref: &'a str,
}

/// One meeting-attendance escrow.
pub struct Commitment<C: Clock = SystemClock> {
    config: CommitmentConfig,
    roster: Roster,
    digests: AttestationDigestBuilder,
    verifier: Secp256k1Verifier,
    clock: C,
    state: CommitmentState,
    ledger: DepositLedger,
    arrivals: ArrivalRegistry,
    proofs: ProofReferences,
    votes: VotingResolver,
    supply: SupplyConservation,
    outcome: Option<SettlementOutcome>,
    events: Vec<CommitmentEvent>,
}

impl<C: Clock> Commitment<C> {
    /// Create a commitment in `Created`.
    ///
    /// # Errors
    /// Returns `Configuration` if the config fails validation, or if a full
    /// roster of deposits would leave the amount range.
    pub fn new(config: CommitmentConfig, roster: Roster, clock: C) -> Result<Self> {
        config.validate()?;
        // Every later sum is bounded by the fully funded pool.
        if config
            .deposit_amount
            .checked_mul(Decimal::from(roster.len()))
            .is_none()
        {
            return Err(OntimeError::Configuration(format!(
                "deposit_amount {} times {} participants exceeds the amount range",
                config.deposit_amount,
                roster.len()
            )));
        }
        tracing::info!(
            instance = %config.domain.instance,
            participants = roster.len(),
            meeting_time = config.meeting_time,
            deposit = %config.deposit_amount,
            "Commitment created"
        );
        Ok(Self {
            digests: AttestationDigestBuilder::new(&config.domain),
            verifier: Secp256k1Verifier,
            config,
            roster,
            clock,
            state: CommitmentState::Created,
            ledger: DepositLedger::new(),
            arrivals: ArrivalRegistry::new(),
            proofs: ProofReferences::new(),
            votes: VotingResolver::new(),
            supply: SupplyConservation::new(),
            outcome: None,
            events: Vec::new(),
        })
    }

    // =================================================================
    // Operations
    // =================================================================

    /// Lock exactly `deposit_amount` for `caller`.
    ///
    /// # Errors
    /// - `NotOnRoster` for a non-member
    /// - `WrongState` unless the commitment is `Created`
    /// - `AlreadyDeposited`, `WrongDepositAmount` from the ledger
    pub fn deposit(&mut self, caller: Address, amount: Decimal) -> Result<()> {
        self.roster.ensure_member(&caller)?;
        if self.state != CommitmentState::Created {
            return Err(OntimeError::WrongState {
                expected: CommitmentState::Created,
                actual: self.state,
            });
        }
        self.ledger
            .deposit(caller, amount, self.config.deposit_amount)?;
        self.supply.record_deposit(amount);

        tracing::info!(participant = %caller, %amount, "Deposit accepted");
        self.emit(CommitmentEvent::Deposited {
            participant: caller,
            amount,
        });
        if self.ledger.depositor_count() == self.roster.len() {
            self.advance(CommitmentState::InProgress);
        }
        Ok(())
    }

    /// Record `caller`'s arrival, corroborated by two roster witnesses.
    ///
    /// Returns `true` if this call set the arrival; `false` if an earlier
    /// arrival was already recorded and kept. The proof reference is stored
    /// either way.
    ///
    /// # Errors
    /// Authorization, state, validation and crypto errors, all raised before
    /// any write.
    pub fn confirm_arrival(
        &mut self,
        caller: Address,
        attestation: &ArrivalAttestation<'_>,
    ) -> Result<bool> {
        self.check_arrival(caller, attestation).inspect_err(|e| {
            tracing::warn!(participant = %caller, error = %e, "Arrival attestation rejected");
        })?;

        let recorded = self.record_arrival(caller, attestation.timestamp);
        self.store_proof(caller, attestation.proof_ref);
        Ok(recorded)
    }

    fn check_arrival(&self, caller: Address, att: &ArrivalAttestation<'_>) -> Result<()> {
        self.check_claim(caller, att.timestamp, att.proof_ref)?;
        for witness in [&att.witness_a, &att.witness_b] {
            if !self.roster.contains(witness) {
                return Err(OntimeError::WitnessNotOnRoster(*witness));
            }
            if *witness == caller {
                return Err(OntimeError::InvalidWitnesses {
                    reason: format!("{caller} cannot witness their own arrival"),
                });
            }
        }
        let sig_a = RecoverableSignature::from_slice(att.sig_a)?;
        let sig_b = RecoverableSignature::from_slice(att.sig_b)?;
        let digest =
            self.digests
                .arrival_digest(&caller, &att.witness_a, &att.witness_b, att.timestamp);
        verify_witness_pair(
            &self.verifier,
            &digest,
            &att.witness_a,
            &att.witness_b,
            &sig_a,
            &sig_b,
        )
    }

    /// Record the arrival of both `caller` and `other` from a mutual
    /// exchange of signatures. Returns how many arrivals this call set.
    ///
    /// # Errors
    /// Authorization, state, validation and crypto errors, all raised before
    /// any write.
    pub fn confirm_mutual_arrival(
        &mut self,
        caller: Address,
        attestation: &MutualAttestation<'_>,
    ) -> Result<usize> {
        self.check_mutual(caller, attestation).inspect_err(|e| {
            tracing::warn!(
                participant = %caller,
                other = %attestation.other,
                error = %e,
                "Mutual attestation rejected"
            );
        })?;

        let mut recorded = 0;
        for who in [caller, attestation.other] {
            if self.record_arrival(who, attestation.timestamp) {
                recorded += 1;
            }
            self.store_proof(who, attestation.proof_ref);
        }
        Ok(recorded)
    }

    fn check_mutual(&self, caller: Address, att: &MutualAttestation<'_>) -> Result<()> {
        self.check_claim(caller, att.timestamp, att.proof_ref)?;
        if !self.roster.contains(&att.other) {
            return Err(OntimeError::WitnessNotOnRoster(att.other));
        }
        if att.other == caller {
            return Err(OntimeError::InvalidWitnesses {
                reason: format!("{caller} cannot attest for themselves"),
            });
        }
        let other_sig = RecoverableSignature::from_slice(att.sig_other_for_caller)?;
        let caller_sig = RecoverableSignature::from_slice(att.sig_caller_for_other)?;

        let for_caller = self.digests.mutual_digest(&caller, &att.other, att.timestamp);
        verify_counterparty(&self.verifier, &for_caller, &att.other, &other_sig)?;
        let for_other = self.digests.mutual_digest(&att.other, &caller, att.timestamp);
        verify_counterparty(&self.verifier, &for_other, &caller, &caller_sig)
    }

    /// Checks shared by both attestation flows.
    fn check_claim(&self, caller: Address, timestamp: u64, proof_ref: &str) -> Result<()> {
        self.roster.ensure_member(&caller)?;
        self.ensure_open()?;
        if proof_ref.is_empty() {
            return Err(OntimeError::EmptyProofReference);
        }
        if timestamp < self.config.meeting_time {
            return Err(OntimeError::TimestampBeforeMeeting {
                timestamp,
                meeting_time: self.config.meeting_time,
            });
        }
        let now = self.clock.now();
        if timestamp > now {
            return Err(OntimeError::TimestampInFuture { timestamp, now });
        }
        Ok(())
    }

    /// Vote that `candidate` is the one participant who showed up.
    ///
    /// # Errors
    /// - `AlreadyFinalized` after finalization
    /// - any rejection from [`VotingResolver::vote`]
    pub fn report_only_arrived(&mut self, caller: Address, candidate: Address) -> Result<()> {
        let now = self.clock.now();
        let window = ReportingWindow {
            opens: self.config.meeting_time,
            closes: self.config.reporting_closes_at(),
        };
        self.ensure_open()
            .and_then(|()| {
                self.votes
                    .vote(&self.roster, &self.ledger, window, now, caller, candidate)
            })
            .inspect_err(|e| {
                tracing::warn!(
                    voter = %caller,
                    candidate = %candidate,
                    error = %e,
                    "Vote rejected"
                );
            })?;

        tracing::info!(
            voter = %caller,
            candidate = %candidate,
            tally = self.votes.tally_of(&candidate),
            "Vote cast"
        );
        self.emit(CommitmentEvent::VoteCast {
            voter: caller,
            candidate,
        });
        Ok(())
    }

    /// Finalize as `Cancelled` before anyone arrived or voted. Every
    /// depositor may then withdraw exactly their deposit.
    ///
    /// # Errors
    /// - `NotOnRoster`, `NotDepositor` for an ineligible caller
    /// - `AlreadyFinalized` after finalization
    /// - `CancelNotAllowed` once an arrival or a vote is recorded
    pub fn cancel_before_arrivals(&mut self, caller: Address) -> Result<()> {
        self.roster.ensure_member(&caller)?;
        self.ensure_open()?;
        if !self.ledger.has_deposited(&caller) {
            return Err(OntimeError::NotDepositor(caller));
        }
        let arrivals = self.arrivals.count_recorded();
        if arrivals > 0 {
            return Err(OntimeError::CancelNotAllowed {
                reason: format!("{arrivals} arrival(s) already recorded"),
            });
        }
        let votes = self.votes.total_votes();
        if votes > 0 {
            return Err(OntimeError::CancelNotAllowed {
                reason: format!("{votes} vote(s) already cast"),
            });
        }

        let settlement = FinalizationEngine::cancellation(&self.ledger);
        self.emit(CommitmentEvent::Cancelled { by: caller });
        self.commit_settlement(settlement)?;
        tracing::info!(by = %caller, "Commitment cancelled");
        Ok(())
    }

    /// Settle every balance and move to `Finalized`.
    ///
    /// # Errors
    /// - `NotOnRoster` for a non-member
    /// - `AlreadyFinalized`, `FinalizeTooEarly` from the guard
    /// - `SupplyInvariantViolation` if the settlement would not conserve
    ///   supply; nothing is applied in that case
    pub fn finalize(&mut self, caller: Address) -> Result<SettlementOutcome> {
        self.roster.ensure_member(&caller)?;
        let now = self.clock.now();
        let engine = FinalizationEngine::new(&self.config, &self.roster);
        engine.check_guard(self.state, &self.arrivals, now)?;
        let settlement = engine.settle(&self.ledger, &self.arrivals, &self.votes, now)?;
        self.commit_settlement(settlement)
    }

    /// Pay `caller`'s full balance through `payout`.
    ///
    /// # Errors
    /// - `NotOnRoster` for a non-member
    /// - `WrongState`, `NothingToWithdraw` from the gateway
    /// - `TransferFailed` if the release failed; the amount is stranded
    pub fn withdraw<P: Payout + ?Sized>(
        &mut self,
        caller: Address,
        payout: &mut P,
    ) -> Result<Decimal> {
        self.roster.ensure_member(&caller)?;
        let gateway = WithdrawalGateway::new(self.state);
        let result = gateway.execute(&mut self.ledger, &mut self.supply, &caller, payout);
        self.supply.verify(self.ledger.total_balances())?;

        match result {
            Ok(amount) => {
                self.emit(CommitmentEvent::Withdrawn {
                    participant: caller,
                    amount,
                });
                Ok(amount)
            }
            Err(OntimeError::TransferFailed { to, amount, reason }) => {
                self.emit(CommitmentEvent::WithdrawalFailed {
                    participant: to,
                    amount,
                    reason: reason.clone(),
                });
                Err(OntimeError::TransferFailed { to, amount, reason })
            }
            Err(e) => Err(e),
        }
    }

    // =================================================================
    // Internals
    // =================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_finalized() {
            Err(OntimeError::AlreadyFinalized)
        } else {
            Ok(())
        }
    }

    fn advance(&mut self, target: CommitmentState) {
        if self.state.can_transition_to(target) {
            tracing::info!(from = %self.state, to = %target, "State transition");
            self.state = target;
        }
    }

    fn record_arrival(&mut self, who: Address, timestamp: u64) -> bool {
        if !self.arrivals.record_arrival(who, timestamp) {
            tracing::debug!(
                participant = %who,
                kept = self.arrivals.arrival_of(&who),
                "Arrival already recorded"
            );
            return false;
        }
        tracing::info!(participant = %who, timestamp, "Arrival recorded");
        self.emit(CommitmentEvent::ArrivalRecorded {
            participant: who,
            timestamp,
        });
        self.advance(CommitmentState::InProgress);
        true
    }

    fn store_proof(&mut self, who: Address, proof_ref: &str) {
        self.proofs.store(who, proof_ref);
        self.emit(CommitmentEvent::ProofStored {
            participant: who,
            proof_ref: proof_ref.to_string(),
        });
    }

    /// Verify, then apply. A settlement that fails conservation is dropped
    /// without touching the ledger.
    fn commit_settlement(&mut self, settlement: Settlement) -> Result<SettlementOutcome> {
        self.supply
            .verify_with_loss(settlement.total(), settlement.undistributed)?;

        let Settlement {
            outcome,
            balances,
            undistributed,
        } = settlement;
        self.ledger.apply(balances);
        self.supply.record_undistributed(undistributed);
        self.advance(CommitmentState::Finalized);
        self.outcome = Some(outcome.clone());

        tracing::info!(%outcome, %undistributed, "Commitment finalized");
        self.emit(CommitmentEvent::Finalized {
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    fn emit(&mut self, event: CommitmentEvent) {
        tracing::trace!(event = event.tag(), "Event emitted");
        self.events.push(event);
    }

    // =================================================================
    // Accessors
    // =================================================================

    #[must_use]
    pub fn state(&self) -> CommitmentState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &CommitmentConfig {
        &self.config
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Digest builder bound to this instance's domain, for clients preparing
    /// signatures.
    #[must_use]
    pub fn digests(&self) -> &AttestationDigestBuilder {
        &self.digests
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    #[must_use]
    pub fn balance_of(&self, who: &Address) -> Decimal {
        self.ledger.balance_of(who)
    }

    #[must_use]
    pub fn deposit_of(&self, who: &Address) -> Decimal {
        self.ledger.deposit_of(who)
    }

    #[must_use]
    pub fn has_deposited(&self, who: &Address) -> bool {
        self.ledger.has_deposited(who)
    }

    #[must_use]
    pub fn stranded_of(&self, who: &Address) -> Decimal {
        self.ledger.stranded_of(who)
    }

    #[must_use]
    pub fn total_deposited(&self) -> Decimal {
        self.ledger.total_deposited()
    }

    /// Recorded arrival, `0` if unset.
    #[must_use]
    pub fn arrival_of(&self, who: &Address) -> u64 {
        self.arrivals.arrival_of(who)
    }

    #[must_use]
    pub fn arrival_count(&self) -> usize {
        self.arrivals.count_recorded()
    }

    #[must_use]
    pub fn proof_of(&self, who: &Address) -> Option<&str> {
        self.proofs.proof_of(who)
    }

    #[must_use]
    pub fn vote_of(&self, voter: &Address) -> Option<Address> {
        self.votes.vote_of(voter)
    }

    #[must_use]
    pub fn tally_of(&self, candidate: &Address) -> usize {
        self.votes.tally_of(candidate)
    }

    #[must_use]
    pub fn total_votes(&self) -> usize {
        self.votes.total_votes()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SettlementOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    #[must_use]
    pub fn events(&self) -> &[CommitmentEvent] {
        &self.events
    }

    /// Hand the pending notifications to an observer.
    pub fn drain_events(&mut self) -> Vec<CommitmentEvent> {
        std::mem::take(&mut self.events)
    }

    // =================================================================
    // Persistence
    // =================================================================

    /// Export the persisted entity set.
    #[must_use]
    pub fn snapshot(&self) -> CommitmentSnapshot {
        CommitmentSnapshot {
            config: self.config.clone(),
            roster: self.roster.clone(),
            state: self.state,
            deposits: sorted(self.ledger.deposits()),
            balances: sorted(self.ledger.balances()),
            stranded: sorted(self.ledger.stranded()),
            arrivals: sorted(self.arrivals.entries()),
            proofs: sorted(self.proofs.entries()),
            votes: sorted(self.votes.entries()),
            outcome: self.outcome.clone(),
            total_released: self.supply.total_released(),
            total_undistributed: self.supply.total_undistributed(),
        }
    }

    /// Rebuild a commitment from a snapshot.
    ///
    /// # Errors
    /// - `Configuration` if the config fails validation
    /// - `NotOnRoster` if any column names a non-member
    /// - `WrongDepositAmount` if a deposit differs from the configured amount
    /// - `Overflow` if a column total leaves the amount range
    /// - `SupplyInvariantViolation` if an amount is negative or the balances
    ///   do not conserve supply
    pub fn restore(snapshot: CommitmentSnapshot, clock: C) -> Result<Self> {
        let CommitmentSnapshot {
            config,
            roster,
            state,
            deposits,
            balances,
            stranded,
            arrivals,
            proofs,
            votes,
            outcome,
            total_released,
            total_undistributed,
        } = snapshot;

        let named = deposits
            .keys()
            .chain(balances.keys())
            .chain(stranded.keys())
            .chain(arrivals.keys())
            .chain(proofs.keys())
            .chain(votes.keys())
            .chain(votes.values());
        for who in named {
            roster.ensure_member(who)?;
        }
        for amount in deposits.values() {
            if *amount != config.deposit_amount {
                return Err(OntimeError::WrongDepositAmount {
                    required: config.deposit_amount,
                    provided: *amount,
                });
            }
        }

        let mut commitment = Self::new(config, roster, clock)?;
        let deposited = checked_total(deposits.values(), "snapshot deposits")?;
        let total_stranded = checked_total(stranded.values(), "snapshot stranded")?;
        let held = [
            checked_total(balances.values(), "snapshot balances")?,
            total_stranded,
            total_released,
            total_undistributed,
        ];
        let negative = balances
            .values()
            .chain(stranded.values())
            .chain(&held)
            .any(Decimal::is_sign_negative);
        if negative {
            return Err(OntimeError::SupplyInvariantViolation {
                reason: "snapshot holds a negative amount".into(),
            });
        }
        let accounted = checked_total(held.iter(), "snapshot supply")?;
        if accounted != deposited {
            return Err(OntimeError::SupplyInvariantViolation {
                reason: format!("snapshot accounts for {accounted} of {deposited} deposited"),
            });
        }

        commitment.supply.record_deposit(deposited);
        commitment.supply.record_release(total_released);
        commitment.supply.record_stranded(total_stranded);
        commitment.supply.record_undistributed(total_undistributed);
        commitment.ledger = DepositLedger::from_parts(
            deposits.into_iter().collect(),
            balances.into_iter().collect(),
            stranded.into_iter().collect(),
        );

        commitment.arrivals = ArrivalRegistry::from_entries(arrivals.into_iter().collect());
        commitment.proofs = ProofReferences::from_entries(proofs.into_iter().collect());
        commitment.votes = VotingResolver::from_votes(votes.into_iter().collect());
        commitment.state = state;
        commitment.outcome = outcome;
        tracing::info!(state = %state, "Commitment restored");
        Ok(commitment)
    }
}

fn checked_total<'a>(
    amounts: impl IntoIterator<Item = &'a Decimal>,
    context: &'static str,
) -> Result<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))
        .ok_or(OntimeError::Overflow { context })
}

fn sorted<V: Clone>(map: &HashMap<Address, V>) -> BTreeMap<Address, V> {
    map.iter().map(|(k, v)| (*k, v.clone())).collect()
}

/// Serializable image of a commitment's persisted state. Columns are
/// ordered so equal state always serializes identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentSnapshot {
    pub config: CommitmentConfig,
    pub roster: Roster,
    pub state: CommitmentState,
    pub deposits: BTreeMap<Address, Decimal>,
    pub balances: BTreeMap<Address, Decimal>,
    pub stranded: BTreeMap<Address, Decimal>,
    pub arrivals: BTreeMap<Address, u64>,
    pub proofs: BTreeMap<Address, String>,
    pub votes: BTreeMap<Address, Address>,
    pub outcome: Option<SettlementOutcome>,
    pub total_released: Decimal,
    pub total_undistributed: Decimal,
}
