//! End-to-end tests across the attestation and settlement planes.
//!
//! These tests exercise the full commitment lifecycle:
//! deposit -> attestation / vote -> finalize -> withdraw
//!
//! They use real secp256k1 signatures produced by `TestSigner` and a manual
//! clock, and check the economic outcomes end to end: penalty sharing,
//! quorum resolution, cancellation refunds, and supply conservation.

use ontime_attest::AttestationDigestBuilder;
use ontime_attest::testing::TestSigner;
use ontime_escrow::{ArrivalAttestation, Commitment, MutualAttestation, Payout};
use ontime_types::*;
use rust_decimal::Decimal;

const MEETING: u64 = 1_700_000_000;
const WINDOW: u64 = 1800;
const GRACE: u64 = 3600;

/// 1.0 in 18-decimal base units.
fn one() -> Decimal {
    Decimal::from(1_000_000_000_000_000_000_u64)
}

/// Records every release; can be switched to fail.
#[derive(Default)]
struct RecordingPayout {
    released: Vec<(Address, Decimal)>,
    fail: bool,
}

impl RecordingPayout {
    fn total(&self) -> Decimal {
        self.released.iter().map(|(_, amount)| *amount).sum()
    }
}

impl Payout for RecordingPayout {
    fn release(&mut self, to: &Address, amount: Decimal) -> std::result::Result<(), String> {
        if self.fail {
            return Err("recipient rejected transfer".into());
        }
        self.released.push((*to, amount));
        Ok(())
    }
}

/// Helper: one commitment with seeded signers and a shared manual clock.
struct Meeting {
    signers: Vec<TestSigner>,
    clock: ManualClock,
    commitment: Commitment<ManualClock>,
}

impl Meeting {
    fn new(participants: u8) -> Self {
        Self::with_instance(participants, Address([0xcc; 20]))
    }

    fn with_instance(participants: u8, instance: Address) -> Self {
        let signers: Vec<_> = (1..=participants).map(TestSigner::from_seed).collect();
        let roster = Roster::new(signers.iter().map(TestSigner::address).collect())
            .expect("valid roster");
        let clock = ManualClock::new(MEETING - 3600);
        let commitment =
            Commitment::new(config(instance), roster, clock.clone()).expect("valid config");
        Self {
            signers,
            clock,
            commitment,
        }
    }

    fn who(&self, i: usize) -> Address {
        self.signers[i].address()
    }

    fn deposit_all(&mut self) {
        for i in 0..self.signers.len() {
            let who = self.who(i);
            self.commitment
                .deposit(who, one())
                .expect("deposit should succeed");
        }
    }

    fn arrival_digest(&self, arriver: usize, a: usize, b: usize, ts: u64) -> [u8; 32] {
        self.commitment
            .digests()
            .arrival_digest(&self.who(arriver), &self.who(a), &self.who(b), ts)
    }

    /// Arrival of `arriver` witnessed by `a` and `b`, signatures in slot order.
    fn arrive(&mut self, arriver: usize, a: usize, b: usize, ts: u64) -> Result<bool> {
        let digest = self.arrival_digest(arriver, a, b, ts);
        let sig_a = self.signers[a].sign(&digest);
        let sig_b = self.signers[b].sign(&digest);
        let caller = self.who(arriver);
        let attestation = ArrivalAttestation {
            witness_a: self.who(a),
            witness_b: self.who(b),
            timestamp: ts,
            sig_a: sig_a.as_bytes(),
            sig_b: sig_b.as_bytes(),
            proof_ref: "bafy-proof",
        };
        self.commitment.confirm_arrival(caller, &attestation)
    }

    fn withdraw_all(&mut self, payout: &mut RecordingPayout) {
        for i in 0..self.signers.len() {
            let who = self.who(i);
            if !self.commitment.balance_of(&who).is_zero() {
                self.commitment
                    .withdraw(who, payout)
                    .expect("withdraw should succeed");
            }
        }
    }
}

fn config(instance: Address) -> CommitmentConfig {
    CommitmentConfig {
        meeting_time: MEETING,
        deposit_amount: one(),
        penalty_rate_per_minute: 200,
        honesty_refund_percent: 50,
        reporting_window: WINDOW,
        grace_period: GRACE,
        domain: DomainConfig {
            chain_id: 31_337,
            instance,
        },
    }
}

// =============================================================================
// Test: Penalty settlement, the 2%/min x 10 minutes example
// =============================================================================
#[test]
fn e2e_penalty_shared_among_punctual() {
    let mut m = Meeting::new(3);
    m.deposit_all();
    assert_eq!(m.commitment.state(), CommitmentState::InProgress);

    m.clock.set(MEETING + 700);
    assert!(m.arrive(0, 1, 2, MEETING).unwrap());
    assert!(m.arrive(1, 0, 2, MEETING + 30).unwrap());
    // Exactly 10 minutes late.
    assert!(m.arrive(2, 0, 1, MEETING + 600).unwrap());

    m.clock.set(MEETING + GRACE + 1);
    let caller = m.who(0);
    let outcome = m.commitment.finalize(caller).unwrap();
    assert!(matches!(
        outcome,
        SettlementOutcome::Penalty { ref punctual, undistributed, .. }
            if punctual.len() == 2 && undistributed.is_zero()
    ));

    let tenth = one() / Decimal::TEN;
    assert_eq!(m.commitment.balance_of(&m.who(0)), one() + tenth);
    assert_eq!(m.commitment.balance_of(&m.who(1)), one() + tenth);
    assert_eq!(m.commitment.balance_of(&m.who(2)), one() - tenth - tenth);

    let mut payout = RecordingPayout::default();
    m.withdraw_all(&mut payout);
    assert_eq!(payout.total(), one() * Decimal::from(3));
    assert_eq!(m.commitment.supply().total_released(), one() * Decimal::from(3));
}

// =============================================================================
// Test: Arrival is write-once
// =============================================================================
#[test]
fn e2e_idempotent_arrival() {
    let mut m = Meeting::new(3);
    m.deposit_all();
    m.clock.set(MEETING + 600);

    assert!(m.arrive(0, 1, 2, MEETING + 60).unwrap());
    assert!(!m.arrive(0, 1, 2, MEETING + 300).unwrap());
    assert_eq!(m.commitment.arrival_of(&m.who(0)), MEETING + 60);
    assert_eq!(m.commitment.arrival_count(), 1);

    let recorded = m
        .commitment
        .events()
        .iter()
        .filter(|e| matches!(e, CommitmentEvent::ArrivalRecorded { .. }))
        .count();
    assert_eq!(recorded, 1);
}

// =============================================================================
// Test: Witness order and signature slot order do not matter
// =============================================================================
#[test]
fn e2e_signature_order_agnostic() {
    let ts = MEETING + 45;
    let mut forward = Meeting::new(3);
    let mut reverse = Meeting::new(3);
    for m in [&mut forward, &mut reverse] {
        m.deposit_all();
        m.clock.set(MEETING + 100);
    }

    forward.arrive(0, 1, 2, ts).unwrap();
    reverse.arrive(0, 2, 1, ts).unwrap();
    assert_eq!(
        forward.commitment.arrival_of(&forward.who(0)),
        reverse.commitment.arrival_of(&reverse.who(0))
    );

    // Signatures swapped between slots are accepted too.
    let mut swapped = Meeting::new(3);
    swapped.deposit_all();
    swapped.clock.set(MEETING + 100);
    let digest = swapped.arrival_digest(0, 1, 2, ts);
    let sig_1 = swapped.signers[1].sign(&digest);
    let sig_2 = swapped.signers[2].sign(&digest);
    let caller = swapped.who(0);
    let attestation = ArrivalAttestation {
        witness_a: swapped.who(1),
        witness_b: swapped.who(2),
        timestamp: ts,
        sig_a: sig_2.as_bytes(),
        sig_b: sig_1.as_bytes(),
        proof_ref: "bafy-proof",
    };
    assert!(swapped.commitment.confirm_arrival(caller, &attestation).unwrap());
    assert_eq!(swapped.commitment.arrival_of(&caller), ts);
}

// =============================================================================
// Test: A wrong signer is rejected without any mutation
// =============================================================================
#[test]
fn e2e_forged_witness_rejected() {
    let mut m = Meeting::new(4);
    m.deposit_all();
    m.clock.set(MEETING + 100);

    let digest = m.arrival_digest(0, 1, 2, MEETING);
    let sig_1 = m.signers[1].sign(&digest);
    let forged = m.signers[3].sign(&digest);
    let caller = m.who(0);
    let attestation = ArrivalAttestation {
        witness_a: m.who(1),
        witness_b: m.who(2),
        timestamp: MEETING,
        sig_a: sig_1.as_bytes(),
        sig_b: forged.as_bytes(),
        proof_ref: "bafy-proof",
    };
    let err = m.commitment.confirm_arrival(caller, &attestation).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Crypto);
    assert_eq!(m.commitment.arrival_count(), 0);
    assert_eq!(m.commitment.proof_of(&caller), None);
}

// =============================================================================
// Test: Legacy signed-message encoding is accepted, mixed with raw
// =============================================================================
#[test]
fn e2e_legacy_signatures_accepted() {
    let mut m = Meeting::new(3);
    m.deposit_all();
    m.clock.set(MEETING + 100);

    let digest = m.arrival_digest(0, 1, 2, MEETING + 10);
    let legacy = m.signers[1].sign_legacy(&digest);
    let raw = m.signers[2].sign(&digest);
    let caller = m.who(0);
    let attestation = ArrivalAttestation {
        witness_a: m.who(1),
        witness_b: m.who(2),
        timestamp: MEETING + 10,
        sig_a: legacy.as_bytes(),
        sig_b: raw.as_bytes(),
        proof_ref: "bafy-proof",
    };
    assert!(m.commitment.confirm_arrival(caller, &attestation).unwrap());
}

// =============================================================================
// Test: Signatures collected for one instance do not verify on another
// =============================================================================
#[test]
fn e2e_cross_instance_replay_rejected() {
    let mut target = Meeting::with_instance(3, Address([0xdd; 20]));
    target.deposit_all();
    target.clock.set(MEETING + 100);

    let other_domain = AttestationDigestBuilder::new(&DomainConfig {
        chain_id: 31_337,
        instance: Address([0xcc; 20]),
    });
    let (arriver, a, b) = (target.who(0), target.who(1), target.who(2));
    let digest = other_domain.arrival_digest(&arriver, &a, &b, MEETING);
    let sig_a = target.signers[1].sign(&digest);
    let sig_b = target.signers[2].sign(&digest);

    let err = target
        .commitment
        .confirm_arrival(
            arriver,
            &ArrivalAttestation {
                witness_a: a,
                witness_b: b,
                timestamp: MEETING,
                sig_a: sig_a.as_bytes(),
                sig_b: sig_b.as_bytes(),
                proof_ref: "bafy-proof",
            },
        )
        .unwrap_err();
    assert!(matches!(err, OntimeError::SignerMismatch { .. }));
}

// =============================================================================
// Test: Mutual attestation records both parties
// =============================================================================
#[test]
fn e2e_mutual_arrival() {
    let mut m = Meeting::new(3);
    m.deposit_all();
    m.clock.set(MEETING + 100);

    let (me, other) = (m.who(0), m.who(1));
    let ts = MEETING + 20;
    let digests = m.commitment.digests();
    let for_me = m.signers[1].sign(&digests.mutual_digest(&me, &other, ts));
    let for_other = m.signers[0].sign(&digests.mutual_digest(&other, &me, ts));

    // Signatures over the wrong direction are rejected.
    let err = m
        .commitment
        .confirm_mutual_arrival(
            me,
            &MutualAttestation {
                other,
                timestamp: ts,
                sig_other_for_caller: for_other.as_bytes(),
                sig_caller_for_other: for_me.as_bytes(),
                proof_ref: "bafy-mutual",
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Crypto);

    let recorded = m
        .commitment
        .confirm_mutual_arrival(
            me,
            &MutualAttestation {
                other,
                timestamp: ts,
                sig_other_for_caller: for_me.as_bytes(),
                sig_caller_for_other: for_other.as_bytes(),
                proof_ref: "bafy-mutual",
            },
        )
        .unwrap();
    assert_eq!(recorded, 2);
    assert_eq!(m.commitment.arrival_of(&me), ts);
    assert_eq!(m.commitment.arrival_of(&other), ts);
    assert_eq!(m.commitment.proof_of(&other), Some("bafy-mutual"));
}

// =============================================================================
// Test: Quorum voting, roster of 3, candidate never deposited
// =============================================================================
#[test]
fn e2e_quorum_vote_winner() {
    let mut m = Meeting::new(3);
    let (a, b, c) = (m.who(0), m.who(1), m.who(2));
    m.commitment.deposit(a, one()).unwrap();
    m.commitment.deposit(b, one()).unwrap();

    m.clock.set(MEETING + 300);
    m.commitment.report_only_arrived(a, c).unwrap();
    m.commitment.report_only_arrived(b, c).unwrap();
    let err = m.commitment.report_only_arrived(c, a).unwrap_err();
    assert!(matches!(err, OntimeError::NotDepositor(_)));

    // Too early while the window is open.
    m.clock.set(MEETING + WINDOW);
    assert!(m.commitment.finalize(a).is_err());

    m.clock.set(MEETING + WINDOW + 1);
    let err = m.commitment.report_only_arrived(a, b).unwrap_err();
    assert!(matches!(err, OntimeError::AlreadyVoted(_)));

    let outcome = m.commitment.finalize(c).unwrap();
    assert_eq!(outcome, SettlementOutcome::Voting { winner: c });

    let retained = one() / Decimal::TWO;
    assert_eq!(m.commitment.balance_of(&a), retained);
    assert_eq!(m.commitment.balance_of(&b), retained);
    assert_eq!(
        m.commitment.balance_of(&c),
        (one() - retained) + (one() - retained)
    );

    let mut payout = RecordingPayout::default();
    m.withdraw_all(&mut payout);
    assert_eq!(payout.total(), one() * Decimal::TWO);
}

// =============================================================================
// Test: Votes below quorum fall through to penalty settlement
// =============================================================================
#[test]
fn e2e_no_quorum_refunds_through_penalty_path() {
    let mut m = Meeting::new(3);
    m.deposit_all();
    let (a, b) = (m.who(0), m.who(1));
    m.clock.set(MEETING + 60);
    m.commitment.report_only_arrived(a, b).unwrap();

    m.clock.set(MEETING + WINDOW + 1);
    let outcome = m.commitment.finalize(a).unwrap();
    assert!(matches!(outcome, SettlementOutcome::Penalty { pool, .. } if pool.is_zero()));
    for i in 0..3 {
        assert_eq!(m.commitment.balance_of(&m.who(i)), one());
    }
}

// =============================================================================
// Test: A recorded arrival overrides a quorum of votes
// =============================================================================
#[test]
fn e2e_recorded_arrival_overrides_vote_quorum() {
    let mut m = Meeting::new(3);
    m.deposit_all();
    let (a, b, c) = (m.who(0), m.who(1), m.who(2));
    m.clock.set(MEETING + 60);
    m.commitment.report_only_arrived(a, c).unwrap();
    m.commitment.report_only_arrived(b, c).unwrap();
    assert!(m.arrive(0, 1, 2, MEETING).unwrap());

    // With an arrival on record the reporting window no longer opens finalize.
    m.clock.set(MEETING + WINDOW + 1);
    let err = m.commitment.finalize(a).unwrap_err();
    assert!(matches!(err, OntimeError::FinalizeTooEarly { .. }));

    m.clock.set(MEETING + GRACE + 1);
    let outcome = m.commitment.finalize(a).unwrap();
    assert!(matches!(outcome, SettlementOutcome::Penalty { pool, .. } if pool.is_zero()));
    for i in 0..3 {
        assert_eq!(m.commitment.balance_of(&m.who(i)), one());
    }
}

// =============================================================================
// Test: Double withdrawal is rejected and pays nothing twice
// =============================================================================
#[test]
fn e2e_double_withdraw_rejected() {
    let mut m = Meeting::new(2);
    m.deposit_all();
    let a = m.who(0);
    m.commitment.cancel_before_arrivals(a).unwrap();

    let mut payout = RecordingPayout::default();
    assert_eq!(m.commitment.withdraw(a, &mut payout).unwrap(), one());
    let err = m.commitment.withdraw(a, &mut payout).unwrap_err();
    assert!(matches!(err, OntimeError::NothingToWithdraw(_)));
    assert_eq!(payout.released.len(), 1);
}

// =============================================================================
// Test: Cancellation refunds exactly the deposits
// =============================================================================
#[test]
fn e2e_cancel_before_arrivals() {
    let mut m = Meeting::new(3);
    let (a, b) = (m.who(0), m.who(1));
    m.commitment.deposit(a, one()).unwrap();
    m.commitment.deposit(b, one()).unwrap();

    m.commitment.cancel_before_arrivals(b).unwrap();
    assert_eq!(m.commitment.state(), CommitmentState::Finalized);
    assert!(matches!(
        m.commitment.events(),
        [.., CommitmentEvent::Cancelled { .. }, CommitmentEvent::Finalized { .. }]
    ));

    let late = m.who(2);
    let err = m.commitment.deposit(late, one()).unwrap_err();
    assert!(matches!(err, OntimeError::WrongState { .. }));

    let mut payout = RecordingPayout::default();
    m.withdraw_all(&mut payout);
    assert_eq!(payout.released, vec![(a, one()), (b, one())]);
}

// =============================================================================
// Test: Failed payout strands funds; supply still balances
// =============================================================================
#[test]
fn e2e_failed_payout_strands_funds() {
    let mut m = Meeting::new(2);
    m.deposit_all();
    let a = m.who(0);
    m.commitment.cancel_before_arrivals(a).unwrap();

    let mut payout = RecordingPayout {
        fail: true,
        ..RecordingPayout::default()
    };
    let err = m.commitment.withdraw(a, &mut payout).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert_eq!(m.commitment.balance_of(&a), Decimal::ZERO);
    assert_eq!(m.commitment.stranded_of(&a), one());
    assert!(matches!(
        m.commitment.events().last(),
        Some(CommitmentEvent::WithdrawalFailed { amount, .. }) if *amount == one()
    ));

    payout.fail = false;
    assert!(m.commitment.withdraw(a, &mut payout).is_err());
    assert!(payout.released.is_empty());

    let supply = m.commitment.supply();
    assert_eq!(supply.total_stranded(), one());
    assert_eq!(
        supply.total_stranded() + m.commitment.balance_of(&m.who(1)),
        supply.total_deposited()
    );
}

// =============================================================================
// Test: Conservation across a mixed late/absent scenario
// =============================================================================
#[test]
fn e2e_supply_conservation_with_undistributed_remainder() {
    let mut m = Meeting::new(4);
    m.deposit_all();
    m.clock.set(MEETING + 2000);
    m.arrive(0, 1, 2, MEETING).unwrap();
    m.arrive(1, 0, 2, MEETING).unwrap();
    m.arrive(2, 0, 1, MEETING).unwrap();
    // 7 minutes late: 14% of 1.0 split three ways leaves a remainder.
    m.arrive(3, 0, 1, MEETING + 7 * 60).unwrap();

    m.clock.set(MEETING + GRACE + 1);
    let caller = m.who(3);
    let outcome = m.commitment.finalize(caller).unwrap();
    let SettlementOutcome::Penalty {
        pool,
        undistributed,
        ..
    } = outcome
    else {
        panic!("expected penalty settlement");
    };
    assert_eq!(pool, one() * Decimal::new(14, 2));
    // 140_000_000_000_000_000 = 3 * 46_666_666_666_666_666 + 2
    assert_eq!(undistributed, Decimal::TWO);

    let mut payout = RecordingPayout::default();
    m.withdraw_all(&mut payout);
    assert_eq!(payout.total() + undistributed, m.commitment.total_deposited());
    assert!(payout.total() <= m.commitment.total_deposited());
}
