//! # ontime-escrow
//!
//! **Settlement Plane**: deposit ledger, arrival records, quorum voting,
//! lateness penalties, finalization, and pull-based withdrawal.
//!
//! ## Architecture
//!
//! The [`Commitment`] facade owns every component and enforces call order
//! through its state machine:
//! 1. **DepositLedger**: exact, once-only deposits and withdrawable balances
//! 2. **ArrivalRegistry**: write-once arrival timestamps from verified
//!    attestations, plus proof references
//! 3. **VotingResolver**: fallback votes and the `ceil(2N/3)` quorum
//! 4. **PenaltyCalculator**: lateness in whole minutes to a capped penalty
//! 5. **FinalizationEngine**: computes the terminal settlement
//! 6. **SupplyConservation**: verifies every settlement and withdrawal
//! 7. **WithdrawalGateway**: zero-then-release payouts after finalization
//!
//! ## Flow
//!
//! ```text
//! deposit → confirm_arrival | confirm_mutual_arrival | report_only_arrived
//!     → finalize (FinalizationEngine → SupplyConservation → ledger)
//!     → withdraw (WithdrawalGateway → Payout)
//! ```
//!
//! Finalization redistributes balances but never moves funds; value only
//! leaves through [`Payout`].

pub mod amount;
pub mod arrival;
pub mod commitment;
pub mod finalize;
pub mod ledger;
pub mod penalty;
pub mod supply_conservation;
pub mod voting;
pub mod withdraw;

pub use arrival::{ArrivalRegistry, ProofReferences};
pub use commitment::{ArrivalAttestation, Commitment, CommitmentSnapshot, MutualAttestation};
pub use finalize::{FinalizationEngine, Settlement};
pub use ledger::DepositLedger;
pub use penalty::PenaltyCalculator;
pub use supply_conservation::SupplyConservation;
pub use voting::{ReportingWindow, VotingResolver, quorum};
pub use withdraw::{Payout, WithdrawalGateway};

#[cfg(any(test, feature = "test-helpers"))]
pub use withdraw::MockPayout;
