//! Notifications emitted for external observers.
//!
//! Every externally visible transition appends one [`CommitmentEvent`] to the
//! commitment's append-only log, so a frontend can mirror state without
//! polling every accessor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, SettlementOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentEvent {
    /// A participant locked the required deposit.
    Deposited { participant: Address, amount: Decimal },
    /// First valid arrival recorded for a participant.
    ArrivalRecorded { participant: Address, timestamp: u64 },
    /// A proof reference was stored (overwrites any earlier one).
    ProofStored {
        participant: Address,
        proof_ref: String,
    },
    /// A vote was cast in the fallback resolution.
    VoteCast { voter: Address, candidate: Address },
    /// The commitment was cancelled before any arrival.
    Cancelled { by: Address },
    /// The commitment reached its terminal state.
    Finalized { outcome: SettlementOutcome },
    /// Funds were released to a participant.
    Withdrawn { participant: Address, amount: Decimal },
    /// Release failed after the balance was zeroed; the amount is stranded.
    WithdrawalFailed {
        participant: Address,
        amount: Decimal,
        reason: String,
    },
}

impl CommitmentEvent {
    /// Short uppercase tag for log lines.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Deposited { .. } => "DEPOSITED",
            Self::ArrivalRecorded { .. } => "ARRIVAL_RECORDED",
            Self::ProofStored { .. } => "PROOF_STORED",
            Self::VoteCast { .. } => "VOTE_CAST",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Finalized { .. } => "FINALIZED",
            Self::Withdrawn { .. } => "WITHDRAWN",
            Self::WithdrawalFailed { .. } => "WITHDRAWAL_FAILED",
        }
    }
}
