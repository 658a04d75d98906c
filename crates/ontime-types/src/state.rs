//! Commitment lifecycle state.
//!
//! ```text
//!   ┌─────────┐ all funded / first arrival ┌────────────┐
//!   │ CREATED ├───────────────────────────▶│ IN_PROGRESS│
//!   └────┬────┘                            └─────┬──────┘
//!        │ cancel / finalize                     │ cancel / finalize
//!        ▼                                       ▼
//!   ┌───────────────────────────────────────────────────┐
//!   │                     FINALIZED                     │
//!   └───────────────────────────────────────────────────┘
//! ```
//!
//! Transitions are monotonic. `Finalized` is terminal and is the only state
//! in which withdrawals are allowed.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Address;

/// The lifecycle state of a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommitmentState {
    /// Accepting deposits.
    Created,
    /// Deposits closed; arrivals and votes flowing in.
    InProgress,
    /// Balances settled. Terminal.
    Finalized,
}

impl CommitmentState {
    /// Can the state move to `target`? Never backwards, never in place.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        target > self
    }

    #[must_use]
    pub fn is_finalized(self) -> bool {
        self == Self::Finalized
    }
}

impl fmt::Display for CommitmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Finalized => write!(f, "FINALIZED"),
        }
    }
}

/// How a commitment reached `Finalized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// Quorum vote named a winner who collects forfeited deposits.
    Voting { winner: Address },
    /// Lateness penalties were pooled and shared among punctual participants.
    Penalty {
        pool: Decimal,
        punctual: Vec<Address>,
        undistributed: Decimal,
    },
    /// Cancelled before any arrival; every depositor keeps their deposit.
    Cancelled,
}

impl fmt::Display for SettlementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Voting { winner } => write!(f, "VOTING(winner={winner})"),
            Self::Penalty { pool, punctual, .. } => {
                write!(f, "PENALTY(pool={pool}, punctual={})", punctual.len())
            }
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}
