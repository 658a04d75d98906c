//! Finalization engine: the one-shot transition to `Finalized`.
//!
//! ## Guard
//!
//! Finalization is admissible once the clock is past
//! `meeting_time + grace_period`, or earlier, once the reporting window has
//! closed with no arrival recorded, which means attestations are not coming
//! and the vote can decide.
//!
//! ## Paths
//!
//! ```text
//!            arrivals == 0 && window closed && votes > 0 ?
//!                  │yes                          │no
//!                  ▼                             │
//!      VotingResolver::resolve() ── None ──────▶ │
//!                  │Some(winner)                 ▼
//!                  ▼                     Penalty settlement
//!          Voting settlement
//! ```
//!
//! The engine never touches the ledger. It returns a complete [`Settlement`]
//! which the caller verifies against supply conservation and only then
//! applies, so a failed finalization leaves no partial state. Funds are
//! never moved here, only balances; transfers happen in withdrawal.

use std::collections::HashMap;

use ontime_types::{
    Address, CommitmentConfig, CommitmentState, OntimeError, Result, Roster, SettlementOutcome,
    constants,
};
use rust_decimal::Decimal;

use crate::amount::{mul_div_floor, split_floor};
use crate::arrival::ArrivalRegistry;
use crate::ledger::DepositLedger;
use crate::penalty::PenaltyCalculator;
use crate::voting::VotingResolver;

/// A fully computed, not yet applied, terminal balance map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub outcome: SettlementOutcome,
    /// Final withdrawable balance of every participant that holds one.
    pub balances: HashMap<Address, Decimal>,
    /// Penalty value nobody receives: the integer-division remainder, or the
    /// whole pool when no participant was punctual.
    pub undistributed: Decimal,
}

impl Settlement {
    /// Sum of all settled balances.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.balances.values().copied().sum()
    }
}

/// Computes settlements for one commitment.
pub struct FinalizationEngine<'a> {
    config: &'a CommitmentConfig,
    roster: &'a Roster,
}

impl<'a> FinalizationEngine<'a> {
    #[must_use]
    pub fn new(config: &'a CommitmentConfig, roster: &'a Roster) -> Self {
        Self { config, roster }
    }

    /// Check that finalization may run now.
    ///
    /// # Errors
    /// - `AlreadyFinalized` if the commitment is terminal
    /// - `FinalizeTooEarly` if neither deadline has passed
    pub fn check_guard(
        &self,
        state: CommitmentState,
        arrivals: &ArrivalRegistry,
        now: u64,
    ) -> Result<()> {
        if state.is_finalized() {
            return Err(OntimeError::AlreadyFinalized);
        }
        let grace_ends = self.config.grace_ends_at();
        if now > grace_ends {
            return Ok(());
        }
        let window_closes = self.config.reporting_closes_at();
        if arrivals.count_recorded() == 0 {
            if now > window_closes {
                return Ok(());
            }
            return Err(OntimeError::FinalizeTooEarly {
                now,
                opens_after: grace_ends.min(window_closes),
            });
        }
        Err(OntimeError::FinalizeTooEarly {
            now,
            opens_after: grace_ends,
        })
    }

    /// Whether the voting path is eligible: no arrivals, window closed, and
    /// at least one vote cast.
    #[must_use]
    pub fn voting_path_open(
        &self,
        arrivals: &ArrivalRegistry,
        votes: &VotingResolver,
        now: u64,
    ) -> bool {
        arrivals.count_recorded() == 0
            && now > self.config.reporting_closes_at()
            && votes.total_votes() > 0
    }

    /// Compute the terminal settlement: voting if eligible and a winner
    /// binds, penalty otherwise.
    ///
    /// # Errors
    /// Returns `Overflow` if the penalty pool leaves the amount range.
    pub fn settle(
        &self,
        ledger: &DepositLedger,
        arrivals: &ArrivalRegistry,
        votes: &VotingResolver,
        now: u64,
    ) -> Result<Settlement> {
        if self.voting_path_open(arrivals, votes, now) {
            match votes.resolve(self.roster) {
                Some(winner) => return Ok(self.voting_settlement(ledger, votes, winner)),
                None => {
                    tracing::info!(
                        votes = votes.total_votes(),
                        "No quorum; falling back to penalty settlement"
                    );
                }
            }
        }
        self.penalty_settlement(ledger, arrivals)
    }

    /// The winner collects forfeited deposits. Voters who named the winner
    /// keep `honesty_refund_percent` of their deposit; everyone else who
    /// deposited forfeits all of it.
    #[must_use]
    pub fn voting_settlement(
        &self,
        ledger: &DepositLedger,
        votes: &VotingResolver,
        winner: Address,
    ) -> Settlement {
        let honesty = u64::from(self.config.honesty_refund_percent);
        let mut balances = HashMap::new();
        let mut winnings = ledger.deposit_of(&winner);

        for member in self.roster.iter().filter(|m| **m != winner) {
            if !ledger.has_deposited(member) {
                continue;
            }
            let deposit = ledger.deposit_of(member);
            let retained = if votes.vote_of(member) == Some(winner) {
                mul_div_floor(deposit, honesty, constants::PERCENT_DENOMINATOR)
            } else {
                Decimal::ZERO
            };
            tracing::debug!(participant = %member, %deposit, %retained, "Voting settlement");
            winnings += deposit - retained;
            balances.insert(*member, retained);
        }
        balances.insert(winner, winnings);

        Settlement {
            outcome: SettlementOutcome::Voting { winner },
            balances,
            undistributed: Decimal::ZERO,
        }
    }

    /// Deduct lateness penalties from every full depositor and share the pool
    /// equally among punctual participants. The division remainder, or the
    /// whole pool if nobody was punctual, is left undistributed.
    ///
    /// # Errors
    /// Returns `Overflow` if the penalty pool leaves the amount range.
    pub fn penalty_settlement(
        &self,
        ledger: &DepositLedger,
        arrivals: &ArrivalRegistry,
    ) -> Result<Settlement> {
        let calc = PenaltyCalculator::new(self.config);
        let mut balances = ledger.balances().clone();
        let mut pool = Decimal::ZERO;
        let mut punctual = Vec::new();

        for member in self.roster.iter() {
            if ledger.deposit_of(member) != self.config.deposit_amount {
                continue;
            }
            let arrival = arrivals.arrival_of(member);
            let balance = ledger.balance_of(member);
            let penalty = calc.penalty_for(arrival).min(balance);
            tracing::debug!(participant = %member, arrival, %penalty, "Penalty settlement");

            if !penalty.is_zero() {
                balances.insert(*member, balance - penalty);
                pool = pool
                    .checked_add(penalty)
                    .ok_or(OntimeError::Overflow { context: "penalty pool" })?;
            }
            if arrival != 0 && penalty.is_zero() {
                punctual.push(*member);
            }
        }

        let undistributed = if punctual.is_empty() {
            if pool > Decimal::ZERO {
                tracing::warn!(%pool, "No punctual participant; penalty pool left undistributed");
            }
            pool
        } else if pool > Decimal::ZERO {
            let (share, remainder) = split_floor(pool, punctual.len());
            for member in &punctual {
                *balances.entry(*member).or_insert(Decimal::ZERO) += share;
            }
            remainder
        } else {
            Decimal::ZERO
        };

        Ok(Settlement {
            outcome: SettlementOutcome::Penalty {
                pool,
                punctual,
                undistributed,
            },
            balances,
            undistributed,
        })
    }

    /// Cancellation leaves every balance equal to its deposit.
    #[must_use]
    pub fn cancellation(ledger: &DepositLedger) -> Settlement {
        Settlement {
            outcome: SettlementOutcome::Cancelled,
            balances: ledger.balances().clone(),
            undistributed: Decimal::ZERO,
        }
    }
}
