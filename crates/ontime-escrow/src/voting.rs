//! Quorum-based fallback resolution.
//!
//! When no arrival attestation is ever recorded, depositing participants vote
//! for the one participant they saw show up. A candidate binds only with at
//! least `ceil(2N/3)` votes where `N` is the full roster size, so low turnout
//! can never lower the bar.

use std::collections::HashMap;

use ontime_types::{Address, OntimeError, Result, Roster};

use crate::ledger::DepositLedger;

/// Minimum votes for a binding resolution: `ceil(2 * roster_size / 3)`.
#[must_use]
pub fn quorum(roster_size: usize) -> usize {
    (2 * roster_size).div_ceil(3)
}

/// Inclusive `[opens, closes]` interval during which votes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingWindow {
    pub opens: u64,
    pub closes: u64,
}

impl ReportingWindow {
    #[must_use]
    pub fn contains(&self, now: u64) -> bool {
        (self.opens..=self.closes).contains(&now)
    }
}

/// Write-once votes and per-candidate tallies.
#[derive(Debug, Clone, Default)]
pub struct VotingResolver {
    votes: HashMap<Address, Address>,
    tallies: HashMap<Address, usize>,
    total: usize,
}

impl VotingResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `voter`'s vote for `candidate`.
    ///
    /// # Errors
    /// - `NotOnRoster` if the voter is not a member
    /// - `CandidateNotOnRoster` if the candidate is not a member
    /// - `AlreadyVoted` on a repeat vote
    /// - `NotDepositor` if the voter never deposited
    /// - `OutsideReportingWindow` if `now` is outside `window`
    pub fn vote(
        &mut self,
        roster: &Roster,
        ledger: &DepositLedger,
        window: ReportingWindow,
        now: u64,
        voter: Address,
        candidate: Address,
    ) -> Result<()> {
        roster.ensure_member(&voter)?;
        if !roster.contains(&candidate) {
            return Err(OntimeError::CandidateNotOnRoster(candidate));
        }
        if self.votes.contains_key(&voter) {
            return Err(OntimeError::AlreadyVoted(voter));
        }
        if !ledger.has_deposited(&voter) {
            return Err(OntimeError::NotDepositor(voter));
        }
        if !window.contains(now) {
            return Err(OntimeError::OutsideReportingWindow {
                now,
                opens: window.opens,
                closes: window.closes,
            });
        }
        self.insert(voter, candidate);
        Ok(())
    }

    fn insert(&mut self, voter: Address, candidate: Address) {
        self.votes.insert(voter, candidate);
        *self.tallies.entry(candidate).or_insert(0) += 1;
        self.total += 1;
    }

    /// The candidate with the highest tally and that tally.
    ///
    /// Candidates are scanned in roster order and only a strictly higher
    /// tally replaces the leader, so ties go to the earlier roster member.
    #[must_use]
    pub fn leader(&self, roster: &Roster) -> Option<(Address, usize)> {
        let mut leader: Option<(Address, usize)> = None;
        for candidate in roster.iter() {
            let tally = self.tally_of(candidate);
            if tally > leader.map_or(0, |(_, best)| best) {
                leader = Some((*candidate, tally));
            }
        }
        leader
    }

    /// The leader, if their tally meets the quorum of the full roster.
    #[must_use]
    pub fn resolve(&self, roster: &Roster) -> Option<Address> {
        let (winner, tally) = self.leader(roster)?;
        let needed = quorum(roster.len());
        if tally >= needed {
            Some(winner)
        } else {
            tracing::debug!(
                leader = %winner,
                tally,
                quorum = needed,
                "Vote leader short of quorum"
            );
            None
        }
    }

    #[must_use]
    pub fn vote_of(&self, voter: &Address) -> Option<Address> {
        self.votes.get(voter).copied()
    }

    #[must_use]
    pub fn tally_of(&self, candidate: &Address) -> usize {
        self.tallies.get(candidate).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_votes(&self) -> usize {
        self.total
    }

    pub(crate) fn entries(&self) -> &HashMap<Address, Address> {
        &self.votes
    }

    /// Rebuild tallies from persisted votes.
    pub(crate) fn from_votes(votes: HashMap<Address, Address>) -> Self {
        let mut resolver = Self::new();
        for (voter, candidate) in votes {
            resolver.insert(voter, candidate);
        }
        resolver
    }
}
