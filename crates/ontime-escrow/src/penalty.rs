//! Lateness penalty.
//!
//! ```text
//! minutes_late = floor((arrival - meeting_time) / 60)
//! penalty      = min(deposit, floor(deposit * minutes_late * rate / 10_000))
//! ```
//!
//! `rate` is basis points per minute: 200 means 2% of the deposit per whole
//! minute late. An unset arrival (`0`) or an arrival at or before the meeting
//! time costs nothing.

use ontime_types::{CommitmentConfig, constants};
use rust_decimal::Decimal;

use crate::amount::mul_div_floor;

/// Whole minutes between `meeting_time` and `arrival`, zero if not late.
#[must_use]
pub fn minutes_late(arrival: u64, meeting_time: u64) -> u64 {
    if arrival == 0 || arrival <= meeting_time {
        return 0;
    }
    (arrival - meeting_time) / constants::SECONDS_PER_MINUTE
}

/// Penalty for arriving at `arrival`, clamped to `deposit`.
#[must_use]
pub fn penalty(arrival: u64, meeting_time: u64, deposit: Decimal, rate_per_minute: u32) -> Decimal {
    let minutes = minutes_late(arrival, meeting_time);
    let factor = minutes.saturating_mul(u64::from(rate_per_minute));
    if factor >= constants::PENALTY_RATE_DENOMINATOR {
        return deposit;
    }
    mul_div_floor(deposit, factor, constants::PENALTY_RATE_DENOMINATOR)
}

/// [`penalty`] bound to one commitment's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyCalculator {
    meeting_time: u64,
    deposit: Decimal,
    rate_per_minute: u32,
}

impl PenaltyCalculator {
    #[must_use]
    pub fn new(config: &CommitmentConfig) -> Self {
        Self {
            meeting_time: config.meeting_time,
            deposit: config.deposit_amount,
            rate_per_minute: config.penalty_rate_per_minute,
        }
    }

    #[must_use]
    pub fn penalty_for(&self, arrival: u64) -> Decimal {
        penalty(arrival, self.meeting_time, self.deposit, self.rate_per_minute)
    }
}
