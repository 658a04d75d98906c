//! Commitment configuration: fixed at construction, immutable afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, OntimeError, Result, constants};

/// Identity of the deployed instance, bound into every attestation digest so
/// a signature collected for one commitment cannot be replayed on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Chain / network identifier.
    pub chain_id: u64,
    /// Address of this commitment instance.
    pub instance: Address,
}

/// Economic and timing parameters of one commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentConfig {
    /// The meeting start, in unix seconds. Anchors "on time".
    pub meeting_time: u64,
    /// Exact amount every participant must lock, in the smallest unit.
    pub deposit_amount: Decimal,
    /// Penalty per whole minute late, in basis points (200 = 2%/min).
    pub penalty_rate_per_minute: u32,
    /// Share of the deposit an honest voter keeps under voting settlement.
    pub honesty_refund_percent: u8,
    /// Length of the vote reporting window after `meeting_time`, in seconds.
    pub reporting_window: u64,
    /// Delay after `meeting_time` before penalty settlement may run.
    #[serde(default = "default_grace_period")]
    pub grace_period: u64,
    /// Digest domain of this instance.
    pub domain: DomainConfig,
}

fn default_grace_period() -> u64 {
    constants::DEFAULT_GRACE_PERIOD_SECS
}

impl CommitmentConfig {
    /// Parse a JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations no commitment can run with.
    pub fn validate(&self) -> Result<()> {
        if self.meeting_time == 0 {
            return Err(OntimeError::Configuration(
                "meeting_time must be non-zero".into(),
            ));
        }
        if self.deposit_amount <= Decimal::ZERO {
            return Err(OntimeError::Configuration(format!(
                "deposit_amount must be positive, got {}",
                self.deposit_amount
            )));
        }
        if !self.deposit_amount.fract().is_zero() {
            return Err(OntimeError::Configuration(format!(
                "deposit_amount must be a whole number of base units, got {}",
                self.deposit_amount
            )));
        }
        if u64::from(self.honesty_refund_percent) > constants::PERCENT_DENOMINATOR {
            return Err(OntimeError::Configuration(format!(
                "honesty_refund_percent must be <= 100, got {}",
                self.honesty_refund_percent
            )));
        }
        if self.reporting_window == 0 {
            return Err(OntimeError::Configuration(
                "reporting_window must be non-zero".into(),
            ));
        }
        if self.domain.instance.is_zero() {
            return Err(OntimeError::Configuration(
                "domain.instance must be a non-zero address".into(),
            ));
        }
        Ok(())
    }

    /// Last second at which a vote is accepted.
    #[must_use]
    pub fn reporting_closes_at(&self) -> u64 {
        self.meeting_time.saturating_add(self.reporting_window)
    }

    /// Penalty settlement may run once the clock is strictly past this.
    #[must_use]
    pub fn grace_ends_at(&self) -> u64 {
        self.meeting_time.saturating_add(self.grace_period)
    }
}
