//! Supply conservation invariant checker.
//!
//! Mathematical invariant enforced after every finalization and withdrawal:
//! ```text
//! Σ(balances) + released + stranded + undistributed == Σ(deposits)
//! ```
//!
//! Finalization only redistributes; it never mints. The only way value
//! leaves the balance column is a release, a failed release (stranded), or
//! penalty value nobody receives (undistributed). If the
//! equation ever breaks, the operation is refused.

use ontime_types::{OntimeError, Result};
use rust_decimal::Decimal;

/// Running totals of value entering and leaving the ledger.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    deposited: Decimal,
    released: Decimal,
    stranded: Decimal,
    undistributed: Decimal,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, amount: Decimal) {
        self.deposited += amount;
    }

    pub fn record_release(&mut self, amount: Decimal) {
        self.released += amount;
    }

    pub fn record_stranded(&mut self, amount: Decimal) {
        self.stranded += amount;
    }

    pub fn record_undistributed(&mut self, amount: Decimal) {
        self.undistributed += amount;
    }

    /// What the balance column must sum to.
    #[must_use]
    pub fn expected_supply(&self) -> Decimal {
        self.deposited - self.released - self.stranded - self.undistributed
    }

    /// Verify the balance column against the running totals.
    ///
    /// # Errors
    /// Returns [`OntimeError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, actual_supply: Decimal) -> Result<()> {
        self.verify_with_loss(actual_supply, Decimal::ZERO)
    }

    /// Verify a prospective balance column that would additionally burn
    /// `pending_loss`, before anything is committed.
    ///
    /// # Errors
    /// Returns [`OntimeError::SupplyInvariantViolation`] if the column plus
    /// the pending loss does not equal the current expected supply.
    pub fn verify_with_loss(&self, actual_supply: Decimal, pending_loss: Decimal) -> Result<()> {
        let expected = self.expected_supply();
        if actual_supply + pending_loss != expected {
            return Err(OntimeError::SupplyInvariantViolation {
                reason: format!(
                    "balances {actual_supply} + pending loss {pending_loss} != expected {expected} \
                     (deposited={}, released={}, stranded={}, undistributed={})",
                    self.deposited, self.released, self.stranded, self.undistributed,
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_deposited(&self) -> Decimal {
        self.deposited
    }

    #[must_use]
    pub fn total_released(&self) -> Decimal {
        self.released
    }

    #[must_use]
    pub fn total_stranded(&self) -> Decimal {
        self.stranded
    }

    #[must_use]
    pub fn total_undistributed(&self) -> Decimal {
        self.undistributed
    }
}
