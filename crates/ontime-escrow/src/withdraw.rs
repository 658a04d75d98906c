//! State-aware withdrawal gateway.
//!
//! Withdrawals open only once the commitment is `Finalized`; before that
//! balances are still subject to redistribution. A withdrawal follows
//! checks, effects, interactions: the balance is zeroed before the external
//! release is attempted. If the release fails the amount is recorded as
//! stranded, so it stays visible to accounting and can never be paid twice.

use ontime_types::{Address, CommitmentState, OntimeError, Result};
use rust_decimal::Decimal;

use crate::ledger::DepositLedger;
use crate::supply_conservation::SupplyConservation;

/// External side that moves funds to a participant.
///
/// An `Err` carries the reason reported by the external system.
pub trait Payout {
    fn release(&mut self, to: &Address, amount: Decimal) -> std::result::Result<(), String>;
}

/// Gate that blocks withdrawals until the commitment is terminal.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawalGateway {
    state: CommitmentState,
}

impl WithdrawalGateway {
    #[must_use]
    pub fn new(state: CommitmentState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn withdrawals_allowed(&self) -> bool {
        self.state.is_finalized()
    }

    /// Guard a withdrawal by `who`. Returns the amount that would be paid.
    ///
    /// # Errors
    /// - `WrongState` unless the commitment is `Finalized`
    /// - `NothingToWithdraw` if the balance is zero
    pub fn check_withdraw(&self, ledger: &DepositLedger, who: &Address) -> Result<Decimal> {
        if !self.withdrawals_allowed() {
            return Err(OntimeError::WrongState {
                expected: CommitmentState::Finalized,
                actual: self.state,
            });
        }
        let amount = ledger.balance_of(who);
        if amount.is_zero() {
            return Err(OntimeError::NothingToWithdraw(*who));
        }
        Ok(amount)
    }

    /// Pay out `who`'s full balance through `payout`.
    ///
    /// The balance is zeroed and the supply totals updated before the
    /// release, whatever its result. Returns the released amount.
    ///
    /// # Errors
    /// - any error from [`check_withdraw`](Self::check_withdraw), with no
    ///   state changed
    /// - `TransferFailed` if the release failed; the amount is then stranded
    pub fn execute<P: Payout + ?Sized>(
        &self,
        ledger: &mut DepositLedger,
        supply: &mut SupplyConservation,
        who: &Address,
        payout: &mut P,
    ) -> Result<Decimal> {
        self.check_withdraw(ledger, who)?;
        let amount = ledger.take_balance(who);

        match payout.release(who, amount) {
            Ok(()) => {
                supply.record_release(amount);
                tracing::info!(participant = %who, %amount, "Withdrawal released");
                Ok(amount)
            }
            Err(reason) => {
                ledger.record_stranded(*who, amount);
                supply.record_stranded(amount);
                tracing::error!(
                    participant = %who,
                    %amount,
                    reason = %reason,
                    "Withdrawal release failed; funds stranded"
                );
                Err(OntimeError::TransferFailed {
                    to: *who,
                    amount,
                    reason,
                })
            }
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockPayout;

#[cfg(any(test, feature = "test-helpers"))]
mod mock {
    use ontime_types::Address;
    use rust_decimal::Decimal;

    use super::Payout;

    /// In-memory payout that records releases and can be told to fail.
    #[derive(Debug, Default)]
    pub struct MockPayout {
        pub released: Vec<(Address, Decimal)>,
        pub fail_with: Option<String>,
    }

    impl MockPayout {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn failing(reason: &str) -> Self {
            Self {
                released: Vec::new(),
                fail_with: Some(reason.to_string()),
            }
        }

        /// Total released to `who` so far.
        #[must_use]
        pub fn released_to(&self, who: &Address) -> Decimal {
            self.released
                .iter()
                .filter(|(to, _)| to == who)
                .map(|(_, amount)| *amount)
                .sum()
        }
    }

    impl Payout for MockPayout {
        fn release(&mut self, to: &Address, amount: Decimal) -> std::result::Result<(), String> {
            if let Some(reason) = &self.fail_with {
                return Err(reason.clone());
            }
            self.released.push((*to, amount));
            Ok(())
        }
    }
}
