//! Deposit ledger: per-participant deposits and withdrawable balances.
//!
//! Two columns per participant:
//! - `deposit`: what the participant locked; set once, never changes
//! - `balance`: what the participant may withdraw; equals the deposit until
//!   finalization redistributes it, and is zeroed by withdrawal
//!
//! A third column, `stranded`, records amounts whose release failed after the
//! balance had already been zeroed, so those funds stay visible to
//! accounting instead of disappearing.
//!
//! All mutations are atomic: either the full operation succeeds or the
//! ledger is unchanged.

use std::collections::HashMap;

use ontime_types::{Address, OntimeError, Result};
use rust_decimal::Decimal;

/// Owned store of every participant's deposit and balance.
#[derive(Debug, Clone, Default)]
pub struct DepositLedger {
    deposits: HashMap<Address, Decimal>,
    balances: HashMap<Address, Decimal>,
    stranded: HashMap<Address, Decimal>,
}

impl DepositLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `amount` for `who`. The amount must equal `required` and each
    /// participant may deposit only once.
    ///
    /// # Errors
    /// - `AlreadyDeposited` on a second deposit
    /// - `WrongDepositAmount` if `amount != required`
    pub fn deposit(&mut self, who: Address, amount: Decimal, required: Decimal) -> Result<()> {
        if self.deposits.contains_key(&who) {
            return Err(OntimeError::AlreadyDeposited(who));
        }
        if amount != required {
            return Err(OntimeError::WrongDepositAmount {
                required,
                provided: amount,
            });
        }
        self.deposits.insert(who, amount);
        self.balances.insert(who, amount);
        Ok(())
    }

    #[must_use]
    pub fn has_deposited(&self, who: &Address) -> bool {
        self.deposits.contains_key(who)
    }

    /// Amount originally locked, zero if none.
    #[must_use]
    pub fn deposit_of(&self, who: &Address) -> Decimal {
        self.deposits.get(who).copied().unwrap_or(Decimal::ZERO)
    }

    /// Current withdrawable balance, zero if none.
    #[must_use]
    pub fn balance_of(&self, who: &Address) -> Decimal {
        self.balances.get(who).copied().unwrap_or(Decimal::ZERO)
    }

    /// Amount lost to a failed release, zero if none.
    #[must_use]
    pub fn stranded_of(&self, who: &Address) -> Decimal {
        self.stranded.get(who).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn depositor_count(&self) -> usize {
        self.deposits.len()
    }

    /// Sum of all deposits ever accepted.
    #[must_use]
    pub fn total_deposited(&self) -> Decimal {
        self.deposits.values().copied().sum()
    }

    /// Sum of all current balances.
    #[must_use]
    pub fn total_balances(&self) -> Decimal {
        self.balances.values().copied().sum()
    }

    #[must_use]
    pub fn total_stranded(&self) -> Decimal {
        self.stranded.values().copied().sum()
    }

    /// Read-only view of all balances.
    #[must_use]
    pub fn balances(&self) -> &HashMap<Address, Decimal> {
        &self.balances
    }

    /// Replace every balance with a settled balance map. Participants missing
    /// from `settled` end at zero.
    pub(crate) fn apply(&mut self, settled: HashMap<Address, Decimal>) {
        self.balances = settled;
    }

    /// Zero `who`'s balance and return what it held.
    pub(crate) fn take_balance(&mut self, who: &Address) -> Decimal {
        self.balances
            .get_mut(who)
            .map(|bal| std::mem::replace(bal, Decimal::ZERO))
            .unwrap_or(Decimal::ZERO)
    }

    pub(crate) fn record_stranded(&mut self, who: Address, amount: Decimal) {
        *self.stranded.entry(who).or_insert(Decimal::ZERO) += amount;
    }

    /// Rebuild from persisted columns.
    pub(crate) fn from_parts(
        deposits: HashMap<Address, Decimal>,
        balances: HashMap<Address, Decimal>,
        stranded: HashMap<Address, Decimal>,
    ) -> Self {
        Self {
            deposits,
            balances,
            stranded,
        }
    }

    pub(crate) fn deposits(&self) -> &HashMap<Address, Decimal> {
        &self.deposits
    }

    pub(crate) fn stranded(&self) -> &HashMap<Address, Decimal> {
        &self.stranded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address([n; 20])
    }

    const REQUIRED: Decimal = Decimal::ONE_HUNDRED;

    #[test]
    fn deposit_sets_deposit_and_balance() {
        let mut ledger = DepositLedger::new();
        ledger.deposit(addr(1), REQUIRED, REQUIRED).unwrap();
        assert!(ledger.has_deposited(&addr(1)));
        assert_eq!(ledger.deposit_of(&addr(1)), REQUIRED);
        assert_eq!(ledger.balance_of(&addr(1)), REQUIRED);
        assert_eq!(ledger.depositor_count(), 1);
    }

    #[test]
    fn wrong_amount_rejected_without_mutation() {
        let mut ledger = DepositLedger::new();
        let err = ledger.deposit(addr(1), Decimal::TEN, REQUIRED).unwrap_err();
        assert!(matches!(err, OntimeError::WrongDepositAmount { .. }));
        assert!(!ledger.has_deposited(&addr(1)));
        assert_eq!(ledger.total_balances(), Decimal::ZERO);
    }

    #[test]
    fn double_deposit_rejected() {
        let mut ledger = DepositLedger::new();
        ledger.deposit(addr(1), REQUIRED, REQUIRED).unwrap();
        let err = ledger.deposit(addr(1), REQUIRED, REQUIRED).unwrap_err();
        assert!(matches!(err, OntimeError::AlreadyDeposited(_)));
        assert_eq!(ledger.total_deposited(), REQUIRED);
    }

    #[test]
    fn take_balance_zeroes_once() {
        let mut ledger = DepositLedger::new();
        ledger.deposit(addr(1), REQUIRED, REQUIRED).unwrap();
        assert_eq!(ledger.take_balance(&addr(1)), REQUIRED);
        assert_eq!(ledger.balance_of(&addr(1)), Decimal::ZERO);
        assert_eq!(ledger.take_balance(&addr(1)), Decimal::ZERO);
        // The deposit record survives withdrawal.
        assert_eq!(ledger.deposit_of(&addr(1)), REQUIRED);
    }

    #[test]
    fn apply_replaces_balances() {
        let mut ledger = DepositLedger::new();
        ledger.deposit(addr(1), REQUIRED, REQUIRED).unwrap();
        ledger.deposit(addr(2), REQUIRED, REQUIRED).unwrap();
        let settled = HashMap::from([(addr(2), Decimal::from(200))]);
        ledger.apply(settled);
        assert_eq!(ledger.balance_of(&addr(1)), Decimal::ZERO);
        assert_eq!(ledger.balance_of(&addr(2)), Decimal::from(200));
        assert_eq!(ledger.total_deposited(), Decimal::from(200));
    }

    #[test]
    fn stranded_accumulates() {
        let mut ledger = DepositLedger::new();
        ledger.record_stranded(addr(1), Decimal::TEN);
        ledger.record_stranded(addr(1), Decimal::ONE);
        assert_eq!(ledger.stranded_of(&addr(1)), Decimal::from(11));
        assert_eq!(ledger.total_stranded(), Decimal::from(11));
    }

    #[test]
    fn unknown_participant_reads_zero() {
        let ledger = DepositLedger::new();
        assert_eq!(ledger.balance_of(&addr(9)), Decimal::ZERO);
        assert_eq!(ledger.deposit_of(&addr(9)), Decimal::ZERO);
        assert!(!ledger.has_deposited(&addr(9)));
    }
}
