//! # Ledger
//!
//! Per-member contributed balances and the aggregate treasury balance.
//!
//! | Field              | Meaning                                        |
//! |--------------------|------------------------------------------------|
//! | `balances`         | Cumulative contribution per member             |
//! | `total_balance`    | Funds currently held by the treasury           |
//! | `total_contributed`| Sum of every accepted contribution             |
//! | `total_paid_out`   | Sum of every committed payout                  |
//!
//! `total_balance == total_contributed - total_paid_out` holds after every
//! call. [`Ledger::contribute`] and [`Ledger::debit`] are the only paths that
//! change a balance; [`Ledger::revert`] undoes a debit whose payout failed.

use std::collections::BTreeMap;

use crate::errors::{DaoError, Result};
use crate::types::{Address, Amount};

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    balances: BTreeMap<Address, Amount>,
    total_balance: Amount,
    total_contributed: Amount,
    total_paid_out: Amount,
}

/// A treasury withdrawal that has been applied but not yet settled.
///
/// Must be either [`committed`](Debit::commit) or handed back to
/// [`Ledger::revert`].
#[must_use = "a debit must be committed or reverted"]
#[derive(Debug, PartialEq, Eq)]
pub struct Debit {
    amount: Amount,
}

impl Debit {
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Finalize the withdrawal; returns the debited amount.
    pub fn commit(self) -> Amount {
        self.amount
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `member` and to the treasury.
    ///
    /// Returns `(new_member_balance, new_total_balance)`.
    pub fn contribute(&mut self, member: &Address, amount: Amount) -> Result<(Amount, Amount)> {
        if amount == 0 {
            return Err(DaoError::InvalidAmount {
                amount,
                reason: "contribution must be positive",
            });
        }

        let current = self.balance_of(member);
        let overflow = || DaoError::InvalidAmount {
            amount,
            reason: "contribution overflows balance",
        };
        let new_balance = current.checked_add(amount).ok_or_else(overflow)?;
        let new_total = self.total_balance.checked_add(amount).ok_or_else(overflow)?;
        let new_contributed = self
            .total_contributed
            .checked_add(amount)
            .ok_or_else(overflow)?;

        self.balances.insert(member.clone(), new_balance);
        self.total_balance = new_total;
        self.total_contributed = new_contributed;
        Ok((new_balance, new_total))
    }

    /// Contributed balance of `member`; zero for unknown members.
    pub fn balance_of(&self, member: &Address) -> Amount {
        self.balances.get(member).copied().unwrap_or(0)
    }

    pub fn total_balance(&self) -> Amount {
        self.total_balance
    }

    pub fn total_contributed(&self) -> Amount {
        self.total_contributed
    }

    pub fn total_paid_out(&self) -> Amount {
        self.total_paid_out
    }

    pub fn member_count(&self) -> usize {
        self.balances.len()
    }

    pub fn members(&self) -> impl Iterator<Item = (&Address, Amount)> {
        self.balances.iter().map(|(a, b)| (a, *b))
    }

    /// Withdraw `amount` from the treasury for a payout.
    pub(crate) fn debit(&mut self, amount: Amount) -> Result<Debit> {
        if amount > self.total_balance {
            return Err(DaoError::InsufficientFunds {
                requested: amount,
                available: self.total_balance,
            });
        }
        self.total_balance -= amount;
        self.total_paid_out += amount;
        Ok(Debit { amount })
    }

    /// Compensate a debit whose settlement failed.
    pub(crate) fn revert(&mut self, debit: Debit) {
        self.total_balance += debit.amount;
        self.total_paid_out -= debit.amount;
    }
}
