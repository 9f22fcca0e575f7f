//! # Membership
//!
//! Derives a member's [`Tier`] from ledger balances. Holds no state of its
//! own; a [`Membership`] is a borrowed view over the [`Ledger`] plus the
//! configured stakeholder threshold.
//!
//! | Contributed balance           | Tier          |
//! |-------------------------------|---------------|
//! | `0`                           | `None`        |
//! | `0 < balance < threshold`     | `Contributor` |
//! | `balance >= threshold`        | `Stakeholder` |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DaoError, Result};
use crate::ledger::Ledger;
use crate::types::{Address, Amount};

/// Membership tier. Ordered: `None < Contributor < Stakeholder`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    None,
    Contributor,
    Stakeholder,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::Contributor => "contributor",
            Tier::Stakeholder => "stakeholder",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a contributed balance against `threshold`.
pub fn classify(balance: Amount, threshold: Amount) -> Tier {
    if balance == 0 {
        Tier::None
    } else if balance >= threshold {
        Tier::Stakeholder
    } else {
        Tier::Contributor
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Membership<'a> {
    ledger: &'a Ledger,
    threshold: Amount,
}

impl<'a> Membership<'a> {
    pub fn new(ledger: &'a Ledger, threshold: Amount) -> Self {
        Self { ledger, threshold }
    }

    pub fn balance_of(&self, member: &Address) -> Amount {
        self.ledger.balance_of(member)
    }

    pub fn tier_of(&self, member: &Address) -> Tier {
        classify(self.ledger.balance_of(member), self.threshold)
    }

    pub fn is_stakeholder(&self, member: &Address) -> bool {
        self.tier_of(member) == Tier::Stakeholder
    }

    /// Any positive balance counts, so stakeholders are contributors too.
    pub fn is_contributor(&self, member: &Address) -> bool {
        self.tier_of(member) >= Tier::Contributor
    }

    /// Fail with `Unauthorized` unless `member` holds at least `required`.
    pub fn require(&self, member: &Address, required: Tier) -> Result<Tier> {
        let actual = self.tier_of(member);
        if actual < required {
            return Err(DaoError::Unauthorized {
                member: member.clone(),
                required,
                actual,
            });
        }
        Ok(actual)
    }
}
