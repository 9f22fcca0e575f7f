//! # Payout
//!
//! Releases treasury funds to a proposal's beneficiary once its tally
//! passes. Money movement itself is delegated to a [`Settlement`]
//! implementation; this module only decides whether to pay and keeps the
//! ledger and proposal status consistent with the settlement outcome.
//!
//! A payout is all-or-nothing. The ledger is debited and the proposal marked
//! `Paid` before the settlement is asked to transfer; if the transfer fails
//! the debit is reverted and the previous status restored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::warn;

use crate::config::GovernanceConfig;
use crate::errors::{DaoError, Result};
use crate::ledger::Ledger;
use crate::membership::{Membership, Tier};
use crate::proposals::ProposalStore;
use crate::types::{Address, Amount, PaymentReceipt, ProposalId, ProposalStatus};
use crate::voting::Tally;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransferError(pub String);

/// External value-transfer collaborator (account or settlement layer).
pub trait Settlement: Send + Sync {
    fn transfer(&self, beneficiary: &Address, amount: Amount) -> std::result::Result<(), TransferError>;
}

/// Settlement that credits beneficiaries in memory.
///
/// Addresses registered with [`InMemorySettlement::reject`] refuse incoming
/// transfers, which lets callers exercise the payout rollback path.
#[derive(Debug, Default)]
pub struct InMemorySettlement {
    credited: Mutex<BTreeMap<Address, Amount>>,
    rejected: Mutex<BTreeSet<Address>>,
}

impl InMemorySettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, beneficiary: &Address) {
        self.rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(beneficiary.clone());
    }

    pub fn accept(&self, beneficiary: &Address) {
        self.rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(beneficiary);
    }

    pub fn credited_to(&self, beneficiary: &Address) -> Amount {
        self.credited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(beneficiary)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_credited(&self) -> Amount {
        self.credited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl Settlement for InMemorySettlement {
    fn transfer(&self, beneficiary: &Address, amount: Amount) -> std::result::Result<(), TransferError> {
        if self
            .rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(beneficiary)
        {
            return Err(TransferError(format!("{beneficiary} rejected the transfer")));
        }
        let mut credited = self.credited.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = credited.entry(beneficiary.clone()).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| TransferError(format!("{beneficiary} balance would overflow")))?;
        Ok(())
    }
}

/// Pay out proposal `id` on behalf of `caller`.
pub fn pay_beneficiary(
    ledger: &mut Ledger,
    store: &mut ProposalStore,
    config: &GovernanceConfig,
    settlement: &dyn Settlement,
    caller: &Address,
    id: ProposalId,
) -> Result<PaymentReceipt> {
    Membership::new(ledger, config.stakeholder_threshold).require(caller, Tier::Stakeholder)?;

    let proposal = store.get(id)?;
    let prior = proposal.status;
    if !matches!(prior, ProposalStatus::Open | ProposalStatus::Passed) {
        return Err(DaoError::InvalidState {
            proposal_id: id,
            status: prior,
            operation: "pay",
        });
    }

    let tally = Tally::of(&proposal.votes);
    if !tally.passes(config.quorum) {
        return Err(DaoError::VoteNotPassed {
            proposal_id: id,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            quorum: config.quorum,
        });
    }

    let amount = proposal.amount;
    let beneficiary = proposal.beneficiary.clone();

    let debit = ledger.debit(amount)?;
    if let Err(e) = store.transition(id, ProposalStatus::Paid, "pay") {
        ledger.revert(debit);
        return Err(e);
    }

    if let Err(e) = settlement.transfer(&beneficiary, amount) {
        ledger.revert(debit);
        store.restore_status(id, prior);
        warn!(id, %beneficiary, %amount, error = %e, "transfer failed; payout rolled back");
        return Err(DaoError::TransferFailed {
            beneficiary,
            amount,
            reason: e.0,
        });
    }

    let amount = debit.commit();
    Ok(PaymentReceipt {
        proposal_id: id,
        beneficiary,
        amount,
        remaining_balance: ledger.total_balance(),
    })
}
