//! # Engine
//!
//! [`Engine`] is the handle external callers hold. It owns the ledger,
//! proposal store and event log behind a single `RwLock`:
//!
//! - every mutating call takes the write lock and runs to completion before
//!   the next one is admitted;
//! - queries take the read lock, so they run concurrently with each other and
//!   never observe a half-applied mutation.
//!
//! Each committed mutation appends exactly one event while still holding the
//! write lock, so event order is mutation order.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, GovernanceConfig};
use crate::errors::{DaoError, Result};
use crate::events::{DaoEvent, EventLog, EventRecord, ProposalAction, VoteAction, PROPOSAL_PAID, PROPOSAL_RAISED};
use crate::ledger::Ledger;
use crate::membership::{Membership, Tier};
use crate::payout::{self, Settlement};
use crate::proposals::ProposalStore;
use crate::types::{
    Address, Amount, ContributionReceipt, NewProposal, PaymentReceipt, Proposal, ProposalId,
    ProposalStatus, ProposalView, Vote, VoteReceipt,
};
use crate::voting::{self, Tally};

#[derive(Debug, Default)]
struct DaoState {
    ledger: Ledger,
    proposals: ProposalStore,
    events: EventLog,
    next_vote_sequence: u64,
}

impl DaoState {
    fn membership(&self, config: &GovernanceConfig) -> Membership<'_> {
        Membership::new(&self.ledger, config.stakeholder_threshold)
    }
}

/// Consistent point-in-time summary of the treasury.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasurySnapshot {
    pub total_balance: Amount,
    pub total_contributed: Amount,
    pub total_paid_out: Amount,
    pub member_count: usize,
    pub proposals: Vec<ProposalView>,
    pub event_count: usize,
}

pub struct Engine {
    config: GovernanceConfig,
    settlement: Arc<dyn Settlement>,
    state: RwLock<DaoState>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(config: GovernanceConfig, settlement: Arc<dyn Settlement>) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        info!(
            threshold = %config.stakeholder_threshold,
            weighting = %config.vote_weighting,
            quorum = %config.quorum,
            "DAO engine initialised"
        );
        Ok(Self {
            config,
            settlement,
            state: RwLock::new(DaoState::default()),
        })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, DaoState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DaoState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────
    // Contributions and membership
    // ─────────────────────────────────────────────────────────

    /// Add `amount` to `member`'s contribution and to the treasury.
    pub fn contribute(&self, member: &Address, amount: Amount) -> Result<ContributionReceipt> {
        let mut state = self.write();
        let (new_balance, new_total) = state.ledger.contribute(member, amount)?;
        state.events.append(DaoEvent::ContributionReceived {
            member: member.clone(),
            amount,
            new_balance,
            total_balance: new_total,
        });
        info!(%member, %amount, %new_balance, total = %new_total, "contribution received");
        Ok(ContributionReceipt {
            member: member.clone(),
            amount,
            new_balance,
            new_total_balance: new_total,
        })
    }

    pub fn balance_of(&self, member: &Address) -> Amount {
        self.read().ledger.balance_of(member)
    }

    /// Contributed balance if `member` is a stakeholder, otherwise zero.
    pub fn stakeholders_balance(&self, member: &Address) -> Amount {
        let state = self.read();
        if state.membership(&self.config).is_stakeholder(member) {
            state.ledger.balance_of(member)
        } else {
            0
        }
    }

    /// Contributed balance of any member; zero for non-contributors.
    pub fn contributors_balance(&self, member: &Address) -> Amount {
        self.read().ledger.balance_of(member)
    }

    pub fn total_balance(&self) -> Amount {
        self.read().ledger.total_balance()
    }

    pub fn stakeholder_status(&self, member: &Address) -> bool {
        self.read().membership(&self.config).is_stakeholder(member)
    }

    pub fn is_contributor(&self, member: &Address) -> bool {
        self.read().membership(&self.config).is_contributor(member)
    }

    pub fn member_tier(&self, member: &Address) -> Tier {
        self.read().membership(&self.config).tier_of(member)
    }

    // ─────────────────────────────────────────────────────────
    // Proposals
    // ─────────────────────────────────────────────────────────

    /// Raise a spending proposal. `creator` must be a stakeholder.
    ///
    /// The requested amount is not checked against the treasury here; that
    /// happens at payout time.
    pub fn create_proposal(
        &self,
        creator: &Address,
        title: impl Into<String>,
        description: impl Into<String>,
        beneficiary: Address,
        amount: Amount,
    ) -> Result<ProposalId> {
        let draft = NewProposal {
            title: title.into(),
            description: description.into(),
            beneficiary,
            amount,
        };

        let mut guard = self.write();
        let DaoState {
            ledger,
            proposals,
            events,
            ..
        } = &mut *guard;
        let membership = Membership::new(ledger, self.config.stakeholder_threshold);

        let proposal = proposals.create(&membership, creator, draft).map_err(|e| {
            if matches!(e, DaoError::Unauthorized { .. }) {
                warn!(%creator, "proposal rejected: {e}");
            }
            e
        })?;
        let id = proposal.id;
        events.append(DaoEvent::ProposalRaised(ProposalAction {
            proposal_id: id,
            actor: creator.clone(),
            label: PROPOSAL_RAISED.to_string(),
            beneficiary: proposal.beneficiary.clone(),
            amount: proposal.amount,
        }));
        info!(id, %creator, beneficiary = %proposal.beneficiary, amount = %proposal.amount, "proposal raised");
        Ok(id)
    }

    pub fn get_proposal(&self, id: ProposalId) -> Result<ProposalView> {
        self.read().proposals.get(id).map(view)
    }

    pub fn proposals(&self) -> Vec<ProposalView> {
        self.read().proposals.iter().map(view).collect()
    }

    pub fn proposal_count(&self) -> usize {
        self.read().proposals.len()
    }

    // ─────────────────────────────────────────────────────────
    // Voting
    // ─────────────────────────────────────────────────────────

    /// Cast `voter`'s up (`true`) or down (`false`) vote on proposal `id`.
    pub fn perform_vote(&self, voter: &Address, id: ProposalId, choice: bool) -> Result<VoteReceipt> {
        let mut guard = self.write();
        let DaoState {
            ledger,
            proposals,
            events,
            next_vote_sequence,
        } = &mut *guard;
        let membership = Membership::new(ledger, self.config.stakeholder_threshold);

        let (vote, tally) = voting::cast_vote(
            proposals,
            &membership,
            &self.config,
            voter,
            id,
            choice,
            *next_vote_sequence,
        )
        .map_err(|e| {
            if matches!(e, DaoError::DuplicateVote { .. } | DaoError::Unauthorized { .. }) {
                warn!(%voter, id, "vote rejected: {e}");
            }
            e
        })?;
        *next_vote_sequence += 1;

        let proposal = proposals.get(id)?;
        events.append(DaoEvent::VoteCast(VoteAction {
            voter: voter.clone(),
            proposal_id: id,
            title: proposal.title.clone(),
            beneficiary: proposal.beneficiary.clone(),
            amount: proposal.amount,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            choice,
        }));
        info!(id, %voter, choice, up = %tally.upvotes, down = %tally.downvotes, "vote cast");

        Ok(VoteReceipt {
            proposal_id: id,
            voter: vote.voter,
            choice,
            weight: vote.weight,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
        })
    }

    /// Votes on proposal `id` in cast order.
    pub fn proposal_votes(&self, id: ProposalId) -> Result<Vec<Vote>> {
        voting::votes_of(&self.read().proposals, id).map(<[Vote]>::to_vec)
    }

    pub fn tally(&self, id: ProposalId) -> Result<Tally> {
        let tally = voting::tally(&self.read().proposals, id)?;
        debug!(id, up = %tally.upvotes, down = %tally.downvotes, "tally computed");
        Ok(tally)
    }

    /// Close voting on proposal `id`; returns the resulting status.
    pub fn finalize_proposal(&self, caller: &Address, id: ProposalId) -> Result<ProposalStatus> {
        let mut guard = self.write();
        let DaoState {
            ledger,
            proposals,
            events,
            ..
        } = &mut *guard;
        let membership = Membership::new(ledger, self.config.stakeholder_threshold);

        let (status, tally) = voting::finalize(proposals, &membership, &self.config, caller, id)?;
        events.append(DaoEvent::ProposalFinalized {
            proposal_id: id,
            caller: caller.clone(),
            status,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
        });
        info!(id, %caller, %status, "proposal finalized");
        Ok(status)
    }

    // ─────────────────────────────────────────────────────────
    // Payout
    // ─────────────────────────────────────────────────────────

    /// Release proposal `id`'s amount to its beneficiary.
    pub fn pay_beneficiary(&self, caller: &Address, id: ProposalId) -> Result<PaymentReceipt> {
        let mut guard = self.write();
        let DaoState {
            ledger,
            proposals,
            events,
            ..
        } = &mut *guard;

        let receipt = payout::pay_beneficiary(
            ledger,
            proposals,
            &self.config,
            self.settlement.as_ref(),
            caller,
            id,
        )?;
        events.append(DaoEvent::ProposalPaid(ProposalAction {
            proposal_id: id,
            actor: caller.clone(),
            label: PROPOSAL_PAID.to_string(),
            beneficiary: receipt.beneficiary.clone(),
            amount: receipt.amount,
        }));
        info!(
            id,
            %caller,
            beneficiary = %receipt.beneficiary,
            amount = %receipt.amount,
            remaining = %receipt.remaining_balance,
            "proposal paid"
        );
        Ok(receipt)
    }

    // ─────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────

    /// Up to `limit` event records starting at sequence `cursor`.
    pub fn events_since(&self, cursor: u64, limit: usize) -> Vec<EventRecord> {
        self.read().events.since(cursor, limit)
    }

    pub fn event_count(&self) -> usize {
        self.read().events.len()
    }

    pub fn snapshot(&self) -> TreasurySnapshot {
        let state = self.read();
        TreasurySnapshot {
            total_balance: state.ledger.total_balance(),
            total_contributed: state.ledger.total_contributed(),
            total_paid_out: state.ledger.total_paid_out(),
            member_count: state.ledger.member_count(),
            proposals: state.proposals.iter().map(view).collect(),
            event_count: state.events.len(),
        }
    }
}

fn view(p: &Proposal) -> ProposalView {
    let tally = Tally::of(&p.votes);
    ProposalView {
        id: p.id,
        title: p.title.clone(),
        description: p.description.clone(),
        beneficiary: p.beneficiary.clone(),
        amount: p.amount,
        creator: p.creator.clone(),
        status: p.status,
        upvotes: tally.upvotes,
        downvotes: tally.downvotes,
        vote_count: tally.voters,
    }
}
