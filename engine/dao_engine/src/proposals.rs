//! # Proposal Store
//!
//! Owns every [`Proposal`] and its votes. Proposals are appended with
//! sequential ids starting at 0 and are never deleted. Status changes go
//! through [`ProposalStore::transition`], which only admits the forward
//! moves allowed by [`ProposalStatus::can_transition_to`].

use tracing::debug;

use crate::errors::{DaoError, Result};
use crate::membership::{Membership, Tier};
use crate::types::{Address, NewProposal, Proposal, ProposalId, ProposalStatus};

#[derive(Clone, Debug, Default)]
pub struct ProposalStore {
    proposals: Vec<Proposal>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a new proposal on behalf of `creator`.
    ///
    /// Authorization is checked before the arguments, so a non-stakeholder
    /// always gets `Unauthorized` regardless of what it submitted.
    pub fn create(
        &mut self,
        membership: &Membership<'_>,
        creator: &Address,
        draft: NewProposal,
    ) -> Result<&Proposal> {
        membership.require(creator, Tier::Stakeholder)?;
        validate(&draft)?;

        let id = self.proposals.len() as ProposalId;
        self.proposals.push(Proposal {
            id,
            title: draft.title,
            description: draft.description,
            beneficiary: draft.beneficiary,
            amount: draft.amount,
            creator: creator.clone(),
            votes: Vec::new(),
            status: ProposalStatus::Open,
        });
        debug!(id, %creator, "proposal stored");
        Ok(&self.proposals[id as usize])
    }

    pub fn get(&self, id: ProposalId) -> Result<&Proposal> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.proposals.get(i))
            .ok_or(DaoError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: ProposalId) -> Result<&mut Proposal> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.proposals.get_mut(i))
            .ok_or(DaoError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    /// Move proposal `id` to `to`, rejecting any backward or terminal move.
    pub(crate) fn transition(
        &mut self,
        id: ProposalId,
        to: ProposalStatus,
        operation: &'static str,
    ) -> Result<ProposalStatus> {
        let proposal = self.get_mut(id)?;
        let from = proposal.status;
        if !from.can_transition_to(to) {
            return Err(DaoError::InvalidState {
                proposal_id: id,
                status: from,
                operation,
            });
        }
        proposal.status = to;
        Ok(from)
    }

    /// Put back a status saved before a payout whose transfer failed.
    pub(crate) fn restore_status(&mut self, id: ProposalId, status: ProposalStatus) {
        if let Ok(proposal) = self.get_mut(id) {
            proposal.status = status;
        }
    }
}

fn validate(draft: &NewProposal) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(DaoError::InvalidProposal("title must not be empty".into()));
    }
    if draft.amount == 0 {
        return Err(DaoError::InvalidProposal("amount must be positive".into()));
    }
    if draft.beneficiary.is_zero() {
        return Err(DaoError::InvalidProposal(
            "beneficiary must not be the zero address".into(),
        ));
    }
    Ok(())
}
