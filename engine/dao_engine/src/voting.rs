//! # Voting
//!
//! One vote per stakeholder per proposal, weighted according to the
//! configured [`VoteWeighting`](crate::config::VoteWeighting).
//!
//! The pass/fail decision is never taken automatically after a vote. It is
//! evaluated lazily, either by an explicit [`finalize`] or at payout time:
//! a proposal passes when its upvote weight is strictly greater than its
//! downvote weight and reaches the configured quorum.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GovernanceConfig;
use crate::errors::{DaoError, Result};
use crate::membership::{Membership, Tier};
use crate::proposals::ProposalStore;
use crate::types::{Address, Amount, ProposalId, ProposalStatus, Vote};

/// Aggregated vote weight on a proposal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub upvotes: Amount,
    pub downvotes: Amount,
    pub voters: usize,
}

impl Tally {
    pub fn of(votes: &[Vote]) -> Self {
        votes.iter().fold(Tally::default(), |mut t, v| {
            if v.choice {
                t.upvotes = t.upvotes.saturating_add(v.weight);
            } else {
                t.downvotes = t.downvotes.saturating_add(v.weight);
            }
            t.voters += 1;
            t
        })
    }

    pub fn passes(&self, quorum: Amount) -> bool {
        self.upvotes > self.downvotes && self.upvotes >= quorum
    }

    /// Terminal status a finalization would assign.
    pub fn decision(&self, quorum: Amount) -> ProposalStatus {
        if self.passes(quorum) {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Failed
        }
    }
}

/// Tally the votes recorded on proposal `id`.
pub fn tally(store: &ProposalStore, id: ProposalId) -> Result<Tally> {
    Ok(Tally::of(&store.get(id)?.votes))
}

/// Votes on proposal `id` in cast order.
pub fn votes_of(store: &ProposalStore, id: ProposalId) -> Result<&[Vote]> {
    Ok(&store.get(id)?.votes)
}

/// Record `voter`'s vote on proposal `id`.
///
/// Returns the stored vote and the tally including it.
pub fn cast_vote(
    store: &mut ProposalStore,
    membership: &Membership<'_>,
    config: &GovernanceConfig,
    voter: &Address,
    id: ProposalId,
    choice: bool,
    sequence: u64,
) -> Result<(Vote, Tally)> {
    membership.require(voter, Tier::Stakeholder)?;

    let proposal = store.get_mut(id)?;
    if proposal.status != ProposalStatus::Open {
        return Err(DaoError::InvalidState {
            proposal_id: id,
            status: proposal.status,
            operation: "vote",
        });
    }
    if proposal.has_voted(voter) {
        return Err(DaoError::DuplicateVote {
            voter: voter.clone(),
            proposal_id: id,
        });
    }

    let vote = Vote {
        voter: voter.clone(),
        proposal_id: id,
        choice,
        weight: config.vote_weighting.weight_for(membership.balance_of(voter)),
        sequence,
    };
    proposal.votes.push(vote.clone());
    let tally = Tally::of(&proposal.votes);
    debug!(id, %voter, choice, weight = %vote.weight, "vote recorded");
    Ok((vote, tally))
}

/// Close voting on proposal `id`, moving it to Passed or Failed.
pub fn finalize(
    store: &mut ProposalStore,
    membership: &Membership<'_>,
    config: &GovernanceConfig,
    caller: &Address,
    id: ProposalId,
) -> Result<(ProposalStatus, Tally)> {
    membership.require(caller, Tier::Stakeholder)?;

    let proposal = store.get(id)?;
    if proposal.status != ProposalStatus::Open {
        return Err(DaoError::InvalidState {
            proposal_id: id,
            status: proposal.status,
            operation: "finalize",
        });
    }
    let tally = Tally::of(&proposal.votes);
    let decision = tally.decision(config.quorum);
    store.transition(id, decision, "finalize")?;
    Ok((decision, tally))
}
