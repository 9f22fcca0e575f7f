//! Engine-wide error types.

use thiserror::Error;

use crate::membership::Tier;
use crate::types::{Address, Amount, ProposalId, ProposalStatus};

/// Every failure a governance or treasury operation can return.
///
/// All errors are returned synchronously and none are retried by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DaoError {
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: &'static str },

    #[error("{member} is not authorized: requires {required} tier, has {actual}")]
    Unauthorized {
        member: Address,
        required: Tier,
        actual: Tier,
    },

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("proposal {0} not found")]
    NotFound(ProposalId),

    #[error("proposal {proposal_id} is {status}; cannot {operation}")]
    InvalidState {
        proposal_id: ProposalId,
        status: ProposalStatus,
        operation: &'static str,
    },

    #[error("{voter} has already voted on proposal {proposal_id}")]
    DuplicateVote {
        voter: Address,
        proposal_id: ProposalId,
    },

    #[error("proposal {proposal_id} has not passed ({upvotes} up / {downvotes} down, quorum {quorum})")]
    VoteNotPassed {
        proposal_id: ProposalId,
        upvotes: Amount,
        downvotes: Amount,
        quorum: Amount,
    },

    #[error("insufficient funds: requested {requested}, treasury holds {available}")]
    InsufficientFunds { requested: Amount, available: Amount },

    #[error("transfer of {amount} to {beneficiary} failed: {reason}")]
    TransferFailed {
        beneficiary: Address,
        amount: Amount,
        reason: String,
    },
}

impl DaoError {
    /// Stable numeric code for external callers.
    pub fn code(&self) -> u32 {
        match self {
            DaoError::InvalidAmount { .. } => 1,
            DaoError::Unauthorized { .. } => 2,
            DaoError::InvalidProposal(_) => 3,
            DaoError::NotFound(_) => 4,
            DaoError::InvalidState { .. } => 5,
            DaoError::DuplicateVote { .. } => 6,
            DaoError::VoteNotPassed { .. } => 7,
            DaoError::InsufficientFunds { .. } => 8,
            DaoError::TransferFailed { .. } => 9,
        }
    }
}

/// Failure to parse an [`Address`] from text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address {0:?} must start with 0x")]
    MissingPrefix(String),

    #[error("address {input:?} has {len} hex digits, expected 40")]
    BadLength { input: String, len: usize },

    #[error("address {0:?} is not valid hex")]
    NotHex(String),
}

impl From<AddressError> for DaoError {
    fn from(err: AddressError) -> Self {
        DaoError::InvalidProposal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DaoError>;
