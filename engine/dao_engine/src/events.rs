//! # Event Log
//!
//! Append-only record of committed state transitions. Every mutating engine
//! call appends exactly one [`DaoEvent`]; records carry a zero-based
//! `sequence` that matches the order in which mutations were applied.
//! External observers poll [`EventLog::since`] with the next sequence they
//! have not yet seen.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, ProposalId, ProposalStatus};

/// Label carried by the event raised alongside a new proposal.
pub const PROPOSAL_RAISED: &str = "Proposal Raised";
/// Label carried by the event raised alongside a payout.
pub const PROPOSAL_PAID: &str = "Proposal Paid";

/// Payload shared by proposal creation and payout events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAction {
    pub proposal_id: ProposalId,
    /// Creator for a raise, caller for a payout.
    pub actor: Address,
    pub label: String,
    pub beneficiary: Address,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAction {
    pub voter: Address,
    pub proposal_id: ProposalId,
    pub title: String,
    pub beneficiary: Address,
    pub amount: Amount,
    /// Upvote weight after this vote.
    pub upvotes: Amount,
    /// Downvote weight after this vote.
    pub downvotes: Amount,
    pub choice: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaoEvent {
    ContributionReceived {
        member: Address,
        amount: Amount,
        new_balance: Amount,
        total_balance: Amount,
    },
    ProposalRaised(ProposalAction),
    VoteCast(VoteAction),
    ProposalFinalized {
        proposal_id: ProposalId,
        caller: Address,
        status: ProposalStatus,
        upvotes: Amount,
        downvotes: Amount,
    },
    ProposalPaid(ProposalAction),
}

/// Short identifier for each event variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ContributionReceived,
    ProposalRaised,
    VoteCast,
    ProposalFinalized,
    ProposalPaid,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContributionReceived => "contribution_received",
            Self::ProposalRaised => "proposal_raised",
            Self::VoteCast => "vote_cast",
            Self::ProposalFinalized => "proposal_finalized",
            Self::ProposalPaid => "proposal_paid",
        }
    }
}

impl DaoEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DaoEvent::ContributionReceived { .. } => EventKind::ContributionReceived,
            DaoEvent::ProposalRaised(_) => EventKind::ProposalRaised,
            DaoEvent::VoteCast(_) => EventKind::VoteCast,
            DaoEvent::ProposalFinalized { .. } => EventKind::ProposalFinalized,
            DaoEvent::ProposalPaid(_) => EventKind::ProposalPaid,
        }
    }

    /// Proposal the event refers to, if any.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            DaoEvent::ContributionReceived { .. } => None,
            DaoEvent::ProposalRaised(a) | DaoEvent::ProposalPaid(a) => Some(a.proposal_id),
            DaoEvent::VoteCast(v) => Some(v.proposal_id),
            DaoEvent::ProposalFinalized { proposal_id, .. } => Some(*proposal_id),
        }
    }

    /// Member whose call produced the event.
    pub fn actor(&self) -> &Address {
        match self {
            DaoEvent::ContributionReceived { member, .. } => member,
            DaoEvent::ProposalRaised(a) | DaoEvent::ProposalPaid(a) => &a.actor,
            DaoEvent::VoteCast(v) => &v.voter,
            DaoEvent::ProposalFinalized { caller, .. } => caller,
        }
    }

    /// Amount of value the event concerns, if any.
    pub fn amount(&self) -> Option<Amount> {
        match self {
            DaoEvent::ContributionReceived { amount, .. } => Some(*amount),
            DaoEvent::ProposalRaised(a) | DaoEvent::ProposalPaid(a) => Some(a.amount),
            DaoEvent::VoteCast(v) => Some(v.amount),
            DaoEvent::ProposalFinalized { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub event: DaoEvent,
}

#[derive(Clone, Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event`; returns its sequence number.
    pub(crate) fn append(&mut self, event: DaoEvent) -> u64 {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord { sequence, event });
        sequence
    }

    /// Up to `limit` records starting at sequence `cursor`.
    pub fn since(&self, cursor: u64, limit: usize) -> Vec<EventRecord> {
        let start = usize::try_from(cursor).unwrap_or(usize::MAX);
        self.records
            .iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }
}
