#![allow(dead_code)]

use std::collections::HashSet;

use crate::engine::Engine;
use crate::events::{DaoEvent, EventRecord};
use crate::types::{Amount, ProposalStatus, ProposalView, Vote};

/// Treasury balance equals everything contributed minus everything paid.
pub fn assert_treasury_identity(engine: &Engine) {
    let snap = engine.snapshot();
    assert_eq!(
        snap.total_balance,
        snap.total_contributed - snap.total_paid_out,
        "treasury identity broken: {} != {} - {}",
        snap.total_balance,
        snap.total_contributed,
        snap.total_paid_out
    );

    let paid: Amount = snap
        .proposals
        .iter()
        .filter(|p| p.status == ProposalStatus::Paid)
        .map(|p| p.amount)
        .sum();
    assert_eq!(
        paid, snap.total_paid_out,
        "paid proposals sum to {paid}, ledger reports {}",
        snap.total_paid_out
    );
}

/// Proposal ids are sequential starting from 0.
pub fn assert_sequential_ids(proposals: &[ProposalView]) {
    for (i, proposal) in proposals.iter().enumerate() {
        assert_eq!(
            proposal.id, i as u64,
            "expected proposal id {}, got {}",
            i, proposal.id
        );
    }
}

/// Only forward transitions are allowed:
///   Open   -> Passed | Failed | Paid
///   Passed -> Paid
///   Failed, Paid -> (none)
pub fn assert_valid_status_transition(from: ProposalStatus, to: ProposalStatus) {
    let valid = matches!(
        (from, to),
        (ProposalStatus::Open, ProposalStatus::Passed)
            | (ProposalStatus::Open, ProposalStatus::Failed)
            | (ProposalStatus::Open, ProposalStatus::Paid)
            | (ProposalStatus::Passed, ProposalStatus::Paid)
    );
    assert!(valid, "invalid status transition from {from:?} to {to:?}");
}

/// A voter appears at most once per proposal, in strictly increasing cast order.
pub fn assert_one_vote_per_voter(votes: &[Vote]) {
    let mut seen = HashSet::new();
    for vote in votes {
        assert!(
            seen.insert(&vote.voter),
            "{} voted twice on proposal {}",
            vote.voter,
            vote.proposal_id
        );
    }
    for pair in votes.windows(2) {
        assert!(
            pair[0].sequence < pair[1].sequence,
            "votes out of cast order on proposal {}",
            pair[0].proposal_id
        );
    }
}

/// Fields fixed at creation never change.
pub fn assert_proposal_immutable_fields(original: &ProposalView, current: &ProposalView) {
    assert_eq!(original.id, current.id, "proposal id changed");
    assert_eq!(original.title, current.title, "proposal title changed");
    assert_eq!(
        original.description, current.description,
        "proposal description changed"
    );
    assert_eq!(
        original.beneficiary, current.beneficiary,
        "proposal beneficiary changed"
    );
    assert_eq!(original.amount, current.amount, "proposal amount changed");
    assert_eq!(original.creator, current.creator, "proposal creator changed");
}

/// Event sequences are zero-based and gap-free.
pub fn assert_event_sequence(records: &[EventRecord]) {
    for (i, record) in records.iter().enumerate() {
        assert_eq!(
            record.sequence, i as u64,
            "event sequence gap at position {i}"
        );
    }
}

/// Number of contribution events equals the number of accepted contributions.
pub fn count_contributions(records: &[EventRecord]) -> usize {
    records
        .iter()
        .filter(|r| matches!(r.event, DaoEvent::ContributionReceived { .. }))
        .count()
}

/// Run every engine-wide invariant.
pub fn assert_all_invariants(engine: &Engine) {
    assert_treasury_identity(engine);

    let proposals = engine.proposals();
    assert_sequential_ids(&proposals);
    for proposal in &proposals {
        let votes = engine.proposal_votes(proposal.id).unwrap();
        assert_eq!(votes.len(), proposal.vote_count);
        assert_one_vote_per_voter(&votes);
    }

    assert_event_sequence(&engine.events_since(0, usize::MAX));
}

/// Remembers every proposal as first seen and its last observed status.
///
/// Call [`ProposalHistory::observe`] after each step of a scenario: it runs
/// [`assert_all_invariants`], checks that creation-time fields still match,
/// and that every status change since the previous observation is allowed.
#[derive(Debug, Default)]
pub struct ProposalHistory {
    originals: Vec<ProposalView>,
    last_status: Vec<ProposalStatus>,
}

impl ProposalHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, engine: &Engine) {
        assert_all_invariants(engine);

        let current = engine.proposals();
        assert!(
            current.len() >= self.originals.len(),
            "proposals disappeared: {} -> {}",
            self.originals.len(),
            current.len()
        );
        for proposal in current {
            let i = proposal.id as usize;
            if i < self.originals.len() {
                assert_proposal_immutable_fields(&self.originals[i], &proposal);
                let before = self.last_status[i];
                if before != proposal.status {
                    assert_valid_status_transition(before, proposal.status);
                }
                self.last_status[i] = proposal.status;
            } else {
                self.last_status.push(proposal.status);
                self.originals.push(proposal);
            }
        }
    }

    /// Status as of the last observation.
    pub fn status(&self, id: u64) -> ProposalStatus {
        self.last_status[id as usize]
    }
}
