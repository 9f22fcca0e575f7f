//! # DAO Engine
//!
//! In-memory governance and treasury engine for a contribution-backed DAO.
//! Members contribute to a pooled treasury; members whose cumulative
//! contribution reaches the stakeholder threshold may raise spending
//! proposals, vote on them, and trigger payouts once a proposal passes.
//!
//! | Phase        | Entry Point(s)                                              |
//! |--------------|-------------------------------------------------------------|
//! | Bootstrap    | [`Engine::new`]                                             |
//! | Funding      | [`Engine::contribute`]                                      |
//! | Membership   | `stakeholder_status`, `is_contributor`, `member_tier`       |
//! | Proposals    | [`Engine::create_proposal`], `get_proposal`, `proposals`    |
//! | Voting       | [`Engine::perform_vote`], `proposal_votes`, `tally`, `finalize_proposal` |
//! | Payout       | [`Engine::pay_beneficiary`]                                 |
//! | Observation  | `events_since`, `event_count`, `snapshot`                   |
//!
//! ## Architecture
//!
//! Balances live in [`ledger`], tiers are derived in [`membership`],
//! proposals and their votes are owned by [`proposals`], decisions are
//! computed in [`voting`], and funds leave through [`payout`] via an
//! external [`Settlement`]. Every committed mutation is appended to the
//! [`events`] log. [`Engine`] wires them together and serializes writers.
//!
//! Callers identify themselves explicitly: every operation takes the acting
//! member's [`Address`] as an argument.

pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod membership;
pub mod payout;
pub mod proposals;
pub mod types;
pub mod voting;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_payout;

pub use config::{ConfigError, GovernanceConfig, VoteWeighting};
pub use engine::{Engine, TreasurySnapshot};
pub use errors::{AddressError, DaoError, Result};
pub use events::{DaoEvent, EventKind, EventRecord, ProposalAction, VoteAction};
pub use membership::Tier;
pub use payout::{InMemorySettlement, Settlement, TransferError};
pub use types::{
    Address, Amount, ContributionReceipt, PaymentReceipt, ProposalId, ProposalStatus,
    ProposalView, Vote, VoteReceipt, UNIT,
};
pub use voting::Tally;
