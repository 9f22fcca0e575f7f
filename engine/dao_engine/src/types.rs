//! # Types
//!
//! Shared data structures used across all modules of the DAO engine.
//!
//! ## Design decisions
//!
//! ### Fixed-point amounts
//!
//! Every balance and payout is an [`Amount`]: an unsigned integer counted in
//! the smallest indivisible unit. One whole unit of currency is [`UNIT`]
//! (`10^18`), so `0.05` of a unit is `UNIT / 20`. No floating point is used
//! anywhere, which keeps `total_balance` arithmetic exact.
//!
//! ### Proposal status as a finite-state machine
//!
//! [`ProposalStatus`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! Open ──► Passed ──► Paid
//!   │                  ▲
//!   ├──────────────────┘
//!   └──► Failed
//! ```
//!
//! `Paid` and `Failed` are terminal. Open may go straight to Paid because the
//! vote decision is evaluated lazily at payout time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AddressError;

/// Smallest indivisible currency amount.
pub type Amount = u128;

/// Sequential, zero-based proposal identifier.
pub type ProposalId = u64;

/// One whole unit of currency expressed in the smallest unit.
pub const UNIT: Amount = 1_000_000_000_000_000_000;

const ADDRESS_BYTES: usize = 20;

// ── Address ──────────────────────────────────────────────────────────

/// Account identity: `0x` followed by 40 hex digits, stored lowercase.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address string.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(input.to_string()))?;

        if digits.len() != ADDRESS_BYTES * 2 {
            return Err(AddressError::BadLength {
                input: input.to_string(),
                len: digits.len(),
            });
        }

        let bytes = hex::decode(digits).map_err(|_| AddressError::NotHex(input.to_string()))?;
        Ok(Self(format!("0x{}", hex::encode(bytes))))
    }

    /// Build an address from its raw 20 bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// The all-zero address. Syntactically valid, but never a payout target.
    pub fn zero() -> Self {
        Self::from_bytes([0u8; ADDRESS_BYTES])
    }

    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

// ── Proposal lifecycle ───────────────────────────────────────────────

/// Lifecycle status of a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Accepting votes.
    Open,
    /// Finalized with a passing tally; awaiting payout.
    Passed,
    /// Finalized without a passing tally.
    Failed,
    /// Funds released to the beneficiary.
    Paid,
}

impl ProposalStatus {
    /// `true` if `self -> to` is a legal forward transition.
    pub fn can_transition_to(self, to: ProposalStatus) -> bool {
        matches!(
            (self, to),
            (ProposalStatus::Open, ProposalStatus::Passed)
                | (ProposalStatus::Open, ProposalStatus::Failed)
                | (ProposalStatus::Open, ProposalStatus::Paid)
                | (ProposalStatus::Passed, ProposalStatus::Paid)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProposalStatus::Failed | ProposalStatus::Paid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProposalStatus::Open => "open",
            ProposalStatus::Passed => "passed",
            ProposalStatus::Failed => "failed",
            ProposalStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stakeholder's vote. Immutable once cast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: Address,
    pub proposal_id: ProposalId,
    /// `true` for an upvote, `false` for a downvote.
    pub choice: bool,
    /// Influence of this vote in the tally, fixed at cast time.
    pub weight: Amount,
    /// Engine-wide cast order.
    pub sequence: u64,
}

/// Arguments for a new proposal, validated by the proposal store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProposal {
    pub title: String,
    pub description: String,
    pub beneficiary: Address,
    pub amount: Amount,
}

/// Full in-engine representation of a spending proposal.
///
/// `id`, `title`, `description`, `beneficiary`, `amount` and `creator` never
/// change after creation; only `status` and `votes` do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique identifier (auto-incremented from 0).
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    /// Address that receives the payout.
    pub beneficiary: Address,
    /// Requested payout.
    pub amount: Amount,
    /// Stakeholder that raised the proposal.
    pub creator: Address,
    /// Votes in cast order.
    pub votes: Vec<Vote>,
    /// Current lifecycle status.
    pub status: ProposalStatus,
}

impl Proposal {
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.votes.iter().any(|v| &v.voter == voter)
    }
}

// ── External views and receipts ──────────────────────────────────────

/// Read-only projection of a proposal returned to external callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalView {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub beneficiary: Address,
    pub amount: Amount,
    pub creator: Address,
    pub status: ProposalStatus,
    pub upvotes: Amount,
    pub downvotes: Amount,
    pub vote_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionReceipt {
    pub member: Address,
    pub amount: Amount,
    pub new_balance: Amount,
    pub new_total_balance: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub proposal_id: ProposalId,
    pub voter: Address,
    pub choice: bool,
    pub weight: Amount,
    pub upvotes: Amount,
    pub downvotes: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub proposal_id: ProposalId,
    pub beneficiary: Address,
    pub amount: Amount,
    pub remaining_balance: Amount,
}
