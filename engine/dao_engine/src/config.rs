//! Governance parameters.
//!
//! The stakeholder threshold and the vote-weighting model are policy, not
//! code: both live here and are fixed when the engine is constructed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Amount, UNIT};

/// Default stakeholder threshold: 0.1 unit.
pub const DEFAULT_STAKEHOLDER_THRESHOLD: Amount = UNIT / 10;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("stakeholder threshold must be positive")]
    ZeroThreshold,

    #[error("unknown vote weighting {0:?} (expected one_member_one_vote or stake_weighted)")]
    UnknownWeighting(String),
}

/// How much a single stakeholder vote counts in the tally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteWeighting {
    /// Every stakeholder vote has weight 1.
    #[default]
    OneMemberOneVote,
    /// A vote weighs the voter's contributed balance at cast time.
    StakeWeighted,
}

impl VoteWeighting {
    pub fn weight_for(self, stake: Amount) -> Amount {
        match self {
            VoteWeighting::OneMemberOneVote => 1,
            VoteWeighting::StakeWeighted => stake,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteWeighting::OneMemberOneVote => "one_member_one_vote",
            VoteWeighting::StakeWeighted => "stake_weighted",
        }
    }
}

impl fmt::Display for VoteWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteWeighting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one_member_one_vote" | "uniform" => Ok(VoteWeighting::OneMemberOneVote),
            "stake_weighted" | "stake" => Ok(VoteWeighting::StakeWeighted),
            other => Err(ConfigError::UnknownWeighting(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Minimum cumulative contribution for Stakeholder tier.
    pub stakeholder_threshold: Amount,
    pub vote_weighting: VoteWeighting,
    /// Minimum total upvote weight for a proposal to pass. May be zero.
    pub quorum: Amount,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            stakeholder_threshold: DEFAULT_STAKEHOLDER_THRESHOLD,
            vote_weighting: VoteWeighting::default(),
            quorum: 0,
        }
    }
}

impl GovernanceConfig {
    pub fn with_threshold(mut self, threshold: Amount) -> Self {
        self.stakeholder_threshold = threshold;
        self
    }

    pub fn with_weighting(mut self, weighting: VoteWeighting) -> Self {
        self.vote_weighting = weighting;
        self
    }

    pub fn with_quorum(mut self, quorum: Amount) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stakeholder_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(())
    }
}
