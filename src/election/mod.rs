//! Vote accounting and validator election.

pub mod ranking;
pub mod selector;
pub mod votes;

pub use ranking::{RankingHint, SortedRanking};
pub use selector::{elect_n_validator_signers, elect_validator_accounts};
pub use votes::{
    ActiveVotes, LedgerCheckpoint, PendingVote, PendingVotes, VoteLedger, UNIT_PRECISION_FACTOR,
};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StakingError};
use crate::fraction::Fraction;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionParameters {
    pub min_electable_validators: usize,
    pub max_electable_validators: usize,
    /// Distinct validators a single voter may back at once.
    pub max_num_validators_voted_for: usize,
    /// Share of all votes a validator needs to be elected at all.
    pub electability_threshold: Fraction,
}

impl Default for ElectionParameters {
    fn default() -> Self {
        Self {
            min_electable_validators: 1,
            max_electable_validators: 100,
            max_num_validators_voted_for: 10,
            electability_threshold: Fraction::from_raw(crate::fraction::FIXED1 / 1000),
        }
    }
}

impl ElectionParameters {
    pub fn validate(&self) -> Result<()> {
        if self.min_electable_validators == 0 {
            return Err(StakingError::InvalidParameter(
                "min_electable_validators must be at least 1".into(),
            ));
        }
        if self.max_electable_validators < self.min_electable_validators {
            return Err(StakingError::InvalidParameter(
                "max_electable_validators must be at least min_electable_validators".into(),
            ));
        }
        if self.max_num_validators_voted_for == 0 {
            return Err(StakingError::InvalidParameter(
                "max_num_validators_voted_for must be at least 1".into(),
            ));
        }
        if self.electability_threshold >= Fraction::ONE {
            return Err(StakingError::InvalidParameter(
                "electability_threshold must be smaller than 1".into(),
            ));
        }
        Ok(())
    }
}
