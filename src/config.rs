//! Tunable parameters, loaded from JSON.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::economic_model::EpochRewardParameters;
use crate::election::ElectionParameters;
use crate::error::StakingError;
use crate::validators::ValidatorParameters;

/// Every parameter the engine is initialized with. Missing sections and
/// fields fall back to their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub election: ElectionParameters,
    pub validators: ValidatorParameters,
    pub rewards: EpochRewardParameters,
}

impl Parameters {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read parameters from {}", path.display()))?;
        let parameters: Parameters = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse parameters in {}", path.display()))?;
        parameters
            .validate()
            .with_context(|| format!("invalid parameters in {}", path.display()))?;
        Ok(parameters)
    }

    pub fn validate(&self) -> std::result::Result<(), StakingError> {
        self.election.validate()?;
        self.validators.validate()?;
        self.rewards.validate()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
