use serde::{Deserialize, Serialize};

use crate::error::{Result, StakingError};
use crate::fraction::{Fraction, FIXED1};
use crate::host::{Address, Amount};

pub const ECDSA_PUBLIC_KEY_LENGTH: usize = 64;
pub const BLS_PUBLIC_KEY_LENGTH: usize = 128;
pub const BLS_G1_PUBLIC_KEY_LENGTH: usize = 64;
pub const BLS_POP_LENGTH: usize = 64;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeys {
    pub ecdsa: Vec<u8>,
    pub bls: Vec<u8>,
    pub bls_g1: Vec<u8>,
}

/// Commission waiting for its activation block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommission {
    pub commission: Fraction,
    pub activation_block: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingInfo {
    pub multiplier: Fraction,
    /// Timestamp of the last halving, zero if never slashed.
    pub last_slashed: u64,
}

impl Default for SlashingInfo {
    fn default() -> Self {
        Self {
            multiplier: Fraction::ONE,
            last_slashed: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub public_keys: PublicKeys,
    pub signer: Address,
    pub score: Fraction,
    pub commission: Fraction,
    pub next_commission: Option<PendingCommission>,
    pub slashing: SlashingInfo,
    pub registered_at: u64,
}

/// Everything an account submits to become a validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRegistration {
    pub commission: Fraction,
    pub ecdsa_public_key: Vec<u8>,
    pub bls_public_key: Vec<u8>,
    pub bls_g1_public_key: Vec<u8>,
    pub bls_pop: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedGoldRequirements {
    /// Collateral a validator must keep locked.
    pub value: Amount,
    /// Seconds after registration before deregistration may be requested.
    pub duration: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreParameters {
    pub exponent: u64,
    pub adjustment_speed: Fraction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorParameters {
    pub locked_gold_requirements: LockedGoldRequirements,
    pub score: ScoreParameters,
    /// Added to measured uptime before scoring.
    pub downtime_grace_period: Fraction,
    /// Blocks between queueing a commission and applying it.
    pub commission_update_delay: u64,
    /// Seconds a validator must wait after a halving before resetting.
    pub slashing_reset_period: u64,
    /// Added to the score when sizing a validator's epoch payment.
    pub pledge_multiplier: Fraction,
}

impl Default for ValidatorParameters {
    fn default() -> Self {
        Self {
            locked_gold_requirements: LockedGoldRequirements {
                value: 10_000 * 1_000_000_000_000_000_000,
                duration: 60 * 24 * 60 * 60,
            },
            score: ScoreParameters {
                exponent: 10,
                adjustment_speed: Fraction::from_raw(FIXED1 / 10),
            },
            downtime_grace_period: Fraction::ZERO,
            commission_update_delay: 3 * 17_280,
            slashing_reset_period: 30 * 24 * 60 * 60,
            pledge_multiplier: Fraction::ZERO,
        }
    }
}

impl ValidatorParameters {
    pub fn validate(&self) -> Result<()> {
        if self.score.adjustment_speed > Fraction::ONE {
            return Err(StakingError::InvalidParameter(
                "score adjustment_speed must not exceed 1".into(),
            ));
        }
        if self.downtime_grace_period > Fraction::ONE {
            return Err(StakingError::InvalidParameter(
                "downtime_grace_period must not exceed 1".into(),
            ));
        }
        if self.score.exponent == 0 {
            return Err(StakingError::InvalidParameter(
                "score exponent must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// How a validator's epoch payment was split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochPayment {
    pub total: Amount,
    /// Commission share, minted to the validator.
    pub validator_payment: Amount,
    /// Left over for the validator's voters.
    pub remainder: Amount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub validator: Address,
    pub epoch_score: Fraction,
    pub score: Fraction,
}
