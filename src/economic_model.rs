//! Epoch reward split between the community fund, relayers and validators.

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StakingError};
use crate::events::{Event, EventLog};
use crate::fraction::{Fraction, FIXED1};
use crate::host::{Address, Amount};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpochRewardParameters {
    pub target_epoch_payment: Amount,
    pub community_fraction: Fraction,
    pub relayer_fraction: Fraction,
    /// Receives the community share each epoch.
    pub community_fund: Address,
}

impl Default for EpochRewardParameters {
    fn default() -> Self {
        Self {
            target_epoch_payment: 1_000 * 1_000_000_000_000_000_000,
            community_fraction: Fraction::from_raw(FIXED1 / 4),
            relayer_fraction: Fraction::ZERO,
            community_fund: Address::zero(),
        }
    }
}

impl EpochRewardParameters {
    pub fn validate(&self) -> Result<()> {
        if self.community_fraction >= Fraction::ONE || self.relayer_fraction >= Fraction::ONE {
            return Err(StakingError::InvalidParameter(
                "reward fractions must be smaller than 1".into(),
            ));
        }
        if self.community_fraction.checked_add(self.relayer_fraction)? > Fraction::ONE {
            return Err(StakingError::InvalidParameter(
                "community and relayer fractions must not exceed 1 together".into(),
            ));
        }
        Ok(())
    }
}

/// One epoch's payment broken down by recipient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSplit {
    pub total: Amount,
    pub community: Amount,
    pub relayers: Amount,
    pub validators: Amount,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EpochRewards {
    parameters: EpochRewardParameters,
}

impl EpochRewards {
    pub fn new(parameters: EpochRewardParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &EpochRewardParameters {
        &self.parameters
    }

    pub fn community_fund(&self) -> Address {
        self.parameters.community_fund
    }

    /// Splits the target epoch payment. The validator share is what is left
    /// after the community and relayer shares are taken out.
    pub fn calculate(&self) -> Result<RewardSplit> {
        let total = self.parameters.target_epoch_payment;
        let community = self.parameters.community_fraction.mul_amount(total)?;
        let relayers = self.parameters.relayer_fraction.mul_amount(total)?;
        let validators = total
            .checked_sub(community)
            .and_then(|rest| rest.checked_sub(relayers))
            .ok_or(StakingError::Underflow)?;
        Ok(RewardSplit {
            total,
            community,
            relayers,
            validators,
        })
    }

    pub fn set_target_epoch_payment(&mut self, events: &mut EventLog, value: Amount) -> Result<()> {
        if value == self.parameters.target_epoch_payment {
            return Err(StakingError::ParameterUnchanged("target epoch payment"));
        }
        self.parameters.target_epoch_payment = value;
        info!("Target epoch payment set to {}", value);
        events.record(Event::TargetEpochPaymentSet { value });
        Ok(())
    }

    pub fn set_community_fraction(&mut self, events: &mut EventLog, fraction: Fraction) -> Result<()> {
        if fraction == self.parameters.community_fraction {
            return Err(StakingError::ParameterUnchanged("community fraction"));
        }
        Self::check_fraction(fraction, self.parameters.relayer_fraction)?;
        self.parameters.community_fraction = fraction;
        info!("Community reward fraction set to {}", fraction);
        events.record(Event::CommunityFractionSet { fraction });
        Ok(())
    }

    pub fn set_relayer_fraction(&mut self, events: &mut EventLog, fraction: Fraction) -> Result<()> {
        if fraction == self.parameters.relayer_fraction {
            return Err(StakingError::ParameterUnchanged("relayer fraction"));
        }
        Self::check_fraction(fraction, self.parameters.community_fraction)?;
        self.parameters.relayer_fraction = fraction;
        info!("Relayer reward fraction set to {}", fraction);
        events.record(Event::RelayerFractionSet { fraction });
        Ok(())
    }

    fn check_fraction(fraction: Fraction, other: Fraction) -> Result<()> {
        if fraction >= Fraction::ONE {
            return Err(StakingError::InvalidParameter(format!(
                "reward fraction {} must be smaller than 1",
                fraction
            )));
        }
        if fraction.checked_add(other)? > Fraction::ONE {
            return Err(StakingError::InvalidParameter(format!(
                "reward fractions {} and {} exceed 1 together",
                fraction, other
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewards(payment: Amount, community: u128, relayer: u128) -> EpochRewards {
        EpochRewards::new(EpochRewardParameters {
            target_epoch_payment: payment,
            community_fraction: Fraction::percent(community).unwrap(),
            relayer_fraction: Fraction::percent(relayer).unwrap(),
            community_fund: Address::from_low_u64(1),
        })
    }

    #[test]
    fn test_split_by_subtraction() {
        let split = rewards(1_001, 25, 10).calculate().unwrap();
        assert_eq!(
            split,
            RewardSplit {
                total: 1_001,
                community: 250,
                relayers: 100,
                validators: 651,
            }
        );
        assert_eq!(split.community + split.relayers + split.validators, split.total);
    }

    #[test]
    fn test_setters_reject_unchanged_and_out_of_range() {
        let mut rewards = rewards(1_000, 25, 0);
        let mut events = EventLog::new();

        assert_eq!(
            rewards.set_community_fraction(&mut events, Fraction::percent(25).unwrap()),
            Err(StakingError::ParameterUnchanged("community fraction"))
        );
        assert!(rewards.set_community_fraction(&mut events, Fraction::ONE).is_err());
        assert!(rewards
            .set_relayer_fraction(&mut events, Fraction::percent(80).unwrap())
            .is_err());
        assert_eq!(
            rewards.set_target_epoch_payment(&mut events, 1_000),
            Err(StakingError::ParameterUnchanged("target epoch payment"))
        );
        assert!(events.is_empty());

        rewards
            .set_relayer_fraction(&mut events, Fraction::percent(5).unwrap())
            .unwrap();
        rewards.set_target_epoch_payment(&mut events, 2_000).unwrap();
        assert_eq!(rewards.calculate().unwrap().validators, 1_400);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_validate_parameters() {
        assert!(EpochRewardParameters::default().validate().is_ok());
        let parameters = EpochRewardParameters {
            community_fraction: Fraction::percent(60).unwrap(),
            relayer_fraction: Fraction::percent(50).unwrap(),
            ..EpochRewardParameters::default()
        };
        assert!(parameters.validate().is_err());
    }
}
