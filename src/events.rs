//! Audit trail of state transitions.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;
use crate::host::{Address, Amount};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    ValidatorRegistered { validator: Address, signer: Address },
    ValidatorDeregistrationRequested { validator: Address },
    ValidatorDeregistrationCancelled { validator: Address },
    ValidatorDeregistered { validator: Address },
    ValidatorEcdsaPublicKeyUpdated { validator: Address },
    ValidatorBlsPublicKeyUpdated { validator: Address },
    ValidatorScoreUpdated {
        validator: Address,
        score: Fraction,
        epoch_score: Fraction,
    },
    ValidatorCommissionUpdateQueued {
        validator: Address,
        commission: Fraction,
        activation_block: u64,
    },
    ValidatorCommissionUpdated { validator: Address, commission: Fraction },
    ValidatorEpochPaymentDistributed {
        validator: Address,
        validator_payment: Amount,
        remainder: Amount,
    },
    SlashingMultiplierHalved { validator: Address, multiplier: Fraction },
    SlashingMultiplierReset { validator: Address },
    ValidatorMarkedEligible { validator: Address },
    ValidatorMarkedIneligible { validator: Address },
    VoteCast {
        voter: Address,
        validator: Address,
        value: Amount,
    },
    VoteActivated {
        voter: Address,
        validator: Address,
        value: Amount,
        units: u128,
    },
    PendingVoteRevoked {
        voter: Address,
        validator: Address,
        value: Amount,
    },
    ActiveVoteRevoked {
        voter: Address,
        validator: Address,
        value: Amount,
        units: u128,
    },
    EpochRewardsDistributedToVoters { validator: Address, value: Amount },
    CommunityRewardMinted { fund: Address, value: Amount },
    VoterRewardsMinted { collateral: Address, value: Amount },
    EpochProcessed { epoch: u64 },
    TargetEpochPaymentSet { value: Amount },
    CommunityFractionSet { fraction: Fraction },
    RelayerFractionSet { fraction: Fraction },
}

#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: Event) {
        debug!("event: {:?}", event);
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Drops every event recorded after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
