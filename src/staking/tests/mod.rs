mod engine_test;
mod validator_test;
mod voting_test;

use crate::config::Parameters;
use crate::election::RankingHint;
use crate::fraction::Fraction;
use crate::host::{Address, Amount, InMemoryHost};
use crate::staking::{StakingEngine, ValidatorOperations, VoteOperations};
use crate::validators::{
    ValidatorRegistration, BLS_G1_PUBLIC_KEY_LENGTH, BLS_PUBLIC_KEY_LENGTH, ECDSA_PUBLIC_KEY_LENGTH,
};

pub(crate) const REQUIREMENT: Amount = 10_000;
pub(crate) const NO_HINT: RankingHint = RankingHint {
    lesser: None,
    greater: None,
};

pub(crate) fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

pub(crate) fn pct(value: u128) -> Fraction {
    Fraction::percent(value).unwrap()
}

pub(crate) fn test_parameters() -> Parameters {
    let mut parameters = Parameters::default();
    parameters.validators.locked_gold_requirements.value = REQUIREMENT;
    parameters.validators.locked_gold_requirements.duration = 1_000;
    parameters.validators.commission_update_delay = 10;
    parameters.validators.slashing_reset_period = 500;
    parameters.validators.score.exponent = 1;
    parameters.validators.score.adjustment_speed = Fraction::ONE;
    parameters.election.max_num_validators_voted_for = 3;
    parameters.election.electability_threshold = pct(10);
    parameters.rewards.target_epoch_payment = 1_000;
    parameters.rewards.community_fraction = pct(20);
    parameters.rewards.community_fund = addr(999);
    parameters
}

pub(crate) fn registration(account: Address, commission: Fraction) -> ValidatorRegistration {
    let bls = vec![7; BLS_PUBLIC_KEY_LENGTH];
    let bls_g1 = vec![8; BLS_G1_PUBLIC_KEY_LENGTH];
    ValidatorRegistration {
        commission,
        ecdsa_public_key: vec![1; ECDSA_PUBLIC_KEY_LENGTH],
        bls_pop: InMemoryHost::proof_of_possession_g1(account, &bls, &bls_g1),
        bls_public_key: bls,
        bls_g1_public_key: bls_g1,
    }
}

pub(crate) fn engine() -> StakingEngine<InMemoryHost> {
    let mut engine = StakingEngine::new(InMemoryHost::new());
    engine.initialize(test_parameters()).unwrap();
    engine
}

/// Locks the collateral requirement for `account` and registers it.
pub(crate) fn register(engine: &mut StakingEngine<InMemoryHost>, account: Address, commission: Fraction) {
    engine.host_mut().lock(account, REQUIREMENT);
    engine
        .register_validator(account, registration(account, commission))
        .unwrap();
}

/// Locks `value` for `voter` and votes it all for `validator`.
pub(crate) fn lock_and_vote(
    engine: &mut StakingEngine<InMemoryHost>,
    voter: Address,
    validator: Address,
    value: Amount,
) {
    engine.host_mut().lock(voter, value);
    engine.vote(voter, validator, value, NO_HINT).unwrap();
}

pub(crate) fn next_epoch(engine: &mut StakingEngine<InMemoryHost>) {
    engine.host_mut().advance_epoch(100, 500);
}
