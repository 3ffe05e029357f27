use pretty_assertions::assert_eq;

use super::*;
use crate::error::{Outcome, StakingError};
use crate::host::CollateralLedger;
use crate::staking::EpochProcessor;
use crate::validators::{EpochPayment, ECDSA_PUBLIC_KEY_LENGTH};

#[test]
fn test_commission_update_after_delay() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(5));

    engine.host_mut().set_block(100);
    engine.set_next_commission_update(addr(1), pct(8)).unwrap();

    engine.host_mut().set_block(109);
    assert_eq!(
        engine.update_commission(addr(1)),
        Err(StakingError::CommissionUpdateNotReady {
            activation_block: 110,
            current_block: 109
        })
    );

    engine.host_mut().set_block(110);
    assert_eq!(engine.update_commission(addr(1)), Ok(pct(8)));
    let validator = engine.registry().unwrap().validator(&addr(1)).unwrap().clone();
    assert_eq!(validator.commission, pct(8));
    assert_eq!(validator.next_commission, None);
}

#[test]
fn test_slashing_multiplier_reset_period() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    let slasher = addr(900);
    engine.host_mut().add_slasher(slasher);

    engine.host_mut().set_timestamp(2_000);
    assert_eq!(
        engine.halve_slashing_multiplier(addr(1), addr(1)),
        Err(StakingError::NotSlasher(addr(1)))
    );
    assert_eq!(engine.halve_slashing_multiplier(slasher, addr(1)), Ok(pct(50)));

    engine.host_mut().set_timestamp(2_499);
    assert_eq!(
        engine.reset_slashing_multiplier(addr(1), addr(1)),
        Err(StakingError::SlashingResetTooEarly { available_at: 2_500 })
    );
    engine.host_mut().set_timestamp(2_500);
    assert_eq!(
        engine.reset_slashing_multiplier(slasher, addr(1)),
        Err(StakingError::NotValidatorOwner {
            caller: slasher,
            validator: addr(1)
        })
    );
    engine.reset_slashing_multiplier(addr(1), addr(1)).unwrap();
    assert_eq!(
        engine.registry().unwrap().validator(&addr(1)).unwrap().slashing.multiplier,
        Fraction::ONE
    );
}

#[test]
fn test_slashed_validator_is_paid_less() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(10));
    engine.host_mut().add_slasher(addr(900));
    engine.update_validator_score_from_signer(addr(1), Fraction::ONE).unwrap();
    engine.halve_slashing_multiplier(addr(900), addr(1)).unwrap();

    let payment = engine
        .distribute_epoch_payment_from_signer(addr(1), 1_000, Fraction::ONE)
        .unwrap();
    assert_eq!(
        payment,
        Outcome::Applied(EpochPayment {
            total: 500,
            validator_payment: 50,
            remainder: 450
        })
    );
    assert_eq!(engine.host().balance_of(addr(1)), 50);
}

#[test]
fn test_deregistration_lifecycle() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    lock_and_vote(&mut engine, addr(100), addr(1), 500);

    assert_eq!(
        engine.request_deregistration(addr(1)),
        Err(StakingError::RequirementDurationNotElapsed { ends_at: 1_000 })
    );
    engine.host_mut().set_timestamp(1_000);
    engine.request_deregistration(addr(1)).unwrap();
    engine.cancel_deregistration(addr(1)).unwrap();
    assert!(engine.deregister_all_validators_in_pending().unwrap().is_empty());

    engine.request_deregistration(addr(1)).unwrap();
    assert_eq!(engine.deregister_all_validators_in_pending().unwrap(), vec![addr(1)]);
    assert!(!engine.registry().unwrap().is_validator(&addr(1)));
    assert_eq!(engine.top_validators(10).unwrap(), Vec::<Address>::new());
    assert_eq!(
        engine.vote(addr(100), addr(1), 1, NO_HINT),
        Err(StakingError::ValidatorNotEligible(addr(1)))
    );

    // votes on a removed validator can still be withdrawn
    engine.revoke_pending(addr(100), addr(1), 500, NO_HINT, 0).unwrap();
    assert_eq!(engine.host().nonvoting_locked_gold(addr(100)), 500);
}

#[test]
fn test_locked_gold_requirement() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    let registry = engine.registry().unwrap();
    assert_eq!(registry.account_locked_gold_requirement(&addr(1)), REQUIREMENT);
    assert_eq!(registry.account_locked_gold_requirement(&addr(2)), 0);
    assert!(registry.meets_account_locked_gold_requirements(engine.host(), addr(1)));

    engine.host_mut().unlock(addr(1), 1).unwrap();
    let registry = engine.registry().unwrap();
    assert!(!registry.meets_account_locked_gold_requirements(engine.host(), addr(1)));
    assert_eq!(
        engine.distribute_epoch_payment_from_signer(addr(1), 1_000, Fraction::ONE),
        Ok(Outcome::NotApplicable)
    );
}

#[test]
fn test_key_update_validation_is_atomic() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    let events_before = engine.events().len();

    assert!(matches!(
        engine.update_ecdsa_public_key(addr(1), vec![0; 20]),
        Err(StakingError::InvalidKeyLength { .. })
    ));
    assert_eq!(
        engine.update_ecdsa_public_key(addr(2), vec![0; ECDSA_PUBLIC_KEY_LENGTH]),
        Err(StakingError::NotValidator(addr(2)))
    );
    assert_eq!(engine.events().len(), events_before);
}
