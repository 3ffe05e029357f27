use pretty_assertions::assert_eq;

use super::*;
use crate::error::{ErrorKind, StakingError};
use crate::host::CollateralLedger;

#[test]
fn test_operations_require_initialization() {
    let mut engine = StakingEngine::new(InMemoryHost::new());
    assert!(!engine.is_initialized());
    assert_eq!(
        engine.vote(addr(1), addr(2), 10, NO_HINT),
        Err(StakingError::NotInitialized)
    );
    assert!(engine.registry().is_err());
    assert!(engine.snapshot().is_err());
}

#[test]
fn test_initialize_only_once() {
    let mut engine = engine();
    assert_eq!(
        engine.initialize(test_parameters()),
        Err(StakingError::AlreadyInitialized)
    );

    let mut parameters = test_parameters();
    parameters.election.min_electable_validators = 0;
    let mut fresh = StakingEngine::new(InMemoryHost::new());
    assert!(matches!(
        fresh.initialize(parameters),
        Err(StakingError::InvalidParameter(_))
    ));
    assert!(!fresh.is_initialized());
}

#[test]
fn test_failed_operation_restores_state_host_and_events() {
    let mut engine = engine();
    let (a, b, voter) = (addr(1), addr(2), addr(100));
    register(&mut engine, a, pct(0));
    register(&mut engine, b, pct(0));

    lock_and_vote(&mut engine, voter, b, 60);
    next_epoch(&mut engine);
    engine.activate(voter, b).unwrap();
    lock_and_vote(&mut engine, voter, a, 40);
    let events_before = engine.events().len();
    let balance_before = engine.host().locked_balance(voter);

    // A's pending votes are revoked first, then the bad index for B fails
    let result = engine.force_decrement_votes(voter, 100, &[NO_HINT, NO_HINT], &[5, 1]);
    assert_eq!(result, Err(StakingError::BadIndex { index: 5 }));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Invariant);

    let ledger = engine.ledger().unwrap();
    assert_eq!(ledger.pending_votes_for_validator_by_account(&a, &voter), 40);
    assert_eq!(ledger.active_votes_for_validator_by_account(&b, &voter), 60);
    assert_eq!(ledger.validators_voted_for_by_account(&voter), &[b, a]);
    assert_eq!(ledger.ranking().value(&a), Some(40));
    assert_eq!(engine.host().nonvoting_locked_gold(voter), 0);
    assert_eq!(engine.host().locked_balance(voter), balance_before);
    assert_eq!(engine.events().len(), events_before);
    assert!(!engine.guard().is_entered());
}

#[test]
fn test_reentrant_call_is_rejected() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    engine.host_mut().lock(addr(100), 50);

    let token = engine.guard().acquire().unwrap();
    assert_eq!(
        engine.vote(addr(100), addr(1), 50, NO_HINT),
        Err(StakingError::Reentrancy)
    );
    drop(token);
    engine.vote(addr(100), addr(1), 50, NO_HINT).unwrap();
}

#[test]
fn test_snapshot_restores_into_fresh_engine() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(5));
    lock_and_vote(&mut engine, addr(100), addr(1), 250);
    next_epoch(&mut engine);
    engine.activate(addr(100), addr(1)).unwrap();

    let snapshot = engine.snapshot().unwrap();
    let mut restored = StakingEngine::new(engine.host().clone());
    restored.restore(&snapshot).unwrap();

    let ledger = restored.ledger().unwrap();
    assert_eq!(ledger.active_votes_for_validator(&addr(1)), 250);
    assert_eq!(
        ledger.active_vote_units_for_validator_by_account(&addr(1), &addr(100)),
        engine
            .ledger()
            .unwrap()
            .active_vote_units_for_validator_by_account(&addr(1), &addr(100))
    );
    assert_eq!(restored.registry().unwrap().registered_validators(), vec![addr(1)]);
    assert_eq!(restored.parameters().unwrap(), &test_parameters());

    // the restored engine keeps working
    restored.revoke_all_active(addr(100), addr(1), NO_HINT, 0).unwrap();
    assert_eq!(restored.host().nonvoting_locked_gold(addr(100)), 250);

    assert!(matches!(
        restored.restore(&[1, 2, 3]),
        Err(StakingError::Snapshot(_))
    ));
}
