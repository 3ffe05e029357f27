use pretty_assertions::assert_eq;

use super::*;
use crate::error::StakingError;
use crate::events::Event;
use crate::host::CollateralLedger;

#[test]
fn test_vote_signer_maps_to_account() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    let (account, signer) = (addr(100), addr(200));
    engine.host_mut().authorize_signer(account, signer);
    engine.host_mut().lock(account, 500);

    engine.vote(signer, addr(1), 300, NO_HINT).unwrap();

    let ledger = engine.ledger().unwrap();
    assert_eq!(ledger.pending_votes_for_validator_by_account(&addr(1), &account), 300);
    assert_eq!(ledger.pending_votes_for_validator_by_account(&addr(1), &signer), 0);
    assert_eq!(engine.host().nonvoting_locked_gold(account), 200);
    assert_eq!(
        engine.events().last(),
        Some(&Event::VoteCast {
            voter: account,
            validator: addr(1),
            value: 300
        })
    );
}

#[test]
fn test_activation_is_not_repeatable() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    lock_and_vote(&mut engine, addr(100), addr(1), 80);

    assert!(matches!(
        engine.activate(addr(100), addr(1)),
        Err(StakingError::PendingVoteEpochNotPassed { .. })
    ));
    next_epoch(&mut engine);
    engine.activate(addr(100), addr(1)).unwrap();
    assert_eq!(
        engine.activate(addr(100), addr(1)),
        Err(StakingError::NoPendingVotes)
    );
    assert_eq!(
        engine.ledger().unwrap().active_votes_for_validator_by_account(&addr(1), &addr(100)),
        80
    );
}

#[test]
fn test_activate_all_keeps_votes_from_current_epoch() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    lock_and_vote(&mut engine, addr(100), addr(1), 10);
    next_epoch(&mut engine);
    lock_and_vote(&mut engine, addr(101), addr(1), 20);

    assert_eq!(engine.activate_all(&[addr(1)]).unwrap(), 1);
    let ledger = engine.ledger().unwrap();
    assert_eq!(ledger.active_votes_for_validator(&addr(1)), 10);
    assert_eq!(ledger.pending_votes_for_validator(&addr(1)), 20);
    assert!(!ledger.has_activatable_pending_votes(&addr(101), &addr(1), 2));
}

#[test]
fn test_force_decrement_consumes_pending_before_active() {
    let mut engine = engine();
    let (a, b, voter) = (addr(1), addr(2), addr(100));
    register(&mut engine, a, pct(0));
    register(&mut engine, b, pct(0));
    lock_and_vote(&mut engine, voter, b, 60);
    next_epoch(&mut engine);
    engine.activate(voter, b).unwrap();
    lock_and_vote(&mut engine, voter, a, 40);

    let hints = [NO_HINT, NO_HINT];
    let indices = [0, 1];
    let events_before = engine.events().len();
    assert_eq!(
        engine.force_decrement_votes(voter, 150, &hints, &indices),
        Err(StakingError::InsufficientVotesToDecrement { remaining: 50 })
    );
    assert_eq!(engine.events().len(), events_before);
    assert_eq!(engine.ledger().unwrap().total_votes_by_account(&voter), 100);

    assert_eq!(engine.force_decrement_votes(voter, 70, &hints, &indices), Ok(70));
    let ledger = engine.ledger().unwrap();
    assert_eq!(ledger.pending_votes_for_validator_by_account(&a, &voter), 0);
    assert_eq!(ledger.active_votes_for_validator_by_account(&b, &voter), 30);
    assert_eq!(ledger.total_votes_by_account(&voter), 30);
    assert_eq!(ledger.validators_voted_for_by_account(&voter), &[b]);
    assert_eq!(ledger.ranking().value(&a), Some(0));
    assert_eq!(ledger.ranking().value(&b), Some(30));
    assert_eq!(engine.host().nonvoting_locked_gold(voter), 70);
}

#[test]
fn test_rewards_accrue_to_existing_units_only() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    lock_and_vote(&mut engine, addr(100), addr(1), 1_000);
    next_epoch(&mut engine);
    engine.activate(addr(100), addr(1)).unwrap();

    engine
        .distribute_epoch_voters_rewards(addr(1), 100, NO_HINT)
        .unwrap();
    lock_and_vote(&mut engine, addr(101), addr(1), 1_100);
    next_epoch(&mut engine);
    engine.activate(addr(101), addr(1)).unwrap();
    engine
        .distribute_epoch_voters_rewards(addr(1), 220, NO_HINT)
        .unwrap();

    let ledger = engine.ledger().unwrap();
    assert_eq!(ledger.active_votes_for_validator_by_account(&addr(1), &addr(100)), 1_210);
    assert_eq!(ledger.active_votes_for_validator_by_account(&addr(1), &addr(101)), 1_210);
    assert_eq!(ledger.active_votes(), 2_420);
    assert_eq!(ledger.ranking().value(&addr(1)), Some(2_420));

    // a zero reward is a no-op
    let events_before = engine.events().len();
    engine.distribute_epoch_voters_rewards(addr(1), 0, NO_HINT).unwrap();
    assert_eq!(engine.events().len(), events_before);
}

#[test]
fn test_revoking_everything_returns_collateral() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    register(&mut engine, addr(2), pct(0));
    let voter = addr(100);
    lock_and_vote(&mut engine, voter, addr(1), 300);
    lock_and_vote(&mut engine, voter, addr(2), 200);
    next_epoch(&mut engine);
    engine.activate(voter, addr(1)).unwrap();

    let index = engine.ledger().unwrap().voted_for_index(&voter, &addr(1)).unwrap();
    engine.revoke_all_active(voter, addr(1), NO_HINT, index).unwrap();
    let index = engine.ledger().unwrap().voted_for_index(&voter, &addr(2)).unwrap();
    engine.revoke_pending(voter, addr(2), 200, NO_HINT, index).unwrap();

    let ledger = engine.ledger().unwrap();
    assert_eq!(ledger.total_votes(), 0);
    assert!(ledger.validators_voted_for_by_account(&voter).is_empty());
    assert_eq!(engine.host().nonvoting_locked_gold(voter), 500);
    assert_eq!(
        engine.revoke_all_active(voter, addr(1), NO_HINT, 0),
        Err(StakingError::NoActiveVotes(addr(1)))
    );
}

#[test]
fn test_revoked_rewards_can_be_unlocked() {
    let mut engine = engine();
    register(&mut engine, addr(1), pct(0));
    let voter = addr(100);
    lock_and_vote(&mut engine, voter, addr(1), 100);
    next_epoch(&mut engine);
    engine.activate(voter, addr(1)).unwrap();
    engine.distribute_epoch_voters_rewards(addr(1), 50, NO_HINT).unwrap();

    assert_eq!(engine.revoke_all_active(voter, addr(1), NO_HINT, 0), Ok(150));
    assert_eq!(engine.host().nonvoting_locked_gold(voter), 150);
    assert_eq!(engine.host().total_locked_gold(voter), 150);
    engine.host_mut().unlock(voter, 150).unwrap();
    assert_eq!(engine.host().total_locked_gold(voter), 0);
}
