//! Pending and active vote accounting.
//!
//! Pending votes are plain amounts stamped with the epoch they were cast in.
//! Active votes are held as units of a validator's active pool: rewards grow
//! the pool total without minting units, so every unit redeems for more
//! votes over time and no per-voter bookkeeping is needed on distribution.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::election::ranking::{RankingHint, SortedRanking};
use crate::election::ElectionParameters;
use crate::error::{Result, StakingError};
use crate::events::{Event, EventLog};
use crate::fraction::mul_div;
use crate::host::{Address, Amount, CollateralLedger};

/// Units minted per vote when a validator's active pool is empty.
pub const UNIT_PRECISION_FACTOR: u128 = 10_000_000_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVote {
    pub value: Amount,
    /// Epoch of the latest increment.
    pub epoch: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVotes {
    pub total: Amount,
    pub by_account: BTreeMap<Address, PendingVote>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveVotes {
    pub total: Amount,
    pub total_units: u128,
    pub units_by_account: BTreeMap<Address, u128>,
}

impl ActiveVotes {
    fn votes_to_units(&self, value: Amount) -> Result<u128> {
        if self.total_units == 0 {
            return value
                .checked_mul(UNIT_PRECISION_FACTOR)
                .ok_or(StakingError::Overflow);
        }
        mul_div(value, self.total_units, self.total)
    }

    fn units_to_votes(&self, units: u128) -> Amount {
        if self.total_units == 0 {
            return 0;
        }
        // units never exceed total_units, so the quotient is bounded by total
        mul_div(self.total, units.min(self.total_units), self.total_units).unwrap_or(self.total)
    }

    fn units_of(&self, voter: &Address) -> u128 {
        self.units_by_account.get(voter).copied().unwrap_or(0)
    }
}

/// Entries of a [`VoteLedger`] captured before an operation, enough to put
/// back everything the operation could write for the named validators and
/// voters.
#[derive(Clone, Debug)]
pub struct LedgerCheckpoint {
    pending_total: Amount,
    active_total: Amount,
    validators: Vec<ValidatorEntries>,
    voters: Vec<(Address, Option<Vec<Address>>)>,
}

#[derive(Clone, Debug)]
struct ValidatorEntries {
    validator: Address,
    pending: Option<PendingVotes>,
    active: Option<ActiveVotes>,
    rank: Option<Amount>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoteLedger {
    parameters: ElectionParameters,
    pending: BTreeMap<Address, PendingVotes>,
    pending_total: Amount,
    active: BTreeMap<Address, ActiveVotes>,
    active_total: Amount,
    eligible: SortedRanking,
    voted_for: BTreeMap<Address, Vec<Address>>,
}

impl VoteLedger {
    pub fn new(parameters: ElectionParameters) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn parameters(&self) -> &ElectionParameters {
        &self.parameters
    }

    /// Captures the entries of `validators` and `voters`. Cost is bounded by
    /// the votes held for those validators, not by the size of the ledger.
    pub fn checkpoint(&self, validators: &[Address], voters: &[Address]) -> LedgerCheckpoint {
        LedgerCheckpoint {
            pending_total: self.pending_total,
            active_total: self.active_total,
            validators: validators
                .iter()
                .map(|validator| ValidatorEntries {
                    validator: *validator,
                    pending: self.pending.get(validator).cloned(),
                    active: self.active.get(validator).cloned(),
                    rank: self.eligible.value(validator),
                })
                .collect(),
            voters: voters
                .iter()
                .map(|voter| (*voter, self.voted_for.get(voter).cloned()))
                .collect(),
        }
    }

    /// Restores the entries captured by [`checkpoint`](Self::checkpoint).
    /// Anything outside the captured validators and voters is left alone.
    pub fn rollback(&mut self, checkpoint: LedgerCheckpoint) {
        self.pending_total = checkpoint.pending_total;
        self.active_total = checkpoint.active_total;
        for entries in checkpoint.validators {
            match entries.pending {
                Some(pending) => self.pending.insert(entries.validator, pending),
                None => self.pending.remove(&entries.validator),
            };
            match entries.active {
                Some(active) => self.active.insert(entries.validator, active),
                None => self.active.remove(&entries.validator),
            };
            self.eligible.restore_entry(entries.validator, entries.rank);
        }
        for (voter, backed) in checkpoint.voters {
            match backed {
                Some(backed) => self.voted_for.insert(voter, backed),
                None => self.voted_for.remove(&voter),
            };
        }
    }

    /// Casts `value` of the voter's nonvoting collateral as pending votes.
    #[allow(clippy::too_many_arguments)]
    pub fn vote<C: CollateralLedger + ?Sized>(
        &mut self,
        collateral: &mut C,
        events: &mut EventLog,
        voter: Address,
        validator: Address,
        value: Amount,
        hint: RankingHint,
        current_epoch: u64,
    ) -> Result<()> {
        if !self.eligible.contains(&validator) {
            return Err(StakingError::ValidatorNotEligible(validator));
        }
        if value == 0 {
            return Err(StakingError::ZeroValue);
        }
        let backed = self.validators_voted_for_by_account(&voter);
        let already_backed = backed.contains(&validator);
        if !already_backed && backed.len() >= self.parameters.max_num_validators_voted_for {
            return Err(StakingError::TooManyValidatorsVotedFor {
                max: self.parameters.max_num_validators_voted_for,
            });
        }
        let available = collateral.nonvoting_locked_gold(voter);
        if value > available {
            return Err(StakingError::InsufficientNonvotingBalance {
                requested: value,
                available,
            });
        }

        self.increment_total(validator, value, hint)?;
        self.increment_pending(validator, voter, value, current_epoch)?;
        if !already_backed {
            self.voted_for.entry(voter).or_default().push(validator);
        }
        collateral.decrement_nonvoting_balance(voter, value)?;

        info!(
            "Vote cast by {} for {}: {} (epoch {})",
            hex::encode(voter.as_bytes()),
            hex::encode(validator.as_bytes()),
            value,
            current_epoch
        );
        events.record(Event::VoteCast {
            voter,
            validator,
            value,
        });
        Ok(())
    }

    /// Converts the voter's whole pending vote for `validator` into active
    /// units. Only votes cast before `current_epoch` can be activated.
    pub fn activate(
        &mut self,
        events: &mut EventLog,
        voter: Address,
        validator: Address,
        current_epoch: u64,
    ) -> Result<u128> {
        let pending = self
            .pending_vote(&validator, &voter)
            .filter(|vote| vote.value > 0)
            .ok_or(StakingError::NoPendingVotes)?;
        if pending.epoch >= current_epoch {
            return Err(StakingError::PendingVoteEpochNotPassed {
                cast: pending.epoch,
                current: current_epoch,
            });
        }

        self.decrement_pending(validator, voter, pending.value)?;
        let units = self.increment_active(validator, voter, pending.value)?;

        info!(
            "Activated {} votes of {} for {} ({} units)",
            pending.value,
            hex::encode(voter.as_bytes()),
            hex::encode(validator.as_bytes()),
            units
        );
        events.record(Event::VoteActivated {
            voter,
            validator,
            value: pending.value,
            units,
        });
        Ok(units)
    }

    /// Activates every activatable pending vote for each of `validators`.
    /// Returns the number of activations performed.
    pub fn activate_all(
        &mut self,
        events: &mut EventLog,
        validators: &[Address],
        current_epoch: u64,
    ) -> Result<usize> {
        let mut activated = 0;
        for validator in validators {
            let voters: Vec<Address> = self
                .pending
                .get(validator)
                .map(|pending| {
                    pending
                        .by_account
                        .iter()
                        .filter(|(_, vote)| vote.value > 0 && vote.epoch < current_epoch)
                        .map(|(voter, _)| *voter)
                        .collect()
                })
                .unwrap_or_default();
            for voter in voters {
                self.activate(events, voter, *validator, current_epoch)?;
                activated += 1;
            }
        }
        Ok(activated)
    }

    /// Returns pending votes to the voter's nonvoting balance. `index` must
    /// point at `validator` in the voter's backed list; it is only consulted
    /// when the revocation leaves nothing behind for that validator.
    #[allow(clippy::too_many_arguments)]
    pub fn revoke_pending<C: CollateralLedger + ?Sized>(
        &mut self,
        collateral: &mut C,
        events: &mut EventLog,
        voter: Address,
        validator: Address,
        value: Amount,
        hint: RankingHint,
        index: usize,
    ) -> Result<()> {
        if value == 0 {
            return Err(StakingError::ZeroValue);
        }
        let pending = self.pending_votes_for_validator_by_account(&validator, &voter);
        if value > pending {
            return Err(StakingError::RevokeExceedsPending {
                requested: value,
                available: pending,
            });
        }
        let emptied =
            pending - value == 0 && self.active_votes_for_validator_by_account(&validator, &voter) == 0;
        if emptied {
            self.check_voted_for_index(&voter, &validator, index)?;
        }

        self.decrement_total(validator, value, hint)?;
        self.decrement_pending(validator, voter, value)?;
        collateral.increment_nonvoting_balance(voter, value)?;
        if emptied {
            self.remove_voted_for(&voter, index);
        }

        info!(
            "Revoked {} pending votes of {} for {}",
            value,
            hex::encode(voter.as_bytes()),
            hex::encode(validator.as_bytes())
        );
        events.record(Event::PendingVoteRevoked {
            voter,
            validator,
            value,
        });
        Ok(())
    }

    /// Redeems active votes worth `value`. Revoking the voter's whole active
    /// balance burns exactly the stored units so no dust is left behind.
    #[allow(clippy::too_many_arguments)]
    pub fn revoke_active<C: CollateralLedger + ?Sized>(
        &mut self,
        collateral: &mut C,
        events: &mut EventLog,
        voter: Address,
        validator: Address,
        value: Amount,
        hint: RankingHint,
        index: usize,
    ) -> Result<()> {
        if value == 0 {
            return Err(StakingError::ZeroValue);
        }
        let active = self.active_votes_for_validator_by_account(&validator, &voter);
        if value > active {
            return Err(StakingError::RevokeExceedsActive {
                requested: value,
                available: active,
            });
        }
        let emptied =
            active - value == 0 && self.pending_votes_for_validator_by_account(&validator, &voter) == 0;
        if emptied {
            self.check_voted_for_index(&voter, &validator, index)?;
        }

        self.decrement_total(validator, value, hint)?;
        let units = self.decrement_active(validator, voter, value, value == active)?;
        collateral.increment_nonvoting_balance(voter, value)?;
        if emptied {
            self.remove_voted_for(&voter, index);
        }

        info!(
            "Revoked {} active votes ({} units) of {} for {}",
            value,
            units,
            hex::encode(voter.as_bytes()),
            hex::encode(validator.as_bytes())
        );
        events.record(Event::ActiveVoteRevoked {
            voter,
            validator,
            value,
            units,
        });
        Ok(())
    }

    pub fn revoke_all_active<C: CollateralLedger + ?Sized>(
        &mut self,
        collateral: &mut C,
        events: &mut EventLog,
        voter: Address,
        validator: Address,
        hint: RankingHint,
        index: usize,
    ) -> Result<Amount> {
        let active = self.active_votes_for_validator_by_account(&validator, &voter);
        if active == 0 {
            return Err(StakingError::NoActiveVotes(validator));
        }
        self.revoke_active(collateral, events, voter, validator, active, hint, index)?;
        Ok(active)
    }

    /// Revokes exactly `value` of the voter's votes, pending before active,
    /// walking the backed validators from the most recently added. `hints`
    /// and `indices` are positional over the voter's backed list.
    ///
    /// Fails without touching state when the voter holds fewer votes than
    /// `value`.
    pub fn force_decrement_votes<C: CollateralLedger + ?Sized>(
        &mut self,
        collateral: &mut C,
        events: &mut EventLog,
        voter: Address,
        value: Amount,
        hints: &[RankingHint],
        indices: &[usize],
    ) -> Result<Amount> {
        if value == 0 {
            return Err(StakingError::ZeroValue);
        }
        let backed = self.validators_voted_for_by_account(&voter).to_vec();
        if hints.len() > backed.len() || hints.len() != indices.len() {
            return Err(StakingError::InputLengthMismatch);
        }
        let held = self.total_votes_by_account(&voter);
        if held < value {
            return Err(StakingError::InsufficientVotesToDecrement {
                remaining: value - held,
            });
        }

        let mut remaining = value;
        for position in (0..backed.len()).rev() {
            let hint = *hints.get(position).ok_or(StakingError::InputLengthMismatch)?;
            let index = *indices.get(position).ok_or(StakingError::InputLengthMismatch)?;
            let decremented = self.decrement_votes(
                collateral,
                events,
                voter,
                backed[position],
                remaining,
                hint,
                index,
            )?;
            remaining -= decremented;
            if remaining == 0 {
                break;
            }
        }
        if remaining != 0 {
            return Err(StakingError::InsufficientVotesToDecrement { remaining });
        }
        Ok(value)
    }

    #[allow(clippy::too_many_arguments)]
    fn decrement_votes<C: CollateralLedger + ?Sized>(
        &mut self,
        collateral: &mut C,
        events: &mut EventLog,
        voter: Address,
        validator: Address,
        max_value: Amount,
        hint: RankingHint,
        index: usize,
    ) -> Result<Amount> {
        let mut remaining = max_value;
        let pending = self.pending_votes_for_validator_by_account(&validator, &voter);
        if pending > 0 {
            let value = remaining.min(pending);
            self.revoke_pending(collateral, events, voter, validator, value, hint, index)?;
            remaining -= value;
        }
        if remaining > 0 {
            let active = self.active_votes_for_validator_by_account(&validator, &voter);
            if active > 0 {
                let value = remaining.min(active);
                self.revoke_active(collateral, events, voter, validator, value, hint, index)?;
                remaining -= value;
            }
        }
        Ok(max_value - remaining)
    }

    /// Grows the validator's active pool by `value` without minting units.
    pub fn distribute_epoch_voters_rewards(
        &mut self,
        events: &mut EventLog,
        validator: Address,
        value: Amount,
        hint: RankingHint,
    ) -> Result<()> {
        if value == 0 {
            return Ok(());
        }
        let has_units = self
            .active
            .get(&validator)
            .map(|active| active.total_units > 0)
            .unwrap_or(false);
        if !has_units {
            return Err(StakingError::NoActiveVotes(validator));
        }
        let active_total = self
            .active_total
            .checked_add(value)
            .ok_or(StakingError::Overflow)?;

        self.increment_total(validator, value, hint)?;
        if let Some(active) = self.active.get_mut(&validator) {
            active.total = active.total.checked_add(value).ok_or(StakingError::Overflow)?;
        }
        self.active_total = active_total;

        info!(
            "Distributed {} epoch rewards to voters of {}",
            value,
            hex::encode(validator.as_bytes())
        );
        events.record(Event::EpochRewardsDistributedToVoters { validator, value });
        Ok(())
    }

    /// Admits a validator to the ranking at its current vote total.
    pub fn mark_eligible(
        &mut self,
        events: &mut EventLog,
        validator: Address,
        hint: RankingHint,
    ) -> Result<()> {
        if self.eligible.contains(&validator) {
            return Err(StakingError::AlreadyEligible(validator));
        }
        let total = self.total_votes_for_validator(&validator);
        self.eligible.insert(validator, total, hint)?;
        events.record(Event::ValidatorMarkedEligible { validator });
        Ok(())
    }

    pub fn mark_ineligible(&mut self, events: &mut EventLog, validator: Address) -> Result<()> {
        if self.eligible.contains(&validator) {
            self.eligible.remove(&validator)?;
            events.record(Event::ValidatorMarkedIneligible { validator });
        }
        Ok(())
    }

    fn increment_total(&mut self, validator: Address, value: Amount, hint: RankingHint) -> Result<()> {
        if let Some(current) = self.eligible.value(&validator) {
            let updated = current.checked_add(value).ok_or(StakingError::Overflow)?;
            self.eligible.update(validator, updated, hint)?;
        }
        Ok(())
    }

    fn decrement_total(&mut self, validator: Address, value: Amount, hint: RankingHint) -> Result<()> {
        if let Some(current) = self.eligible.value(&validator) {
            let updated = current.checked_sub(value).ok_or(StakingError::Underflow)?;
            self.eligible.update(validator, updated, hint)?;
        }
        Ok(())
    }

    fn increment_pending(
        &mut self,
        validator: Address,
        voter: Address,
        value: Amount,
        epoch: u64,
    ) -> Result<()> {
        let pending_total = self
            .pending_total
            .checked_add(value)
            .ok_or(StakingError::Overflow)?;
        let pending = self.pending.entry(validator).or_default();
        pending.total = pending.total.checked_add(value).ok_or(StakingError::Overflow)?;
        let vote = pending.by_account.entry(voter).or_default();
        vote.value = vote.value.checked_add(value).ok_or(StakingError::Overflow)?;
        vote.epoch = epoch;
        self.pending_total = pending_total;
        Ok(())
    }

    fn decrement_pending(&mut self, validator: Address, voter: Address, value: Amount) -> Result<()> {
        let pending_total = self
            .pending_total
            .checked_sub(value)
            .ok_or(StakingError::Underflow)?;
        let pending = self
            .pending
            .get_mut(&validator)
            .ok_or(StakingError::NoPendingVotes)?;
        let vote = pending
            .by_account
            .get_mut(&voter)
            .ok_or(StakingError::NoPendingVotes)?;
        vote.value = vote.value.checked_sub(value).ok_or(StakingError::Underflow)?;
        if vote.value == 0 {
            pending.by_account.remove(&voter);
        }
        pending.total = pending.total.checked_sub(value).ok_or(StakingError::Underflow)?;
        if pending.total == 0 && pending.by_account.is_empty() {
            self.pending.remove(&validator);
        }
        self.pending_total = pending_total;
        Ok(())
    }

    fn increment_active(&mut self, validator: Address, voter: Address, value: Amount) -> Result<u128> {
        let active_total = self
            .active_total
            .checked_add(value)
            .ok_or(StakingError::Overflow)?;
        let active = self.active.entry(validator).or_default();
        let units = active.votes_to_units(value)?;
        active.total = active.total.checked_add(value).ok_or(StakingError::Overflow)?;
        active.total_units = active
            .total_units
            .checked_add(units)
            .ok_or(StakingError::Overflow)?;
        let held = active.units_by_account.entry(voter).or_insert(0);
        *held = held.checked_add(units).ok_or(StakingError::Overflow)?;
        self.active_total = active_total;
        Ok(units)
    }

    fn decrement_active(
        &mut self,
        validator: Address,
        voter: Address,
        value: Amount,
        full_balance: bool,
    ) -> Result<u128> {
        let active_total = self
            .active_total
            .checked_sub(value)
            .ok_or(StakingError::Underflow)?;
        let active = self
            .active
            .get_mut(&validator)
            .ok_or(StakingError::NoActiveVotes(validator))?;
        let held = active.units_of(&voter);
        let units = if full_balance {
            held
        } else {
            active.votes_to_units(value)?
        };
        let remaining_units = held.checked_sub(units).ok_or(StakingError::Underflow)?;
        active.total = active.total.checked_sub(value).ok_or(StakingError::Underflow)?;
        active.total_units = active
            .total_units
            .checked_sub(units)
            .ok_or(StakingError::Underflow)?;
        if remaining_units == 0 {
            active.units_by_account.remove(&voter);
        } else {
            active.units_by_account.insert(voter, remaining_units);
        }
        if active.total == 0 && active.total_units == 0 {
            self.active.remove(&validator);
        }
        self.active_total = active_total;
        Ok(units)
    }

    fn check_voted_for_index(&self, voter: &Address, validator: &Address, index: usize) -> Result<()> {
        match self.voted_for.get(voter).and_then(|backed| backed.get(index)) {
            Some(found) if found == validator => Ok(()),
            _ => Err(StakingError::BadIndex { index }),
        }
    }

    fn remove_voted_for(&mut self, voter: &Address, index: usize) {
        if let Some(backed) = self.voted_for.get_mut(voter) {
            backed.swap_remove(index);
            if backed.is_empty() {
                self.voted_for.remove(voter);
            }
        }
    }

    pub fn pending_vote(&self, validator: &Address, voter: &Address) -> Option<PendingVote> {
        self.pending
            .get(validator)
            .and_then(|pending| pending.by_account.get(voter))
            .copied()
    }

    pub fn pending_votes_for_validator_by_account(&self, validator: &Address, voter: &Address) -> Amount {
        self.pending_vote(validator, voter)
            .map(|vote| vote.value)
            .unwrap_or(0)
    }

    pub fn active_votes_for_validator_by_account(&self, validator: &Address, voter: &Address) -> Amount {
        self.active
            .get(validator)
            .map(|active| active.units_to_votes(active.units_of(voter)))
            .unwrap_or(0)
    }

    pub fn total_votes_for_validator_by_account(&self, validator: &Address, voter: &Address) -> Amount {
        self.pending_votes_for_validator_by_account(validator, voter)
            .saturating_add(self.active_votes_for_validator_by_account(validator, voter))
    }

    /// Pending plus active votes across every validator the voter backs.
    pub fn total_votes_by_account(&self, voter: &Address) -> Amount {
        self.validators_voted_for_by_account(voter)
            .iter()
            .map(|validator| self.total_votes_for_validator_by_account(validator, voter))
            .fold(0, Amount::saturating_add)
    }

    pub fn pending_votes_by_account(&self, voter: &Address) -> Amount {
        self.validators_voted_for_by_account(voter)
            .iter()
            .map(|validator| self.pending_votes_for_validator_by_account(validator, voter))
            .fold(0, Amount::saturating_add)
    }

    pub fn active_votes_by_account(&self, voter: &Address) -> Amount {
        self.validators_voted_for_by_account(voter)
            .iter()
            .map(|validator| self.active_votes_for_validator_by_account(validator, voter))
            .fold(0, Amount::saturating_add)
    }

    pub fn pending_votes_for_validator(&self, validator: &Address) -> Amount {
        self.pending.get(validator).map(|pending| pending.total).unwrap_or(0)
    }

    pub fn active_votes_for_validator(&self, validator: &Address) -> Amount {
        self.active.get(validator).map(|active| active.total).unwrap_or(0)
    }

    pub fn total_votes_for_validator(&self, validator: &Address) -> Amount {
        self.pending_votes_for_validator(validator)
            .saturating_add(self.active_votes_for_validator(validator))
    }

    pub fn active_vote_units_for_validator(&self, validator: &Address) -> u128 {
        self.active.get(validator).map(|active| active.total_units).unwrap_or(0)
    }

    pub fn active_vote_units_for_validator_by_account(&self, validator: &Address, voter: &Address) -> u128 {
        self.active
            .get(validator)
            .map(|active| active.units_of(voter))
            .unwrap_or(0)
    }

    pub fn pending_votes(&self) -> Amount {
        self.pending_total
    }

    pub fn active_votes(&self) -> Amount {
        self.active_total
    }

    /// Pending plus active votes across the whole system.
    pub fn total_votes(&self) -> Amount {
        self.pending_total.saturating_add(self.active_total)
    }

    pub fn validators_voted_for_by_account(&self, voter: &Address) -> &[Address] {
        self.voted_for.get(voter).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of `validator` in the voter's backed list, for revocations.
    pub fn voted_for_index(&self, voter: &Address, validator: &Address) -> Option<usize> {
        self.validators_voted_for_by_account(voter)
            .iter()
            .position(|backed| backed == validator)
    }

    pub fn has_activatable_pending_votes(&self, voter: &Address, validator: &Address, current_epoch: u64) -> bool {
        self.pending_vote(validator, voter)
            .map(|vote| vote.value > 0 && vote.epoch < current_epoch)
            .unwrap_or(false)
    }

    /// Validators holding any pending votes.
    pub fn validators_with_pending_votes(&self) -> Vec<Address> {
        self.pending.keys().copied().collect()
    }

    pub fn ranking(&self) -> &SortedRanking {
        &self.eligible
    }

    pub fn is_eligible(&self, validator: &Address) -> bool {
        self.eligible.contains(validator)
    }

    pub fn eligible_validators(&self) -> Vec<Address> {
        self.eligible.keys()
    }

    pub fn total_votes_for_eligible_validators(&self) -> (Vec<Address>, Vec<Amount>) {
        self.eligible.elements()
    }
}
