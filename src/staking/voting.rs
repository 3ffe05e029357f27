use crate::election::RankingHint;
use crate::error::Result;
use crate::host::{Address, Amount, Host};
use crate::staking::StakingEngine;

/// Vote casting, activation and revocation. Voters are identified by their
/// vote signer, which is mapped to the account the votes belong to.
pub trait VoteOperations {
    fn vote(&mut self, signer: Address, validator: Address, value: Amount, hint: RankingHint) -> Result<()>;

    /// Activates the signer's pending votes for `validator`, returning the
    /// units issued.
    fn activate(&mut self, signer: Address, validator: Address) -> Result<u128>;

    /// Activates every activatable pending vote for each of `validators`.
    fn activate_all(&mut self, validators: &[Address]) -> Result<usize>;

    fn revoke_pending(
        &mut self,
        signer: Address,
        validator: Address,
        value: Amount,
        hint: RankingHint,
        index: usize,
    ) -> Result<()>;

    fn revoke_active(
        &mut self,
        signer: Address,
        validator: Address,
        value: Amount,
        hint: RankingHint,
        index: usize,
    ) -> Result<()>;

    fn revoke_all_active(
        &mut self,
        signer: Address,
        validator: Address,
        hint: RankingHint,
        index: usize,
    ) -> Result<Amount>;

    /// Frees exactly `value` of `account`'s voting collateral or fails
    /// without changes.
    fn force_decrement_votes(
        &mut self,
        account: Address,
        value: Amount,
        hints: &[RankingHint],
        indices: &[usize],
    ) -> Result<Amount>;

    fn distribute_epoch_voters_rewards(&mut self, validator: Address, value: Amount, hint: RankingHint) -> Result<()>;
}

impl<H: Host> VoteOperations for StakingEngine<H> {
    fn vote(&mut self, signer: Address, validator: Address, value: Amount, hint: RankingHint) -> Result<()> {
        let voter = self.host().vote_signer_to_account(signer);
        let epoch = self.host().epoch_number();
        self.transact_votes("vote", &[validator], &[voter], |ledger, collateral, events| {
            ledger.vote(collateral, events, voter, validator, value, hint, epoch)
        })
    }

    fn activate(&mut self, signer: Address, validator: Address) -> Result<u128> {
        let voter = self.host().vote_signer_to_account(signer);
        let epoch = self.host().epoch_number();
        self.transact_votes("activate", &[validator], &[voter], |ledger, _, events| {
            ledger.activate(events, voter, validator, epoch)
        })
    }

    fn activate_all(&mut self, validators: &[Address]) -> Result<usize> {
        let epoch = self.host().epoch_number();
        self.transact_votes("activate_all", validators, &[], |ledger, _, events| {
            ledger.activate_all(events, validators, epoch)
        })
    }

    fn revoke_pending(
        &mut self,
        signer: Address,
        validator: Address,
        value: Amount,
        hint: RankingHint,
        index: usize,
    ) -> Result<()> {
        let voter = self.host().vote_signer_to_account(signer);
        self.transact_votes("revoke_pending", &[validator], &[voter], |ledger, collateral, events| {
            ledger.revoke_pending(collateral, events, voter, validator, value, hint, index)
        })
    }

    fn revoke_active(
        &mut self,
        signer: Address,
        validator: Address,
        value: Amount,
        hint: RankingHint,
        index: usize,
    ) -> Result<()> {
        let voter = self.host().vote_signer_to_account(signer);
        self.transact_votes("revoke_active", &[validator], &[voter], |ledger, collateral, events| {
            ledger.revoke_active(collateral, events, voter, validator, value, hint, index)
        })
    }

    fn revoke_all_active(
        &mut self,
        signer: Address,
        validator: Address,
        hint: RankingHint,
        index: usize,
    ) -> Result<Amount> {
        let voter = self.host().vote_signer_to_account(signer);
        self.transact_votes("revoke_all_active", &[validator], &[voter], |ledger, collateral, events| {
            ledger.revoke_all_active(collateral, events, voter, validator, hint, index)
        })
    }

    fn force_decrement_votes(
        &mut self,
        account: Address,
        value: Amount,
        hints: &[RankingHint],
        indices: &[usize],
    ) -> Result<Amount> {
        let backed = self.ledger()?.validators_voted_for_by_account(&account).to_vec();
        self.transact_votes("force_decrement_votes", &backed, &[account], |ledger, collateral, events| {
            ledger.force_decrement_votes(collateral, events, account, value, hints, indices)
        })
    }

    fn distribute_epoch_voters_rewards(&mut self, validator: Address, value: Amount, hint: RankingHint) -> Result<()> {
        self.transact_votes("distribute_epoch_voters_rewards", &[validator], &[], |ledger, _, events| {
            ledger.distribute_epoch_voters_rewards(events, validator, value, hint)
        })
    }
}
