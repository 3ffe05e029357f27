use crate::error::{Outcome, Result};
use crate::fraction::Fraction;
use crate::host::{Address, Amount, Host};
use crate::staking::StakingEngine;
use crate::validators::{EpochPayment, ScoreUpdate, ValidatorRegistration};

pub trait ValidatorOperations {
    fn register_validator(&mut self, account: Address, registration: ValidatorRegistration) -> Result<()>;
    fn request_deregistration(&mut self, account: Address) -> Result<()>;
    fn cancel_deregistration(&mut self, account: Address) -> Result<()>;

    /// Finalizes every pending deregistration, returning the removed
    /// validators.
    fn deregister_all_validators_in_pending(&mut self) -> Result<Vec<Address>>;

    fn update_ecdsa_public_key(&mut self, account: Address, ecdsa_public_key: Vec<u8>) -> Result<()>;
    fn update_bls_public_key(
        &mut self,
        account: Address,
        bls_public_key: Vec<u8>,
        bls_g1_public_key: Vec<u8>,
        bls_pop: Vec<u8>,
    ) -> Result<()>;

    fn update_validator_score_from_signer(&mut self, signer: Address, uptime: Fraction) -> Result<Outcome<ScoreUpdate>>;
    fn distribute_epoch_payment_from_signer(
        &mut self,
        signer: Address,
        max_payment: Amount,
        total_scores: Fraction,
    ) -> Result<Outcome<EpochPayment>>;

    fn set_next_commission_update(&mut self, account: Address, commission: Fraction) -> Result<()>;
    fn update_commission(&mut self, account: Address) -> Result<Fraction>;

    fn halve_slashing_multiplier(&mut self, caller: Address, validator: Address) -> Result<Fraction>;
    /// Restores `validator`'s multiplier. `caller` must be the validator's
    /// account or its signer.
    fn reset_slashing_multiplier(&mut self, caller: Address, validator: Address) -> Result<()>;
}

impl<H: Host> ValidatorOperations for StakingEngine<H> {
    fn register_validator(&mut self, account: Address, registration: ValidatorRegistration) -> Result<()> {
        self.transact("register_validator", |state, host, events| {
            let now = host.timestamp();
            state
                .registry
                .register(&*host, &mut state.ledger, events, account, registration, now)
        })
    }

    fn request_deregistration(&mut self, account: Address) -> Result<()> {
        self.transact("request_deregistration", |state, host, events| {
            state
                .registry
                .request_deregistration(events, account, host.timestamp())
        })
    }

    fn cancel_deregistration(&mut self, account: Address) -> Result<()> {
        self.transact("cancel_deregistration", |state, _, events| {
            state.registry.cancel_deregistration(events, account)
        })
    }

    fn deregister_all_validators_in_pending(&mut self) -> Result<Vec<Address>> {
        self.transact("deregister_all_validators_in_pending", |state, _, events| {
            state.registry.deregister_all_pending(&mut state.ledger, events)
        })
    }

    fn update_ecdsa_public_key(&mut self, account: Address, ecdsa_public_key: Vec<u8>) -> Result<()> {
        self.transact("update_ecdsa_public_key", |state, _, events| {
            state
                .registry
                .update_ecdsa_public_key(events, account, ecdsa_public_key)
        })
    }

    fn update_bls_public_key(
        &mut self,
        account: Address,
        bls_public_key: Vec<u8>,
        bls_g1_public_key: Vec<u8>,
        bls_pop: Vec<u8>,
    ) -> Result<()> {
        self.transact("update_bls_public_key", |state, host, events| {
            state.registry.update_bls_public_key(
                &*host,
                events,
                account,
                bls_public_key,
                bls_g1_public_key,
                bls_pop,
            )
        })
    }

    fn update_validator_score_from_signer(&mut self, signer: Address, uptime: Fraction) -> Result<Outcome<ScoreUpdate>> {
        self.transact("update_validator_score_from_signer", |state, host, events| {
            state
                .registry
                .update_score_from_signer(&*host, events, signer, uptime)
        })
    }

    fn distribute_epoch_payment_from_signer(
        &mut self,
        signer: Address,
        max_payment: Amount,
        total_scores: Fraction,
    ) -> Result<Outcome<EpochPayment>> {
        self.transact("distribute_epoch_payment_from_signer", |state, host, events| {
            state
                .registry
                .distribute_epoch_payment_from_signer(host, events, signer, max_payment, total_scores)
        })
    }

    fn set_next_commission_update(&mut self, account: Address, commission: Fraction) -> Result<()> {
        self.transact("set_next_commission_update", |state, host, events| {
            state
                .registry
                .set_next_commission_update(events, account, commission, host.block_number())
        })
    }

    fn update_commission(&mut self, account: Address) -> Result<Fraction> {
        self.transact("update_commission", |state, host, events| {
            state
                .registry
                .update_commission(events, account, host.block_number())
        })
    }

    fn halve_slashing_multiplier(&mut self, caller: Address, validator: Address) -> Result<Fraction> {
        self.transact("halve_slashing_multiplier", |state, host, events| {
            let now = host.timestamp();
            state
                .registry
                .halve_slashing_multiplier(&*host, events, caller, validator, now)
        })
    }

    fn reset_slashing_multiplier(&mut self, caller: Address, validator: Address) -> Result<()> {
        self.transact("reset_slashing_multiplier", |state, host, events| {
            let now = host.timestamp();
            state
                .registry
                .reset_slashing_multiplier(&*host, events, caller, validator, now)
        })
    }
}
