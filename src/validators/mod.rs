//! Validator identity, keys, collateral requirements and epoch payments.
//!
//! Score, commission and slashing transitions live in their own files as
//! further `impl ValidatorRegistry` blocks.

pub mod commission;
pub mod score;
pub mod slashing;
pub mod types;

pub use types::{
    EpochPayment, LockedGoldRequirements, PendingCommission, PublicKeys, ScoreParameters,
    ScoreUpdate, SlashingInfo, Validator, ValidatorParameters, ValidatorRegistration,
    BLS_G1_PUBLIC_KEY_LENGTH, BLS_POP_LENGTH, BLS_PUBLIC_KEY_LENGTH, ECDSA_PUBLIC_KEY_LENGTH,
};

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::election::{RankingHint, VoteLedger};
use crate::error::{Outcome, Result, StakingError};
use crate::events::{Event, EventLog};
use crate::fraction::Fraction;
use crate::host::{AccountIdentity, Address, Amount, BlsVerifier, CollateralLedger, MintableToken};

fn check_length(what: &'static str, key: &[u8], expected: usize) -> Result<()> {
    if key.len() != expected {
        return Err(StakingError::InvalidKeyLength {
            what,
            expected,
            actual: key.len(),
        });
    }
    Ok(())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidatorRegistry {
    parameters: ValidatorParameters,
    validators: BTreeMap<Address, Validator>,
    /// Account to the timestamp of its deregistration request.
    pending_deregistrations: BTreeMap<Address, u64>,
}

impl ValidatorRegistry {
    pub fn new(parameters: ValidatorParameters) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn parameters(&self) -> &ValidatorParameters {
        &self.parameters
    }

    /// Registers `account` and admits it to the vote ranking.
    #[allow(clippy::too_many_arguments)]
    pub fn register<H>(
        &mut self,
        host: &H,
        ledger: &mut VoteLedger,
        events: &mut EventLog,
        account: Address,
        registration: ValidatorRegistration,
        now: u64,
    ) -> Result<()>
    where
        H: AccountIdentity + CollateralLedger + BlsVerifier + ?Sized,
    {
        if registration.commission > Fraction::ONE {
            return Err(StakingError::CommissionTooLarge);
        }
        check_length("ECDSA public key", &registration.ecdsa_public_key, ECDSA_PUBLIC_KEY_LENGTH)?;
        check_length("BLS public key", &registration.bls_public_key, BLS_PUBLIC_KEY_LENGTH)?;
        check_length("BLS G1 public key", &registration.bls_g1_public_key, BLS_G1_PUBLIC_KEY_LENGTH)?;
        check_length("BLS proof of possession", &registration.bls_pop, BLS_POP_LENGTH)?;
        if !host.check_proof_of_possession_g1(
            account,
            &registration.bls_public_key,
            &registration.bls_g1_public_key,
            &registration.bls_pop,
        ) {
            return Err(StakingError::InvalidProofOfPossession);
        }
        if self.is_validator(&account) {
            return Err(StakingError::AlreadyRegistered(account));
        }
        let required = self.parameters.locked_gold_requirements.value;
        let available = host.total_locked_gold(account);
        if available < required {
            return Err(StakingError::InsufficientLockedGold { required, available });
        }

        let signer = host.validator_signer(account);
        ledger.mark_eligible(events, account, RankingHint::default())?;
        self.validators.insert(
            account,
            Validator {
                public_keys: PublicKeys {
                    ecdsa: registration.ecdsa_public_key,
                    bls: registration.bls_public_key,
                    bls_g1: registration.bls_g1_public_key,
                },
                signer,
                score: Fraction::ZERO,
                commission: registration.commission,
                next_commission: None,
                slashing: SlashingInfo::default(),
                registered_at: now,
            },
        );

        info!(
            "Validator registered: {} (signer {}, commission {})",
            hex::encode(account.as_bytes()),
            hex::encode(signer.as_bytes()),
            registration.commission
        );
        events.record(Event::ValidatorRegistered {
            validator: account,
            signer,
        });
        Ok(())
    }

    /// Queues the validator for removal at the next finalization.
    pub fn request_deregistration(&mut self, events: &mut EventLog, account: Address, now: u64) -> Result<()> {
        let validator = self.validator(&account)?;
        let ends_at = validator
            .registered_at
            .saturating_add(self.parameters.locked_gold_requirements.duration);
        if now < ends_at {
            return Err(StakingError::RequirementDurationNotElapsed { ends_at });
        }
        if self.pending_deregistrations.contains_key(&account) {
            return Err(StakingError::DeregistrationAlreadyPending(account));
        }
        self.pending_deregistrations.insert(account, now);

        info!("Deregistration requested for {}", hex::encode(account.as_bytes()));
        events.record(Event::ValidatorDeregistrationRequested { validator: account });
        Ok(())
    }

    pub fn cancel_deregistration(&mut self, events: &mut EventLog, account: Address) -> Result<()> {
        if self.pending_deregistrations.remove(&account).is_none() {
            return Err(StakingError::NoPendingDeregistration(account));
        }
        info!("Deregistration cancelled for {}", hex::encode(account.as_bytes()));
        events.record(Event::ValidatorDeregistrationCancelled { validator: account });
        Ok(())
    }

    /// Removes every validator with a pending request that is still
    /// registered, drops it from the ranking and clears the pending set.
    pub fn deregister_all_pending(
        &mut self,
        ledger: &mut VoteLedger,
        events: &mut EventLog,
    ) -> Result<Vec<Address>> {
        let pending: Vec<Address> = self.pending_deregistrations.keys().copied().collect();
        let mut removed = Vec::with_capacity(pending.len());
        for account in pending {
            if self.validators.remove(&account).is_none() {
                continue;
            }
            ledger.mark_ineligible(events, account)?;
            info!("Validator deregistered: {}", hex::encode(account.as_bytes()));
            events.record(Event::ValidatorDeregistered { validator: account });
            removed.push(account);
        }
        self.pending_deregistrations.clear();
        Ok(removed)
    }

    pub fn update_ecdsa_public_key(
        &mut self,
        events: &mut EventLog,
        account: Address,
        ecdsa_public_key: Vec<u8>,
    ) -> Result<()> {
        check_length("ECDSA public key", &ecdsa_public_key, ECDSA_PUBLIC_KEY_LENGTH)?;
        let validator = self.validator_mut(&account)?;
        validator.public_keys.ecdsa = ecdsa_public_key;
        info!("ECDSA key updated for {}", hex::encode(account.as_bytes()));
        events.record(Event::ValidatorEcdsaPublicKeyUpdated { validator: account });
        Ok(())
    }

    pub fn update_bls_public_key<V: BlsVerifier + ?Sized>(
        &mut self,
        verifier: &V,
        events: &mut EventLog,
        account: Address,
        bls_public_key: Vec<u8>,
        bls_g1_public_key: Vec<u8>,
        bls_pop: Vec<u8>,
    ) -> Result<()> {
        check_length("BLS public key", &bls_public_key, BLS_PUBLIC_KEY_LENGTH)?;
        check_length("BLS G1 public key", &bls_g1_public_key, BLS_G1_PUBLIC_KEY_LENGTH)?;
        check_length("BLS proof of possession", &bls_pop, BLS_POP_LENGTH)?;
        self.validator(&account)?;
        if !verifier.check_proof_of_possession_g1(account, &bls_public_key, &bls_g1_public_key, &bls_pop) {
            return Err(StakingError::InvalidProofOfPossession);
        }
        let validator = self.validator_mut(&account)?;
        validator.public_keys.bls = bls_public_key;
        validator.public_keys.bls_g1 = bls_g1_public_key;
        info!("BLS key updated for {}", hex::encode(account.as_bytes()));
        events.record(Event::ValidatorBlsPublicKeyUpdated { validator: account });
        Ok(())
    }

    /// Pays the validator behind `signer` its share of `max_payment`.
    ///
    /// The share is `(score + pledge multiplier) / total_scores`, scaled by
    /// the slashing multiplier. The commission part is minted to the
    /// validator and the rest is returned for its voters. Unknown signers
    /// and under-collateralized validators are skipped.
    pub fn distribute_epoch_payment_from_signer<H>(
        &self,
        host: &mut H,
        events: &mut EventLog,
        signer: Address,
        max_payment: Amount,
        total_scores: Fraction,
    ) -> Result<Outcome<EpochPayment>>
    where
        H: AccountIdentity + CollateralLedger + MintableToken + ?Sized,
    {
        let account = host.signer_to_account(signer);
        let validator = match self.validators.get(&account) {
            Some(validator) => validator,
            None => return Ok(Outcome::NotApplicable),
        };
        if !self.meets_account_locked_gold_requirements(host, account) {
            warn!(
                "Skipping epoch payment for {}: locked gold below requirement",
                hex::encode(account.as_bytes())
            );
            return Ok(Outcome::NotApplicable);
        }
        if total_scores.is_zero() {
            return Err(StakingError::InvalidTotalScores(account));
        }
        let share = validator
            .score
            .checked_add(self.parameters.pledge_multiplier)?
            .checked_div(total_scores)?;
        if share > Fraction::ONE {
            return Err(StakingError::InvalidTotalScores(account));
        }

        let total = validator
            .slashing
            .multiplier
            .mul_amount(share.mul_amount(max_payment)?)?;
        let validator_payment = validator.commission.mul_amount(total)?;
        let remainder = total
            .checked_sub(validator_payment)
            .ok_or(StakingError::Underflow)?;
        if validator_payment > 0 {
            host.mint(account, validator_payment)?;
        }

        info!(
            "Epoch payment for {}: {} total, {} commission, {} to voters",
            hex::encode(account.as_bytes()),
            total,
            validator_payment,
            remainder
        );
        events.record(Event::ValidatorEpochPaymentDistributed {
            validator: account,
            validator_payment,
            remainder,
        });
        Ok(Outcome::Applied(EpochPayment {
            total,
            validator_payment,
            remainder,
        }))
    }

    /// Sum of `score + pledge multiplier` over the registered validators
    /// behind `signers`, counting each validator once.
    pub fn total_epoch_scores<I: AccountIdentity + ?Sized>(
        &self,
        accounts: &I,
        signers: &[Address],
    ) -> Result<Fraction> {
        let validators: BTreeSet<Address> = signers
            .iter()
            .map(|signer| accounts.signer_to_account(*signer))
            .filter(|account| self.is_validator(account))
            .collect();
        validators.iter().try_fold(Fraction::ZERO, |total, account| {
            let score = self.validators.get(account).map(|v| v.score).unwrap_or_default();
            total
                .checked_add(score)?
                .checked_add(self.parameters.pledge_multiplier)
        })
    }

    /// Collateral `account` must keep locked, zero for non-validators.
    pub fn account_locked_gold_requirement(&self, account: &Address) -> Amount {
        if self.is_validator(account) {
            self.parameters.locked_gold_requirements.value
        } else {
            0
        }
    }

    pub fn meets_account_locked_gold_requirements<C: CollateralLedger + ?Sized>(
        &self,
        collateral: &C,
        account: Address,
    ) -> bool {
        collateral.total_locked_gold(account) >= self.account_locked_gold_requirement(&account)
    }

    pub fn is_validator(&self, account: &Address) -> bool {
        self.validators.contains_key(account)
    }

    pub fn validator(&self, account: &Address) -> Result<&Validator> {
        self.validators
            .get(account)
            .ok_or(StakingError::NotValidator(*account))
    }

    fn validator_mut(&mut self, account: &Address) -> Result<&mut Validator> {
        self.validators
            .get_mut(account)
            .ok_or(StakingError::NotValidator(*account))
    }

    pub fn registered_validators(&self) -> Vec<Address> {
        self.validators.keys().copied().collect()
    }

    pub fn registered_validator_signers(&self) -> Vec<Address> {
        self.validators.values().map(|v| v.signer).collect()
    }

    pub fn pending_deregistrations(&self) -> Vec<Address> {
        self.pending_deregistrations.keys().copied().collect()
    }

    pub fn is_pending_deregistration(&self, account: &Address) -> bool {
        self.pending_deregistrations.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
