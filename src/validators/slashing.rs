//! Slashing multiplier halving and self-service reset.

use log::{info, warn};

use super::ValidatorRegistry;
use crate::error::{Result, StakingError};
use crate::events::{Event, EventLog};
use crate::fraction::Fraction;
use crate::host::{AccountIdentity, Address, CollateralLedger};

impl ValidatorRegistry {
    /// Halves the validator's reward multiplier. Only slashers may call this.
    pub fn halve_slashing_multiplier<C: CollateralLedger + ?Sized>(
        &mut self,
        collateral: &C,
        events: &mut EventLog,
        caller: Address,
        account: Address,
        now: u64,
    ) -> Result<Fraction> {
        if !collateral.is_slasher(caller) {
            warn!(
                "Rejected slashing of {} by {}",
                hex::encode(account.as_bytes()),
                hex::encode(caller.as_bytes())
            );
            return Err(StakingError::NotSlasher(caller));
        }
        let validator = self.validator_mut(&account)?;
        let multiplier = validator.slashing.multiplier.halve();
        validator.slashing.multiplier = multiplier;
        validator.slashing.last_slashed = now;

        warn!(
            "Slashing multiplier of {} halved to {}",
            hex::encode(account.as_bytes()),
            multiplier
        );
        events.record(Event::SlashingMultiplierHalved {
            validator: account,
            multiplier,
        });
        Ok(multiplier)
    }

    /// Restores the multiplier to 1 once the reset period has passed since
    /// the last halving. Only the validator, through its account or its
    /// signer, may reset its own multiplier.
    pub fn reset_slashing_multiplier<I: AccountIdentity + ?Sized>(
        &mut self,
        accounts: &I,
        events: &mut EventLog,
        caller: Address,
        account: Address,
        now: u64,
    ) -> Result<()> {
        if accounts.signer_to_account(caller) != account {
            return Err(StakingError::NotValidatorOwner {
                caller,
                validator: account,
            });
        }
        let period = self.parameters.slashing_reset_period;
        let validator = self.validator_mut(&account)?;
        let available_at = validator.slashing.last_slashed.saturating_add(period);
        if now < available_at {
            return Err(StakingError::SlashingResetTooEarly { available_at });
        }
        validator.slashing.multiplier = Fraction::ONE;

        info!("Slashing multiplier of {} reset", hex::encode(account.as_bytes()));
        events.record(Event::SlashingMultiplierReset { validator: account });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{addr, Fixture};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_halve_and_reset() {
        let mut f = Fixture::new();
        f.registry.parameters.slashing_reset_period = 1_000;
        f.register(addr(1), Fraction::ZERO, 0).unwrap();
        f.host.add_slasher(addr(50));

        let halved = f
            .registry
            .halve_slashing_multiplier(&f.host, &mut f.events, addr(50), addr(1), 5_000)
            .unwrap();
        assert_eq!(halved, Fraction::percent(50).unwrap());
        assert_eq!(f.registry.validator(&addr(1)).unwrap().slashing.last_slashed, 5_000);

        assert_eq!(
            f.registry
                .reset_slashing_multiplier(&f.host, &mut f.events, addr(1), addr(1), 5_999),
            Err(StakingError::SlashingResetTooEarly { available_at: 6_000 })
        );
        f.registry
            .reset_slashing_multiplier(&f.host, &mut f.events, addr(1), addr(1), 6_000)
            .unwrap();
        assert_eq!(
            f.registry.validator(&addr(1)).unwrap().slashing.multiplier,
            Fraction::ONE
        );
    }

    #[test]
    fn test_repeated_halving_compounds() {
        let mut f = Fixture::new();
        f.register(addr(1), Fraction::ZERO, 0).unwrap();
        f.host.add_slasher(addr(50));
        for _ in 0..2 {
            f.registry
                .halve_slashing_multiplier(&f.host, &mut f.events, addr(50), addr(1), 10)
                .unwrap();
        }
        assert_eq!(
            f.registry.validator(&addr(1)).unwrap().slashing.multiplier,
            Fraction::percent(25).unwrap()
        );
    }

    #[test]
    fn test_only_the_validator_may_reset() {
        let mut f = Fixture::new();
        f.register(addr(1), Fraction::ZERO, 0).unwrap();
        f.host.add_slasher(addr(50));
        f.host.authorize_signer(addr(1), addr(11));
        f.registry
            .halve_slashing_multiplier(&f.host, &mut f.events, addr(50), addr(1), 0)
            .unwrap();

        assert_eq!(
            f.registry
                .reset_slashing_multiplier(&f.host, &mut f.events, addr(2), addr(1), 1_000_000_000),
            Err(StakingError::NotValidatorOwner {
                caller: addr(2),
                validator: addr(1)
            })
        );
        assert_eq!(
            f.registry.validator(&addr(1)).unwrap().slashing.multiplier,
            Fraction::percent(50).unwrap()
        );
        f.registry
            .reset_slashing_multiplier(&f.host, &mut f.events, addr(11), addr(1), 1_000_000_000)
            .unwrap();
        assert_eq!(
            f.registry.validator(&addr(1)).unwrap().slashing.multiplier,
            Fraction::ONE
        );
    }

    #[test]
    fn test_only_slashers_may_halve() {
        let mut f = Fixture::new();
        f.register(addr(1), Fraction::ZERO, 0).unwrap();
        assert_eq!(
            f.registry
                .halve_slashing_multiplier(&f.host, &mut f.events, addr(2), addr(1), 10),
            Err(StakingError::NotSlasher(addr(2)))
        );
        assert_eq!(
            f.registry.validator(&addr(1)).unwrap().slashing.multiplier,
            Fraction::ONE
        );
    }
}
