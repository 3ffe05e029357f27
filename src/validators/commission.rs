//! Block-delayed commission changes.

use log::info;

use super::{PendingCommission, ValidatorRegistry};
use crate::error::{Result, StakingError};
use crate::events::{Event, EventLog};
use crate::fraction::Fraction;
use crate::host::Address;

impl ValidatorRegistry {
    /// Queues `commission` to take effect `commission_update_delay` blocks
    /// after `current_block`. A later call replaces the queued update.
    pub fn set_next_commission_update(
        &mut self,
        events: &mut EventLog,
        account: Address,
        commission: Fraction,
        current_block: u64,
    ) -> Result<()> {
        if commission > Fraction::ONE {
            return Err(StakingError::CommissionTooLarge);
        }
        let delay = self.parameters.commission_update_delay;
        let validator = self.validator_mut(&account)?;
        if commission == validator.commission {
            return Err(StakingError::CommissionUnchanged);
        }
        let activation_block = current_block.saturating_add(delay);
        validator.next_commission = Some(PendingCommission {
            commission,
            activation_block,
        });

        info!(
            "Commission update for {} queued: {} at block {}",
            hex::encode(account.as_bytes()),
            commission,
            activation_block
        );
        events.record(Event::ValidatorCommissionUpdateQueued {
            validator: account,
            commission,
            activation_block,
        });
        Ok(())
    }

    /// Applies the queued commission once its activation block is reached.
    pub fn update_commission(&mut self, events: &mut EventLog, account: Address, current_block: u64) -> Result<Fraction> {
        let validator = self.validator_mut(&account)?;
        let pending = validator
            .next_commission
            .ok_or(StakingError::NoCommissionUpdateQueued)?;
        if current_block < pending.activation_block {
            return Err(StakingError::CommissionUpdateNotReady {
                activation_block: pending.activation_block,
                current_block,
            });
        }
        validator.commission = pending.commission;
        validator.next_commission = None;

        info!(
            "Commission of {} updated to {}",
            hex::encode(account.as_bytes()),
            pending.commission
        );
        events.record(Event::ValidatorCommissionUpdated {
            validator: account,
            commission: pending.commission,
        });
        Ok(pending.commission)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{addr, Fixture};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_commission_update_waits_for_activation_block() {
        let mut f = Fixture::new();
        f.registry.parameters.commission_update_delay = 10;
        f.register(addr(1), Fraction::percent(5).unwrap(), 0).unwrap();

        f.registry
            .set_next_commission_update(&mut f.events, addr(1), Fraction::percent(8).unwrap(), 100)
            .unwrap();
        assert_eq!(
            f.registry.update_commission(&mut f.events, addr(1), 109),
            Err(StakingError::CommissionUpdateNotReady {
                activation_block: 110,
                current_block: 109
            })
        );
        assert_eq!(
            f.registry.validator(&addr(1)).unwrap().commission,
            Fraction::percent(5).unwrap()
        );

        let applied = f.registry.update_commission(&mut f.events, addr(1), 110).unwrap();
        assert_eq!(applied, Fraction::percent(8).unwrap());
        let validator = f.registry.validator(&addr(1)).unwrap();
        assert_eq!(validator.commission, Fraction::percent(8).unwrap());
        assert_eq!(validator.next_commission, None);

        assert_eq!(
            f.registry.update_commission(&mut f.events, addr(1), 200),
            Err(StakingError::NoCommissionUpdateQueued)
        );
    }

    #[test]
    fn test_commission_update_validation() {
        let mut f = Fixture::new();
        f.register(addr(1), Fraction::percent(5).unwrap(), 0).unwrap();
        let too_large = Fraction::ONE.checked_add(Fraction::from_raw(1)).unwrap();

        assert_eq!(
            f.registry
                .set_next_commission_update(&mut f.events, addr(1), too_large, 1),
            Err(StakingError::CommissionTooLarge)
        );
        assert_eq!(
            f.registry
                .set_next_commission_update(&mut f.events, addr(1), Fraction::percent(5).unwrap(), 1),
            Err(StakingError::CommissionUnchanged)
        );
        assert_eq!(
            f.registry
                .set_next_commission_update(&mut f.events, addr(2), Fraction::percent(6).unwrap(), 1),
            Err(StakingError::NotValidator(addr(2)))
        );
    }
}
