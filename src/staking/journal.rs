//! Undo journal for collateral moved by vote operations.

use log::warn;

use crate::error::Result;
use crate::host::{Address, Amount, CollateralLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Movement {
    Credited(Address, Amount),
    Debited(Address, Amount),
}

/// Passes nonvoting balance changes through to the collateral ledger and
/// remembers them, so a failed operation can hand every change back.
pub struct CollateralJournal<'a, C: CollateralLedger + ?Sized> {
    collateral: &'a mut C,
    movements: Vec<Movement>,
}

impl<'a, C: CollateralLedger + ?Sized> CollateralJournal<'a, C> {
    pub fn new(collateral: &'a mut C) -> Self {
        Self {
            collateral,
            movements: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    /// Reverses the recorded changes, latest first.
    pub fn revert(self) {
        let Self {
            collateral,
            movements,
        } = self;
        for movement in movements.into_iter().rev() {
            let reverted = match movement {
                Movement::Credited(account, amount) => collateral.decrement_nonvoting_balance(account, amount),
                Movement::Debited(account, amount) => collateral.increment_nonvoting_balance(account, amount),
            };
            if let Err(e) = reverted {
                warn!("Could not reverse {:?}: {}", movement, e);
            }
        }
    }
}

impl<'a, C: CollateralLedger + ?Sized> CollateralLedger for CollateralJournal<'a, C> {
    fn total_locked_gold(&self, account: Address) -> Amount {
        self.collateral.total_locked_gold(account)
    }

    fn nonvoting_locked_gold(&self, account: Address) -> Amount {
        self.collateral.nonvoting_locked_gold(account)
    }

    fn increment_nonvoting_balance(&mut self, account: Address, amount: Amount) -> Result<()> {
        self.collateral.increment_nonvoting_balance(account, amount)?;
        self.movements.push(Movement::Credited(account, amount));
        Ok(())
    }

    fn decrement_nonvoting_balance(&mut self, account: Address, amount: Amount) -> Result<()> {
        self.collateral.decrement_nonvoting_balance(account, amount)?;
        self.movements.push(Movement::Debited(account, amount));
        Ok(())
    }

    fn is_slasher(&self, address: Address) -> bool {
        self.collateral.is_slasher(address)
    }

    fn collateral_account(&self) -> Address {
        self.collateral.collateral_account()
    }
}
