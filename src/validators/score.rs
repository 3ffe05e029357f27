//! Uptime-driven validator scores.

use log::{debug, info};

use super::{ScoreUpdate, ValidatorRegistry};
use crate::error::{Outcome, Result, StakingError};
use crate::events::{Event, EventLog};
use crate::fraction::Fraction;
use crate::host::{AccountIdentity, Address};

impl ValidatorRegistry {
    /// `min(uptime + grace, 1) ^ exponent`.
    pub fn calculate_epoch_score(&self, uptime: Fraction) -> Result<Fraction> {
        if uptime > Fraction::ONE {
            return Err(StakingError::UptimeTooLarge);
        }
        let with_grace = uptime
            .checked_add(self.parameters.downtime_grace_period)?
            .min(Fraction::ONE);
        with_grace.pow(self.parameters.score.exponent)
    }

    /// Folds this epoch's uptime into the score of the validator behind
    /// `signer`. The smoothed score never exceeds the raw epoch score.
    pub fn update_score_from_signer<I: AccountIdentity + ?Sized>(
        &mut self,
        accounts: &I,
        events: &mut EventLog,
        signer: Address,
        uptime: Fraction,
    ) -> Result<Outcome<ScoreUpdate>> {
        let account = accounts.signer_to_account(signer);
        if !self.is_validator(&account) {
            debug!("No validator behind signer {}", hex::encode(signer.as_bytes()));
            return Ok(Outcome::NotApplicable);
        }
        let epoch_score = self.calculate_epoch_score(uptime)?;
        let speed = self.parameters.score.adjustment_speed;
        let validator = self.validator_mut(&account)?;

        let retained = Fraction::ONE.checked_sub(speed)?.checked_mul(validator.score)?;
        let smoothed = speed.checked_mul(epoch_score)?.checked_add(retained)?;
        let score = smoothed.min(epoch_score);
        validator.score = score;

        info!(
            "Score of {} updated to {} (uptime {}, epoch score {})",
            hex::encode(account.as_bytes()),
            score,
            uptime,
            epoch_score
        );
        events.record(Event::ValidatorScoreUpdated {
            validator: account,
            score,
            epoch_score,
        });
        Ok(Outcome::Applied(ScoreUpdate {
            validator: account,
            epoch_score,
            score,
        }))
    }
}
