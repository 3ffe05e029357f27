//! Election queries, reward parameters and the per-epoch batch.

use std::collections::BTreeSet;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::economic_model::RewardSplit;
use crate::election::{elect_n_validator_signers, RankingHint};
use crate::error::{Outcome, Result, StakingError};
use crate::events::Event;
use crate::fraction::Fraction;
use crate::host::{Address, Amount, Host};
use crate::staking::StakingEngine;
use crate::validators::{EpochPayment, ScoreUpdate};

/// What one call to [`EpochProcessor::process_epoch`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch: u64,
    pub score_updates: Vec<ScoreUpdate>,
    /// Signers with measured uptime but no registered validator, or whose
    /// validator was already scored earlier in the batch.
    pub skipped_signers: Vec<Address>,
    pub rewards: RewardSplit,
    pub total_scores: Fraction,
    /// Payments by validator account.
    pub payments: Vec<(Address, EpochPayment)>,
    /// Rewards added to each validator's active votes. Their sum is minted
    /// to the collateral account.
    pub voter_rewards: Vec<(Address, Amount)>,
    /// Remainders of validators without active votes to receive them.
    pub undistributed: Amount,
    pub activations: usize,
    pub deregistered: Vec<Address>,
    /// Signers elected for the next epoch, `None` if the election failed.
    pub next_validators: Option<Vec<Address>>,
}

pub trait EpochProcessor {
    /// Elects signers using the configured bounds.
    fn elect_validator_signers(&self) -> Result<Vec<Address>>;
    fn elect_n_validator_signers(&self, min_electable: usize, max_electable: usize) -> Result<Vec<Address>>;

    /// The `n` highest ranked eligible validators, regardless of threshold.
    fn top_validators(&self, n: usize) -> Result<Vec<Address>>;
    fn eligible_validators_with_votes(&self) -> Result<(Vec<Address>, Vec<Amount>)>;

    fn calculate_epoch_rewards(&self) -> Result<RewardSplit>;
    fn set_target_epoch_payment(&mut self, value: Amount) -> Result<()>;
    fn set_community_fraction(&mut self, fraction: Fraction) -> Result<()>;
    fn set_relayer_fraction(&mut self, fraction: Fraction) -> Result<()>;

    /// Runs the epoch boundary for the clock's current epoch: scores,
    /// reward split, validator payments, voter rewards, pending vote
    /// activation, deregistrations and the next election, all or nothing.
    fn process_epoch(&mut self, uptimes: &[(Address, Fraction)]) -> Result<EpochReport>;
}

impl<H: Host> EpochProcessor for StakingEngine<H> {
    fn elect_validator_signers(&self) -> Result<Vec<Address>> {
        let parameters = &self.state()?.parameters.election;
        self.elect_n_validator_signers(
            parameters.min_electable_validators,
            parameters.max_electable_validators,
        )
    }

    fn elect_n_validator_signers(&self, min_electable: usize, max_electable: usize) -> Result<Vec<Address>> {
        let state = self.state()?;
        elect_n_validator_signers(self.host(), &state.ledger, min_electable, max_electable)
    }

    fn top_validators(&self, n: usize) -> Result<Vec<Address>> {
        Ok(self.state()?.ledger.ranking().head_n(n))
    }

    fn eligible_validators_with_votes(&self) -> Result<(Vec<Address>, Vec<Amount>)> {
        Ok(self.state()?.ledger.total_votes_for_eligible_validators())
    }

    fn calculate_epoch_rewards(&self) -> Result<RewardSplit> {
        self.state()?.rewards.calculate()
    }

    fn set_target_epoch_payment(&mut self, value: Amount) -> Result<()> {
        self.transact("set_target_epoch_payment", |state, _, events| {
            state.rewards.set_target_epoch_payment(events, value)
        })
    }

    fn set_community_fraction(&mut self, fraction: Fraction) -> Result<()> {
        self.transact("set_community_fraction", |state, _, events| {
            state.rewards.set_community_fraction(events, fraction)
        })
    }

    fn set_relayer_fraction(&mut self, fraction: Fraction) -> Result<()> {
        self.transact("set_relayer_fraction", |state, _, events| {
            state.rewards.set_relayer_fraction(events, fraction)
        })
    }

    fn process_epoch(&mut self, uptimes: &[(Address, Fraction)]) -> Result<EpochReport> {
        self.transact("process_epoch", |state, host, events| {
            let epoch = host.epoch_number();
            if let Some(last) = state.last_processed_epoch {
                if epoch <= last {
                    return Err(StakingError::EpochAlreadyProcessed(epoch));
                }
            }
            let mut report = EpochReport {
                epoch,
                ..EpochReport::default()
            };

            let mut scored = BTreeSet::new();
            for (signer, uptime) in uptimes {
                if !scored.insert(host.signer_to_account(*signer)) {
                    warn!(
                        "Ignoring repeated uptime for signer {} in epoch {}",
                        hex::encode(signer.as_bytes()),
                        epoch
                    );
                    report.skipped_signers.push(*signer);
                    continue;
                }
                match state
                    .registry
                    .update_score_from_signer(&*host, events, *signer, *uptime)?
                {
                    Outcome::Applied(update) => report.score_updates.push(update),
                    Outcome::NotApplicable => report.skipped_signers.push(*signer),
                }
            }

            report.rewards = state.rewards.calculate()?;
            if report.rewards.community > 0 {
                let fund = state.rewards.community_fund();
                host.mint(fund, report.rewards.community)?;
                events.record(Event::CommunityRewardMinted {
                    fund,
                    value: report.rewards.community,
                });
            }

            let signers: Vec<Address> = uptimes.iter().map(|(signer, _)| *signer).collect();
            report.total_scores = state.registry.total_epoch_scores(&*host, &signers)?;
            if !report.total_scores.is_zero() {
                let mut paid = BTreeSet::new();
                for signer in &signers {
                    let account = host.signer_to_account(*signer);
                    if !paid.insert(account) {
                        continue;
                    }
                    let outcome = state.registry.distribute_epoch_payment_from_signer(
                        host,
                        events,
                        *signer,
                        report.rewards.validators,
                        report.total_scores,
                    )?;
                    if let Outcome::Applied(payment) = outcome {
                        report.payments.push((account, payment));
                    }
                }
            }

            for (account, payment) in &report.payments {
                if payment.remainder == 0 {
                    continue;
                }
                if state.ledger.active_vote_units_for_validator(account) == 0 {
                    report.undistributed += payment.remainder;
                    continue;
                }
                state.ledger.distribute_epoch_voters_rewards(
                    events,
                    *account,
                    payment.remainder,
                    RankingHint::default(),
                )?;
                report.voter_rewards.push((*account, payment.remainder));
            }
            let minted_for_voters = report
                .voter_rewards
                .iter()
                .try_fold(0, |sum: Amount, (_, value)| sum.checked_add(*value))
                .ok_or(StakingError::Overflow)?;
            if minted_for_voters > 0 {
                let collateral = host.collateral_account();
                host.mint(collateral, minted_for_voters)?;
                events.record(Event::VoterRewardsMinted {
                    collateral,
                    value: minted_for_voters,
                });
            }

            let pending = state.ledger.validators_with_pending_votes();
            report.activations = state.ledger.activate_all(events, &pending, epoch)?;

            report.deregistered = state.registry.deregister_all_pending(&mut state.ledger, events)?;

            let bounds = &state.parameters.election;
            report.next_validators = match elect_n_validator_signers(
                &*host,
                &state.ledger,
                bounds.min_electable_validators,
                bounds.max_electable_validators,
            ) {
                Ok(signers) => Some(signers),
                Err(e) => {
                    warn!("No validator set elected after epoch {}: {}", epoch, e);
                    None
                }
            };

            state.last_processed_epoch = Some(epoch);
            events.record(Event::EpochProcessed { epoch });
            info!(
                "Epoch {} processed: {} scores, {} payments, {} activations, {} deregistered, {} elected",
                epoch,
                report.score_updates.len(),
                report.payments.len(),
                report.activations,
                report.deregistered.len(),
                report.next_validators.as_ref().map(Vec::len).unwrap_or(0)
            );
            Ok(report)
        })
    }
}
