//! Threshold election over the eligible ranking.

use log::{debug, warn};

use crate::election::votes::VoteLedger;
use crate::error::{Result, StakingError};
use crate::host::{AccountIdentity, Address};

/// Elects up to `max_electable` validator accounts, in ranking order, whose
/// vote totals reach the electability threshold share of all votes.
pub fn elect_validator_accounts(
    ledger: &VoteLedger,
    min_electable: usize,
    max_electable: usize,
) -> Result<Vec<Address>> {
    let total_votes = ledger.total_votes();
    if total_votes == 0 {
        return Err(StakingError::NoVotes);
    }
    let required = ledger
        .parameters()
        .electability_threshold
        .mul_amount(total_votes)?;
    let ranking = ledger.ranking();
    let elected = ranking.num_elements_greater_than(required, max_electable);
    if elected < min_electable {
        warn!(
            "Election failed: {} validators reach {} votes, {} required",
            elected, required, min_electable
        );
        return Err(StakingError::NotEnoughElected {
            elected,
            min: min_electable,
        });
    }
    debug!(
        "Elected {} of {} eligible validators (threshold {} of {} votes)",
        elected,
        ranking.len(),
        required,
        total_votes
    );
    Ok(ranking.head_n(elected))
}

/// Elects validator accounts and maps each to its registered signer.
pub fn elect_n_validator_signers<I: AccountIdentity + ?Sized>(
    accounts: &I,
    ledger: &VoteLedger,
    min_electable: usize,
    max_electable: usize,
) -> Result<Vec<Address>> {
    Ok(elect_validator_accounts(ledger, min_electable, max_electable)?
        .into_iter()
        .map(|account| accounts.validator_signer(account))
        .collect())
}
