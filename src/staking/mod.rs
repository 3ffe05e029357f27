//! The staking engine: registry, vote ledger and reward parameters behind
//! one transactional front.
//!
//! Operations are grouped by concern into [`ValidatorOperations`],
//! [`VoteOperations`] and [`EpochProcessor`], all implemented on
//! [`StakingEngine`]. Every mutating call holds the reentrancy guard and
//! leaves nothing behind if it fails. Vote operations checkpoint only the
//! ledger entries they touch and journal their collateral moves
//! (`transact_votes`); registry and epoch operations snapshot the whole
//! local state and host (`transact`).

pub mod epoch;
pub mod guard;
pub mod journal;
pub mod validator;
pub mod voting;

#[cfg(test)]
mod tests;

pub use epoch::{EpochProcessor, EpochReport};
pub use guard::{GuardToken, ReentrancyGuard};
pub use journal::CollateralJournal;
pub use validator::ValidatorOperations;
pub use voting::VoteOperations;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::economic_model::EpochRewards;
use crate::election::VoteLedger;
use crate::error::{Result, StakingError};
use crate::events::EventLog;
use crate::host::{Address, Host};
use crate::validators::ValidatorRegistry;

/// State owned by the engine itself, as opposed to its host.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalState {
    pub parameters: Parameters,
    pub registry: ValidatorRegistry,
    pub ledger: VoteLedger,
    pub rewards: EpochRewards,
    pub last_processed_epoch: Option<u64>,
}

impl LocalState {
    fn new(parameters: Parameters) -> Self {
        Self {
            registry: ValidatorRegistry::new(parameters.validators.clone()),
            ledger: VoteLedger::new(parameters.election.clone()),
            rewards: EpochRewards::new(parameters.rewards.clone()),
            parameters,
            last_processed_epoch: None,
        }
    }
}

pub struct StakingEngine<H: Host> {
    host: H,
    state: Option<LocalState>,
    events: EventLog,
    guard: ReentrancyGuard,
}

impl<H: Host> StakingEngine<H> {
    /// Creates an engine that rejects every operation until
    /// [`initialize`](Self::initialize) is called.
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: None,
            events: EventLog::new(),
            guard: ReentrancyGuard::new(),
        }
    }

    pub fn initialize(&mut self, parameters: Parameters) -> Result<()> {
        let _token = self.guard.acquire()?;
        if self.state.is_some() {
            return Err(StakingError::AlreadyInitialized);
        }
        parameters.validate()?;
        self.state = Some(LocalState::new(parameters));
        info!("Staking engine initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Runs `operation` against local state, host and event log. On error
    /// all three are put back the way they were.
    pub(crate) fn transact<T, F>(&mut self, name: &'static str, operation: F) -> Result<T>
    where
        F: FnOnce(&mut LocalState, &mut H, &mut EventLog) -> Result<T>,
    {
        let _token = self.guard.acquire()?;
        let state = self.state.as_mut().ok_or(StakingError::NotInitialized)?;
        let saved_state = state.clone();
        let saved_host = self.host.clone();
        let mark = self.events.len();

        match operation(state, &mut self.host, &mut self.events) {
            Ok(value) => Ok(value),
            Err(e) => {
                *state = saved_state;
                self.host = saved_host;
                self.events.truncate(mark);
                warn!("{} failed, state restored: {}", name, e);
                Err(e)
            }
        }
    }

    /// Runs a vote ledger operation. Only the entries of `validators` and
    /// `voters` are checkpointed, and collateral moves go through a
    /// [`CollateralJournal`], so the cost of making the call undoable does
    /// not grow with the rest of the state. The operation must not write
    /// ledger entries of other validators or voters.
    pub(crate) fn transact_votes<T, F>(
        &mut self,
        name: &'static str,
        validators: &[Address],
        voters: &[Address],
        operation: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut VoteLedger, &mut CollateralJournal<'_, H>, &mut EventLog) -> Result<T>,
    {
        let _token = self.guard.acquire()?;
        let state = self.state.as_mut().ok_or(StakingError::NotInitialized)?;
        let checkpoint = state.ledger.checkpoint(validators, voters);
        let mark = self.events.len();
        let mut journal = CollateralJournal::new(&mut self.host);

        match operation(&mut state.ledger, &mut journal, &mut self.events) {
            Ok(value) => Ok(value),
            Err(e) => {
                journal.revert();
                state.ledger.rollback(checkpoint);
                self.events.truncate(mark);
                warn!("{} failed, votes restored: {}", name, e);
                Err(e)
            }
        }
    }

    pub(crate) fn state(&self) -> Result<&LocalState> {
        self.state.as_ref().ok_or(StakingError::NotInitialized)
    }

    pub fn parameters(&self) -> Result<&Parameters> {
        Ok(&self.state()?.parameters)
    }

    pub fn registry(&self) -> Result<&ValidatorRegistry> {
        Ok(&self.state()?.registry)
    }

    pub fn ledger(&self) -> Result<&VoteLedger> {
        Ok(&self.state()?.ledger)
    }

    pub fn rewards(&self) -> Result<&EpochRewards> {
        Ok(&self.state()?.rewards)
    }

    pub fn last_processed_epoch(&self) -> Result<Option<u64>> {
        Ok(self.state()?.last_processed_epoch)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct access to the collaborators, for driving the clock and
    /// collateral from outside an operation.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Serializes the local state. The host is not included.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self.state()?).map_err(|e| StakingError::Snapshot(e.to_string()))
    }

    /// Replaces the local state with a snapshot, initializing the engine if
    /// it was not already.
    pub fn restore(&mut self, snapshot: &[u8]) -> Result<()> {
        let _token = self.guard.acquire()?;
        let state: LocalState =
            bincode::deserialize(snapshot).map_err(|e| StakingError::Snapshot(e.to_string()))?;
        state.parameters.validate()?;
        self.state = Some(state);
        info!("Staking engine restored from a {} byte snapshot", snapshot.len());
        Ok(())
    }
}
