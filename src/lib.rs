/*!
StakeLedger - validator economics for a proof-of-stake chain

This crate keeps the books a PoS chain needs to pick its validator set and pay it:
locked collateral turned into votes, validators ranked by the votes they hold,
per-epoch scores and payments, and the protocol-wide reward split.

# Main Components

- `fraction`: 24-decimal fixed point numbers used for scores, commissions and multipliers
- `election`: the sorted ranking of eligible validators, the vote ledger and the selector
- `validators`: registration, keys, commission, scores, slashing multipliers and payments
- `economic_model`: epoch reward targets and the community/relayer/validator split
- `staking`: the engine that runs every operation atomically against a host chain
- `host`: the collateral, identity, clock, BLS and token interfaces the engine depends on
- `cli`: parameter inspection and an in-memory multi-epoch simulation

# Example Usage

```rust
use stakeledger::{EpochProcessor, InMemoryHost, Parameters, StakingEngine};

let mut engine = StakingEngine::new(InMemoryHost::new());
engine.initialize(Parameters::default()).unwrap();
let rewards = engine.calculate_epoch_rewards().unwrap();
assert_eq!(rewards.total, rewards.community + rewards.relayers + rewards.validators);
```
*/

/// Command-line interface and simulator.
pub mod cli;

/// Parameter file loading and validation.
pub mod config;

/// Epoch reward targets and how they are split.
pub mod economic_model;

/// Validator ranking, votes and election.
pub mod election;

pub mod error;

/// Events emitted by state transitions.
pub mod events;

/// Fixed point arithmetic.
pub mod fraction;

/// Interfaces to the surrounding chain and an in-memory implementation.
pub mod host;

/// The staking engine and its operation traits.
pub mod staking;

/// Validator registry.
pub mod validators;

// Re-export commonly used types
pub use config::Parameters;
pub use election::{ElectionParameters, RankingHint, SortedRanking, VoteLedger};
pub use error::{Outcome, Result, StakingError};
pub use events::{Event, EventLog};
pub use fraction::Fraction;
pub use host::{Address, Amount, Host, InMemoryHost};
pub use staking::{EpochProcessor, EpochReport, StakingEngine, ValidatorOperations, VoteOperations};
pub use validators::{Validator, ValidatorParameters, ValidatorRegistry};
