use serde::{Deserialize, Serialize};

use crate::host::{Address, Amount};

pub type Result<T> = std::result::Result<T, StakingError>;

/// How a failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input.
    Validation,
    /// Caller not allowed, or the operation is not possible yet.
    Precondition,
    /// A defect: arithmetic or index bookkeeping went wrong.
    Invariant,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    #[error("value must be greater than zero")]
    ZeroValue,
    #[error("{what} must be {expected} bytes, got {actual}")]
    InvalidKeyLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid BLS proof of possession")]
    InvalidProofOfPossession,
    #[error("commission can't be greater than 100%")]
    CommissionTooLarge,
    #[error("commission must be different from the current one")]
    CommissionUnchanged,
    #[error("uptime cannot be larger than one")]
    UptimeTooLarge,
    #[error("{0} must differ from the current value")]
    ParameterUnchanged(&'static str),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("input lengths must correspond")]
    InputLengthMismatch,
    #[error("total scores do not cover the score of {0}")]
    InvalidTotalScores(Address),

    #[error("engine is not initialized")]
    NotInitialized,
    #[error("engine is already initialized")]
    AlreadyInitialized,
    #[error("reentrant call into a mutating operation")]
    Reentrancy,
    #[error("{0} is not a registered validator")]
    NotValidator(Address),
    #[error("{0} is already registered")]
    AlreadyRegistered(Address),
    #[error("deposit too small: {available} locked, {required} required")]
    InsufficientLockedGold { required: Amount, available: Amount },
    #[error("{0} is not eligible for votes")]
    ValidatorNotEligible(Address),
    #[error("{0} is already eligible")]
    AlreadyEligible(Address),
    #[error("voted for too many validators (max {max})")]
    TooManyValidatorsVotedFor { max: usize },
    #[error("nonvoting balance too low: {requested} requested, {available} available")]
    InsufficientNonvotingBalance { requested: Amount, available: Amount },
    #[error("no pending votes")]
    NoPendingVotes,
    #[error("pending vote cast in epoch {cast} cannot be activated in epoch {current}")]
    PendingVoteEpochNotPassed { cast: u64, current: u64 },
    #[error("revoking {requested} exceeds {available} pending votes")]
    RevokeExceedsPending { requested: Amount, available: Amount },
    #[error("revoking {requested} exceeds {available} active votes")]
    RevokeExceedsActive { requested: Amount, available: Amount },
    #[error("{0} has no active votes")]
    NoActiveVotes(Address),
    #[error("failure to decrement all votes, {remaining} left")]
    InsufficientVotesToDecrement { remaining: Amount },
    #[error("locked gold requirement lasts until {ends_at}")]
    RequirementDurationNotElapsed { ends_at: u64 },
    #[error("deregistration of {0} is already pending")]
    DeregistrationAlreadyPending(Address),
    #[error("no pending deregistration for {0}")]
    NoPendingDeregistration(Address),
    #[error("no commission update queued")]
    NoCommissionUpdateQueued,
    #[error("can't apply commission update before block {activation_block} (now {current_block})")]
    CommissionUpdateNotReady {
        activation_block: u64,
        current_block: u64,
    },
    #[error("{0} is not a slasher")]
    NotSlasher(Address),
    #[error("{caller} may not act for validator {validator}")]
    NotValidatorOwner { caller: Address, validator: Address },
    #[error("slashing multiplier can't be reset before {available_at}")]
    SlashingResetTooEarly { available_at: u64 },
    #[error("total votes must be greater than zero")]
    NoVotes,
    #[error("not enough elected validators: {elected} < {min}")]
    NotEnoughElected { elected: usize, min: usize },
    #[error("epoch {0} was already processed")]
    EpochAlreadyProcessed(u64),
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("ranking hint {0} is inconsistent with the new value")]
    InvalidRankingHint(Address),
    #[error("{0} is already ranked")]
    RankingEntryExists(Address),
    #[error("{0} is not ranked")]
    RankingEntryMissing(Address),
    #[error("bad index {index}")]
    BadIndex { index: usize },
}

impl StakingError {
    pub fn kind(&self) -> ErrorKind {
        use StakingError::*;
        match self {
            ZeroValue
            | InvalidKeyLength { .. }
            | InvalidProofOfPossession
            | CommissionTooLarge
            | CommissionUnchanged
            | UptimeTooLarge
            | ParameterUnchanged(_)
            | InvalidParameter(_)
            | InputLengthMismatch
            | InvalidTotalScores(_) => ErrorKind::Validation,
            Overflow
            | Underflow
            | DivisionByZero
            | InvalidRankingHint(_)
            | RankingEntryExists(_)
            | RankingEntryMissing(_)
            | BadIndex { .. }
            | Snapshot(_) => ErrorKind::Invariant,
            _ => ErrorKind::Precondition,
        }
    }
}

/// Result of an operation that is skipped, rather than failed, when it does
/// not apply (an unknown signer during an epoch batch, for instance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome<T> {
    Applied(T),
    NotApplicable,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::NotApplicable => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}
