//! Collaborators the engine consumes but does not own: signer/account
//! identity, locked collateral, the epoch clock, BLS proof-of-possession
//! checks and token minting.
//!
//! [`InMemoryHost`] implements all of them for tests and the simulator.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, StakingError};

/// Base-currency amount.
pub type Amount = u128;

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const fn zero() -> Self {
        Address([0u8; 20])
    }

    /// Address whose low eight bytes hold `value` big-endian.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = StakingError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| StakingError::InvalidParameter(format!("address `{}`: {}", s, e)))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| StakingError::InvalidParameter(format!("address `{}` is not 20 bytes", s)))?;
        Ok(Address(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = StakingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

/// Bidirectional signer/account mapping. Unmapped addresses map to
/// themselves, so the mapping is total.
pub trait AccountIdentity {
    fn vote_signer_to_account(&self, signer: Address) -> Address;
    fn signer_to_account(&self, signer: Address) -> Address;
    fn validator_signer(&self, account: Address) -> Address;
}

pub trait CollateralLedger {
    fn total_locked_gold(&self, account: Address) -> Amount;
    fn nonvoting_locked_gold(&self, account: Address) -> Amount;
    fn increment_nonvoting_balance(&mut self, account: Address, amount: Amount) -> Result<()>;
    fn decrement_nonvoting_balance(&mut self, account: Address, amount: Amount) -> Result<()>;
    fn is_slasher(&self, address: Address) -> bool;
    /// Account holding the locked collateral itself. Voter rewards are
    /// minted here, since revoking them returns them as locked collateral.
    fn collateral_account(&self) -> Address;
}

pub trait EpochClock {
    fn epoch_number(&self) -> u64;
    fn block_number(&self) -> u64;
    /// Seconds since the unix epoch.
    fn timestamp(&self) -> u64;
}

pub trait BlsVerifier {
    fn check_proof_of_possession(&self, account: Address, bls_key: &[u8], pop: &[u8]) -> bool;

    /// Variant binding an additional G1 public key into the proof.
    fn check_proof_of_possession_g1(
        &self,
        account: Address,
        bls_key: &[u8],
        bls_g1_key: &[u8],
        pop: &[u8],
    ) -> bool;
}

pub trait MintableToken {
    fn mint(&mut self, account: Address, amount: Amount) -> Result<()>;
}

/// Everything the engine needs from its environment. `Clone` lets a failed
/// operation restore the collaborators along with local state.
pub trait Host: AccountIdentity + CollateralLedger + EpochClock + BlsVerifier + MintableToken + Clone {}

impl<T> Host for T where
    T: AccountIdentity + CollateralLedger + EpochClock + BlsVerifier + MintableToken + Clone
{
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedBalance {
    pub nonvoting: Amount,
    /// Collateral moved into votes less collateral returned from them.
    /// Goes negative once revocations return rewards on top of the votes.
    pub voting: i128,
}

impl LockedBalance {
    /// Nonvoting plus outstanding voting collateral, never below nonvoting.
    pub fn total(&self) -> Amount {
        let voting = Amount::try_from(self.voting).unwrap_or(0);
        self.nonvoting.saturating_add(voting)
    }
}

fn signed(amount: Amount) -> Result<i128> {
    i128::try_from(amount).map_err(|_| StakingError::Overflow)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryHost {
    signer_accounts: BTreeMap<Address, Address>,
    account_signers: BTreeMap<Address, Address>,
    locked: BTreeMap<Address, LockedBalance>,
    slashers: BTreeSet<Address>,
    balances: BTreeMap<Address, Amount>,
    total_minted: Amount,
    epoch: u64,
    block: u64,
    timestamp: u64,
}

impl InMemoryHost {
    pub const COLLATERAL_ACCOUNT: Address = Address([0xc0; 20]);

    pub fn new() -> Self {
        Self {
            epoch: 1,
            block: 1,
            ..Self::default()
        }
    }

    pub fn authorize_signer(&mut self, account: Address, signer: Address) {
        self.signer_accounts.insert(signer, account);
        self.account_signers.insert(account, signer);
    }

    /// Locks `amount` of fresh collateral for `account`.
    pub fn lock(&mut self, account: Address, amount: Amount) {
        let balance = self.locked.entry(account).or_default();
        balance.nonvoting = balance.nonvoting.saturating_add(amount);
    }

    /// Releases nonvoting collateral, as an unlock would.
    pub fn unlock(&mut self, account: Address, amount: Amount) -> Result<()> {
        let balance = self.locked.entry(account).or_default();
        if balance.nonvoting < amount {
            return Err(StakingError::InsufficientNonvotingBalance {
                requested: amount,
                available: balance.nonvoting,
            });
        }
        balance.nonvoting -= amount;
        Ok(())
    }

    pub fn add_slasher(&mut self, slasher: Address) {
        self.slashers.insert(slasher);
    }

    pub fn set_epoch(&mut self, epoch: u64) {
        self.epoch = epoch;
    }

    pub fn set_block(&mut self, block: u64) {
        self.block = block;
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Moves to the next epoch, advancing the block number and clock.
    pub fn advance_epoch(&mut self, blocks: u64, seconds: u64) {
        self.epoch += 1;
        self.block += blocks;
        self.timestamp += seconds;
    }

    pub fn locked_balance(&self, account: Address) -> LockedBalance {
        self.locked.get(&account).copied().unwrap_or_default()
    }

    pub fn balance_of(&self, account: Address) -> Amount {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn total_minted(&self) -> Amount {
        self.total_minted
    }

    /// Proof of possession accepted by this host for `(account, bls_key)`.
    pub fn proof_of_possession(account: Address, bls_key: &[u8]) -> Vec<u8> {
        Self::pop_digest(account, &[bls_key])
    }

    pub fn proof_of_possession_g1(account: Address, bls_key: &[u8], bls_g1_key: &[u8]) -> Vec<u8> {
        Self::pop_digest(account, &[bls_key, bls_g1_key])
    }

    fn pop_digest(account: Address, keys: &[&[u8]]) -> Vec<u8> {
        let mut first = Sha256::new();
        first.update(account.as_bytes());
        for key in keys {
            first.update(key);
        }
        let first = first.finalize();

        let mut second = Sha256::new();
        second.update(first);
        second.update(account.as_bytes());
        let second = second.finalize();

        let mut pop = first.to_vec();
        pop.extend_from_slice(&second);
        pop
    }
}

impl AccountIdentity for InMemoryHost {
    fn vote_signer_to_account(&self, signer: Address) -> Address {
        self.signer_accounts.get(&signer).copied().unwrap_or(signer)
    }

    fn signer_to_account(&self, signer: Address) -> Address {
        self.signer_accounts.get(&signer).copied().unwrap_or(signer)
    }

    fn validator_signer(&self, account: Address) -> Address {
        self.account_signers.get(&account).copied().unwrap_or(account)
    }
}

impl CollateralLedger for InMemoryHost {
    fn total_locked_gold(&self, account: Address) -> Amount {
        self.locked_balance(account).total()
    }

    fn nonvoting_locked_gold(&self, account: Address) -> Amount {
        self.locked_balance(account).nonvoting
    }

    fn increment_nonvoting_balance(&mut self, account: Address, amount: Amount) -> Result<()> {
        let delta = signed(amount)?;
        let balance = self.locked.entry(account).or_default();
        let nonvoting = balance.nonvoting.checked_add(amount).ok_or(StakingError::Overflow)?;
        balance.voting = balance.voting.checked_sub(delta).ok_or(StakingError::Underflow)?;
        balance.nonvoting = nonvoting;
        Ok(())
    }

    fn decrement_nonvoting_balance(&mut self, account: Address, amount: Amount) -> Result<()> {
        let balance = self.locked.entry(account).or_default();
        if balance.nonvoting < amount {
            return Err(StakingError::InsufficientNonvotingBalance {
                requested: amount,
                available: balance.nonvoting,
            });
        }
        let delta = signed(amount)?;
        balance.voting = balance.voting.checked_add(delta).ok_or(StakingError::Overflow)?;
        balance.nonvoting -= amount;
        Ok(())
    }

    fn is_slasher(&self, address: Address) -> bool {
        self.slashers.contains(&address)
    }

    fn collateral_account(&self) -> Address {
        Self::COLLATERAL_ACCOUNT
    }
}

impl EpochClock for InMemoryHost {
    fn epoch_number(&self) -> u64 {
        self.epoch
    }

    fn block_number(&self) -> u64 {
        self.block
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl BlsVerifier for InMemoryHost {
    fn check_proof_of_possession(&self, account: Address, bls_key: &[u8], pop: &[u8]) -> bool {
        Self::proof_of_possession(account, bls_key) == pop
    }

    fn check_proof_of_possession_g1(
        &self,
        account: Address,
        bls_key: &[u8],
        bls_g1_key: &[u8],
        pop: &[u8],
    ) -> bool {
        Self::proof_of_possession_g1(account, bls_key, bls_g1_key) == pop
    }
}

impl MintableToken for InMemoryHost {
    fn mint(&mut self, account: Address, amount: Amount) -> Result<()> {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(StakingError::Overflow)?;
        self.total_minted = self.total_minted.checked_add(amount).ok_or(StakingError::Overflow)?;
        Ok(())
    }
}
