//! Validators ordered by the total votes cast for them.
//!
//! Entries live in an ordered set keyed by `(inverted votes, address)`, so
//! iteration yields descending vote totals with ties broken by ascending
//! address. Insert, update and remove are `O(log n)`.
//!
//! Callers may pass a [`RankingHint`] naming the entries they expect to end
//! up next to the updated one. Hints are not needed to find the position,
//! but when given they must agree with the new value or the operation is
//! rejected.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StakingError};
use crate::host::{Address, Amount};

/// Neighbours expected around an entry after it is repositioned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingHint {
    /// Entry expected to rank just below (value not greater).
    pub lesser: Option<Address>,
    /// Entry expected to rank just above (value not smaller).
    pub greater: Option<Address>,
}

impl RankingHint {
    pub fn new(lesser: Option<Address>, greater: Option<Address>) -> Self {
        Self { lesser, greater }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct RankKey {
    inverted: Amount,
    address: Address,
}

impl RankKey {
    fn new(address: Address, value: Amount) -> Self {
        Self {
            inverted: Amount::MAX - value,
            address,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SortedRanking {
    values: BTreeMap<Address, Amount>,
    order: BTreeSet<RankKey>,
}

impl SortedRanking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address, value: Amount, hint: RankingHint) -> Result<()> {
        if self.contains(&address) {
            return Err(StakingError::RankingEntryExists(address));
        }
        self.check_hint(address, value, hint)?;
        self.values.insert(address, value);
        self.order.insert(RankKey::new(address, value));
        Ok(())
    }

    pub fn update(&mut self, address: Address, value: Amount, hint: RankingHint) -> Result<()> {
        let current = self
            .value(&address)
            .ok_or(StakingError::RankingEntryMissing(address))?;
        self.check_hint(address, value, hint)?;
        self.order.remove(&RankKey::new(address, current));
        self.order.insert(RankKey::new(address, value));
        self.values.insert(address, value);
        Ok(())
    }

    /// Removes an entry and returns its value.
    pub fn remove(&mut self, address: &Address) -> Result<Amount> {
        let value = self
            .values
            .remove(address)
            .ok_or(StakingError::RankingEntryMissing(*address))?;
        self.order.remove(&RankKey::new(*address, value));
        Ok(value)
    }

    /// Puts an entry back to `value`, or drops it for `None`, without hint
    /// checks.
    pub(crate) fn restore_entry(&mut self, address: Address, value: Option<Amount>) {
        if let Some(current) = self.values.remove(&address) {
            self.order.remove(&RankKey::new(address, current));
        }
        if let Some(value) = value {
            self.values.insert(address, value);
            self.order.insert(RankKey::new(address, value));
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.values.contains_key(address)
    }

    pub fn value(&self, address: &Address) -> Option<Amount> {
        self.values.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in ranking order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, Amount)> + '_ {
        self.order
            .iter()
            .map(|key| (key.address, Amount::MAX - key.inverted))
    }

    /// The first `n` addresses in ranking order.
    pub fn head_n(&self, n: usize) -> Vec<Address> {
        self.iter().take(n).map(|(address, _)| address).collect()
    }

    /// Counts leading entries whose value is at least `threshold`, stopping
    /// after `cap` entries.
    pub fn num_elements_greater_than(&self, threshold: Amount, cap: usize) -> usize {
        self.iter()
            .take(cap)
            .take_while(|(_, value)| *value >= threshold)
            .count()
    }

    pub fn keys(&self) -> Vec<Address> {
        self.iter().map(|(address, _)| address).collect()
    }

    /// Addresses and values, both in ranking order.
    pub fn elements(&self) -> (Vec<Address>, Vec<Amount>) {
        self.iter().unzip()
    }

    fn check_hint(&self, address: Address, value: Amount, hint: RankingHint) -> Result<()> {
        if let Some(lesser) = hint.lesser {
            match self.value(&lesser) {
                Some(other) if lesser != address && other <= value => {}
                _ => return Err(StakingError::InvalidRankingHint(lesser)),
            }
        }
        if let Some(greater) = hint.greater {
            match self.value(&greater) {
                Some(other) if greater != address && other >= value => {}
                _ => return Err(StakingError::InvalidRankingHint(greater)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn ranking(entries: &[(u64, Amount)]) -> SortedRanking {
        let mut ranking = SortedRanking::new();
        for (n, value) in entries {
            ranking.insert(addr(*n), *value, RankingHint::default()).unwrap();
        }
        ranking
    }

    #[test]
    fn test_orders_descending_with_address_tiebreak() {
        let ranking = ranking(&[(3, 50), (1, 500), (4, 300), (2, 300)]);
        assert_eq!(ranking.keys(), vec![addr(1), addr(2), addr(4), addr(3)]);
        assert_eq!(ranking.elements().1, vec![500, 300, 300, 50]);
    }

    #[test]
    fn test_update_repositions_entry() {
        let mut ranking = ranking(&[(1, 500), (2, 300), (3, 150)]);
        ranking.update(addr(3), 600, RankingHint::new(Some(addr(1)), None)).unwrap();
        assert_eq!(ranking.head_n(2), vec![addr(3), addr(1)]);
        assert_eq!(ranking.value(&addr(3)), Some(600));
        assert_eq!(ranking.len(), 3);
    }

    #[test]
    fn test_inconsistent_hint_is_rejected() {
        let mut ranking = ranking(&[(1, 500), (2, 300)]);
        let result = ranking.update(addr(2), 600, RankingHint::new(None, Some(addr(1))));
        assert_eq!(result, Err(StakingError::InvalidRankingHint(addr(1))));
        // untouched on failure
        assert_eq!(ranking.value(&addr(2)), Some(300));

        let result = ranking.insert(addr(3), 10, RankingHint::new(Some(addr(9)), None));
        assert_eq!(result, Err(StakingError::InvalidRankingHint(addr(9))));
        assert!(!ranking.contains(&addr(3)));
    }

    #[test]
    fn test_duplicate_and_missing_entries() {
        let mut ranking = ranking(&[(1, 5)]);
        assert_eq!(
            ranking.insert(addr(1), 7, RankingHint::default()),
            Err(StakingError::RankingEntryExists(addr(1)))
        );
        assert_eq!(
            ranking.update(addr(2), 7, RankingHint::default()),
            Err(StakingError::RankingEntryMissing(addr(2)))
        );
        assert_eq!(ranking.remove(&addr(1)), Ok(5));
        assert!(ranking.is_empty());
        assert!(ranking.remove(&addr(1)).is_err());
    }

    #[test]
    fn test_num_elements_greater_than_respects_cap() {
        let ranking = ranking(&[(1, 500), (2, 300), (3, 150), (4, 50)]);
        assert_eq!(ranking.num_elements_greater_than(100, 10), 3);
        assert_eq!(ranking.num_elements_greater_than(100, 2), 2);
        assert_eq!(ranking.num_elements_greater_than(150, 10), 3);
        assert_eq!(ranking.num_elements_greater_than(1000, 10), 0);
        assert_eq!(ranking.num_elements_greater_than(0, 10), 4);
    }
}
