//! Order-preserving enumerable selector set with O(1) membership and removal.
//!
//! Backed by a dense entry vector plus a position map holding 1-based slots;
//! position 0 is the "not present" sentinel and is never stored. Removal
//! swaps the removed slot with the current last entry, so iteration order is
//! unspecified after any removal — callers may rely on it for membership
//! only.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vault_types::Selector;

/// A set of selectors supporting O(1) membership, insertion, and swap-delete.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EnumerableSelectorSet {
    entries: Vec<Selector>,
    /// Selector → 1-based position into `entries`. Absent ≡ position 0.
    positions: HashMap<Selector, usize>,
}

impl EnumerableSelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a selector. Returns false when it was already present.
    pub fn insert(&mut self, selector: Selector) -> bool {
        if self.positions.contains_key(&selector) {
            return false;
        }
        self.entries.push(selector.clone());
        self.positions.insert(selector, self.entries.len());
        true
    }

    /// Remove a selector by swapping its slot with the last entry.
    /// Returns false when it was not present.
    pub fn remove(&mut self, selector: &Selector) -> bool {
        let Some(position) = self.positions.remove(selector) else {
            return false;
        };

        let index = position - 1;
        self.entries.swap_remove(index);
        if index < self.entries.len() {
            // The former last entry was backfilled into the vacated slot.
            let moved = self.entries[index].clone();
            self.positions.insert(moved, position);
        }
        true
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.positions.contains_key(selector)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enumerate current members. Order is insertion order until the first
    /// removal, unspecified afterwards.
    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(name: &str) -> Selector {
        Selector::new(name)
    }

    #[test]
    fn insert_is_idempotent_on_presence() {
        let mut set = EnumerableSelectorSet::new();
        assert!(set.insert(sel("collect")));
        assert!(!set.insert(sel("collect")));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&sel("collect")));
    }

    #[test]
    fn remove_backfills_with_last_entry() {
        let mut set = EnumerableSelectorSet::new();
        set.insert(sel("a"));
        set.insert(sel("b"));
        set.insert(sel("c"));

        assert!(set.remove(&sel("a")));
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&sel("a")));
        assert!(set.contains(&sel("b")));
        assert!(set.contains(&sel("c")));

        // The backfilled entry must remain reachable through the map.
        assert!(set.remove(&sel("c")));
        assert!(set.remove(&sel("b")));
        assert!(set.is_empty());
    }

    #[test]
    fn remove_absent_is_a_noop() {
        let mut set = EnumerableSelectorSet::new();
        set.insert(sel("a"));
        assert!(!set.remove(&sel("missing")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn membership_survives_interleaved_mutations() {
        let mut set = EnumerableSelectorSet::new();
        for name in ["a", "b", "c", "d", "e"] {
            set.insert(sel(name));
        }
        set.remove(&sel("b"));
        set.remove(&sel("d"));
        set.insert(sel("f"));

        let members: Vec<_> = set.iter().cloned().collect();
        assert_eq!(members.len(), set.len());
        for member in &members {
            assert!(set.contains(member));
        }
        assert!(!set.contains(&sel("b")));
        assert!(!set.contains(&sel("d")));
    }
}
