//! Symmetric many-to-many index
//!
//! A [`Relation`] keeps two hash maps of sets, `forward: left -> {right}` and
//! `backward: right -> {left}`. Every mutator touches both maps, so
//! `r ∈ forward[l]` holds exactly when `l ∈ backward[r]`. Empty sets are
//! pruned, which makes "drop the entry if now empty" implicit.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Set of identifiers
pub type IdSet = HashSet<String>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    forward: HashMap<String, IdSet>,
    backward: HashMap<String, IdSet>,
}

impl Relation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `left` and `right`. Returns false if they were already linked.
    pub fn insert(&mut self, left: &str, right: &str) -> bool {
        let added = self
            .forward
            .entry(left.to_string())
            .or_default()
            .insert(right.to_string());
        self.backward
            .entry(right.to_string())
            .or_default()
            .insert(left.to_string());
        added
    }

    /// Unlink `left` and `right`. Unknown pairs are a no-op.
    pub fn remove(&mut self, left: &str, right: &str) -> bool {
        let removed = detach(&mut self.forward, left, right);
        detach(&mut self.backward, right, left);
        removed
    }

    /// Drop every link of `left`, returning the rights it pointed to
    pub fn remove_left(&mut self, left: &str) -> IdSet {
        let rights = self.forward.remove(left).unwrap_or_default();
        for right in &rights {
            detach(&mut self.backward, right, left);
        }
        rights
    }

    /// Drop every link of `right`, returning the lefts that pointed to it
    pub fn remove_right(&mut self, right: &str) -> IdSet {
        let lefts = self.backward.remove(right).unwrap_or_default();
        for left in &lefts {
            detach(&mut self.forward, left, right);
        }
        lefts
    }

    /// Replace all rights of `left`
    pub fn set_left<I, S>(&mut self, left: &str, rights: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.remove_left(left);
        for right in rights {
            self.insert(left, right.as_ref());
        }
    }

    /// Replace all lefts of `right`
    pub fn set_right<I, S>(&mut self, right: &str, lefts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.remove_right(right);
        for left in lefts {
            self.insert(left.as_ref(), right);
        }
    }

    pub fn contains(&self, left: &str, right: &str) -> bool {
        self.forward
            .get(left)
            .is_some_and(|rights| rights.contains(right))
    }

    /// Rights linked to `left` (empty if none)
    pub fn rights_of(&self, left: &str) -> IdSet {
        self.forward.get(left).cloned().unwrap_or_default()
    }

    /// Lefts linked to `right` (empty if none)
    pub fn lefts_of(&self, right: &str) -> IdSet {
        self.backward.get(right).cloned().unwrap_or_default()
    }

    /// Borrowing variant of [`Relation::rights_of`]
    pub fn rights_ref(&self, left: &str) -> Option<&IdSet> {
        self.forward.get(left)
    }

    /// Borrowing variant of [`Relation::lefts_of`]
    pub fn lefts_ref(&self, right: &str) -> Option<&IdSet> {
        self.backward.get(right)
    }

    pub fn has_left(&self, left: &str) -> bool {
        self.forward.contains_key(left)
    }

    pub fn has_right(&self, right: &str) -> bool {
        self.backward.contains_key(right)
    }

    /// Every identifier that appears on the left side of some link
    pub fn lefts(&self) -> impl Iterator<Item = &String> {
        self.forward.keys()
    }

    /// Every identifier that appears on the right side of some link
    pub fn rights(&self) -> impl Iterator<Item = &String> {
        self.backward.keys()
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.forward.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Find a link present in one direction only
    ///
    /// Returns the offending `(left, right)` pair, or `None` when both maps
    /// agree and hold no empty sets.
    pub fn find_asymmetry(&self) -> Option<(String, String)> {
        for (left, rights) in &self.forward {
            if rights.is_empty() {
                return Some((left.clone(), String::new()));
            }
            for right in rights {
                if !self.backward.get(right).is_some_and(|l| l.contains(left)) {
                    return Some((left.clone(), right.clone()));
                }
            }
        }
        for (right, lefts) in &self.backward {
            if lefts.is_empty() {
                return Some((String::new(), right.clone()));
            }
            for left in lefts {
                if !self.forward.get(left).is_some_and(|r| r.contains(right)) {
                    return Some((left.clone(), right.clone()));
                }
            }
        }
        None
    }
}

fn detach(map: &mut HashMap<String, IdSet>, key: &str, value: &str) -> bool {
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(value);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}
