//! Identifier indexing and rated-pair tracking.
//!
//! External identifiers (any hashable key type) are mapped to dense
//! zero-based indices in first-seen order during the fitting pass. The
//! factor matrices are addressed by these indices, so density with no gaps
//! is an invariant here, not a convention.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Bidirectional mapping between external keys and dense indices.
///
/// Indices are assigned in insertion order starting at 0. Built once per
/// fit and replaced wholesale by the next fit, never merged.
#[derive(Debug, Clone, Default)]
pub struct IdIndex<K> {
    forward: HashMap<K, usize>,
    keys: Vec<K>,
}

impl<K: Eq + Hash + Clone> IdIndex<K> {
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            keys: Vec::new(),
        }
    }

    /// Return the existing index for `key`, or assign the next dense index
    pub fn get_or_assign(&mut self, key: &K) -> usize {
        if let Some(&index) = self.forward.get(key) {
            return index;
        }
        let index = self.keys.len();
        self.forward.insert(key.clone(), index);
        self.keys.push(key.clone());
        index
    }

    /// Read-only lookup; `None` denotes an entity unseen during fitting
    pub fn lookup(&self, key: &K) -> Option<usize> {
        self.forward.get(key).copied()
    }

    /// The key assigned to `index`. Panics only on indices this map never
    /// produced, which would be a bug in the caller.
    pub fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    /// All keys in insertion (first-seen) order
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Per-user set of item indices observed during training.
///
/// Contains exactly the deduplicated (user, item) pairs of the training set;
/// used to drop already-rated items from unrestricted recommendations.
#[derive(Debug, Clone, Default)]
pub struct RatedSet {
    by_user: HashMap<usize, HashSet<usize>>,
}

impl RatedSet {
    pub fn new() -> Self {
        Self {
            by_user: HashMap::new(),
        }
    }

    pub fn insert(&mut self, user_index: usize, item_index: usize) {
        self.by_user
            .entry(user_index)
            .or_default()
            .insert(item_index);
    }

    /// Items the user interacted with during training, if any
    pub fn items(&self, user_index: usize) -> Option<&HashSet<usize>> {
        self.by_user.get(&user_index)
    }
}
