use std::collections::HashSet;

use crate::data::FunctionRecord;
use crate::types::PairKeyPart;

/// Canonical, order-independent key for an unordered pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(PairKeyPart, PairKeyPart);

impl PairKey {
    /// Smaller key part.
    pub fn first(&self) -> &str {
        &self.0
    }

    /// Larger key part.
    pub fn second(&self) -> &str {
        &self.1
    }

    /// Both sides resolve to the same function.
    pub fn is_self_pair(&self) -> bool {
        self.0 == self.1
    }
}

/// Key for `(a, b)`: func ids when both carry one, else `qualified_name + range` for both.
pub fn pair_key(a: &FunctionRecord, b: &FunctionRecord) -> PairKey {
    let (left, right) = match (a.func_id(), b.func_id()) {
        (Some(left), Some(right)) => (left.to_string(), right.to_string()),
        _ => (a.location_key(), b.location_key()),
    };
    if left <= right {
        PairKey(left, right)
    } else {
        PairKey(right, left)
    }
}

/// Pair keys already emitted by one sampling call.
#[derive(Debug, Default)]
pub struct SeenPairs {
    seen: HashSet<PairKey>,
    rejected: usize,
}

impl SeenPairs {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`; returns `false` and counts a rejection when it is already present.
    pub fn insert_key(&mut self, key: PairKey) -> bool {
        if self.seen.insert(key) {
            true
        } else {
            self.rejected += 1;
            false
        }
    }

    /// Duplicate candidates discarded so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}
