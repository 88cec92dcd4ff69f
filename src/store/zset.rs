//! Sorted set
//!
//! Composition of the hash map and the skip list over member names: the
//! map answers point queries (name -> score) and is authoritative for
//! membership, the skip list keeps (score, name) order for range
//! queries. Every mutation updates both sides.

use super::dict::Dict;
use super::skiplist::SkipList;
use bytes::Bytes;

/// Whether a zadd created a member or rescored an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZAddOutcome {
    Added,
    Updated,
}

pub struct SortedSet {
    members: Dict<f64>,
    order: SkipList,
}

impl SortedSet {
    pub fn new() -> Self {
        SortedSet {
            members: Dict::new(),
            order: SkipList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert a member or update its score. The old (score, name) node
    /// is removed before the new one goes in, so the list never holds
    /// two nodes for one member.
    pub fn insert(&mut self, name: Bytes, score: f64) -> ZAddOutcome {
        if let Some(&old_score) = self.members.get(&name) {
            self.order.remove(old_score, &name);
            if let Some(slot) = self.members.get_mut(&name) {
                *slot = score;
            }
            self.order.insert(score, name);
            ZAddOutcome::Updated
        } else {
            self.members.insert(name.clone(), score);
            self.order.insert(score, name);
            ZAddOutcome::Added
        }
    }

    /// Remove a member; true if it existed.
    pub fn remove(&mut self, name: &[u8]) -> bool {
        match self.members.remove(name) {
            Some(score) => {
                self.order.remove(score, name);
                true
            }
            None => false,
        }
    }

    /// Score of a member, if present.
    pub fn score(&mut self, name: &[u8]) -> Option<f64> {
        self.members.get(name).copied()
    }

    /// Up to `count` member names in (score, name) order, starting at
    /// the first member with score `>= bound`.
    pub fn range(&self, bound: f64, count: usize) -> Vec<Bytes> {
        self.order
            .range_from(bound)
            .take(count)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

impl Default for SortedSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_update() {
        let mut zset = SortedSet::new();
        assert_eq!(zset.insert(Bytes::from("bob"), 10.0), ZAddOutcome::Added);
        assert_eq!(zset.insert(Bytes::from("bob"), 20.0), ZAddOutcome::Updated);
        assert_eq!(zset.len(), 1);
        assert_eq!(zset.score(b"bob"), Some(20.0));
    }

    #[test]
    fn test_update_moves_member_in_order() {
        let mut zset = SortedSet::new();
        zset.insert(Bytes::from("bob"), 10.0);
        zset.insert(Bytes::from("alice"), 5.0);
        assert_eq!(zset.range(0.0, 10), vec!["alice", "bob"]);

        zset.insert(Bytes::from("alice"), 50.0);
        assert_eq!(zset.range(0.0, 10), vec!["bob", "alice"]);
        // the old node is gone: a range above the old score skips alice
        assert_eq!(zset.range(11.0, 10), vec!["alice"]);
    }

    #[test]
    fn test_remove() {
        let mut zset = SortedSet::new();
        zset.insert(Bytes::from("a"), 1.0);
        assert!(zset.remove(b"a"));
        assert!(!zset.remove(b"a"));
        assert!(zset.is_empty());
        assert_eq!(zset.score(b"a"), None);
    }

    #[test]
    fn test_map_and_list_stay_consistent_under_churn() {
        let mut zset = SortedSet::new();
        for round in 0..10 {
            for i in 0..40 {
                let name = Bytes::from(format!("m{}", i));
                zset.insert(name, ((i * 31 + round * 7) % 100) as f64);
            }
            for i in (0..40).step_by(4) {
                zset.remove(format!("m{}", i).as_bytes());
            }
        }

        // one list node per member, scores agreeing with the map
        let all = zset.range(f64::NEG_INFINITY, usize::MAX);
        assert_eq!(all.len(), zset.len());
        let mut seen = std::collections::HashSet::new();
        for name in &all {
            assert!(seen.insert(name.clone()), "duplicate node for {:?}", name);
            assert!(zset.score(name).is_some());
        }
    }

    #[test]
    fn test_range_bound_and_count() {
        let mut zset = SortedSet::new();
        for (name, score) in [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)] {
            zset.insert(Bytes::from(name), score);
        }
        assert_eq!(zset.range(2.0, 2), vec!["b", "c"]);
        assert_eq!(zset.range(2.5, 10), vec!["c", "d"]);
        assert!(zset.range(5.0, 10).is_empty());
        assert!(zset.range(0.0, 0).is_empty());
    }
}
