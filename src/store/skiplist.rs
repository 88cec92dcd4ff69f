//! Probabilistic skip list
//!
//! Ordered multiset keyed by (score, name). Nodes live in an arena with
//! a free list; links are arena indices, which keeps the multi-level
//! doubly linked structure in safe code. Head and tail sentinels sit at
//! -inf and +inf on every level. Level promotion is a fair coin per
//! level from the thread-local RNG, with at most one new top level per
//! insert.

use bytes::Bytes;
use ordered_float::OrderedFloat;
use rand::Rng;

struct Node {
    score: OrderedFloat<f64>,
    name: Bytes,
    /// Successor per level; `forward.len()` is this node's height.
    forward: Vec<usize>,
    /// Predecessor per level.
    backward: Vec<usize>,
}

/// Ordered multiset of (score, name) pairs.
pub struct SkipList {
    arena: Vec<Option<Node>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    /// Index of the current top level.
    level: usize,
    len: usize,
}

impl SkipList {
    pub fn new() -> Self {
        let head = Node {
            score: OrderedFloat(f64::NEG_INFINITY),
            name: Bytes::new(),
            forward: vec![1],
            backward: vec![usize::MAX],
        };
        let tail = Node {
            score: OrderedFloat(f64::INFINITY),
            name: Bytes::new(),
            forward: vec![usize::MAX],
            backward: vec![0],
        };
        SkipList {
            arena: vec![Some(head), Some(tail)],
            free: Vec::new(),
            head: 0,
            tail: 1,
            level: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels currently allocated.
    pub fn levels(&self) -> usize {
        self.level + 1
    }

    fn node(&self, idx: usize) -> &Node {
        self.arena[idx].as_ref().expect("stale skip list link")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        self.arena[idx].as_mut().expect("stale skip list link")
    }

    /// True when (score, name) sorts strictly before the node at `idx`.
    fn key_before(&self, idx: usize, score: OrderedFloat<f64>, name: &[u8]) -> bool {
        let node = self.node(idx);
        match node.score.cmp(&score) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => node.name.as_ref() < name,
            std::cmp::Ordering::Greater => false,
        }
    }

    /// Predecessor of (score, name) on every level, top to bottom.
    fn find_predecessors(&self, score: OrderedFloat<f64>, name: &[u8]) -> Vec<usize> {
        let mut update = vec![self.head; self.level + 1];
        let mut x = self.head;
        for k in (0..=self.level).rev() {
            loop {
                let next = self.node(x).forward[k];
                if next == self.tail || !self.key_before(next, score, name) {
                    break;
                }
                x = next;
            }
            update[k] = x;
        }
        update
    }

    /// Coin-flip height for a new node, capped one above the current top.
    fn random_height(&self) -> usize {
        let mut rng = rand::thread_rng();
        let max = self.level + 2;
        let mut height = 1;
        while height < max && rng.gen_bool(0.5) {
            height += 1;
        }
        height
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.arena[idx] = Some(node);
                idx
            }
            None => {
                self.arena.push(Some(node));
                self.arena.len() - 1
            }
        }
    }

    /// Insert a (score, name) pair. Duplicate names are the sorted set's
    /// concern; the list itself admits them.
    pub fn insert(&mut self, score: f64, name: Bytes) {
        let score = OrderedFloat(score);
        let mut update = self.find_predecessors(score, &name);
        let height = self.random_height();

        if height > self.level + 1 {
            // new top level: extend both sentinels and route through head
            self.level += 1;
            let tail = self.tail;
            let head = self.head;
            self.node_mut(head).forward.push(tail);
            self.node_mut(head).backward.push(usize::MAX);
            self.node_mut(tail).forward.push(usize::MAX);
            self.node_mut(tail).backward.push(head);
            update.push(self.head);
        }

        let idx = self.alloc(Node {
            score,
            name,
            forward: vec![usize::MAX; height],
            backward: vec![usize::MAX; height],
        });

        for (k, &pred) in update.iter().enumerate().take(height) {
            let succ = self.node(pred).forward[k];
            self.node_mut(idx).forward[k] = succ;
            self.node_mut(idx).backward[k] = pred;
            self.node_mut(pred).forward[k] = idx;
            self.node_mut(succ).backward[k] = idx;
        }
        self.len += 1;
    }

    /// Unlink the exact (score, name) node; true if it was present.
    pub fn remove(&mut self, score: f64, name: &[u8]) -> bool {
        let score = OrderedFloat(score);
        let update = self.find_predecessors(score, name);
        let candidate = self.node(update[0]).forward[0];
        if candidate == self.tail {
            return false;
        }
        {
            let node = self.node(candidate);
            if node.score != score || node.name.as_ref() != name {
                return false;
            }
        }

        let height = self.node(candidate).forward.len();
        for k in 0..height {
            let pred = self.node(candidate).backward[k];
            let succ = self.node(candidate).forward[k];
            self.node_mut(pred).forward[k] = succ;
            self.node_mut(succ).backward[k] = pred;
        }
        self.arena[candidate] = None;
        self.free.push(candidate);
        self.len -= 1;

        // trim now-empty top levels
        while self.level > 0 && self.node(self.head).forward[self.level] == self.tail {
            let head = self.head;
            let tail = self.tail;
            self.node_mut(head).forward.pop();
            self.node_mut(head).backward.pop();
            self.node_mut(tail).forward.pop();
            self.node_mut(tail).backward.pop();
            self.level -= 1;
        }
        true
    }

    /// One-shot iterator over the bottom level, starting at the first
    /// node whose score is `>= bound`.
    pub fn range_from(&self, bound: f64) -> Range<'_> {
        let bound = OrderedFloat(bound);
        let mut x = self.head;
        for k in (0..=self.level).rev() {
            loop {
                let next = self.node(x).forward[k];
                if next == self.tail || self.node(next).score >= bound {
                    break;
                }
                x = next;
            }
        }
        Range {
            list: self,
            cursor: self.node(x).forward[0],
        }
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward walk over the bottom level; exhausted once it reaches the
/// tail sentinel.
pub struct Range<'a> {
    list: &'a SkipList,
    cursor: usize,
}

impl<'a> Iterator for Range<'a> {
    type Item = (f64, &'a Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == self.list.tail {
            return None;
        }
        let node = self.list.node(self.cursor);
        self.cursor = node.forward[0];
        Some((node.score.0, &node.name))
    }
}
