//! TTL min-heap
//!
//! Binary min-heap ordered by absolute monotonic expiry. Each slot
//! carries its own heap position, and a side index maps keys to
//! positions so that a key's slot can be updated or removed without a
//! scan. Both are fixed up on every swap.

use bytes::Bytes;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;

type SlotIndex = HashMap<Bytes, usize, BuildHasherDefault<SipHasher13>>;

struct HeapSlot {
    /// Absolute expiry, monotonic milliseconds.
    expire_at: u64,
    key: Bytes,
    /// Invariant: `slots[slot.pos]` is this slot.
    pos: usize,
}

/// Min-heap of (expire_at, key) with an index by key.
pub struct TtlHeap {
    slots: Vec<HeapSlot>,
    index: SlotIndex,
}

impl TtlHeap {
    pub fn new() -> Self {
        TtlHeap {
            slots: Vec::new(),
            index: SlotIndex::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Insert a slot for `key` or reschedule the existing one.
    pub fn upsert(&mut self, key: Bytes, expire_at: u64) {
        if let Some(&pos) = self.index.get(&key) {
            self.reschedule(pos, expire_at);
            return;
        }
        let pos = self.slots.len();
        self.index.insert(key.clone(), pos);
        self.slots.push(HeapSlot {
            expire_at,
            key,
            pos,
        });
        self.sift_up(pos);
    }

    /// Drop the slot for `key`; true if one existed.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        match self.index.get(key) {
            Some(&pos) => {
                self.remove_at(pos);
                true
            }
            None => false,
        }
    }

    /// Expiry of the soonest slot.
    pub fn peek_min(&self) -> Option<u64> {
        self.slots.first().map(|slot| slot.expire_at)
    }

    /// Remove and return the soonest (key, expire_at).
    pub fn pop_min(&mut self) -> Option<(Bytes, u64)> {
        if self.slots.is_empty() {
            return None;
        }
        let slot = self.remove_at(0);
        Some((slot.key, slot.expire_at))
    }

    /// Expiry of `key`'s slot, if it has one.
    pub fn expire_at_of(&self, key: &[u8]) -> Option<u64> {
        self.index.get(key).map(|&pos| self.slots[pos].expire_at)
    }

    /// Change the expiry of the slot at `pos`; sifts up when the new
    /// value is smaller, down otherwise.
    fn reschedule(&mut self, pos: usize, expire_at: u64) {
        let old = self.slots[pos].expire_at;
        self.slots[pos].expire_at = expire_at;
        if expire_at < old {
            self.sift_up(pos);
        } else {
            self.sift_down(pos);
        }
    }

    /// Remove and return the slot at `pos`, dropping its index entry.
    fn remove_at(&mut self, pos: usize) -> HeapSlot {
        let last = self.slots.len() - 1;
        if pos != last {
            self.swap_slots(pos, last);
        }
        // the swap re-indexed the outgoing key at `last`; drop it for good
        let slot = self.slots.pop().expect("remove_at on empty heap");
        self.index.remove(&slot.key);
        if pos < self.slots.len() {
            // the slot moved into the hole can be out of order both ways
            self.sift_up(pos);
            self.sift_down(pos);
        }
        slot
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.slots.swap(a, b);
        self.slots[a].pos = a;
        self.slots[b].pos = b;
        let key_a = self.slots[a].key.clone();
        let key_b = self.slots[b].key.clone();
        self.index.insert(key_a, a);
        self.index.insert(key_b, b);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.slots[parent].expire_at <= self.slots[pos].expire_at {
                break;
            }
            self.swap_slots(parent, pos);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let left = 2 * pos + 1;
            let right = 2 * pos + 2;
            let mut min = pos;
            if left < self.slots.len()
                && self.slots[left].expire_at < self.slots[min].expire_at
            {
                min = left;
            }
            if right < self.slots.len()
                && self.slots[right].expire_at < self.slots[min].expire_at
            {
                min = right;
            }
            if min == pos {
                break;
            }
            self.swap_slots(min, pos);
            pos = min;
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        assert_eq!(self.slots.len(), self.index.len());
        for (i, slot) in self.slots.iter().enumerate() {
            assert_eq!(slot.pos, i, "stale position back-reference");
            assert_eq!(self.index.get(&slot.key), Some(&i), "stale index entry");
            if i > 0 {
                let parent = (i - 1) / 2;
                assert!(
                    self.slots[parent].expire_at <= slot.expire_at,
                    "heap order violated at {}",
                    i
                );
            }
        }
    }
}

impl Default for TtlHeap {
    fn default() -> Self {
        Self::new()
    }
}
