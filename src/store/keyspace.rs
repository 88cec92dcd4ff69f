//! Keyspace: the key/value map and its TTL heap, kept consistent
//!
//! A key has at most one heap slot, and only while it exists in the map.
//! Deletion removes the heap slot before the map entry; the expiry sweep
//! pops due slots and erases the keys they point at.

use super::dict::Dict;
use super::heap::TtlHeap;
use bytes::Bytes;

/// Status of a TTL-touching operation, encoded as the command reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// The key exists and the operation applied.
    Ok,
    /// The key has expired or never existed.
    Expired,
}

impl TtlStatus {
    pub fn as_int(self) -> i64 {
        match self {
            TtlStatus::Ok => 1,
            TtlStatus::Expired => -2,
        }
    }
}

/// Reply value for `ttl` when the key exists without an expiry.
pub const TTL_NONE: i64 = -1;

pub struct Keyspace {
    map: Dict<Bytes>,
    ttl: TtlHeap,
}

impl Keyspace {
    pub fn new() -> Self {
        Keyspace {
            map: Dict::new(),
            ttl: TtlHeap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn get(&mut self, key: &[u8]) -> Option<&Bytes> {
        self.map.get(key)
    }

    /// Insert or overwrite. An existing TTL is left in place.
    pub fn set(&mut self, key: Bytes, value: Bytes) {
        self.map.insert(key, value);
    }

    /// Remove a key and its heap slot; true if the key existed.
    pub fn del(&mut self, key: &[u8]) -> bool {
        self.ttl.remove(key);
        self.map.remove(key).is_some()
    }

    /// Schedule `key` to expire `ttl_secs` from `now`. A negative TTL
    /// clears any expiry instead, exactly like `persist`.
    pub fn expire(&mut self, key: Bytes, ttl_secs: i64, now: u64) -> TtlStatus {
        if !self.map.contains_key(&key) {
            return TtlStatus::Expired;
        }
        if ttl_secs < 0 {
            return if self.ttl.remove(&key) {
                TtlStatus::Ok
            } else {
                TtlStatus::Expired
            };
        }
        let expire_at = now.saturating_add(ttl_secs as u64 * 1000);
        self.ttl.upsert(key, expire_at);
        TtlStatus::Ok
    }

    /// Clear the expiry on `key`; `Ok` only when a slot was removed.
    pub fn persist(&mut self, key: &[u8]) -> TtlStatus {
        if !self.map.contains_key(key) {
            return TtlStatus::Expired;
        }
        if self.ttl.remove(key) {
            TtlStatus::Ok
        } else {
            TtlStatus::Expired
        }
    }

    /// Remaining whole seconds until expiry, [`TTL_NONE`] for a key
    /// without one, or -2 for a missing key.
    pub fn ttl(&mut self, key: &[u8], now: u64) -> i64 {
        if !self.map.contains_key(key) {
            return TtlStatus::Expired.as_int();
        }
        match self.ttl.expire_at_of(key) {
            Some(expire_at) => (expire_at.saturating_sub(now) / 1000) as i64,
            None => TTL_NONE,
        }
    }

    /// Erase every key whose expiry has passed.
    pub fn process_expired(&mut self, now: u64) {
        while let Some(expire_at) = self.ttl.peek_min() {
            if expire_at > now {
                break;
            }
            if let Some((key, _)) = self.ttl.pop_min() {
                self.map.remove(&key);
            }
        }
    }

    /// Soonest scheduled expiry, for the event-loop timeout.
    pub fn next_expire_at(&self) -> Option<u64> {
        self.ttl.peek_min()
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_set_get_del() {
        let mut ks = Keyspace::new();
        ks.set(b("a"), b("1"));
        assert_eq!(ks.get(b"a"), Some(&b("1")));
        assert!(ks.del(b"a"));
        assert!(!ks.del(b"a"));
        assert_eq!(ks.get(b"a"), None);
    }

    #[test]
    fn test_expire_and_sweep() {
        let mut ks = Keyspace::new();
        ks.set(b("x"), b("hello"));
        assert_eq!(ks.expire(b("x"), 1, 1000), TtlStatus::Ok);
        assert_eq!(ks.ttl(b"x", 1000), 1);

        // not due yet
        ks.process_expired(1999);
        assert!(ks.get(b"x").is_some());

        // due now
        ks.process_expired(2000);
        assert_eq!(ks.get(b"x"), None);
        assert_eq!(ks.ttl(b"x", 2000), -2);
    }

    #[test]
    fn test_expire_missing_key() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.expire(b("nope"), 10, 0), TtlStatus::Expired);
        assert_eq!(ks.ttl(b"nope", 0), -2);
    }

    #[test]
    fn test_negative_ttl_is_persist() {
        let mut ks = Keyspace::new();
        ks.set(b("k"), b("v"));
        assert_eq!(ks.expire(b("k"), 100, 0), TtlStatus::Ok);
        assert_eq!(ks.expire(b("k"), -1, 0), TtlStatus::Ok);
        assert_eq!(ks.ttl(b"k", 0), TTL_NONE);
        // with no slot left, both report expired
        assert_eq!(ks.expire(b("k"), -1, 0), TtlStatus::Expired);
        assert_eq!(ks.persist(b"k"), TtlStatus::Expired);
    }

    #[test]
    fn test_persist_keeps_key() {
        let mut ks = Keyspace::new();
        ks.set(b("k"), b("v"));
        ks.expire(b("k"), 1, 0);
        assert_eq!(ks.persist(b"k"), TtlStatus::Ok);
        // long past the old deadline, the key survives
        ks.process_expired(10_000);
        assert!(ks.get(b"k").is_some());
    }

    #[test]
    fn test_del_drops_heap_slot() {
        let mut ks = Keyspace::new();
        ks.set(b("k"), b("v"));
        ks.expire(b("k"), 5, 0);
        assert!(ks.del(b"k"));
        assert_eq!(ks.next_expire_at(), None);
    }

    #[test]
    fn test_overwrite_keeps_ttl() {
        let mut ks = Keyspace::new();
        ks.set(b("k"), b("v1"));
        ks.expire(b("k"), 30, 0);
        ks.set(b("k"), b("v2"));
        assert_eq!(ks.ttl(b"k", 0), 30);
        assert_eq!(ks.get(b"k"), Some(&b("v2")));
    }

    #[test]
    fn test_sweep_order() {
        let mut ks = Keyspace::new();
        for (key, secs) in [("a", 3), ("b", 1), ("c", 2)] {
            ks.set(b(key), b("v"));
            ks.expire(b(key), secs, 0);
        }
        assert_eq!(ks.next_expire_at(), Some(1000));
        ks.process_expired(2000);
        assert_eq!(ks.get(b"a"), Some(&b("v")));
        assert_eq!(ks.get(b"b"), None);
        assert_eq!(ks.get(b"c"), None);
    }
}
