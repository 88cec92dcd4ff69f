//! In-memory indexes
//!
//! The data structures behind the commands: the incrementally-rehashing
//! hash map, the TTL min-heap, the skip list, and the two compositions
//! built from them (keyspace and sorted set). Independent of protocol
//! and command handling.

mod dict;
mod heap;
mod keyspace;
mod skiplist;
mod zset;

pub use dict::Dict;
pub use heap::TtlHeap;
pub use keyspace::{Keyspace, TtlStatus, TTL_NONE};
pub use skiplist::SkipList;
pub use zset::{SortedSet, ZAddOutcome};
