//! Command execution context

use crate::store::{Keyspace, SortedSet};

/// Context provided to commands during execution
///
/// Owns the data structures the commands act on: the key/value keyspace
/// with its TTL heap, and the sorted set.
pub struct CommandContext {
    pub keyspace: Keyspace,
    pub zset: SortedSet,
}

impl CommandContext {
    pub fn new() -> Self {
        CommandContext {
            keyspace: Keyspace::new(),
            zset: SortedSet::new(),
        }
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new()
    }
}
