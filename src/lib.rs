//! CobaltDB - a lightweight, single-threaded in-memory key-value store
//!
//! CobaltDB serves point lookups, TTL expiration and a sorted set over a
//! compact length-prefixed binary protocol. One thread runs a poll-based
//! event loop; connections pipeline requests through fixed-capacity ring
//! buffers, and the indexes (an incrementally-rehashing hash map, a TTL
//! min-heap and a skip list) are built for predictable per-operation
//! latency.
//!
//! Module responsibilities:
//! - [`buffer`]: bounded ring buffers with the typed response appenders
//! - [`protocol`]: framing constants, request parser, value decoder
//! - [`store`]: the in-memory indexes and their compositions
//! - [`commands`]: one handler per command behind the `Command` trait
//! - [`dispatch`]: registry lookup, arity checks, expiry sweeps
//! - [`server`]: the event loop, connection state machine and timers

pub mod buffer;
pub mod clock;
pub mod commands;
pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod store;

/// Re-export commonly used types
pub use buffer::{BufferError, RingBuffer};
pub use dispatch::Dispatcher;
pub use protocol::{Value, DEFAULT_PORT, HEADER_SIZE, MAX_MSG_LEN};
pub use server::Server;
pub use store::{Keyspace, SortedSet};
