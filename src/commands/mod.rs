//! Command execution module
//!
//! Provides a unified interface for all commands through the Command
//! trait. Each command family is implemented in a separate file.

mod context;
mod registry;

// Command implementations
mod string;
mod ttl;
mod zset;

pub use context::CommandContext;
pub use registry::CommandRegistry;

use crate::buffer::{BufferError, RingBuffer};
use bytes::Bytes;

/// Command execution trait
///
/// A command encodes its reply directly into the connection's outgoing
/// buffer through the typed appenders; the dispatcher has already framed
/// the response and checked the arity.
pub trait Command: Send + Sync {
    /// Execute with the given context and arguments (the command name
    /// itself is not included). `Err` means the outgoing buffer ran out
    /// of space; the connection layer rolls the response back.
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError>;

    /// Command name as it appears on the wire.
    fn name(&self) -> &'static str;

    /// Exact number of arguments after the command name.
    fn arity(&self) -> usize;

    /// Usage line reported on an arity mismatch.
    fn usage(&self) -> &'static str;
}

/// Parse a score argument; scores must be finite.
pub(crate) fn parse_score(arg: &Bytes) -> Result<f64, &'static str> {
    let parsed = std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<f64>().ok());
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err("invalid score"),
    }
}

/// Parse a TTL argument in seconds; negative values are allowed and
/// clear the expiry.
pub(crate) fn parse_ttl(arg: &Bytes) -> Result<i64, &'static str> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or("invalid ttl")
}

/// Parse a result-count argument.
pub(crate) fn parse_count(arg: &Bytes) -> Result<usize, &'static str> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(|n| n as usize)
        .ok_or("invalid count")
}
