//! Sorted set commands (zadd, zrem, zrange)

use super::{parse_count, parse_score, Command, CommandContext};
use crate::buffer::{BufferError, RingBuffer};
use crate::protocol::ErrorCode;
use crate::store::ZAddOutcome;
use bytes::Bytes;

/// zadd name score - insert a member or update its score
///
/// Replies INT(1) when the member was added, INT(0) when an existing
/// member was rescored.
pub struct ZAddCommand;

impl Command for ZAddCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        let score = match parse_score(&args[1]) {
            Ok(score) => score,
            Err(msg) => return out.append_err(ErrorCode::Invalid, msg),
        };
        let added = match ctx.zset.insert(args[0].clone(), score) {
            ZAddOutcome::Added => 1,
            ZAddOutcome::Updated => 0,
        };
        out.append_int(added)
    }

    fn name(&self) -> &'static str {
        "zadd"
    }

    fn arity(&self) -> usize {
        2
    }

    fn usage(&self) -> &'static str {
        "usage: zadd <key> <score>"
    }
}

/// zrem name - remove a member
///
/// Replies INT(1) when the member existed, INT(0) otherwise.
pub struct ZRemCommand;

impl Command for ZRemCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        let removed = ctx.zset.remove(&args[0]);
        out.append_int(removed as i64)
    }

    fn name(&self) -> &'static str {
        "zrem"
    }

    fn arity(&self) -> usize {
        1
    }

    fn usage(&self) -> &'static str {
        "usage: zrem <key>"
    }
}

/// zrange score count - members from a score lower bound
///
/// Replies ARR of up to `count` member names in (score, name) order,
/// starting at the first member whose score is >= the bound.
pub struct ZRangeCommand;

impl Command for ZRangeCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        let bound = match parse_score(&args[0]) {
            Ok(bound) => bound,
            Err(msg) => return out.append_err(ErrorCode::Invalid, msg),
        };
        let count = match parse_count(&args[1]) {
            Ok(count) => count,
            Err(msg) => return out.append_err(ErrorCode::Invalid, msg),
        };
        let names = ctx.zset.range(bound, count);
        out.append_arr(names.len() as u32)?;
        for name in &names {
            out.append_str(name)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "zrange"
    }

    fn arity(&self) -> usize {
        2
    }

    fn usage(&self) -> &'static str {
        "usage: zrange <from> <count>"
    }
}
