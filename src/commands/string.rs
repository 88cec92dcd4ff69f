//! String commands (get, set, del)

use super::{Command, CommandContext};
use crate::buffer::{BufferError, RingBuffer};
use bytes::Bytes;

/// get key - look a value up
///
/// Replies STR(value), or NIL when the key is missing.
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        match ctx.keyspace.get(&args[0]) {
            Some(value) => out.append_str(value),
            None => out.append_nil(),
        }
    }

    fn name(&self) -> &'static str {
        "get"
    }

    fn arity(&self) -> usize {
        1
    }

    fn usage(&self) -> &'static str {
        "usage: get <key>"
    }
}

/// set key value - insert or overwrite
///
/// Replies NIL. An existing key keeps its TTL.
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        ctx.keyspace.set(args[0].clone(), args[1].clone());
        out.append_nil()
    }

    fn name(&self) -> &'static str {
        "set"
    }

    fn arity(&self) -> usize {
        2
    }

    fn usage(&self) -> &'static str {
        "usage: set <key> <val>"
    }
}

/// del key - remove a key
///
/// Replies INT(1) when a key was removed, INT(0) otherwise.
pub struct DelCommand;

impl Command for DelCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        let removed = ctx.keyspace.del(&args[0]);
        out.append_int(removed as i64)
    }

    fn name(&self) -> &'static str {
        "del"
    }

    fn arity(&self) -> usize {
        1
    }

    fn usage(&self) -> &'static str {
        "usage: del <key>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_response, Value};

    fn run(cmd: &dyn Command, ctx: &mut CommandContext, args: &[&str]) -> Value {
        let args: Vec<Bytes> = args.iter().map(|a| Bytes::from(a.to_string())).collect();
        let mut out = RingBuffer::new();
        cmd.execute(ctx, &args, &mut out).unwrap();
        decode_response(&out.copy_to_vec(out.len())).unwrap()
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut ctx = CommandContext::new();
        assert_eq!(run(&SetCommand, &mut ctx, &["a", "1"]), Value::Nil);
        assert_eq!(
            run(&GetCommand, &mut ctx, &["a"]),
            Value::Str(Bytes::from("1"))
        );
    }

    #[test]
    fn test_get_missing_is_nil() {
        let mut ctx = CommandContext::new();
        assert_eq!(run(&GetCommand, &mut ctx, &["nope"]), Value::Nil);
    }

    #[test]
    fn test_del_reports_removal() {
        let mut ctx = CommandContext::new();
        run(&SetCommand, &mut ctx, &["a", "1"]);
        assert_eq!(run(&DelCommand, &mut ctx, &["a"]), Value::Int(1));
        assert_eq!(run(&DelCommand, &mut ctx, &["a"]), Value::Int(0));
        assert_eq!(run(&GetCommand, &mut ctx, &["a"]), Value::Nil);
    }
}
