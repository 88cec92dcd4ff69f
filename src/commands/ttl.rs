//! TTL commands (expire, persist, ttl)

use super::{parse_ttl, Command, CommandContext};
use crate::buffer::{BufferError, RingBuffer};
use crate::clock;
use crate::protocol::ErrorCode;
use bytes::Bytes;

/// expire key seconds - schedule a key to expire
///
/// Replies INT(1) on success, INT(-2) when the key has expired or never
/// existed. A negative TTL clears the expiry instead.
pub struct ExpireCommand;

impl Command for ExpireCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        let ttl = match parse_ttl(&args[1]) {
            Ok(ttl) => ttl,
            Err(msg) => return out.append_err(ErrorCode::Invalid, msg),
        };
        let status = ctx
            .keyspace
            .expire(args[0].clone(), ttl, clock::monotonic_ms());
        out.append_int(status.as_int())
    }

    fn name(&self) -> &'static str {
        "expire"
    }

    fn arity(&self) -> usize {
        2
    }

    fn usage(&self) -> &'static str {
        "usage: expire <key> <ttl>"
    }
}

/// persist key - clear a key's expiry
///
/// Replies INT(1) when an expiry was removed, INT(-2) when the key is
/// missing or carried none.
pub struct PersistCommand;

impl Command for PersistCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        let status = ctx.keyspace.persist(&args[0]);
        out.append_int(status.as_int())
    }

    fn name(&self) -> &'static str {
        "persist"
    }

    fn arity(&self) -> usize {
        1
    }

    fn usage(&self) -> &'static str {
        "usage: persist <key>"
    }
}

/// ttl key - remaining seconds until expiry
///
/// Replies INT(seconds), INT(-1) when the key has no expiry, INT(-2)
/// when the key is missing.
pub struct TtlCommand;

impl Command for TtlCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext,
        args: &[Bytes],
        out: &mut RingBuffer,
    ) -> Result<(), BufferError> {
        let remaining = ctx.keyspace.ttl(&args[0], clock::monotonic_ms());
        out.append_int(remaining)
    }

    fn name(&self) -> &'static str {
        "ttl"
    }

    fn arity(&self) -> usize {
        1
    }

    fn usage(&self) -> &'static str {
        "usage: ttl <key>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_response, Value};
    use crate::store::TTL_NONE;

    fn run(cmd: &dyn Command, ctx: &mut CommandContext, args: &[&str]) -> Value {
        let args: Vec<Bytes> = args.iter().map(|a| Bytes::from(a.to_string())).collect();
        let mut out = RingBuffer::new();
        cmd.execute(ctx, &args, &mut out).unwrap();
        decode_response(&out.copy_to_vec(out.len())).unwrap()
    }

    fn ctx_with_key(key: &str) -> CommandContext {
        let mut ctx = CommandContext::new();
        ctx.keyspace
            .set(Bytes::from(key.to_string()), Bytes::from("v"));
        ctx
    }

    #[test]
    fn test_expire_then_ttl() {
        let mut ctx = ctx_with_key("k");
        assert_eq!(run(&ExpireCommand, &mut ctx, &["k", "100"]), Value::Int(1));
        match run(&TtlCommand, &mut ctx, &["k"]) {
            Value::Int(secs) => assert!((99..=100).contains(&secs)),
            other => panic!("expected integer reply, got {:?}", other),
        }
    }

    #[test]
    fn test_expire_missing_key() {
        let mut ctx = CommandContext::new();
        assert_eq!(
            run(&ExpireCommand, &mut ctx, &["nope", "10"]),
            Value::Int(-2)
        );
    }

    #[test]
    fn test_expire_invalid_ttl() {
        let mut ctx = ctx_with_key("k");
        match run(&ExpireCommand, &mut ctx, &["k", "soon"]) {
            Value::Err { code, msg } => {
                assert_eq!(code, ErrorCode::Invalid as i32);
                assert_eq!(msg, "invalid ttl");
            }
            other => panic!("expected error reply, got {:?}", other),
        }
    }

    #[test]
    fn test_ttl_without_expiry() {
        let mut ctx = ctx_with_key("k");
        assert_eq!(run(&TtlCommand, &mut ctx, &["k"]), Value::Int(TTL_NONE));
    }

    #[test]
    fn test_ttl_missing_key() {
        let mut ctx = CommandContext::new();
        assert_eq!(run(&TtlCommand, &mut ctx, &["nope"]), Value::Int(-2));
    }

    #[test]
    fn test_persist() {
        let mut ctx = ctx_with_key("k");
        run(&ExpireCommand, &mut ctx, &["k", "100"]);
        assert_eq!(run(&PersistCommand, &mut ctx, &["k"]), Value::Int(1));
        assert_eq!(run(&TtlCommand, &mut ctx, &["k"]), Value::Int(TTL_NONE));
        // no expiry left to remove
        assert_eq!(run(&PersistCommand, &mut ctx, &["k"]), Value::Int(-2));
    }

    #[test]
    fn test_negative_ttl_equals_persist() {
        let mut ctx = ctx_with_key("k");
        run(&ExpireCommand, &mut ctx, &["k", "100"]);
        assert_eq!(run(&ExpireCommand, &mut ctx, &["k", "-1"]), Value::Int(1));
        assert_eq!(run(&TtlCommand, &mut ctx, &["k"]), Value::Int(TTL_NONE));
    }
}
