//! Command dispatcher
//!
//! Routes parsed commands to the appropriate handler. Command-level
//! faults (unknown name, wrong arity, bad arguments) become ERR replies
//! and never terminate the connection; only the caller decides that.

use crate::buffer::{BufferError, RingBuffer};
use crate::clock;
use crate::commands::{CommandContext, CommandRegistry};
use crate::protocol::ErrorCode;
use bytes::Bytes;
use tracing::{debug, warn};

/// Command dispatcher
///
/// Owns the registry and the execution context; every request on every
/// connection funnels through here in arrival order.
pub struct Dispatcher {
    registry: CommandRegistry,
    context: CommandContext,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            context: CommandContext::new(),
        }
    }

    /// Execute one command, encoding the reply into `out`.
    ///
    /// `Err` means the outgoing buffer overflowed; the connection layer
    /// rolls back the partial reply.
    pub fn dispatch(&mut self, cmd: &[Bytes], out: &mut RingBuffer) -> Result<(), BufferError> {
        // reap due keys before any command touches the keyspace
        self.context.keyspace.process_expired(clock::monotonic_ms());

        if cmd.is_empty() {
            return out.append_err(ErrorCode::NoCmd, "no input");
        }

        let command = std::str::from_utf8(&cmd[0])
            .ok()
            .and_then(|name| self.registry.get(name));
        let command = match command {
            Some(command) => command,
            None => {
                warn!("unknown command: {}", String::from_utf8_lossy(&cmd[0]));
                return out.append_err(ErrorCode::NoCmd, "command doesn't exist");
            }
        };

        let args = &cmd[1..];
        if args.len() != command.arity() {
            return out.append_err(ErrorCode::Invalid, command.usage());
        }

        debug!("dispatching command: {}", command.name());
        command.execute(&mut self.context, args, out)
    }

    /// Soonest scheduled key expiry, for the event-loop timeout.
    pub fn next_expire_at(&self) -> Option<u64> {
        self.context.keyspace.next_expire_at()
    }

    /// Context access for tests and inspection.
    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CommandContext {
        &mut self.context
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_response, Value};

    fn dispatch(dispatcher: &mut Dispatcher, tokens: &[&str]) -> Value {
        let cmd: Vec<Bytes> = tokens.iter().map(|t| Bytes::from(t.to_string())).collect();
        let mut out = RingBuffer::new();
        dispatcher.dispatch(&cmd, &mut out).unwrap();
        decode_response(&out.copy_to_vec(out.len())).unwrap()
    }

    #[test]
    fn test_dispatch_set_get_del() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dispatch(&mut dispatcher, &["set", "a", "1"]), Value::Nil);
        assert_eq!(
            dispatch(&mut dispatcher, &["get", "a"]),
            Value::Str(Bytes::from("1"))
        );
        assert_eq!(dispatch(&mut dispatcher, &["del", "a"]), Value::Int(1));
        assert_eq!(dispatch(&mut dispatcher, &["get", "a"]), Value::Nil);
    }

    #[test]
    fn test_dispatch_unknown_command() {
        let mut dispatcher = Dispatcher::new();
        match dispatch(&mut dispatcher, &["foo"]) {
            Value::Err { code, msg } => {
                assert_eq!(code, ErrorCode::NoCmd as i32);
                assert_eq!(msg, "command doesn't exist");
            }
            other => panic!("expected error reply, got {:?}", other),
        }
        // the dispatcher stays usable afterwards
        assert_eq!(dispatch(&mut dispatcher, &["set", "a", "1"]), Value::Nil);
    }

    #[test]
    fn test_dispatch_empty_command() {
        let mut dispatcher = Dispatcher::new();
        match dispatch(&mut dispatcher, &[]) {
            Value::Err { code, msg } => {
                assert_eq!(code, ErrorCode::NoCmd as i32);
                assert_eq!(msg, "no input");
            }
            other => panic!("expected error reply, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_wrong_arity() {
        let mut dispatcher = Dispatcher::new();
        match dispatch(&mut dispatcher, &["get"]) {
            Value::Err { code, msg } => {
                assert_eq!(code, ErrorCode::Invalid as i32);
                assert_eq!(msg, "usage: get <key>");
            }
            other => panic!("expected error reply, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_case_insensitive() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dispatch(&mut dispatcher, &["SET", "a", "1"]), Value::Nil);
        assert_eq!(
            dispatch(&mut dispatcher, &["Get", "a"]),
            Value::Str(Bytes::from("1"))
        );
    }

    #[test]
    fn test_dispatch_zset_scenario() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dispatch(&mut dispatcher, &["zadd", "bob", "10"]), Value::Int(1));
        assert_eq!(dispatch(&mut dispatcher, &["zadd", "bob", "20"]), Value::Int(0));
        assert_eq!(dispatch(&mut dispatcher, &["zadd", "alice", "5"]), Value::Int(1));
        assert_eq!(
            dispatch(&mut dispatcher, &["zrange", "0", "10"]),
            Value::Arr(vec![
                Value::Str(Bytes::from("alice")),
                Value::Str(Bytes::from("bob")),
            ])
        );
    }
}
