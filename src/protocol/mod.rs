//! Binary protocol
//!
//! Length-prefixed framing with a tagged response encoding. Parsing and
//! decoding live here; the typed appenders that produce responses live on
//! the ring buffer, which writes the same tag scheme.

mod codec;
mod wire;

pub use codec::{decode_response, parse_request, DecodeError, ParseError, Value};
pub use wire::{ErrorCode, Tag, DEFAULT_PORT, HEADER_SIZE, MAX_MSG_LEN};
