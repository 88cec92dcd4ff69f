//! Request parser and response value decoder
//!
//! A request payload is `u32 nstr` followed by `nstr` length-prefixed
//! strings. The parser is strict: a short payload or trailing bytes are
//! protocol faults that terminate the connection, never command errors.
//!
//! A response payload is a single tagged value tree; [`decode_response`]
//! rebuilds it for the client CLI and for tests.

use super::wire::Tag;
use bytes::Bytes;
use std::fmt;

/// Request payload parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The string count was cut short.
    TruncatedCount,
    /// A string length prefix was cut short.
    TruncatedLength,
    /// A string body was shorter than its declared length.
    TruncatedContent(u32),
    /// Bytes remained after the declared strings.
    TrailingData,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TruncatedCount => {
                write!(f, "failed to read string count: unexpected early end of request")
            }
            ParseError::TruncatedLength => {
                write!(f, "failed to read string len: unexpected early end of request")
            }
            ParseError::TruncatedContent(len) => {
                write!(f, "failed to read string content: the string is too long, len: {}", len)
            }
            ParseError::TrailingData => write!(f, "unexpected trailing data"),
        }
    }
}

impl std::error::Error for ParseError {}

fn read_u32(cursor: &mut &[u8]) -> Option<u32> {
    if cursor.len() < 4 {
        return None;
    }
    let (head, rest) = cursor.split_at(4);
    *cursor = rest;
    Some(u32::from_le_bytes([head[0], head[1], head[2], head[3]]))
}

fn read_bytes<'a>(cursor: &mut &'a [u8], len: usize) -> Option<&'a [u8]> {
    if cursor.len() < len {
        return None;
    }
    let (head, rest) = cursor.split_at(len);
    *cursor = rest;
    Some(head)
}

/// Parse a request payload into its command tokens.
pub fn parse_request(payload: &[u8]) -> Result<Vec<Bytes>, ParseError> {
    let mut cursor = payload;
    let nstr = read_u32(&mut cursor).ok_or(ParseError::TruncatedCount)?;

    let mut cmd = Vec::with_capacity(nstr.min(16) as usize);
    for _ in 0..nstr {
        let len = read_u32(&mut cursor).ok_or(ParseError::TruncatedLength)?;
        let body = read_bytes(&mut cursor, len as usize)
            .ok_or(ParseError::TruncatedContent(len))?;
        cmd.push(Bytes::copy_from_slice(body));
    }

    if !cursor.is_empty() {
        return Err(ParseError::TrailingData);
    }
    Ok(cmd)
}

/// A decoded response value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Err { code: i32, msg: String },
    Str(Bytes),
    Int(i64),
    Dbl(f64),
    Arr(Vec<Value>),
}

/// Response payload decode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload ended inside a value.
    Truncated,
    /// An unrecognised tag byte.
    UnknownTag(u8),
    /// Bytes remained after the value tree.
    TrailingData,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated => write!(f, "unexpected early end of response"),
            DecodeError::UnknownTag(b) => write!(f, "unknown response tag: {}", b),
            DecodeError::TrailingData => write!(f, "unexpected trailing data in response"),
        }
    }
}

impl std::error::Error for DecodeError {}

fn decode_value(cursor: &mut &[u8]) -> Result<Value, DecodeError> {
    let tag = match cursor.first() {
        Some(&b) => Tag::from_byte(b).ok_or(DecodeError::UnknownTag(b))?,
        None => return Err(DecodeError::Truncated),
    };
    *cursor = &cursor[1..];

    match tag {
        Tag::Nil => Ok(Value::Nil),
        Tag::Err => {
            let code = read_u32(cursor).ok_or(DecodeError::Truncated)? as i32;
            let len = read_u32(cursor).ok_or(DecodeError::Truncated)?;
            let msg = read_bytes(cursor, len as usize).ok_or(DecodeError::Truncated)?;
            Ok(Value::Err {
                code,
                msg: String::from_utf8_lossy(msg).into_owned(),
            })
        }
        Tag::Str => {
            let len = read_u32(cursor).ok_or(DecodeError::Truncated)?;
            let body = read_bytes(cursor, len as usize).ok_or(DecodeError::Truncated)?;
            Ok(Value::Str(Bytes::copy_from_slice(body)))
        }
        Tag::Int => {
            let raw = read_bytes(cursor, 8).ok_or(DecodeError::Truncated)?;
            let mut le = [0u8; 8];
            le.copy_from_slice(raw);
            Ok(Value::Int(i64::from_le_bytes(le)))
        }
        Tag::Dbl => {
            let raw = read_bytes(cursor, 8).ok_or(DecodeError::Truncated)?;
            let mut le = [0u8; 8];
            le.copy_from_slice(raw);
            Ok(Value::Dbl(f64::from_le_bytes(le)))
        }
        Tag::Arr => {
            let count = read_u32(cursor).ok_or(DecodeError::Truncated)?;
            let mut items = Vec::with_capacity(count.min(64) as usize);
            for _ in 0..count {
                items.push(decode_value(cursor)?);
            }
            Ok(Value::Arr(items))
        }
    }
}

/// Decode a complete response payload into one value, rejecting
/// trailing bytes.
pub fn decode_response(payload: &[u8]) -> Result<Value, DecodeError> {
    let mut cursor = payload;
    let value = decode_value(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(DecodeError::TrailingData);
    }
    Ok(value)
}
