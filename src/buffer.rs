//! Bounded circular byte buffer
//!
//! Each connection owns two of these: one for bytes read off the socket
//! and one for encoded responses waiting to be sent. The capacity is
//! fixed at twice the largest possible frame, which bounds per-connection
//! memory. Responses are framed by reserving the four header bytes up
//! front with [`RingBuffer::fill`] and overwriting them with
//! [`RingBuffer::patch_at`] once the body length is known.

use crate::protocol::{ErrorCode, Tag, HEADER_SIZE, MAX_MSG_LEN};
use std::fmt;

/// Capacity of every connection buffer.
pub const BUF_CAPACITY: usize = 2 * (HEADER_SIZE + MAX_MSG_LEN);

/// Append failure; the caller decides whether to roll back or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The append would exceed the fixed capacity.
    Full,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::Full => write!(f, "buffer is full"),
        }
    }
}

impl std::error::Error for BufferError {}

/// Fixed-capacity byte ring with typed response appenders.
pub struct RingBuffer {
    buf: Box<[u8]>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Create a buffer with the standard connection capacity.
    pub fn new() -> Self {
        Self::with_capacity(BUF_CAPACITY)
    }

    /// Create a buffer with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        RingBuffer {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes that can still be appended.
    pub fn available(&self) -> usize {
        self.capacity() - self.len
    }

    /// Append a single byte.
    pub fn push_back(&mut self, byte: u8) -> Result<(), BufferError> {
        if self.len == self.capacity() {
            return Err(BufferError::Full);
        }
        let tail = (self.head + self.len) % self.capacity();
        self.buf[tail] = byte;
        self.len += 1;
        Ok(())
    }

    /// Remove and return the first byte.
    pub fn pop_front(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.buf[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(byte)
    }

    /// Append a byte slice; all-or-nothing.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        if bytes.len() > self.available() {
            return Err(BufferError::Full);
        }
        for &b in bytes {
            let tail = (self.head + self.len) % self.capacity();
            self.buf[tail] = b;
            self.len += 1;
        }
        Ok(())
    }

    /// Append `count` copies of `byte`; all-or-nothing.
    pub fn fill(&mut self, byte: u8, count: usize) -> Result<(), BufferError> {
        if count > self.available() {
            return Err(BufferError::Full);
        }
        for _ in 0..count {
            let tail = (self.head + self.len) % self.capacity();
            self.buf[tail] = byte;
            self.len += 1;
        }
        Ok(())
    }

    /// Drop the first `count` buffered bytes.
    pub fn erase_front(&mut self, count: usize) {
        assert!(count <= self.len, "erase length larger than buffer size");
        self.head = (self.head + count) % self.capacity();
        self.len -= count;
    }

    /// Drop appended bytes from the tail until `len` remain. Used to roll
    /// back a partially encoded response.
    pub fn truncate(&mut self, len: usize) {
        assert!(len <= self.len, "truncate beyond buffer size");
        self.len = len;
    }

    /// Overwrite an earlier-reserved range in place.
    pub fn patch_at(&mut self, offset: usize, bytes: &[u8]) {
        assert!(offset + bytes.len() <= self.len, "patch outside buffer");
        let capacity = self.capacity();
        for (i, &b) in bytes.iter().enumerate() {
            self.buf[(self.head + offset + i) % capacity] = b;
        }
    }

    /// Read the first four buffered bytes as a little-endian u32 without
    /// consuming them.
    pub fn peek_u32_le(&self) -> Option<u32> {
        if self.len < 4 {
            return None;
        }
        let capacity = self.capacity();
        let mut raw = [0u8; 4];
        for (i, slot) in raw.iter_mut().enumerate() {
            *slot = self.buf[(self.head + i) % capacity];
        }
        Some(u32::from_le_bytes(raw))
    }

    /// Linearise the first `count` bytes into a vector.
    pub fn copy_to_vec(&self, count: usize) -> Vec<u8> {
        assert!(count <= self.len, "copy beyond buffer size");
        let capacity = self.capacity();
        (0..count)
            .map(|i| self.buf[(self.head + i) % capacity])
            .collect()
    }

    /// The contiguous run of buffered bytes starting at the head. When
    /// the data wraps, this is only the first part; consuming it exposes
    /// the rest.
    pub fn first_chunk(&self) -> &[u8] {
        let end = (self.head + self.len).min(self.capacity());
        &self.buf[self.head..end]
    }

    // Typed appenders for the response tag scheme.

    pub fn append_nil(&mut self) -> Result<(), BufferError> {
        self.push_back(Tag::Nil as u8)
    }

    pub fn append_int(&mut self, val: i64) -> Result<(), BufferError> {
        self.push_back(Tag::Int as u8)?;
        self.extend(&val.to_le_bytes())
    }

    pub fn append_dbl(&mut self, val: f64) -> Result<(), BufferError> {
        self.push_back(Tag::Dbl as u8)?;
        self.extend(&val.to_le_bytes())
    }

    pub fn append_str(&mut self, val: &[u8]) -> Result<(), BufferError> {
        self.push_back(Tag::Str as u8)?;
        self.extend(&(val.len() as u32).to_le_bytes())?;
        self.extend(val)
    }

    pub fn append_arr(&mut self, count: u32) -> Result<(), BufferError> {
        self.push_back(Tag::Arr as u8)?;
        self.extend(&count.to_le_bytes())
    }

    pub fn append_err(&mut self, code: ErrorCode, msg: &str) -> Result<(), BufferError> {
        self.push_back(Tag::Err as u8)?;
        self.extend(&(code as i32).to_le_bytes())?;
        self.extend(&(msg.len() as u32).to_le_bytes())?;
        self.extend(msg.as_bytes())
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut buf = RingBuffer::with_capacity(4);
        buf.push_back(1).unwrap();
        buf.push_back(2).unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.pop_front(), Some(1));
        assert_eq!(buf.pop_front(), Some(2));
        assert_eq!(buf.pop_front(), None);
    }

    #[test]
    fn test_full_rejects_append() {
        let mut buf = RingBuffer::with_capacity(2);
        buf.extend(&[1, 2]).unwrap();
        assert_eq!(buf.push_back(3), Err(BufferError::Full));
        assert_eq!(buf.extend(&[3]), Err(BufferError::Full));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_wraparound() {
        let mut buf = RingBuffer::with_capacity(4);
        buf.extend(&[1, 2, 3]).unwrap();
        buf.erase_front(2);
        buf.extend(&[4, 5, 6]).unwrap();
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.copy_to_vec(4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut buf = RingBuffer::with_capacity(8);
        for round in 0..50 {
            let _ = buf.extend(&[round as u8; 5]);
            assert!(buf.len() <= buf.capacity());
            let drop = buf.len().min(3);
            buf.erase_front(drop);
            assert!(buf.len() <= buf.capacity());
        }
    }

    #[test]
    fn test_patch_at_wraps() {
        let mut buf = RingBuffer::with_capacity(8);
        buf.extend(&[0; 6]).unwrap();
        buf.erase_front(5);
        buf.extend(&[0; 5]).unwrap();
        buf.patch_at(1, &[9, 9, 9, 9]);
        assert_eq!(buf.copy_to_vec(6), vec![0, 9, 9, 9, 9, 0]);
    }

    #[test]
    fn test_truncate_rolls_back() {
        let mut buf = RingBuffer::new();
        buf.extend(b"keep").unwrap();
        let mark = buf.len();
        buf.extend(b"discarded").unwrap();
        buf.truncate(mark);
        assert_eq!(buf.copy_to_vec(buf.len()), b"keep".to_vec());
    }

    #[test]
    fn test_peek_header() {
        let mut buf = RingBuffer::new();
        assert_eq!(buf.peek_u32_le(), None);
        buf.extend(&7u32.to_le_bytes()).unwrap();
        buf.extend(b"payload").unwrap();
        assert_eq!(buf.peek_u32_le(), Some(7));
        // peeking does not consume
        assert_eq!(buf.len(), 11);
    }

    #[test]
    fn test_typed_appenders() {
        let mut buf = RingBuffer::new();
        buf.append_nil().unwrap();
        buf.append_int(-7).unwrap();
        buf.append_str(b"hi").unwrap();
        buf.append_err(ErrorCode::NoCmd, "nope").unwrap();

        let bytes = buf.copy_to_vec(buf.len());
        assert_eq!(bytes[0], Tag::Nil as u8);
        assert_eq!(bytes[1], Tag::Int as u8);
        assert_eq!(&bytes[2..10], &(-7i64).to_le_bytes());
        assert_eq!(bytes[10], Tag::Str as u8);
        assert_eq!(&bytes[11..15], &2u32.to_le_bytes());
        assert_eq!(&bytes[15..17], b"hi");
        assert_eq!(bytes[17], Tag::Err as u8);
        assert_eq!(&bytes[18..22], &3i32.to_le_bytes());
    }

    #[test]
    fn test_first_chunk_contiguous() {
        let mut buf = RingBuffer::with_capacity(4);
        buf.extend(&[1, 2, 3]).unwrap();
        buf.erase_front(2);
        buf.extend(&[4, 5]).unwrap();
        // head is at index 2, so the first chunk runs to the end of the
        // backing slice only
        assert_eq!(buf.first_chunk(), &[3, 4]);
        buf.erase_front(2);
        assert_eq!(buf.first_chunk(), &[5]);
    }
}
