//! Connection handling
//!
//! Per-socket state machine: a connection is Reading, Writing, or
//! Closing, and tells the event loop which readiness it wants. Bytes
//! move through two fixed-capacity ring buffers; multiple complete
//! frames buffered on one readable event are processed back to back, so
//! pipelined requests get their replies in order.

use crate::buffer::RingBuffer;
use crate::dispatch::Dispatcher;
use crate::protocol::{parse_request, ErrorCode, HEADER_SIZE, MAX_MSG_LEN};
use nix::poll::PollFlags;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsFd, BorrowedFd};
use tracing::{debug, warn};

/// A client connection and its buffered I/O state.
pub struct Connection {
    stream: TcpStream,

    // the connection's intent, read by the event loop
    want_read: bool,
    want_write: bool,
    want_close: bool,

    /// Request bytes waiting to be parsed.
    incoming: RingBuffer,
    /// Encoded responses waiting to be sent.
    outgoing: RingBuffer,
}

impl Connection {
    /// Wrap a freshly accepted stream; starts in the Reading state.
    pub fn new(stream: TcpStream) -> Self {
        Connection {
            stream,
            want_read: true,
            want_write: false,
            want_close: false,
            incoming: RingBuffer::new(),
            outgoing: RingBuffer::new(),
        }
    }

    pub fn is_readable(&self) -> bool {
        self.want_read
    }

    pub fn is_writable(&self) -> bool {
        self.want_write
    }

    pub fn is_closing(&self) -> bool {
        self.want_close
    }

    /// Readiness to request from poll for this connection.
    pub fn poll_flags(&self) -> PollFlags {
        let mut flags = PollFlags::POLLERR;
        if self.want_read {
            flags |= PollFlags::POLLIN;
        }
        if self.want_write {
            flags |= PollFlags::POLLOUT;
        }
        flags
    }

    /// Read once, then drain every complete frame that is buffered.
    pub fn handle_read(&mut self, dispatcher: &mut Dispatcher) {
        let mut buf = [0u8; HEADER_SIZE + MAX_MSG_LEN + 1];
        let n = match self.stream.read(&mut buf) {
            Ok(0) => {
                // peer closed
                self.want_close = true;
                return;
            }
            Ok(n) => n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                return;
            }
            Err(e) => {
                warn!("recv failed: {}", e);
                self.want_close = true;
                return;
            }
        };
        debug!("read {} bytes", n);

        if self.incoming.extend(&buf[..n]).is_err() {
            // more unparseable bytes than two frames' worth
            warn!("incoming buffer overflow");
            self.want_close = true;
            return;
        }

        // pipelining: consume every complete frame before returning
        while self.try_process_request(dispatcher) {}

        if !self.outgoing.is_empty() && !self.want_close {
            self.want_read = false;
            self.want_write = true;
            // the socket is usually ready; try before the next poll round
            self.handle_write();
        }
    }

    /// Parse, execute and encode one buffered frame. Returns false when
    /// no complete frame is available or the connection is done for.
    fn try_process_request(&mut self, dispatcher: &mut Dispatcher) -> bool {
        if self.want_close {
            return false;
        }
        let len = match self.incoming.peek_u32_le() {
            Some(len) => len as usize,
            None => return false,
        };
        if len > MAX_MSG_LEN {
            warn!("oversized request frame: {} bytes", len);
            self.want_close = true;
            return false;
        }
        let frame_len = HEADER_SIZE + len;
        if self.incoming.len() < frame_len {
            return false;
        }

        let frame = self.incoming.copy_to_vec(frame_len);
        let cmd = match parse_request(&frame[HEADER_SIZE..]) {
            Ok(cmd) => cmd,
            Err(e) => {
                // framing is corrupt; no reply, just tear down
                warn!("bad request: {}", e);
                self.want_close = true;
                return false;
            }
        };

        // reserve the response header, encode, then patch the length in
        let header_pos = self.outgoing.len();
        let encoded = self.outgoing.fill(0, HEADER_SIZE).is_ok()
            && dispatcher.dispatch(&cmd, &mut self.outgoing).is_ok()
            && self.outgoing.len() - header_pos - HEADER_SIZE <= MAX_MSG_LEN;

        if encoded {
            let body_len = (self.outgoing.len() - header_pos - HEADER_SIZE) as u32;
            self.outgoing.patch_at(header_pos, &body_len.to_le_bytes());
        } else if !self.roll_back_to_too_long(header_pos) {
            self.want_close = true;
            return false;
        }

        self.incoming.erase_front(frame_len);
        true
    }

    /// Discard a partial response and replace it with ERR(TOOLONG).
    fn roll_back_to_too_long(&mut self, header_pos: usize) -> bool {
        self.outgoing.truncate(header_pos);
        let ok = self.outgoing.fill(0, HEADER_SIZE).is_ok()
            && self
                .outgoing
                .append_err(ErrorCode::TooLong, "response is too long")
                .is_ok();
        if ok {
            let body_len = (self.outgoing.len() - header_pos - HEADER_SIZE) as u32;
            self.outgoing.patch_at(header_pos, &body_len.to_le_bytes());
        }
        ok
    }

    /// Send as much buffered output as the kernel accepts.
    pub fn handle_write(&mut self) {
        while !self.outgoing.is_empty() {
            match self.stream.write(self.outgoing.first_chunk()) {
                Ok(0) => {
                    self.want_close = true;
                    return;
                }
                Ok(n) => {
                    debug!("wrote {} bytes", n);
                    self.outgoing.erase_front(n);
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::Interrupted =>
                {
                    return;
                }
                Err(e) => {
                    warn!("send failed: {}", e);
                    self.want_close = true;
                    return;
                }
            }
        }
        // everything flushed; go back to reading requests
        self.want_write = false;
        self.want_read = true;
    }
}

impl AsFd for Connection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}
