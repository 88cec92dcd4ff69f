//! Server module
//!
//! The event loop. One thread polls the listener and every connection
//! for readiness, dispatches reads and writes, and between rounds reaps
//! idle connections and expired keys. Nothing here blocks except the
//! poll call itself, whose timeout is bounded by the nearest idle
//! deadline or key expiry.

mod connection;
mod timer;

pub use connection::Connection;
pub use timer::{TimerQueue, CONN_TIMEOUT_MS, IO_TIMEOUT_MS};

use crate::clock;
use crate::dispatch::Dispatcher;
use nix::poll::{poll, PollFd, PollFlags};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::time::Duration;
use tracing::{error, info, warn};

/// The server: listener, connection table, timers, and the dispatcher
/// that owns all data. Everything is driven from a single thread.
pub struct Server {
    listener: TcpListener,
    conns: HashMap<RawFd, Connection>,
    timers: TimerQueue,
    dispatcher: Dispatcher,
}

impl Server {
    /// Bind the listening socket; port 0 picks a free port.
    pub fn bind(port: u16) -> io::Result<Server> {
        let listener = setup_listener(port)?;
        Ok(Server {
            listener,
            conns: HashMap::new(),
            timers: TimerQueue::new(),
            dispatcher: Dispatcher::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the event loop until a fatal error.
    pub fn run(&mut self) -> io::Result<()> {
        info!("listening on {:?}", self.listener.local_addr()?);
        loop {
            self.tick()?;
        }
    }

    /// One event-loop iteration: poll, accept, dispatch, reap.
    fn tick(&mut self) -> io::Result<()> {
        let now = clock::monotonic_ms();
        let timeout = self.poll_timeout(now);

        let order: Vec<RawFd> = self.conns.keys().copied().collect();
        let (accept_ready, ready) = {
            let listener_fd = self.listener.as_fd();
            let conn_fds: Vec<_> = order.iter().map(|fd| self.conns[fd].as_fd()).collect();
            let mut poll_fds = Vec::with_capacity(order.len() + 1);
            poll_fds.push(PollFd::new(&listener_fd, PollFlags::POLLIN));
            for (fd, conn_fd) in order.iter().zip(conn_fds.iter()) {
                let conn = &self.conns[fd];
                poll_fds.push(PollFd::new(conn_fd, conn.poll_flags()));
            }

            match poll(&mut poll_fds, timeout) {
                Ok(_) => {}
                // a signal interrupted the wait; just go around again
                Err(nix::errno::Errno::EINTR) => return Ok(()),
                Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
            }

            let accept_ready = poll_fds[0]
                .revents()
                .unwrap_or(PollFlags::empty())
                .contains(PollFlags::POLLIN);
            let ready: Vec<PollFlags> = poll_fds[1..]
                .iter()
                .map(|p| p.revents().unwrap_or(PollFlags::empty()))
                .collect();
            (accept_ready, ready)
        };

        if accept_ready {
            self.accept_one();
        }

        for (fd, revents) in order.into_iter().zip(ready) {
            if revents.is_empty() {
                continue;
            }
            self.timers.touch(fd, clock::monotonic_ms());

            let Some(conn) = self.conns.get_mut(&fd) else {
                continue;
            };
            if revents.contains(PollFlags::POLLIN) && conn.is_readable() {
                conn.handle_read(&mut self.dispatcher);
            }
            if revents.contains(PollFlags::POLLOUT) && conn.is_writable() {
                conn.handle_write();
            }
            let hung_up = revents.intersects(PollFlags::POLLERR | PollFlags::POLLHUP);
            if hung_up || self.conns[&fd].is_closing() {
                self.close_connection(fd);
            }
        }

        let now = clock::monotonic_ms();
        for fd in self.timers.pop_expired(now) {
            info!("closing idle connection {}", fd);
            self.conns.remove(&fd);
        }
        self.dispatcher
            .context_mut()
            .keyspace
            .process_expired(now);
        Ok(())
    }

    /// Poll timeout: the nearest of the idle deadline and the next key
    /// expiry; -1 (forever) when neither exists.
    fn poll_timeout(&self, now: u64) -> i32 {
        let idle = self.timers.next_deadline(now);
        let expiry = self
            .dispatcher
            .next_expire_at()
            .map(|at| at.saturating_sub(now));
        match (idle, expiry) {
            (None, None) => -1,
            (idle, expiry) => {
                let ms = idle.unwrap_or(u64::MAX).min(expiry.unwrap_or(u64::MAX));
                ms.min(i32::MAX as u64) as i32
            }
        }
    }

    /// Accept one connection; poll reports the listener ready again
    /// while more are queued.
    fn accept_one(&mut self) {
        match self.listener.accept() {
            Ok((stream, addr)) => {
                info!("got connection from {}", addr);
                if let Err(e) = stream.set_nonblocking(true) {
                    warn!("failed to set non-blocking: {}", e);
                    return;
                }
                let io_timeout = Some(Duration::from_millis(IO_TIMEOUT_MS));
                let _ = stream.set_read_timeout(io_timeout);
                let _ = stream.set_write_timeout(io_timeout);

                let fd = stream.as_raw_fd();
                self.timers.touch(fd, clock::monotonic_ms());
                self.conns.insert(fd, Connection::new(stream));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => error!("accept failed: {}", e),
        }
    }

    fn close_connection(&mut self, fd: RawFd) {
        info!("removing connection {}", fd);
        self.timers.remove(fd);
        // dropping the stream closes the fd
        self.conns.remove(&fd);
    }
}

/// Build the non-blocking listener: dual-stack when the host allows it,
/// plain IPv4 otherwise, with SO_REUSEADDR either way.
fn setup_listener(port: u16) -> io::Result<TcpListener> {
    let v6 = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    let v4 = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    try_listen(Domain::IPV6, v6).or_else(|_| try_listen(Domain::IPV4, v4))
}

fn try_listen(domain: Domain, addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if domain == Domain::IPV6 {
        let _ = socket.set_only_v6(false);
    }
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    socket.listen(nix::libc::SOMAXCONN)?;
    Ok(socket.into())
}
