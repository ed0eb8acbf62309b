//! Event-driven echo server.
//!
//! A single thread drives the readiness multiplexer and the delay queue.
//! Each connection cycles through an explicit interest-set state machine:
//!
//! `Reading` -> `Holding` (parked, no interest, delayed echo pending) ->
//! `Writing` -> `Reading` ...
//!
//! The hold simulates per-message processing latency without blocking the
//! loop: a full buffer parks the connection and schedules a delayed task
//! that re-registers it for writing when the latency has elapsed. The poll
//! timeout (the resolution) bounds how late the delay queue can be serviced
//! when no socket activity wakes the loop.

use crate::config::ServerConfig;
use crate::runtime::{DelayQueue, EchoBuffer, Multiplexer, Progress};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Token};
use slab::Slab;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const LISTENER_TOKEN: Token = Token(usize::MAX);
const EVENT_CAPACITY: usize = 1024;

/// Per-connection phase in the echo cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Accumulating a request into the buffer.
    Reading,
    /// Buffer full; parked with no interest until the delayed echo fires.
    Holding,
    /// Draining the echo back to the client.
    Writing,
}

struct Connection {
    stream: TcpStream,
    phase: Phase,
    buf: EchoBuffer,
    peer: SocketAddr,
}

impl Connection {
    fn new(stream: TcpStream, peer: SocketAddr, buffer_size: usize) -> Self {
        Self {
            stream,
            phase: Phase::Reading,
            buf: EchoBuffer::zeroed(buffer_size),
            peer,
        }
    }

    /// Full buffer: rewind it for the echo and wait out the delay.
    fn start_holding(&mut self) {
        self.buf.reset();
        self.phase = Phase::Holding;
    }

    fn start_writing(&mut self) {
        self.phase = Phase::Writing;
    }

    /// Echo drained: rewind for the next request.
    fn start_reading(&mut self) {
        self.buf.reset();
        self.phase = Phase::Reading;
    }
}

/// Echo server bound to its listening socket.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
}

impl Server {
    /// Bind the listening socket. Port 0 picks an ephemeral port.
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let addr = config.socket_addr()?;
        let listener = listen_with_backlog(addr, config.backlog)?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener: TcpListener::from_std(listener),
            local_addr,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept/echo loop. Runs until the process is terminated.
    pub fn run(mut self) -> io::Result<()> {
        let mut mux = Multiplexer::new()?;
        let mut events = Events::with_capacity(EVENT_CAPACITY);
        mux.set(&mut self.listener, LISTENER_TOKEN, Some(Interest::READABLE))?;

        let mut connections: Slab<Connection> = Slab::new();
        let mut delay: DelayQueue<usize> =
            DelayQueue::new(Duration::from_millis(self.config.delay_ms));
        let resolution = Duration::from_millis(self.config.resolution_ms);
        let mut accepted: u64 = 0;

        info!(
            addr = %self.local_addr,
            buffer_size = self.config.buffer_size,
            delay_ms = self.config.delay_ms,
            resolution_ms = self.config.resolution_ms,
            backlog = self.config.backlog,
            "echo server listening"
        );

        loop {
            mux.poll(&mut events, Some(resolution))?;

            // Delayed echoes first, then fresh readiness.
            let now = Instant::now();
            while let Some(conn_id) = delay.pop_due(now) {
                resume_write(&mut mux, &mut connections, conn_id)?;
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER_TOKEN => accept_connections(
                        &mut self.listener,
                        &mut mux,
                        &mut connections,
                        self.config.buffer_size,
                        &mut accepted,
                    )?,
                    Token(conn_id) => {
                        if event.is_readable() {
                            handle_readable(conn_id, &mut mux, &mut connections, &mut delay)?;
                        }
                        if event.is_writable() {
                            handle_writable(conn_id, &mut mux, &mut connections)?;
                        }
                    }
                }
            }
        }
    }
}

fn accept_connections(
    listener: &mut TcpListener,
    mux: &mut Multiplexer,
    connections: &mut Slab<Connection>,
    buffer_size: usize,
    accepted: &mut u64,
) -> io::Result<()> {
    loop {
        match listener.accept() {
            Ok((mut stream, peer)) => {
                let entry = connections.vacant_entry();
                let token = Token(entry.key());
                mux.set(&mut stream, token, Some(Interest::READABLE))?;
                entry.insert(Connection::new(stream, peer, buffer_size));
                *accepted += 1;
                info!(count = *accepted, remote_port = peer.port(), "accepted connection");
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                warn!(error = %e, "accept failed");
                break;
            }
        }
    }
    Ok(())
}

/// Read into the connection's buffer. A full buffer parks the connection
/// and schedules its delayed echo; end-of-stream or an I/O error tears
/// down this one connection and nothing else.
fn handle_readable(
    conn_id: usize,
    mux: &mut Multiplexer,
    connections: &mut Slab<Connection>,
    delay: &mut DelayQueue<usize>,
) -> io::Result<()> {
    let Some(conn) = connections.get_mut(conn_id) else {
        return Ok(());
    };
    if conn.phase != Phase::Reading {
        return Ok(());
    }
    match conn.buf.fill_from(&mut conn.stream) {
        Ok(Progress::Complete) => {
            conn.start_holding();
            mux.set(&mut conn.stream, Token(conn_id), None)?;
            delay.schedule(Instant::now(), conn_id);
            Ok(())
        }
        Ok(Progress::Partial) => Ok(()),
        Ok(Progress::Eof) => {
            // Client-initiated shutdown between rounds; normal teardown.
            let remote_port = conn.peer.port();
            close_connection(mux, connections, conn_id);
            info!(remote_port, "closed connection");
            Ok(())
        }
        Err(e) => {
            // Connection resets are expected during benchmark teardown.
            let remote_port = conn.peer.port();
            close_connection(mux, connections, conn_id);
            debug!(remote_port, error = %e, "closed connection after read error");
            Ok(())
        }
    }
}

/// Drain the echo. Partial writes stay registered for the next event.
fn handle_writable(
    conn_id: usize,
    mux: &mut Multiplexer,
    connections: &mut Slab<Connection>,
) -> io::Result<()> {
    let Some(conn) = connections.get_mut(conn_id) else {
        return Ok(());
    };
    if conn.phase != Phase::Writing {
        return Ok(());
    }
    match conn.buf.drain_to(&mut conn.stream) {
        Ok(Progress::Complete) => {
            conn.start_reading();
            mux.set(&mut conn.stream, Token(conn_id), Some(Interest::READABLE))?;
            Ok(())
        }
        Ok(Progress::Partial) | Ok(Progress::Eof) => Ok(()),
        Err(e) => {
            let remote_port = conn.peer.port();
            close_connection(mux, connections, conn_id);
            debug!(remote_port, error = %e, "closed connection after write error");
            Ok(())
        }
    }
}

/// Delayed echo came due: move the parked connection into `Writing`.
///
/// The connection may already be gone or mid-teardown; a stale id is
/// skipped rather than resurrected.
fn resume_write(
    mux: &mut Multiplexer,
    connections: &mut Slab<Connection>,
    conn_id: usize,
) -> io::Result<()> {
    let Some(conn) = connections.get_mut(conn_id) else {
        return Ok(());
    };
    if conn.phase != Phase::Holding {
        return Ok(());
    }
    conn.start_writing();
    mux.set(&mut conn.stream, Token(conn_id), Some(Interest::WRITABLE))
}

fn close_connection(mux: &mut Multiplexer, connections: &mut Slab<Connection>, conn_id: usize) {
    if let Some(mut conn) = connections.try_remove(conn_id) {
        let _ = mux.remove(&mut conn.stream, Token(conn_id));
    }
}

/// Build the listening socket with a configurable accept backlog.
fn listen_with_backlog(addr: SocketAddr, backlog: u32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;

    Ok(socket.into())
}
