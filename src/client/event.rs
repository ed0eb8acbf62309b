//! Event-driven client: one thread, one multiplexer, all connections.
//!
//! Every connection is opened non-blocking up front and parked as it
//! finishes connecting. When the last one arrives the barrier opens: the
//! start time is stamped and every connection is re-registered for writing
//! in the same pass, so all first payloads go out together.

use super::ClientError;
use crate::bench::ThroughputReport;
use crate::config::ClientConfig;
use crate::payload::FixedPayload;
use crate::runtime::{EchoBuffer, Multiplexer, Progress};
use mio::net::TcpStream;
use mio::{Events, Interest, Token};
use slab::Slab;
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Non-blocking connect in flight.
    Connecting,
    /// Connected, parked until every connection is ready.
    Parked,
    /// Draining the payload to the server.
    Writing,
    /// Accumulating the echo.
    Reading,
    /// Finished its draining round after the deadline.
    Done,
}

struct Connection {
    stream: TcpStream,
    phase: Phase,
    buf: EchoBuffer,
}

pub(super) fn run(config: &ClientConfig) -> Result<ThroughputReport, ClientError> {
    let addr = config.socket_addr()?;
    let payload = FixedPayload::new(config.payload_len);
    let duration = Duration::from_millis(config.duration_ms);

    let mut mux = Multiplexer::new()?;
    let mut events = Events::with_capacity(EVENT_CAPACITY);
    let mut connections: Slab<Connection> = Slab::with_capacity(config.connections);

    for _ in 0..config.connections {
        let mut stream = TcpStream::connect(addr)?;
        let entry = connections.vacant_entry();
        let token = Token(entry.key());
        mux.set(&mut stream, token, Some(Interest::WRITABLE))?;
        entry.insert(Connection {
            stream,
            phase: Phase::Connecting,
            buf: EchoBuffer::from_slice(payload.as_slice()),
        });
    }

    let mut connected = 0usize;
    let mut echoed: u64 = 0;
    let mut exited = 0usize;
    let mut start: Option<Instant> = None;
    let mut deadline: Option<Instant> = None;

    'outer: loop {
        mux.poll(&mut events, None)?;
        // One verdict per pass: every connection handled in this round sees
        // the same answer, so the cutover can differ across connections by
        // at most one in-flight round.
        let past_deadline = deadline.is_some_and(|d| Instant::now() > d);

        for event in events.iter() {
            let conn_id = event.token().0;
            let phase = match connections.get(conn_id) {
                Some(conn) => conn.phase,
                None => continue,
            };

            match phase {
                Phase::Connecting => {
                    if !event.is_writable() {
                        continue;
                    }
                    let conn = &mut connections[conn_id];
                    if !finish_connect(&conn.stream)? {
                        continue;
                    }
                    conn.phase = Phase::Parked;
                    mux.set(&mut conn.stream, Token(conn_id), None)?;
                    connected += 1;
                    debug!(conn_id, connected, "connection established");

                    if connected == config.connections {
                        info!(connections = connected, "barrier opened");
                        let now = Instant::now();
                        start = Some(now);
                        deadline = Some(now + duration);
                        for (id, conn) in connections.iter_mut() {
                            conn.phase = Phase::Writing;
                            mux.set(&mut conn.stream, Token(id), Some(Interest::WRITABLE))?;
                        }
                    }
                }
                Phase::Writing => {
                    if !event.is_writable() {
                        continue;
                    }
                    let conn = &mut connections[conn_id];
                    match conn.buf.drain_to(&mut conn.stream)? {
                        Progress::Complete => {
                            conn.buf.reset();
                            conn.phase = Phase::Reading;
                            mux.set(&mut conn.stream, Token(conn_id), Some(Interest::READABLE))?;
                        }
                        Progress::Partial | Progress::Eof => {}
                    }
                }
                Phase::Reading => {
                    if !event.is_readable() {
                        continue;
                    }
                    let conn = &mut connections[conn_id];
                    match conn.buf.fill_from(&mut conn.stream)? {
                        Progress::Eof => return Err(ClientError::UnexpectedEof),
                        Progress::Partial => {}
                        Progress::Complete => {
                            if !payload.matches(conn.buf.as_slice()) {
                                return Err(ClientError::PayloadMismatch);
                            }
                            echoed += 1;
                            if past_deadline {
                                conn.phase = Phase::Done;
                                mux.set(&mut conn.stream, Token(conn_id), None)?;
                                exited += 1;
                                if exited == config.connections {
                                    break 'outer;
                                }
                            } else {
                                conn.buf.reset();
                                conn.phase = Phase::Writing;
                                mux.set(
                                    &mut conn.stream,
                                    Token(conn_id),
                                    Some(Interest::WRITABLE),
                                )?;
                            }
                        }
                    }
                }
                Phase::Parked | Phase::Done => {}
            }
        }
    }

    let start = start.ok_or_else(|| {
        ClientError::Io(io::Error::new(
            io::ErrorKind::Other,
            "benchmark window never opened",
        ))
    })?;
    Ok(ThroughputReport::new(start.elapsed(), echoed))
}

/// Connect readiness surfaces as writable; confirm the connection actually
/// established before treating it as open.
fn finish_connect(stream: &TcpStream) -> io::Result<bool> {
    if let Some(err) = stream.take_error()? {
        return Err(err);
    }
    match stream.peer_addr() {
        Ok(_) => Ok(true),
        Err(ref e) if e.kind() == io::ErrorKind::NotConnected => Ok(false),
        Err(e) => Err(e),
    }
}
