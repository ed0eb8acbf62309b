//! Benchmark clients: event-driven and thread-per-connection.
//!
//! Both variants drive the same wire protocol (send `L` bytes, read the
//! `L`-byte echo, verify) and report through the same `ThroughputReport`;
//! only the concurrency model differs.

mod event;
mod threaded;

use crate::bench::{BarrierTimeout, ThroughputReport};
use crate::config::{ClientConfig, ClientMode};
use std::fmt;
use std::io;

/// Run the configured client variant to completion.
pub fn run(config: &ClientConfig) -> Result<ThroughputReport, ClientError> {
    if config.connections == 0 || config.payload_len == 0 {
        return Err(ClientError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "connections and payload length must be at least 1",
        )));
    }
    match config.mode {
        ClientMode::Event => event::run(config),
        ClientMode::Threaded => threaded::run(config),
    }
}

/// Client-side failures. All fatal: masking any of them would corrupt the
/// measurement, so nothing is retried.
#[derive(Debug)]
pub enum ClientError {
    Io(io::Error),
    /// The server closed the stream mid-round; it must only close in
    /// response to client shutdown.
    UnexpectedEof,
    /// Echoed bytes did not match the sent payload.
    PayloadMismatch,
    Barrier(BarrierTimeout),
    /// A connection thread panicked (threaded mode).
    WorkerPanic,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "I/O error: {e}"),
            ClientError::UnexpectedEof => write!(f, "reached end-of-stream unexpectedly"),
            ClientError::PayloadMismatch => write!(f, "echoed bytes did not match sent payload"),
            ClientError::Barrier(e) => write!(f, "{e}"),
            ClientError::WorkerPanic => write!(f, "a connection thread panicked"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Io(e) => Some(e),
            ClientError::Barrier(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Io(e)
    }
}

impl From<BarrierTimeout> for ClientError {
    fn from(e: BarrierTimeout) -> Self {
        ClientError::Barrier(e)
    }
}
