//! Thread-per-connection client: blocking sockets, one thread each.
//!
//! The only shared state is the start barrier and the echo counter; each
//! thread otherwise owns its socket and buffer outright, so no further
//! locking is needed.

use super::ClientError;
use crate::bench::{StartBarrier, ThroughputReport};
use crate::config::ClientConfig;
use crate::payload::FixedPayload;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

pub(super) fn run(config: &ClientConfig) -> Result<ThroughputReport, ClientError> {
    let addr = config.socket_addr()?;
    let payload = FixedPayload::new(config.payload_len);
    let duration = Duration::from_millis(config.duration_ms);
    let barrier = Arc::new(StartBarrier::new(config.connections));
    let echoed = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::with_capacity(config.connections);
    for id in 0..config.connections {
        let payload = payload.clone();
        let barrier = Arc::clone(&barrier);
        let echoed = Arc::clone(&echoed);
        let handle = thread::Builder::new()
            .name(format!("conn-{id}"))
            .spawn(move || connection_loop(addr, &payload, &barrier, duration, &echoed))
            .map_err(ClientError::Io)?;
        handles.push(handle);
    }

    let mut result: Result<(), ClientError> = Ok(());
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if result.is_ok() {
                    result = Err(e);
                }
            }
            Err(_) => {
                if result.is_ok() {
                    result = Err(ClientError::WorkerPanic);
                }
            }
        }
    }
    result?;

    // Every thread reached the barrier, so the start time is set.
    let start = barrier.start_time().ok_or(ClientError::WorkerPanic)?;
    Ok(ThroughputReport::new(
        start.elapsed(),
        echoed.load(Ordering::Relaxed),
    ))
}

fn connection_loop(
    addr: SocketAddr,
    payload: &FixedPayload,
    barrier: &StartBarrier,
    duration: Duration,
    echoed: &AtomicU64,
) -> Result<(), ClientError> {
    let mut stream = TcpStream::connect(addr)?;
    let start = barrier.arrive()?;
    let deadline = start + duration;
    let mut buf = vec![0u8; payload.len()];

    let mut rounds: u64 = 0;
    while Instant::now() < deadline {
        stream.write_all(payload.as_slice())?;
        if let Err(e) = stream.read_exact(&mut buf) {
            return Err(if e.kind() == io::ErrorKind::UnexpectedEof {
                ClientError::UnexpectedEof
            } else {
                ClientError::Io(e)
            });
        }
        if !payload.matches(&buf) {
            return Err(ClientError::PayloadMismatch);
        }
        echoed.fetch_add(1, Ordering::Relaxed);
        rounds += 1;
    }
    debug!(rounds, "connection finished");
    Ok(())
}
