//! Benchmark synchronization and reporting.

use std::fmt;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// How long a participant waits for the rest before giving up. Exceeding
/// this means a connection never finished establishing.
pub const BARRIER_TIMEOUT: Duration = Duration::from_secs(60);

/// Rendezvous that releases all participants at once and stamps a single
/// shared start instant for the measured window.
pub struct StartBarrier {
    participants: usize,
    timeout: Duration,
    state: Mutex<BarrierState>,
    cond: Condvar,
}

struct BarrierState {
    arrived: usize,
    start: Option<Instant>,
}

impl StartBarrier {
    pub fn new(participants: usize) -> Self {
        Self::with_timeout(participants, BARRIER_TIMEOUT)
    }

    pub fn with_timeout(participants: usize, timeout: Duration) -> Self {
        Self {
            participants,
            timeout,
            state: Mutex::new(BarrierState {
                arrived: 0,
                start: None,
            }),
            cond: Condvar::new(),
        }
    }

    /// Block until every participant has arrived.
    ///
    /// The arrival that fills the barrier sets the start instant exactly
    /// once; every caller returns that same instant.
    pub fn arrive(&self) -> Result<Instant, BarrierTimeout> {
        let mut state = self.state.lock().unwrap();
        state.arrived += 1;
        if state.arrived == self.participants {
            let start = Instant::now();
            state.start = Some(start);
            self.cond.notify_all();
            return Ok(start);
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(start) = state.start {
                return Ok(start);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(BarrierTimeout);
            }
            let (guard, _) = self.cond.wait_timeout(state, deadline - now).unwrap();
            state = guard;
        }
    }

    /// The shared start instant, once the barrier has opened.
    pub fn start_time(&self) -> Option<Instant> {
        self.state.lock().unwrap().start
    }
}

/// A participant gave up waiting for the barrier to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierTimeout;

impl fmt::Display for BarrierTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timed out waiting for all connections at the start barrier")
    }
}

impl std::error::Error for BarrierTimeout {}

/// Final wall-time window and verified round-trip count.
#[derive(Debug, Clone, Copy)]
pub struct ThroughputReport {
    pub elapsed: Duration,
    pub echoed: u64,
}

impl ThroughputReport {
    pub fn new(elapsed: Duration, echoed: u64) -> Self {
        Self { elapsed, echoed }
    }

    /// Aggregate messages per second over the measured window. No smoothing,
    /// no percentiles.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.echoed as f64 / secs
    }
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duration: {} ms, throughput: {:.6} msg/sec",
            self.elapsed.as_millis(),
            self.throughput()
        )
    }
}
