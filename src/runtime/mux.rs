//! Readiness multiplexer with replaceable interest sets.
//!
//! Readiness-based model: poll tells us when sockets are ready, then we
//! perform non-blocking read/write syscalls. Uses epoll on Linux, kqueue
//! on macOS.

use mio::event::Source;
use mio::{Events, Interest, Poll, Token};
use std::collections::HashSet;
use std::io;
use std::time::Duration;

/// Wrapper over `mio::Poll` that lets a connection state machine replace a
/// connection's whole interest set in one call, including "no interest".
///
/// mio has no interest-NONE registration, so parking a connection maps to
/// deregistering it; the wrapper remembers which tokens hold a live
/// registration to pick register vs. reregister on the way back in.
pub struct Multiplexer {
    poll: Poll,
    live: HashSet<Token>,
}

impl Multiplexer {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            live: HashSet::new(),
        })
    }

    /// Replace `token`'s registration with the given interest set.
    ///
    /// `None` parks the source: it produces no events until re-registered.
    /// Parking an already-parked token is a no-op.
    pub fn set<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
        token: Token,
        interest: Option<Interest>,
    ) -> io::Result<()> {
        match interest {
            Some(interest) if self.live.contains(&token) => {
                self.poll.registry().reregister(source, token, interest)
            }
            Some(interest) => {
                self.poll.registry().register(source, token, interest)?;
                self.live.insert(token);
                Ok(())
            }
            None => {
                if self.live.remove(&token) {
                    self.poll.registry().deregister(source)?;
                }
                Ok(())
            }
        }
    }

    /// Drop a closing connection's registration so no stale events can
    /// reference it.
    pub fn remove<S: Source + ?Sized>(&mut self, source: &mut S, token: Token) -> io::Result<()> {
        self.set(source, token, None)
    }

    /// Block until at least one registered source is ready or the timeout
    /// elapses. `None` blocks indefinitely. Interrupted waits are retried.
    pub fn poll(&mut self, events: &mut Events, timeout: Option<Duration>) -> io::Result<()> {
        loop {
            match self.poll.poll(events, timeout) {
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }
}
