//! Shared pieces of the event-driven runtime.
//!
//! - `EchoBuffer`: per-connection buffer with partial-transfer accumulation
//! - `DelayQueue`: time-ordered pending work, drained by the event loop
//! - `Multiplexer`: mio `Poll` with replaceable per-connection interest sets

mod buffer;
mod delay;
mod mux;

pub use buffer::{EchoBuffer, Progress};
pub use delay::DelayQueue;
pub use mux::Multiplexer;
