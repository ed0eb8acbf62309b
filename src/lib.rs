//! echo-bench: TCP echo round-trip benchmark.
//!
//! Measures echo throughput under two I/O concurrency models:
//! - an event-driven, single-threaded readiness loop (server and,
//!   optionally, the client), where an interest-set state machine drives
//!   each connection and a delay queue injects per-message latency
//! - a thread-per-connection blocking client, synchronized by a start
//!   barrier, as the comparison point

pub mod bench;
pub mod client;
pub mod config;
pub mod payload;
pub mod runtime;
pub mod server;
