//! Live client/server round-trip tests over loopback.
//!
//! Each test binds an ephemeral port, runs the event-driven server on a
//! background thread, and drives a real client against it.

use echo_bench::client;
use echo_bench::config::{ClientConfig, ClientMode, ServerConfig};
use echo_bench::server::Server;
use std::thread;

fn spawn_server(buffer_size: usize, delay_ms: u64) -> u16 {
    let server = Server::bind(ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        buffer_size,
        delay_ms,
        resolution_ms: 5,
        backlog: 64,
    })
    .expect("bind server");
    let port = server.local_addr().port();
    thread::spawn(move || {
        let _ = server.run();
    });
    port
}

fn client_config(
    port: u16,
    connections: usize,
    payload_len: usize,
    duration_ms: u64,
    mode: ClientMode,
) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        connections,
        payload_len,
        duration_ms,
        mode,
    }
}

#[test]
fn event_client_round_trips() {
    let port = spawn_server(16, 20);
    let config = client_config(port, 4, 16, 400, ClientMode::Event);
    let report = client::run(&config).expect("event client");

    // Every connection drains at least one verified round after the
    // deadline, so the total can never be below the connection count.
    assert!(report.echoed >= 4, "echoed {} rounds", report.echoed);
    assert!(report.elapsed.as_millis() >= 400);
    assert!(report.throughput() > 0.0);
}

#[test]
fn threaded_client_round_trips() {
    let port = spawn_server(16, 20);
    let config = client_config(port, 4, 16, 400, ClientMode::Threaded);
    let report = client::run(&config).expect("threaded client");

    assert!(report.echoed >= 4, "echoed {} rounds", report.echoed);
    assert!(report.elapsed.as_millis() >= 400);
}

#[test]
fn paced_single_connection() {
    // With a 100ms hold per message, a 350ms window fits only a handful of
    // rounds; the artificial latency dominates travel time.
    let port = spawn_server(32, 100);
    let config = client_config(port, 1, 32, 350, ClientMode::Event);
    let report = client::run(&config).expect("paced client");

    assert!(report.echoed >= 1);
    assert!(report.echoed <= 10, "echoed {} rounds", report.echoed);
}

#[test]
fn coordinated_shutdown_with_many_connections() {
    let port = spawn_server(8, 10);
    let connections = 20;
    let config = client_config(port, connections, 8, 300, ClientMode::Event);
    let report = client::run(&config).expect("many-connection client");

    // The loop only terminates once every connection has finished its
    // draining round, each contributing at least one echo.
    assert!(report.echoed >= connections as u64);
}

#[test]
fn both_modes_verify_payloads() {
    let port = spawn_server(4, 10);
    for mode in [ClientMode::Event, ClientMode::Threaded] {
        let config = client_config(port, 2, 4, 150, mode);
        let report = client::run(&config).expect("client run");
        assert!(report.echoed >= 2);
    }
}
