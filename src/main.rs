use echo_bench::client;
use echo_bench::config::{Config, RunConfig};
use echo_bench::server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match config.run {
        RunConfig::Server(server_config) => {
            info!(
                host = %server_config.host,
                port = server_config.port,
                buffer_size = server_config.buffer_size,
                delay_ms = server_config.delay_ms,
                resolution_ms = server_config.resolution_ms,
                backlog = server_config.backlog,
                "starting echo server"
            );
            let server = Server::bind(server_config)?;
            server.run()?;
            Ok(())
        }
        RunConfig::Client(client_config) => {
            info!(
                host = %client_config.host,
                port = client_config.port,
                connections = client_config.connections,
                payload_len = client_config.payload_len,
                duration_ms = client_config.duration_ms,
                mode = ?client_config.mode,
                "starting echo client"
            );
            let report = client::run(&client_config)?;
            println!("{report}");
            Ok(())
        }
    }
}
