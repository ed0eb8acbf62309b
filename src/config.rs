//! Configuration for the echo benchmark.
//!
//! Positional command-line arguments (all optional, mirroring the classic
//! echo-benchmark invocation) plus an optional TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

/// Command-line arguments for the benchmark
#[derive(Parser, Debug)]
#[command(name = "echo-bench")]
#[command(version = "0.1.0")]
#[command(about = "TCP echo round-trip benchmark", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the event-driven echo server
    Server {
        /// Address to listen on
        host: Option<String>,
        /// Port to listen on
        port: Option<u16>,
        /// Per-connection buffer size in bytes (the fixed message length)
        buffer_size: Option<usize>,
        /// Artificial per-message delay in milliseconds
        delay_ms: Option<u64>,
        /// Poll timeout in milliseconds, bounding delay-queue latency
        resolution_ms: Option<u64>,
        /// Accept backlog length
        backlog: Option<u32>,
    },
    /// Run the echo benchmark client
    Client {
        /// Server address
        host: Option<String>,
        /// Server port
        port: Option<u16>,
        /// Number of concurrent connections
        connections: Option<usize>,
        /// Payload length in bytes (must match the server's buffer size)
        payload_len: Option<usize>,
        /// Benchmark duration in milliseconds
        duration_ms: Option<u64>,
        /// Concurrency model
        #[arg(value_enum)]
        mode: Option<ClientMode>,
    },
}

/// Which concurrency model the client uses.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    /// Single-threaded readiness-multiplexed loop
    Event,
    /// One blocking thread per connection
    Threaded,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerToml,
    #[serde(default)]
    pub client: ClientToml,
    #[serde(default)]
    pub logging: LoggingToml,
}

/// Server table of the config file
#[derive(Debug, Deserialize)]
pub struct ServerToml {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_resolution_ms")]
    pub resolution_ms: u64,
    #[serde(default = "default_backlog")]
    pub backlog: u32,
}

impl Default for ServerToml {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            buffer_size: default_buffer_size(),
            delay_ms: default_delay_ms(),
            resolution_ms: default_resolution_ms(),
            backlog: default_backlog(),
        }
    }
}

/// Client table of the config file
#[derive(Debug, Deserialize)]
pub struct ClientToml {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connections")]
    pub connections: usize,
    #[serde(default = "default_payload_len")]
    pub payload_len: usize,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_mode")]
    pub mode: ClientMode,
}

impl Default for ClientToml {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connections: default_connections(),
            payload_len: default_payload_len(),
            duration_ms: default_duration_ms(),
            mode: default_mode(),
        }
    }
}

/// Logging table of the config file
#[derive(Debug, Deserialize)]
pub struct LoggingToml {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingToml {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_buffer_size() -> usize {
    32
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_resolution_ms() -> u64 {
    10
}

fn default_backlog() -> u32 {
    1024
}

fn default_connections() -> usize {
    10
}

fn default_payload_len() -> usize {
    32
}

fn default_duration_ms() -> u64 {
    5000
}

fn default_mode() -> ClientMode {
    ClientMode::Event
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub buffer_size: usize,
    pub delay_ms: u64,
    pub resolution_ms: u64,
    pub backlog: u32,
}

impl ServerConfig {
    /// Resolve the listen address, accepting hostnames like `localhost`.
    pub fn socket_addr(&self) -> io::Result<SocketAddr> {
        resolve(&self.host, self.port)
    }
}

/// Final resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub connections: usize,
    pub payload_len: usize,
    pub duration_ms: u64,
    pub mode: ClientMode,
}

impl ClientConfig {
    /// Resolve the target address, accepting hostnames like `localhost`.
    pub fn socket_addr(&self) -> io::Result<SocketAddr> {
        resolve(&self.host, self.port)
    }
}

fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("host '{host}' resolved to no addresses"),
        )
    })
}

/// Which program to run, with its resolved configuration.
#[derive(Debug, Clone)]
pub enum RunConfig {
    Server(ServerConfig),
    Client(ClientConfig),
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub run: RunConfig,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let run = match cli.command {
            Command::Server {
                host,
                port,
                buffer_size,
                delay_ms,
                resolution_ms,
                backlog,
            } => RunConfig::Server(ServerConfig {
                host: host.unwrap_or(toml_config.server.host),
                port: port.unwrap_or(toml_config.server.port),
                buffer_size: buffer_size.unwrap_or(toml_config.server.buffer_size),
                delay_ms: delay_ms.unwrap_or(toml_config.server.delay_ms),
                resolution_ms: resolution_ms.unwrap_or(toml_config.server.resolution_ms),
                backlog: backlog.unwrap_or(toml_config.server.backlog),
            }),
            Command::Client {
                host,
                port,
                connections,
                payload_len,
                duration_ms,
                mode,
            } => RunConfig::Client(ClientConfig {
                host: host.unwrap_or(toml_config.client.host),
                port: port.unwrap_or(toml_config.client.port),
                connections: connections.unwrap_or(toml_config.client.connections),
                payload_len: payload_len.unwrap_or(toml_config.client.payload_len),
                duration_ms: duration_ms.unwrap_or(toml_config.client.duration_ms),
                mode: mode.unwrap_or(toml_config.client.mode),
            }),
        };

        Ok(Config {
            run,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
