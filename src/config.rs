//! Configuration module for queue-server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::receive::DEFAULT_BUFFER_SIZE;
use crate::server::{ServerSettings, DEFAULT_BACKLOG, DEFAULT_PORT};
use crate::transmit::{TransmitSettings, WaitStrategy};
use clap::Parser;
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "queue-server")]
#[command(version = "0.1.0")]
#[command(
    about = "A single-connection TCP server with inbound and outbound message queues",
    long_about = None
)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:1145)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen backlog
    #[arg(short = 'b', long)]
    pub backlog: Option<i32>,

    /// Largest chunk a single receive produces, in bytes
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Delay between empty outbound-queue checks, in milliseconds
    #[arg(short = 'p', long)]
    pub poll_interval_ms: Option<u64>,

    /// How the transmit loop waits for outbound messages
    #[arg(short = 's', long, value_enum)]
    pub strategy: Option<WaitStrategy>,

    /// How long shutdown waits for the connection loops, in milliseconds
    #[arg(long)]
    pub shutdown_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub receive: ReceiveConfig,
    #[serde(default)]
    pub transmit: TransmitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

/// Receive loop configuration
#[derive(Debug, Deserialize)]
pub struct ReceiveConfig {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

/// Transmit loop configuration
#[derive(Debug, Deserialize)]
pub struct TransmitConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub strategy: WaitStrategy,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            strategy: WaitStrategy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    format!("0.0.0.0:{DEFAULT_PORT}")
}

fn default_backlog() -> i32 {
    DEFAULT_BACKLOG
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub backlog: i32,
    pub buffer_size: usize,
    pub poll_interval: Duration,
    pub strategy: WaitStrategy,
    pub shutdown_timeout: Duration,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Resolve already-parsed CLI arguments, reading the TOML file they name.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|source| ConfigError::FileRead {
                    path: config_path.clone(),
                    source,
                })?;
            toml::from_str(&contents)
                .map_err(|source| ConfigError::TomlParse {
                    path: config_path.clone(),
                    source,
                })?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    /// Merge CLI args with TOML config (CLI takes precedence).
    pub fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let listen = cli.listen.unwrap_or(toml_config.server.listen);
        let listen: SocketAddr = listen
            .parse()
            .map_err(|source| ConfigError::InvalidListen {
                addr: listen.clone(),
                source,
            })?;

        Ok(Config {
            listen,
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            buffer_size: cli
                .buffer_size
                .unwrap_or(toml_config.receive.buffer_size),
            poll_interval: Duration::from_millis(
                cli.poll_interval_ms
                    .unwrap_or(toml_config.transmit.poll_interval_ms),
            ),
            strategy: cli.strategy.unwrap_or(toml_config.transmit.strategy),
            shutdown_timeout: Duration::from_millis(
                cli.shutdown_timeout_ms
                    .unwrap_or(toml_config.server.shutdown_timeout_ms),
            ),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        })
    }

    /// Settings for the server lifecycle.
    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            listen: self.listen,
            backlog: self.backlog,
            buffer_size: self.buffer_size,
            transmit: TransmitSettings {
                poll_interval: self.poll_interval,
                strategy: self.strategy,
            },
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid listen address '{addr}': {source}")]
    InvalidListen {
        addr: String,
        #[source]
        source: AddrParseError,
    },
}
