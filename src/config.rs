//! Configuration module for ws-echo-probe.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the probe
#[derive(Parser, Debug)]
#[command(name = "ws-echo-probe")]
#[command(author = "ws-echo-probe authors")]
#[command(version = "0.1.0")]
#[command(about = "Send numbered greetings to a WebSocket echo endpoint", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Defaults to `probe` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to an endpoint and exchange greetings until interrupted
    Probe(ProbeArgs),
    /// Run a local echo endpoint that behaves like the device
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {
    /// WebSocket endpoint (e.g., ws://10.28.65.123/ws)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Delay between iterations in milliseconds
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// Stop after this many echoed messages (runs forever when omitted)
    #[arg(short = 'n', long)]
    pub max_messages: Option<u64>,

    /// Text placed before "Message #<n>"
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind to (e.g., 127.0.0.1:8080)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Maximum number of concurrent connections
    #[arg(long)]
    pub max_connections: Option<usize>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Probe-related configuration
#[derive(Debug, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub max_messages: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            interval_ms: default_interval_ms(),
            prefix: default_prefix(),
            max_messages: None,
        }
    }
}

/// Echo endpoint configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_connections: default_max_connections(),
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

fn default_endpoint() -> String {
    "ws://10.28.65.123/ws".to_string()
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_prefix() -> String {
    "Hello ESP32!".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_connections() -> usize {
    16
}

// stdout carries the operator lines; logs stay quiet unless asked for
fn default_log_level() -> String {
    "warn".to_string()
}

/// Which side of the exchange to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Probe,
    Serve,
}

/// Resolved probe settings
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub endpoint: String,
    pub interval: Duration,
    pub prefix: String,
    pub max_messages: Option<u64>,
}

/// Resolved echo endpoint settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: String,
    pub max_connections: usize,
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub probe: ProbeSettings,
    pub server: ServerSettings,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    pub fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let (mode, probe_args, serve_args) = match cli.command {
            None => (Mode::Probe, ProbeArgs::default(), ServeArgs::default()),
            Some(Command::Probe(args)) => (Mode::Probe, args, ServeArgs::default()),
            Some(Command::Serve(args)) => (Mode::Serve, ProbeArgs::default(), args),
        };

        let probe = toml_config.probe;
        let server = toml_config.server;

        Config {
            mode,
            probe: ProbeSettings {
                endpoint: probe_args.endpoint.unwrap_or(probe.endpoint),
                interval: Duration::from_millis(
                    probe_args.interval_ms.unwrap_or(probe.interval_ms),
                ),
                prefix: probe_args.prefix.unwrap_or(probe.prefix),
                max_messages: probe_args.max_messages.or(probe.max_messages),
            },
            server: ServerSettings {
                listen: serve_args.listen.unwrap_or(server.listen),
                max_connections: serve_args
                    .max_connections
                    .unwrap_or(server.max_connections)
                    .max(1),
            },
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
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
