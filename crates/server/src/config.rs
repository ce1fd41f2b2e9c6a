//! Server configuration.
//!
//! Provides configuration loading from files and environment variables.

use std::net::SocketAddr;

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address to listen on for client connections.
    pub listen_addr: SocketAddr,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Per-connection resource limits applied at connection setup.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Log output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format (development).
    Text,
    /// JSON structured logging (production).
    Json,
    /// JSON for non-TTY stdout, text otherwise.
    #[default]
    Auto,
}

/// Per-connection resource limits.
///
/// Snapshotted onto each connection when it is accepted; later configuration
/// changes affect only new connections.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum entries returned from a single search.
    #[serde(default = "default_size_limit")]
    pub size_limit: usize,
    /// Maximum time to process a single operation, in seconds.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u64,
    /// Idle time before a connection is eligible for termination, in seconds.
    /// Zero disables idle termination.
    #[serde(default)]
    pub idle_time_limit_secs: u64,
    /// Maximum candidate entries examined while processing a single search.
    #[serde(default = "default_lookthrough_limit")]
    pub lookthrough_limit: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            size_limit: default_size_limit(),
            time_limit_secs: default_time_limit_secs(),
            idle_time_limit_secs: 0,
            lookthrough_limit: default_lookthrough_limit(),
        }
    }
}

fn default_size_limit() -> usize {
    1000
}

fn default_time_limit_secs() -> u64 {
    60
}

fn default_lookthrough_limit() -> usize {
    5000
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Supports TOML format. Environment variables can override config values
    /// using the `ARBORDIR` prefix with `__` as the nesting separator
    /// (e.g., `ARBORDIR__LIMITS__SIZE_LIMIT=500`).
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let builder = config::Config::builder();

        // Add config file if provided
        let builder = if let Some(path) = path {
            builder.add_source(config::File::with_name(path))
        } else {
            // Try default locations
            builder
                .add_source(config::File::with_name("arbordir").required(false))
                .add_source(config::File::with_name("/etc/arbordir/config").required(false))
        };

        let builder = builder.add_source(
            config::Environment::with_prefix("ARBORDIR").separator("__").try_parsing(true),
        );

        let config = builder.build().map_err(|e| ConfigError::Load(e.to_string()))?;

        config.try_deserialize().map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Create a configuration for testing.
    #[allow(clippy::unwrap_used)]
    pub fn for_test(port: u16) -> Self {
        Self {
            listen_addr: format!("127.0.0.1:{}", port).parse().unwrap(),
            log_format: LogFormat::Text,
            limits: LimitsConfig::default(),
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to load configuration.
    Load(String),
    /// Failed to parse configuration.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "failed to load config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "failed to parse config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
