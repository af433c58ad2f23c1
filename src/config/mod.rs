//! Application configuration loading and validation.
//!
//! The top-level `Config` aggregates logging, serial, telemetry and transport
//! settings. It is loaded once from a TOML file before the tracing subscriber
//! exists and stays immutable afterwards.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::{logger::LoggerConfig, serial::SerialConfig, telemetry::TelemetryConfig};

pub mod logger;
pub mod serial;
pub mod telemetry;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "ESPNOW_BRIDGE_CONFIG";

/// Configuration file used when `ESPNOW_BRIDGE_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/espnow-bridge/config.toml";

/// Timestamped console output for use before the tracing subscriber is
/// initialized.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        $crate::config::print_line("INFO", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        $crate::config::print_line("WARN", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::config::print_line("ERROR", format_args!($($arg)*))
    };
}

#[doc(hidden)]
pub fn print_line(level: &str, message: std::fmt::Arguments<'_>) {
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    let level = match level {
        "ERROR" => console::style(level).red(),
        "WARN" => console::style(level).yellow(),
        _ => console::style(level).green(),
    };
    println!("{}  {} {}", console::style(timestamp).dim(), level, message);
}

/// Errors raised while locating, reading, parsing or validating the
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while accessing the configuration file.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML syntax or type mismatch.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Serial port of the ESP-NOW gateway.
    #[validate(nested)]
    pub serial: SerialConfig,

    /// Line grammar markers and topic table.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    /// MQTT broker connection.
    #[validate(nested)]
    pub transport: TransportConfig,
}

pub type TransportConfig = espnow_bridge_mqtt::Config;

impl Config {
    /// Locates and loads the configuration.
    ///
    /// Falls back to built-in defaults when no file exists, so a bare
    /// `espnow-bridge` invocation behaves like the stock gateway setup.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a configuration file exists but cannot be
    /// read, parsed, or validated.
    pub fn new() -> Result<Self, ConfigError> {
        match Self::get_config_path() {
            Some(path) => Self::load(&path),
            None => {
                print_warn!(
                    "No configuration file found ({} unset, {} missing), using defaults",
                    CONFIG_ENV,
                    DEFAULT_CONFIG_PATH
                );
                let config = Config::default();
                config
                    .validate()
                    .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
                Ok(config)
            }
        }
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `ESPNOW_BRIDGE_CONFIG` environment variable
    /// 2. `/etc/espnow-bridge/config.toml`
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(config_path);
            print_info!("Using config from {}: {}", CONFIG_ENV, path.display());
            return Some(path);
        }

        let fallback = Path::new(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Some(fallback.to_path_buf());
        }

        None
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::Config(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let config_str = fs::read_to_string(path)?;
        let config = Self::parse(&config_str)?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn parse(config_str: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(config)
    }
}
