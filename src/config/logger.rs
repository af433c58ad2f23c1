//! Logging configuration structures and validation logic.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Available formats for console log output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Top-level logging configuration.
///
/// `RUST_LOG`, when set, takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggerConfig {
    /// Global log level: trace, debug, info, warn or error (case-insensitive).
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,

    /// Console output. `None` disables it.
    #[validate(nested)]
    pub console: Option<ConsoleConfig>,

    /// Systemd journald output. `None` disables it.
    #[validate(nested)]
    pub journald: Option<JournaldConfig>,
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("invalid_log_level");
            err.message = Some(format!("Invalid log level: {}", level).into());
            Err(err)
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: "info".to_string(),
            console: Some(ConsoleConfig::default()),
            journald: None,
        }
    }
}

/// Console log output.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    /// Include the module path of each event.
    pub show_target: bool,
    pub show_thread_ids: bool,
    /// Emit span close events with timings.
    pub show_spans: bool,
    pub ansi_colors: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: true,
            format: LogFormat::default(),
            show_target: false,
            show_thread_ids: false,
            show_spans: false,
            ansi_colors: true,
        }
    }
}

/// Systemd journald output (Unix only).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JournaldConfig {
    pub enabled: bool,

    /// Syslog identifier of journal entries. Must be non-empty.
    #[validate(length(min = 1))]
    pub identifier: String,
}

impl Default for JournaldConfig {
    fn default() -> Self {
        JournaldConfig {
            enabled: false,
            identifier: "espnow-bridge".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logger_config_is_valid() {
        let config = LoggerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.console.as_ref().is_some_and(|c| c.enabled));
        assert!(config.journald.is_none());
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let config = LoggerConfig {
            level: "DEBUG".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let config = LoggerConfig {
            level: "verbose".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_journald_identifier_rejected() {
        let config = LoggerConfig {
            journald: Some(JournaldConfig {
                enabled: true,
                identifier: String::new(),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_names() {
        let console: ConsoleConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(console.format, LogFormat::Json);
        assert!(console.enabled);
    }
}
