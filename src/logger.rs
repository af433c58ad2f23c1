//! Logging initialization.
//!
//! `LoggerManager` validates a `LoggerConfig` and installs the global
//! `tracing` subscriber with a console layer, a journald layer, or both.
//! `RUST_LOG` overrides the configured level for every layer.

use std::io;

use thiserror::Error;
use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter, Layer, Registry};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, JournaldConfig, LogFormat, LoggerConfig},
    print_info, print_warn,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// Journald socket could not be opened.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Every output is disabled.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,

    /// Global subscriber was already installed.
    #[error("Logger initialization error: {0}")]
    InitializationError(String),
}

pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Validates `config`; nothing is installed until [`LoggerManager::init`].
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;
        Ok(LoggerManager { config })
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    /// Builds the enabled layers.
    ///
    /// A journald failure is only fatal when it would leave no output at all.
    fn layers(&self) -> Result<Vec<BoxedLayer>, LoggerError> {
        let mut layers = Vec::new();

        if let Some(console) = self.config.console.as_ref().filter(|c| c.enabled) {
            layers.push(console_layer(console, self.filter()));
        }

        if let Some(journald) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match journald_layer(journald, self.filter()) {
                Ok(layer) => {
                    layers.push(layer);
                    print_info!(
                        "Systemd journald logger initialized with identifier: {}",
                        journald.identifier
                    );
                }
                Err(e) if !layers.is_empty() => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        if layers.is_empty() {
            print_warn!("No logging layers were initialized. Please check your configuration.");
            return Err(LoggerError::NoLayersConfigured);
        }
        Ok(layers)
    }

    /// Installs the global subscriber. Call once, at startup.
    pub fn init(&self) -> Result<(), LoggerError> {
        let layers = self.layers()?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| LoggerError::InitializationError(e.to_string()))
    }
}

fn console_layer(config: &ConsoleConfig, filter: EnvFilter) -> BoxedLayer {
    let span_events = if config.show_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = fmt::layer()
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_span_events(span_events)
        .with_ansi(config.ansi_colors)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Json => base.json().with_filter(filter).boxed(),
        LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
    }
}

fn journald_layer(config: &JournaldConfig, filter: EnvFilter) -> Result<BoxedLayer, LoggerError> {
    let layer = tracing_journald::layer()?.with_syslog_identifier(config.identifier.clone());
    Ok(layer.with_filter(filter).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        let config = LoggerConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_all_outputs_disabled() {
        let config = LoggerConfig {
            console: None,
            journald: None,
            ..Default::default()
        };
        let manager = LoggerManager::new(config).unwrap();
        assert!(matches!(
            manager.layers(),
            Err(LoggerError::NoLayersConfigured)
        ));
    }

    #[test]
    fn test_console_layer_for_every_format() {
        for format in [LogFormat::Compact, LogFormat::Pretty, LogFormat::Json] {
            let config = LoggerConfig {
                console: Some(ConsoleConfig {
                    format,
                    ..Default::default()
                }),
                ..Default::default()
            };
            let manager = LoggerManager::new(config).unwrap();
            assert_eq!(manager.layers().unwrap().len(), 1);
        }
    }
}
