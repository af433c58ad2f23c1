//! espnow-bridge: ESP-NOW serial gateway to MQTT bridge
//!
//! Reads the newline-delimited telemetry an ESP-NOW gateway prints on its
//! serial port, parses every line into a reading and republishes temperature
//! and humidity on per-node MQTT topics.
//!
//! ## Modules
//!
//! * `config`: TOML configuration with `validator` checks and defaults that
//!   match the stock gateway setup.
//!
//! * `core`: The telemetry pipeline:
//!   - Line grammar and reading model
//!   - Topic resolver for the two known slave nodes
//!   - Dispatcher and the serial line source
//!   - Connection monitor and the bridge context with ordered teardown
//!
//! * `logger`: `tracing` subscriber setup: console output in compact,
//!   pretty or JSON format and optional systemd journald output.
//!
//! The MQTT session itself lives in the `espnow_bridge_mqtt` workspace crate.

pub mod config;
pub mod core;
pub mod logger;
