//! # espnow_bridge_mqtt: MQTT session for the serial telemetry bridge
//!
//! Thin layer over `rumqttc` that gives the bridge exactly what it needs:
//!
//! - **Client builder** from a validated `Config`
//! - **Connection kernel** running the event loop in its own task
//! - **Connection-state notifications** over a `watch` channel
//! - **Fire-and-forget publish** (`try_publish`, never awaits the broker)
//! - **Ordered teardown**: stop background activity, then flush DISCONNECT
//!
//! The kernel never reconnects: the first connection error is reported and
//! the kernel ends.
//!
//! ```text
//! MqttManager ──build_and_start──► MqttInstance   (publish, stop, disconnect)
//!                                       │
//!                         ClientBuilder + ConnectionKernel
//!                                       │
//!                         rumqttc AsyncClient / EventLoop
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod state;

pub use client::ClientBuilder;
pub use config::Config;
pub use connection::ConnectionKernel;
pub use error::TransferError;
pub use manager::{MqttInstance, MqttManager};
pub use state::ConnectionState;
