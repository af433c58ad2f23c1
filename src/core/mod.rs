//! Telemetry pipeline: reading model, line grammar, topic table, dispatch,
//! serial line source, connection monitor and the bridge context that ties
//! them together.

pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod monitor;
pub mod parser;
pub mod reading;
pub mod serial;
pub mod topics;
