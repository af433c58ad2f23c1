//! Error type for every fallible operation of the MQTT session.
//!
//! **Startup errors** (fail fast):
//! - `ClientSetup`: client could not be built from the configuration
//! - `ConfigError`: configuration validation failed
//!
//! **Runtime errors** (logged by the caller, never retried here):
//! - `ClientTransfer`: request could not be queued (channel full or closed)
//! - `ClientConnection`: network or protocol failure reported by the event loop
//! - `ConnectionKernel`: background task could not be joined
//! - `DisconnectTimeout`: DISCONNECT was queued but not flushed in time

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Client could not be built (bad host, unknown QoS, ...).
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// Validation rules on `Config` failed.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] validator::ValidationErrors),

    /// Local client failed to hand a request to the event loop.
    ///
    /// Happens when the request channel is full or when the connection
    /// kernel has stopped and dropped the event loop side.
    #[error("Client transfer error: {0}")]
    ClientTransfer(#[from] rumqttc::ClientError),

    /// Event loop reported a connection failure.
    ///
    /// Boxed, `rumqttc::ConnectionError` is large.
    #[error("Client connection error: {0}")]
    ClientConnection(#[from] Box<rumqttc::ConnectionError>),

    /// Background task failed or panicked.
    #[error("Connection kernel error: {0}")]
    ConnectionKernel(String),

    /// DISCONNECT could not be flushed before the deadline.
    #[error("Disconnect not flushed within {0} ms")]
    DisconnectTimeout(u64),
}

impl From<rumqttc::ConnectionError> for TransferError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        TransferError::ClientConnection(Box::new(err))
    }
}
