use espnow_bridge_mqtt::TransferError;
use thiserror::Error;

use super::{parser::ParseError, topics::UnknownSourceError};

/// Errors of the bridge runtime.
///
/// Line-level failures (`Decode`, `Parse`, `UnknownSource`, `Publish`) are
/// logged by the dispatcher and never end the loop. `SerialOpen` is fatal at
/// startup; `SerialIo` ends the loop and leads to teardown.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Raw line is not valid UTF-8.
    #[error("Line is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    UnknownSource(#[from] UnknownSourceError),

    /// Serial port could not be opened.
    #[error("Failed to open serial port {port}: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Read from or close of an open serial port failed.
    #[error("Serial I/O error: {0}")]
    SerialIo(#[from] std::io::Error),

    /// Value could not be handed to the MQTT client.
    #[error("Failed to publish to {topic}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: TransferError,
    },

    /// MQTT session could not be stopped or closed.
    #[error("MQTT transport error: {0}")]
    Transport(#[from] TransferError),

    /// One or more teardown steps failed; every step was still attempted.
    #[error("Teardown finished with {} error(s)", .0.len())]
    Teardown(Vec<BridgeError>),
}
