//! Serial port settings for the ESP-NOW gateway.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Port, line settings and polling cadence.
///
/// The port is always opened 8N1 without flow control, which is what the
/// ESP32 USB-UART bridges expose.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyUSB0`) or port name (`COM9`).
    #[serde(alias = "serial_port")]
    #[validate(length(min = 1, message = "Serial port must not be empty"))]
    pub port: String,

    #[validate(range(min = 1, message = "Baud rate must be positive"))]
    pub baud_rate: u32,

    /// Delay between two checks for waiting bytes, in milliseconds.
    #[validate(range(min = 1, max = 10000))]
    pub poll_interval_ms: u64,

    /// Read timeout handed to the serial driver, in milliseconds.
    #[validate(range(min = 1, max = 60000))]
    pub timeout_ms: u64,

    /// Bytes accumulated without a newline before the buffer is flushed as a
    /// line of its own.
    #[validate(range(min = 16, max = 65536))]
    pub max_line_length: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            poll_interval_ms: 10,
            timeout_ms: 500,
            max_line_length: 1024,
        }
    }
}
