//! Connection state reported by the connection kernel.
//!
//! The kernel publishes every transition on a `watch` channel. Consumers
//! (the bridge's connection monitor) only observe it; nothing in the publish
//! path blocks on it.
//!
//! ```ignore
//! let state = ConnectionState::Refused(5);
//! println!("{}", state); // "Refused (return code 5)"
//! ```

use std::fmt;

/// Current state of the MQTT session.
///
/// Lifecycle:
/// - `Connecting` -> `Connected` (CONNACK with success code)
/// - `Connecting` -> `Refused` (CONNACK with a non-zero return code)
/// - `Connecting` / `Connected` -> `Disconnected` (network error, broker closed)
/// - any -> `Stopped` (background activity stopped on shutdown)
///
/// There is no automatic reconnection: once `Refused` or `Disconnected` is
/// reported the kernel stops polling the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// CONNECT sent, waiting for CONNACK.
    Connecting,

    /// Broker accepted the session.
    Connected,

    /// Broker answered CONNACK with the given non-zero return code.
    Refused(u8),

    /// Session lost or never established; carries the reason.
    Disconnected(String),

    /// Background activity stopped by the owner.
    Stopped,
}

impl ConnectionState {
    /// Short identifier for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Refused(_) => "Refused",
            ConnectionState::Disconnected(_) => "Disconnected",
            ConnectionState::Stopped => "Stopped",
        }
    }

    /// Contextual details, empty for states that carry none.
    pub fn details(&self) -> String {
        match self {
            ConnectionState::Refused(code) => format!("return code {code}"),
            ConnectionState::Disconnected(reason) => reason.clone(),
            _ => String::new(),
        }
    }

    /// Returns true only in `Connected`.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())?;
        let details = self.details();
        if !details.is_empty() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_as_str() {
        assert_eq!(ConnectionState::Connecting.as_str(), "Connecting");
        assert_eq!(ConnectionState::Connected.as_str(), "Connected");
        assert_eq!(ConnectionState::Refused(5).as_str(), "Refused");
        assert_eq!(
            ConnectionState::Disconnected("test".into()).as_str(),
            "Disconnected"
        );
        assert_eq!(ConnectionState::Stopped.as_str(), "Stopped");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionState::Refused(4).to_string(),
            "Refused (return code 4)"
        );
        assert_eq!(
            ConnectionState::Disconnected("broker closed".into()).to_string(),
            "Disconnected (broker closed)"
        );
    }

    #[test]
    fn test_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Refused(5).is_connected());
    }
}
