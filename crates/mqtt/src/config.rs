//! MQTT session configuration.
//!
//! Loaded as the `[transport]` table of the bridge configuration. The field
//! names follow rumqttc's vocabulary; the operator-facing names
//! (`broker_host`, `broker_port`, `keepalive_seconds`) are accepted as
//! aliases.
//!
//! ```toml
//! [transport]
//! host = "broker.mqtt.cool"
//! port = 1883
//! keep_alive = 60
//! qos = 0
//! ```

use rumqttc::QoS;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::TransferError;

/// Broker address, session options and publish options.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Broker hostname or IP address. DNS resolution happens on connect.
    #[serde(alias = "broker_host")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port, 1883 for plain MQTT.
    #[serde(alias = "broker_port")]
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Keep-alive interval in seconds.
    #[serde(alias = "keepalive_seconds")]
    #[validate(range(
        min = 5,
        max = 3600,
        message = "Keep alive must be between 5 and 3600 seconds"
    ))]
    pub keep_alive: u64,

    /// Client identifier. Empty means a random UUID is generated on build.
    #[validate(length(max = 36, message = "Client ID must not exceed 36 characters"))]
    pub client_id: String,

    /// Ask the broker for a clean session.
    pub clean_session: bool,

    /// QoS used for every publish (0, 1 or 2).
    #[validate(range(max = 2, message = "QoS must be 0, 1, or 2"))]
    pub qos: u8,

    /// Retain flag used for every publish.
    pub retain: bool,

    /// Capacity of the client's request channel. Publishes beyond it fail
    /// instead of blocking the dispatch loop.
    #[validate(range(min = 1, max = 10000))]
    pub request_channel_capacity: usize,

    /// Upper bound for flushing DISCONNECT on shutdown, in milliseconds.
    #[validate(range(min = 1, max = 60000))]
    pub disconnect_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "broker.mqtt.cool".to_string(),
            port: 1883,
            keep_alive: 60,
            client_id: String::new(),
            clean_session: true,
            qos: 0,
            retain: false,
            request_channel_capacity: 10,
            disconnect_timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Maps the numeric QoS onto rumqttc's enum.
    pub fn qos(&self) -> Result<QoS, TransferError> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(TransferError::ClientSetup(format!(
                "Invalid QoS value {other}, must be 0, 1, or 2"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.host, "broker.mqtt.cool");
        assert_eq!(config.port, 1883);
        assert_eq!(config.keep_alive, 60);
    }

    #[test]
    fn test_invalid_qos_rejected() {
        let config = Config {
            qos: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_host_rejected() {
        let config = Config {
            host: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_keep_alive_range() {
        let config = Config {
            keep_alive: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_qos_mapping() {
        let config = Config {
            qos: 1,
            ..Default::default()
        };
        assert_eq!(config.qos().unwrap(), QoS::AtLeastOnce);
    }

    #[test]
    fn test_operator_aliases() {
        let config: Config = toml::from_str(
            r#"
            broker_host = "10.0.0.5"
            broker_port = 1884
            keepalive_seconds = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 1884);
        assert_eq!(config.keep_alive, 30);
        assert_eq!(config.qos, 0);
    }
}
