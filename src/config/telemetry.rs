//! Telemetry line markers and the per-node topic table.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::{parser::DEFAULT_DEGREE_MARKER, topics::TopicSet};

/// Settings consumed by the line parser and the topic resolver.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Literal that follows the temperature value on the wire.
    ///
    /// Compared byte for byte. Set it to whatever the gateway firmware
    /// actually prints if it differs from `°C`.
    #[validate(length(min = 1, message = "Degree marker must not be empty"))]
    pub degree_marker: String,

    #[validate(nested)]
    pub topics: TopicsConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            degree_marker: DEFAULT_DEGREE_MARKER.to_string(),
            topics: TopicsConfig::default(),
        }
    }
}

/// Publish topics of the two known slave nodes.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TopicsConfig {
    #[validate(nested)]
    pub slave1: TopicSet,

    #[validate(nested)]
    pub slave2: TopicSet,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            slave1: TopicSet::new("esp/now/slave1/temp", "esp/now/slave1/humidity"),
            slave2: TopicSet::new("esp/now/slave2/temp", "esp/now/slave2/humidity"),
        }
    }
}
