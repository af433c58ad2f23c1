//! Source id to publish topic mapping.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::config::telemetry::TopicsConfig;

/// Temperature and humidity topics of one slave node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TopicSet {
    #[serde(alias = "temp")]
    #[validate(custom(function = "validate_topic"))]
    pub temperature: String,

    #[validate(custom(function = "validate_topic"))]
    pub humidity: String,
}

impl TopicSet {
    pub fn new(temperature: impl Into<String>, humidity: impl Into<String>) -> Self {
        Self {
            temperature: temperature.into(),
            humidity: humidity.into(),
        }
    }
}

/// Publish topics must be non-empty and free of subscription wildcards.
fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.is_empty() {
        let mut err = ValidationError::new("empty_topic");
        err.message = Some("Topic must not be empty".into());
        return Err(err);
    }
    if topic.contains(['+', '#']) {
        let mut err = ValidationError::new("wildcard_topic");
        err.message = Some(format!("Topic '{}' contains a wildcard", topic).into());
        return Err(err);
    }
    Ok(())
}

/// Reading from a node that has no topic mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown source id {0}")]
pub struct UnknownSourceError(pub u32);

/// Fixed table of known nodes, consulted once per reading.
#[derive(Debug, Clone)]
pub struct TopicResolver {
    entries: Vec<(u32, TopicSet)>,
}

impl TopicResolver {
    pub fn new(entries: impl IntoIterator<Item = (u32, TopicSet)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn from_config(config: &TopicsConfig) -> Self {
        Self::new([(1, config.slave1.clone()), (2, config.slave2.clone())])
    }

    pub fn resolve(&self, source_id: u32) -> Result<&TopicSet, UnknownSourceError> {
        self.entries
            .iter()
            .find(|(id, _)| *id == source_id)
            .map(|(_, topics)| topics)
            .ok_or(UnknownSourceError(source_id))
    }
}

impl Default for TopicResolver {
    fn default() -> Self {
        Self::from_config(&TopicsConfig::default())
    }
}
