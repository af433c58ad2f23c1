//! Per-line pipeline: decode, parse, resolve, publish.
//!
//! `Dispatcher::process_line` never fails. Every outcome is logged and
//! returned as a `LineOutcome`, so the loop that feeds it only has to care
//! about the serial port.

use tracing::{debug, info, warn};

use super::{
    error::BridgeError,
    parser::{strip_line, LineGrammar},
    reading::Reading,
    topics::{TopicResolver, TopicSet},
};
use crate::config::telemetry::TelemetryConfig;

/// Sink for published values.
///
/// `publish` hands the payload over and returns; it does not wait for the
/// broker.
pub trait Publisher {
    fn publish(&self, topic: &str, payload: String) -> Result<(), BridgeError>;
}

/// What happened to one raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Both values were handed to the publisher; `failed` of them were
    /// rejected.
    Published { source_id: u32, failed: usize },
    DecodeFailed,
    ParseFailed,
    UnknownSource(u32),
}

/// Formats a value the way the gateway dashboards expect: shortest
/// round-trip text, integral values keep one decimal (`60.0`).
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Stateless line processor; holds only the grammar and the topic table.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    grammar: LineGrammar,
    resolver: TopicResolver,
}

impl Dispatcher {
    pub fn new(grammar: LineGrammar, resolver: TopicResolver) -> Self {
        Self { grammar, resolver }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(
            LineGrammar::new(config.degree_marker.as_str()),
            TopicResolver::from_config(&config.topics),
        )
    }

    /// Runs one raw line (without its newline) through the pipeline.
    pub fn process_line<P>(&self, raw: &[u8], publisher: &P) -> LineOutcome
    where
        P: Publisher + ?Sized,
    {
        match self.resolve_line(raw) {
            Ok((reading, topics)) => {
                let failed = publish_reading(&reading, topics, publisher);
                LineOutcome::Published {
                    source_id: reading.source_id(),
                    failed,
                }
            }
            Err(BridgeError::Decode(e)) => {
                warn!(
                    "Discarding line that is not valid UTF-8 ({} bytes): {}",
                    raw.len(),
                    e
                );
                LineOutcome::DecodeFailed
            }
            Err(BridgeError::UnknownSource(e)) => {
                warn!("Invalid slave ID: {}", e.0);
                LineOutcome::UnknownSource(e.0)
            }
            Err(e) => {
                if let BridgeError::Parse(parse) = &e {
                    debug!("{}", parse.reason());
                    warn!("Invalid data format: {}", parse.line());
                } else {
                    warn!("Line dropped: {}", e);
                }
                LineOutcome::ParseFailed
            }
        }
    }

    fn resolve_line(&self, raw: &[u8]) -> Result<(Reading, &TopicSet), BridgeError> {
        let text = std::str::from_utf8(raw)?;
        debug!("Received: {}", strip_line(text));

        let reading = self.grammar.parse(text)?;
        let topics = self.resolver.resolve(reading.source_id())?;
        Ok((reading, topics))
    }
}

/// Publishes temperature then humidity; returns how many were rejected.
fn publish_reading<P>(reading: &Reading, topics: &TopicSet, publisher: &P) -> usize
where
    P: Publisher + ?Sized,
{
    let values = [
        (&topics.temperature, reading.temperature_celsius()),
        (&topics.humidity, reading.humidity_percent()),
    ];

    let mut failed = 0;
    for (topic, value) in values {
        let payload = format_value(value);
        match publisher.publish(topic, payload.clone()) {
            Ok(()) => info!("Published to {}: {}", topic, payload),
            Err(e) => {
                warn!("{}", e);
                failed += 1;
            }
        }
    }
    failed
}
