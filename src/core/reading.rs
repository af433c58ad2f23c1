/// One slave node report, as parsed from a single telemetry line.
///
/// Built only by [`LineGrammar::parse`](super::parser::LineGrammar::parse)
/// and dropped once its values are dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    source_id: u32,
    temperature_celsius: f64,
    humidity_percent: f64,
    alert: String,
}

impl Reading {
    pub(crate) fn new(
        source_id: u32,
        temperature_celsius: f64,
        humidity_percent: f64,
        alert: impl Into<String>,
    ) -> Self {
        Self {
            source_id,
            temperature_celsius,
            humidity_percent,
            alert: alert.into(),
        }
    }

    /// Slave number the gateway reported the values for.
    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.temperature_celsius
    }

    pub fn humidity_percent(&self) -> f64 {
        self.humidity_percent
    }

    /// Free-text alert, verbatim. Not published.
    pub fn alert(&self) -> &str {
        &self.alert
    }
}
