//! Telemetry line grammar.
//!
//! The gateway prints one line per slave report:
//!
//! ```text
//! Received Data from Slave1: Temp = 23.5°C, Humidity = 60.0%, Alert = none
//! └──────── prefix ───────┘│└─ sep ─┘└num┘└deg┘└─ label ──┘└num┘%└ label ┘└alert┘
//!                          id
//! ```
//!
//! Matching is done by a small cursor that consumes literals and fields in
//! order, so every failure names the literal or field where it stopped and
//! the byte offset into the stripped line.

use std::fmt;

use thiserror::Error;

use super::reading::Reading;

const PREFIX: &str = "Received Data from Slave";
const TEMPERATURE_LABEL: &str = ": Temp = ";
const HUMIDITY_LABEL: &str = ", Humidity = ";
const PERCENT_MARKER: &str = "%";
const ALERT_LABEL: &str = ", Alert = ";

/// Default degree marker, as UTF-8.
pub const DEFAULT_DEGREE_MARKER: &str = "°C";

/// Captured fields, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SourceId,
    Temperature,
    Humidity,
    Alert,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::SourceId => "source id",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Alert => "alert",
        };
        f.write_str(name)
    }
}

/// Where and why matching stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("expected '{expected}' at byte {offset}")]
    ExpectedLiteral { expected: String, offset: usize },

    #[error("missing {field} at byte {offset}")]
    MissingField { field: Field, offset: usize },

    #[error("invalid {field} '{text}'")]
    InvalidNumber { field: Field, text: String },
}

/// A line that does not match the telemetry grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized telemetry line '{line}': {reason}")]
pub struct ParseError {
    line: String,
    reason: ParseFailure,
}

impl ParseError {
    /// The stripped line that failed to match.
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn reason(&self) -> &ParseFailure {
        &self.reason
    }
}

/// Removes leading and trailing whitespace and control characters.
pub fn strip_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}

/// Parses `line` with the default degree marker.
pub fn parse(line: &str) -> Result<Reading, ParseError> {
    LineGrammar::default().parse(line)
}

/// The telemetry grammar with its configurable unit marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineGrammar {
    degree_marker: String,
}

impl Default for LineGrammar {
    fn default() -> Self {
        Self::new(DEFAULT_DEGREE_MARKER)
    }
}

impl LineGrammar {
    pub fn new(degree_marker: impl Into<String>) -> Self {
        Self {
            degree_marker: degree_marker.into(),
        }
    }

    /// Matches the whole line or fails; never returns a partial reading.
    ///
    /// The source id is not checked against known nodes here.
    pub fn parse(&self, line: &str) -> Result<Reading, ParseError> {
        let line = strip_line(line);
        self.match_fields(line).map_err(|reason| ParseError {
            line: line.to_string(),
            reason,
        })
    }

    fn match_fields(&self, line: &str) -> Result<Reading, ParseFailure> {
        let mut cursor = Cursor::new(line);

        cursor.literal(PREFIX)?;
        let source_id = cursor.digits(Field::SourceId)?;
        cursor.literal(TEMPERATURE_LABEL)?;
        let temperature = cursor.decimal(Field::Temperature)?;
        cursor.literal(&self.degree_marker)?;
        cursor.literal(HUMIDITY_LABEL)?;
        let humidity = cursor.decimal(Field::Humidity)?;
        cursor.literal(PERCENT_MARKER)?;
        cursor.literal(ALERT_LABEL)?;
        let alert = cursor.remainder(Field::Alert)?;

        Ok(Reading::new(
            saturating_id(source_id),
            to_number(Field::Temperature, temperature)?,
            to_number(Field::Humidity, humidity)?,
            alert,
        ))
    }
}

/// Digit run to id; runs beyond `u32::MAX` saturate and stay unknown to the
/// resolver.
fn saturating_id(digits: &str) -> u32 {
    digits.bytes().fold(0u32, |id, digit| {
        id.saturating_mul(10).saturating_add(u32::from(digit - b'0'))
    })
}

fn to_number<T: std::str::FromStr>(field: Field, text: &str) -> Result<T, ParseFailure> {
    text.parse().map_err(|_| ParseFailure::InvalidNumber {
        field,
        text: text.to_string(),
    })
}

/// Forward-only position in a line.
struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn literal(&mut self, expected: &str) -> Result<(), ParseFailure> {
        if !self.rest().starts_with(expected) {
            return Err(ParseFailure::ExpectedLiteral {
                expected: expected.to_string(),
                offset: self.pos,
            });
        }
        self.pos += expected.len();
        Ok(())
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|&(_, c)| !accept(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        &rest[..end]
    }

    fn non_empty(&self, field: Field, text: &'a str) -> Result<&'a str, ParseFailure> {
        if text.is_empty() {
            return Err(ParseFailure::MissingField {
                field,
                offset: self.pos,
            });
        }
        Ok(text)
    }

    /// One or more ASCII digits.
    fn digits(&mut self, field: Field) -> Result<&'a str, ParseFailure> {
        let text = self.take_while(|c| c.is_ascii_digit());
        self.non_empty(field, text)
    }

    /// One or more ASCII digits or dots; conversion happens later.
    fn decimal(&mut self, field: Field) -> Result<&'a str, ParseFailure> {
        let text = self.take_while(|c| c.is_ascii_digit() || c == '.');
        self.non_empty(field, text)
    }

    /// Everything up to the end of the line.
    fn remainder(&mut self, field: Field) -> Result<&'a str, ParseFailure> {
        let text = self.rest();
        self.pos = self.line.len();
        self.non_empty(field, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLAVE1: &str = "Received Data from Slave1: Temp = 23.5°C, Humidity = 60.0%, Alert = none";

    fn failure(line: &str) -> ParseFailure {
        parse(line).unwrap_err().reason().clone()
    }

    #[test]
    fn test_parse_slave1_line() {
        let reading = parse(SLAVE1).unwrap();
        assert_eq!(reading.source_id(), 1);
        assert_eq!(reading.temperature_celsius(), 23.5);
        assert_eq!(reading.humidity_percent(), 60.0);
        assert_eq!(reading.alert(), "none");
    }

    #[test]
    fn test_parse_keeps_alert_verbatim() {
        let reading = parse(
            "Received Data from Slave2: Temp = 19.1°C, Humidity = 45.2%, Alert = low battery, 3.1V",
        )
        .unwrap();
        assert_eq!(reading.source_id(), 2);
        assert_eq!(reading.temperature_celsius(), 19.1);
        assert_eq!(reading.humidity_percent(), 45.2);
        assert_eq!(reading.alert(), "low battery, 3.1V");
    }

    #[test]
    fn test_unknown_source_id_still_parses() {
        let reading =
            parse("Received Data from Slave3: Temp = 10.0°C, Humidity = 50.0%, Alert = none")
                .unwrap();
        assert_eq!(reading.source_id(), 3);
    }

    #[test]
    fn test_integer_values_accepted() {
        let reading =
            parse("Received Data from Slave12: Temp = 21°C, Humidity = 40%, Alert = ok").unwrap();
        assert_eq!(reading.source_id(), 12);
        assert_eq!(reading.temperature_celsius(), 21.0);
        assert_eq!(reading.humidity_percent(), 40.0);
    }

    #[test]
    fn test_strips_whitespace_and_control_characters() {
        let line = format!("\u{0}\u{2}  {SLAVE1}\r\n");
        let reading = parse(&line).unwrap();
        assert_eq!(reading.alert(), "none");
    }

    #[test]
    fn test_error_carries_stripped_line() {
        let err = parse("  garbage line\r\n").unwrap_err();
        assert_eq!(err.line(), "garbage line");
        assert!(err.to_string().contains("garbage line"));
    }

    #[test]
    fn test_garbage_fails_at_prefix() {
        assert_eq!(
            failure("garbage line"),
            ParseFailure::ExpectedLiteral {
                expected: PREFIX.to_string(),
                offset: 0,
            }
        );
    }

    #[test]
    fn test_missing_source_id() {
        assert_eq!(
            failure("Received Data from Slave: Temp = 23.5°C, Humidity = 60.0%, Alert = none"),
            ParseFailure::MissingField {
                field: Field::SourceId,
                offset: PREFIX.len(),
            }
        );
    }

    #[test]
    fn test_missing_temperature() {
        assert!(matches!(
            failure("Received Data from Slave1: Temp = °C, Humidity = 60.0%, Alert = none"),
            ParseFailure::MissingField {
                field: Field::Temperature,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_humidity() {
        assert!(matches!(
            failure("Received Data from Slave1: Temp = 23.5°C, Humidity = %, Alert = none"),
            ParseFailure::MissingField {
                field: Field::Humidity,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_alert_section() {
        assert_eq!(
            failure("Received Data from Slave1: Temp = 23.5°C, Humidity = 60.0%"),
            ParseFailure::ExpectedLiteral {
                expected: ALERT_LABEL.to_string(),
                offset: "Received Data from Slave1: Temp = 23.5°C, Humidity = 60.0%".len(),
            }
        );
    }

    #[test]
    fn test_empty_alert_rejected() {
        // The trailing space is stripped, so the label itself no longer matches.
        assert!(matches!(
            failure("Received Data from Slave1: Temp = 23.5°C, Humidity = 60.0%, Alert = "),
            ParseFailure::ExpectedLiteral { .. }
        ));
    }

    #[test]
    fn test_fields_out_of_order_rejected() {
        assert!(parse("Received Data from Slave1: Humidity = 60.0%, Temp = 23.5°C, Alert = none")
            .is_err());
    }

    #[test]
    fn test_wording_is_case_sensitive() {
        assert!(parse("received data from slave1: Temp = 23.5°C, Humidity = 60.0%, Alert = none")
            .is_err());
    }

    #[test]
    fn test_negative_temperature_rejected() {
        assert!(matches!(
            failure("Received Data from Slave1: Temp = -3.5°C, Humidity = 60.0%, Alert = none"),
            ParseFailure::MissingField {
                field: Field::Temperature,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_decimal_rejected() {
        assert_eq!(
            failure("Received Data from Slave1: Temp = 1.2.3°C, Humidity = 60.0%, Alert = none"),
            ParseFailure::InvalidNumber {
                field: Field::Temperature,
                text: "1.2.3".to_string(),
            }
        );
    }

    #[test]
    fn test_oversized_source_id_saturates() {
        let reading = parse(
            "Received Data from Slave99999999999: Temp = 1.0°C, Humidity = 2.0%, Alert = none",
        )
        .unwrap();
        assert_eq!(reading.source_id(), u32::MAX);
        assert_eq!(saturating_id("4294967295"), u32::MAX);
        assert_eq!(saturating_id("4294967294"), u32::MAX - 1);
        assert_eq!(saturating_id("007"), 7);
    }

    #[test]
    fn test_wrong_degree_marker_rejected() {
        assert!(matches!(
            failure("Received Data from Slave1: Temp = 23.5C, Humidity = 60.0%, Alert = none"),
            ParseFailure::ExpectedLiteral { expected, .. } if expected == DEFAULT_DEGREE_MARKER
        ));
    }

    #[test]
    fn test_custom_degree_marker() {
        let grammar = LineGrammar::new("Â°C");
        let reading = grammar
            .parse("Received Data from Slave2: Temp = 18.0Â°C, Humidity = 55.5%, Alert = none")
            .unwrap();
        assert_eq!(reading.temperature_celsius(), 18.0);
        assert!(grammar.parse(SLAVE1).is_err());
    }

    #[test]
    fn test_decimal_values_round_trip() {
        for value in ["0.0", "5.", ".5", "23.5", "19.1", "45.25", "100.125", "0.001"] {
            let line = format!(
                "Received Data from Slave1: Temp = {value}°C, Humidity = {value}%, Alert = none"
            );
            let reading = parse(&line).unwrap();
            let expected: f64 = value.parse().unwrap();
            assert_eq!(reading.temperature_celsius(), expected, "temperature {value}");
            assert_eq!(reading.humidity_percent(), expected, "humidity {value}");
        }
    }

    #[test]
    fn test_strip_line() {
        assert_eq!(strip_line("\t abc \r\n"), "abc");
        assert_eq!(strip_line("\u{1b}abc\u{7f}"), "abc");
        assert_eq!(strip_line(""), "");
    }
}
