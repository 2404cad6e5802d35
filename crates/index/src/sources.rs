//! Source parsers: turn the two telemetry file shapes into summaries.
//!
//! Each source has its own parser type; [`SourceSet`] drives both through
//! the same generic read path so the format is chosen at compile time.
//! A source that is missing, empty or malformed contributes nothing and
//! never stops the other one.

use crate::error::SourceError;
use crate::types::Summary;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const UNKNOWN: &str = "unknown";
const UNKNOWN_COORD: &str = "?";
const NO_MESSAGE: &str = "no message";

/// A parser for one telemetry document shape.
pub trait SourceParser {
    /// Short name used in logs and errors.
    const KIND: &'static str;

    /// Produce one summary per entry of an already decoded document.
    ///
    /// Returns `Err(reason)` when the top-level shape is unusable.
    fn parse_document(&self, document: &Value) -> Result<Vec<Summary>, String>;
}

/// Position reports: `{"aircraft": [ {flight, hex, alt_baro, gs, lat, lon}, ... ]}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionReportParser;

impl SourceParser for PositionReportParser {
    const KIND: &'static str = "position-report";

    fn parse_document(&self, document: &Value) -> Result<Vec<Summary>, String> {
        let root = document
            .as_object()
            .ok_or_else(|| format!("expected a JSON object, found {}", shape_name(document)))?;

        let entries = match root.get("aircraft") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                return Err(format!(
                    "\"aircraft\" must be an array, found {}",
                    shape_name(other)
                ))
            }
        };

        Ok(entries.iter().map(summarize_position).collect())
    }
}

fn summarize_position(entry: &Value) -> Summary {
    let empty = Map::new();
    let fields = entry.as_object().unwrap_or(&empty);

    Summary::new(format!(
        "ADS-B: {} ({}) at {} ft, speed {} knots, position {}, {}",
        field(fields, "flight", UNKNOWN),
        field(fields, "hex", UNKNOWN),
        field(fields, "alt_baro", UNKNOWN),
        field(fields, "gs", UNKNOWN),
        field(fields, "lat", UNKNOWN_COORD),
        field(fields, "lon", UNKNOWN_COORD),
    ))
}

/// Short text messages: one object or an array of objects, each either
/// wrapped as `{"vdl2": {"acars": {...}}}` or flat as `{"acars": {...}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageParser;

impl SourceParser for MessageParser {
    const KIND: &'static str = "message";

    fn parse_document(&self, document: &Value) -> Result<Vec<Summary>, String> {
        let entries: Vec<&Value> = match document {
            Value::Object(_) => vec![document],
            Value::Array(items) => items.iter().collect(),
            other => return Err(format!("unrecognized top-level {}", shape_name(other))),
        };

        Ok(entries.into_iter().map(summarize_message).collect())
    }
}

fn summarize_message(entry: &Value) -> Summary {
    let body = match entry.get("vdl2") {
        Some(inner @ Value::Object(_)) => inner,
        _ => entry,
    };

    let empty = Map::new();
    let acars = body
        .get("acars")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    Summary::new(format!(
        "ACARS message from flight {}: {}",
        field(acars, "flight", UNKNOWN),
        field(acars, "msg_text", NO_MESSAGE),
    ))
}

/// Render one field, falling back to `placeholder` when absent, null or blank.
fn field(fields: &Map<String, Value>, key: &str, placeholder: &str) -> String {
    let rendered = match fields.get(key) {
        None | Some(Value::Null) => return placeholder.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };

    if rendered.is_empty() {
        placeholder.to_string()
    } else {
        rendered
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read and parse one source file.
pub async fn read_source<P: SourceParser>(
    parser: &P,
    path: &Path,
) -> Result<Vec<Summary>, SourceError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Unavailable {
            kind: P::KIND,
            path: path.to_path_buf(),
            source,
        })?;

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SourceError::Empty {
            kind: P::KIND,
            path: path.to_path_buf(),
        });
    }

    let document: Value = serde_json::from_str(raw).map_err(|e| SourceError::Parse {
        kind: P::KIND,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    parser
        .parse_document(&document)
        .map_err(|reason| SourceError::Parse {
            kind: P::KIND,
            path: path.to_path_buf(),
            reason,
        })
}

/// Summaries from one extraction pass plus the sources that were skipped.
#[derive(Debug, Default)]
pub struct Extraction {
    pub summaries: Vec<Summary>,
    pub failures: Vec<SourceError>,
}

/// The two telemetry files read on every rebuild cycle.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub position_reports: PathBuf,
    pub messages: PathBuf,
}

impl SourceSet {
    pub fn new(position_reports: impl Into<PathBuf>, messages: impl Into<PathBuf>) -> Self {
        Self {
            position_reports: position_reports.into(),
            messages: messages.into(),
        }
    }

    pub fn from_config(config: &radar_core::config::SourcesConfig) -> Self {
        Self::new(&config.position_reports, &config.messages)
    }

    /// Read both sources. Position reports come first, then messages.
    pub async fn extract(&self) -> Extraction {
        let mut extraction = Extraction::default();

        let position = read_source(&PositionReportParser, &self.position_reports).await;
        collect(&mut extraction, position);

        let messages = read_source(&MessageParser, &self.messages).await;
        collect(&mut extraction, messages);

        extraction
    }

    /// Summaries from every readable source; skipped sources are logged.
    pub async fn parse_sources(&self) -> Vec<Summary> {
        self.extract().await.summaries
    }
}

fn collect(extraction: &mut Extraction, result: Result<Vec<Summary>, SourceError>) {
    match result {
        Ok(summaries) => {
            debug!(count = summaries.len(), "Source parsed");
            extraction.summaries.extend(summaries);
        }
        Err(err) => {
            warn!("Skipping source: {}", err);
            extraction.failures.push(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_position_report_full_entry() {
        let doc = json!({"aircraft": [{
            "flight": "UAL123  ",
            "hex": "a1b2c3",
            "alt_baro": 35000,
            "gs": 450.5,
            "lat": 37.62,
            "lon": -122.38
        }]});

        let summaries = PositionReportParser.parse_document(&doc).unwrap();
        assert_eq!(
            summaries[0].as_str(),
            "ADS-B: UAL123 (a1b2c3) at 35000 ft, speed 450.5 knots, position 37.62, -122.38"
        );
    }

    #[test]
    fn test_position_report_missing_fields_use_placeholders() {
        let doc = json!({"aircraft": [{}, {"flight": "   "}]});
        let summaries = PositionReportParser.parse_document(&doc).unwrap();

        assert_eq!(summaries.len(), 2);
        for summary in &summaries {
            assert_eq!(
                summary.as_str(),
                "ADS-B: unknown (unknown) at unknown ft, speed unknown knots, position ?, ?"
            );
        }
    }

    #[test]
    fn test_position_report_without_aircraft_key_is_empty() {
        let summaries = PositionReportParser
            .parse_document(&json!({"now": 1}))
            .unwrap();
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_position_report_rejects_wrong_shapes() {
        assert!(PositionReportParser.parse_document(&json!([1, 2])).is_err());
        assert!(PositionReportParser
            .parse_document(&json!({"aircraft": "nope"}))
            .is_err());
    }

    #[test]
    fn test_message_single_object_and_array() {
        let single = json!({"vdl2": {"acars": {"flight": "DAL456", "msg_text": "FUEL 12.4"}}});
        let summaries = MessageParser.parse_document(&single).unwrap();
        assert_eq!(
            summaries[0].as_str(),
            "ACARS message from flight DAL456: FUEL 12.4"
        );

        let list = json!([
            {"acars": {"flight": "SWA1", "msg_text": "ETA 1420"}},
            {"vdl2": {"acars": {}}},
            "garbage"
        ]);
        let summaries = MessageParser.parse_document(&list).unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].as_str(), "ACARS message from flight SWA1: ETA 1420");
        assert_eq!(
            summaries[1].as_str(),
            "ACARS message from flight unknown: no message"
        );
        assert_eq!(
            summaries[2].as_str(),
            "ACARS message from flight unknown: no message"
        );
    }

    #[test]
    fn test_message_rejects_scalar_document() {
        let err = MessageParser.parse_document(&json!(42)).unwrap_err();
        assert!(err.contains("number"));
    }

    #[tokio::test]
    async fn test_read_source_errors() {
        let temp = TempDir::new().unwrap();

        let missing = temp.path().join("missing.json");
        let err = read_source(&MessageParser, &missing).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));

        let empty = temp.path().join("empty.json");
        std::fs::write(&empty, "  \n").unwrap();
        let err = read_source(&MessageParser, &empty).await.unwrap_err();
        assert!(matches!(err, SourceError::Empty { .. }));

        let broken = temp.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        let err = read_source(&MessageParser, &broken).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_broken_source_does_not_block_the_other() {
        let temp = TempDir::new().unwrap();
        let adsb = temp.path().join("aircraft.json");
        let vdl2 = temp.path().join("vdl2.json");
        std::fs::write(&adsb, "[[[").unwrap();
        std::fs::write(
            &vdl2,
            r#"{"acars": {"flight": "AAL9", "msg_text": "REQUEST GATE"}}"#,
        )
        .unwrap();

        let extraction = SourceSet::new(&adsb, &vdl2).extract().await;
        assert_eq!(extraction.summaries.len(), 1);
        assert_eq!(extraction.failures.len(), 1);
        assert!(matches!(extraction.failures[0], SourceError::Parse { .. }));
    }
}
