use crate::record::LogEvent;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io;

/// Source attribute name that resolves to the rendered timestamp instead of
/// an event attribute.
const TIME_SOURCE: &str = "utctime";

/// Default output layout: `time`, `lvl`, `corr`, `trans`, `op`, `comp`, `msg`.
pub const DEFAULT_FIELD_MAPPING: &[(&str, &str)] = &[
    ("time", TIME_SOURCE),
    ("lvl", "levelname"),
    ("corr", "corr"),
    ("trans", "trans"),
    ("op", "op"),
    ("comp", "module"),
    ("msg", "message"),
];

/// Ordered list of `(output key, source attribute)` pairs.
///
/// Insertion order defines output order. Output keys must be unique; a
/// duplicate is a construction-time error so a bad configuration can never
/// surface mid-render. Supplying a mapping fully replaces the default, it is
/// not merged with it.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pairs: Vec<(String, String)>,
}

impl FieldMapping {
    pub fn new<K, S>(pairs: impl IntoIterator<Item = (K, S)>) -> Result<Self, ConfigError>
    where
        K: Into<String>,
        S: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(key, source)| (key.into(), source.into()))
            .collect();

        let mut seen = HashSet::new();
        for (key, _) in &pairs {
            if !seen.insert(key.as_str()) {
                return Err(ConfigError::DuplicateKey(key.clone()));
            }
        }
        Ok(FieldMapping { pairs })
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, s)| (k.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        // The built-in layout has unique keys, no validation needed.
        FieldMapping {
            pairs: DEFAULT_FIELD_MAPPING
                .iter()
                .map(|&(k, s)| (k.to_string(), s.to_string()))
                .collect(),
        }
    }
}

/// Converts an event's UTC creation instant into the wall-clock reference
/// rendered into the `time` field. The millisecond component always comes
/// from the UTC instant itself.
pub type TimeConverter = fn(DateTime<Utc>) -> NaiveDateTime;

/// Default converter: render the timestamp in UTC.
pub fn utc_time(timestamp: DateTime<Utc>) -> NaiveDateTime {
    timestamp.naive_utc()
}

/// Render the timestamp in the machine's local timezone.
pub fn local_time(timestamp: DateTime<Utc>) -> NaiveDateTime {
    timestamp.with_timezone(&Local).naive_local()
}

/// Malformed formatter configuration, rejected at construction time.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("duplicate output key in field mapping: {0}")]
    DuplicateKey(String),
}

/// Per-event formatting failure. The affected record is dropped by the
/// caller; later events are unaffected.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("failed to encode log record as JSON: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Renders a [`LogEvent`] as one JSON object per line.
///
/// Output keys follow the configured [`FieldMapping`] order, then the
/// event's `additional` keys in their own order, then `exc_text` when
/// exception info is present. All configuration is fixed at construction;
/// `render` keeps no state between calls and the formatter can be shared
/// across threads freely.
///
/// ```
/// use json_track_log::format::JsonFormatter;
/// use json_track_log::record::LogEvent;
///
/// let formatter = JsonFormatter::new();
/// let line = formatter.render(&LogEvent::new("INFO", "middlewares", "Output message")).unwrap();
/// assert!(line.starts_with("{\"time\": \""));
/// assert!(line.ends_with("\"comp\": \"middlewares\", \"msg\": \"Output message\"}"));
/// ```
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    mapping: FieldMapping,
    suppress_blanks: bool,
    convert_time: TimeConverter,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        JsonFormatter {
            mapping: FieldMapping::default(),
            suppress_blanks: false,
            convert_time: utc_time,
        }
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        JsonFormatter::default()
    }

    /// Replace the default field mapping.
    pub fn with_mapping(mut self, mapping: FieldMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Drop keys whose rendered value is null, an empty string, zero,
    /// `false`, or an empty array/object. Off by default.
    pub fn suppress_blanks(mut self, on: bool) -> Self {
        self.suppress_blanks = on;
        self
    }

    /// Replace the wall-clock reference used for the rendered timestamp.
    pub fn with_time_converter(mut self, convert: TimeConverter) -> Self {
        self.convert_time = convert;
        self
    }

    /// Render one event to a single JSON line (no trailing newline; the
    /// record separator belongs to the sink).
    pub fn render(&self, event: &LogEvent) -> Result<String, FormatError> {
        let time = self.format_timestamp(event.timestamp);

        let mut record = Map::new();
        for (key, source) in self.mapping.pairs() {
            let value = if source == TIME_SOURCE {
                Value::String(time.clone())
            } else {
                event.attribute(source)
            };
            record.insert(key.to_string(), value);
        }

        // A colliding key takes the additional value but keeps the mapped
        // field's position; new keys append in the caller's order.
        for (key, value) in &event.additional {
            record.insert(key.clone(), value.clone());
        }

        if let Some(exception) = &event.exception {
            record.insert("exc_text".to_string(), Value::String(exception.render()));
        }

        if self.suppress_blanks {
            record.retain(|_, value| !is_blank(value));
        }

        encode(&record)
    }

    /// `YYYY-MM-DDTHH:MM:SS` in the configured reference, then the event's
    /// millisecond component zero-padded to three digits, then `Z`.
    fn format_timestamp(&self, timestamp: DateTime<Utc>) -> String {
        let wall = (self.convert_time)(timestamp);
        format!(
            "{}.{:03}Z",
            wall.format("%Y-%m-%dT%H:%M:%S"),
            timestamp.timestamp_subsec_millis()
        )
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn encode(record: &Map<String, Value>) -> Result<String, FormatError> {
    let mut buf = Vec::with_capacity(256);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiLineFormatter);
    record.serialize(&mut ser)?;
    // The formatter escapes everything outside ASCII, so the buffer is
    // valid UTF-8 no matter what the record contained.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `serde_json` formatter matching the upstream wire format: `", "` and
/// `": "` separators, non-ASCII characters escaped as `\uXXXX` (surrogate
/// pairs for astral characters).
struct AsciiLineFormatter;

impl serde_json::ser::Formatter for AsciiLineFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut utf16 = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                let mut utf8 = [0u8; 4];
                writer.write_all(ch.encode_utf8(&mut utf8).as_bytes())?;
            } else {
                for unit in ch.encode_utf16(&mut utf16).iter() {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
