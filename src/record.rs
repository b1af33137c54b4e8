use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;

/// One log call captured from the host logging facility.
///
/// The message arrives already interpolated (`tracing` renders the
/// `format_args!` template at the call site). `additional` holds the
/// caller-supplied extra fields of that one call, in call order.
/// `trans`/`corr`/`op` start out empty and are filled in by
/// [`crate::filter::TrackingFilter`] before formatting.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub module: String,
    pub target: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub message: String,
    pub additional: Map<String, Value>,
    pub exception: Option<ExceptionInfo>,
    pub trans: Option<String>,
    pub corr: Option<String>,
    pub op: Option<String>,
}

impl LogEvent {
    /// Build an event timestamped now, with no extras and no identifiers.
    pub fn new(
        level: impl Into<String>,
        module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let module = module.into();
        LogEvent {
            timestamp: Utc::now(),
            level: level.into(),
            target: module.clone(),
            module,
            file: None,
            line: None,
            message: message.into(),
            additional: Map::new(),
            exception: None,
            trans: None,
            corr: None,
            op: None,
        }
    }

    /// Read a named source attribute for field-mapping projection.
    ///
    /// Unknown names and unset optional attributes yield `Value::Null`,
    /// never an error, so a mapping may reference attributes that a given
    /// event does not carry.
    pub fn attribute(&self, name: &str) -> Value {
        match name {
            "levelname" => Value::String(self.level.clone()),
            "module" => Value::String(self.module.clone()),
            "target" => Value::String(self.target.clone()),
            "message" => Value::String(self.message.clone()),
            "trans" => opt_str(&self.trans),
            "corr" => opt_str(&self.corr),
            "op" => opt_str(&self.op),
            "file" => opt_str(&self.file),
            "lineno" => self.line.map(Value::from).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

fn opt_str(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}

/// Structured exception information attached to an event.
///
/// Mirrors what a `std::error::Error` exposes: the top-level message, the
/// `source()` chain, and an optional captured backtrace.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptionInfo {
    pub message: String,
    pub chain: Vec<String>,
    pub backtrace: Option<String>,
}

impl ExceptionInfo {
    /// Capture an error and its `source()` chain.
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        ExceptionInfo {
            message: err.to_string(),
            chain,
            backtrace: None,
        }
    }

    /// Render to the multi-line text that lands in `exc_text`.
    pub fn render(&self) -> String {
        let mut text = self.message.clone();
        for cause in &self.chain {
            text.push_str("\ncaused by: ");
            text.push_str(cause);
        }
        if let Some(backtrace) = &self.backtrace {
            text.push('\n');
            text.push_str(backtrace);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_covers_known_names() {
        let mut event = LogEvent::new("INFO", "middlewares", "Output message");
        event.trans = Some("24ff".to_string());
        event.line = Some(7);

        assert_eq!(event.attribute("levelname"), Value::from("INFO"));
        assert_eq!(event.attribute("module"), Value::from("middlewares"));
        assert_eq!(event.attribute("message"), Value::from("Output message"));
        assert_eq!(event.attribute("trans"), Value::from("24ff"));
        assert_eq!(event.attribute("corr"), Value::Null);
        assert_eq!(event.attribute("lineno"), Value::from(7));
        assert_eq!(event.attribute("no_such_attribute"), Value::Null);
    }

    #[test]
    fn exception_render_includes_cause_chain() {
        let info = ExceptionInfo {
            message: "write failed".to_string(),
            chain: vec!["disk full".to_string()],
            backtrace: None,
        };
        assert_eq!(info.render(), "write failed\ncaused by: disk full");
    }

    #[test]
    fn exception_from_error_without_source() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let info = ExceptionInfo::from_error(&err);
        assert_eq!(info.message, "boom");
        assert!(info.chain.is_empty());
        assert!(!info.render().is_empty());
    }
}
