use crate::filter::TrackingFilter;
use crate::format::JsonFormatter;
use crate::record::{ExceptionInfo, LogEvent};
use chrono::Utc;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns every event into a [`LogEvent`],
/// enriches it with the emitting thread's tracking identifiers and writes it
/// as one JSON line.
///
/// Formatting happens inline on the emitting thread; that is what makes the
/// thread-local identifiers visible without any parameter threading. A
/// record that fails to format or write is dropped with a note on stderr
/// and counted in `failed_events`; later events are unaffected.
pub struct TrackingJsonLayer<W = fn() -> io::Stdout> {
    filter: TrackingFilter,
    formatter: JsonFormatter,
    make_writer: W,
    /// Events rendered and written.
    pub rendered_events: Arc<AtomicU64>,
    /// Events dropped because formatting or writing failed.
    pub failed_events: Arc<AtomicU64>,
}

impl TrackingJsonLayer {
    /// Create a layer writing to stdout.
    pub fn new(formatter: JsonFormatter) -> Self {
        TrackingJsonLayer {
            filter: TrackingFilter,
            formatter,
            make_writer: io::stdout,
            rendered_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<W> TrackingJsonLayer<W> {
    /// Redirect output, e.g. to a file writer or a test buffer.
    pub fn with_writer<W2>(self, make_writer: W2) -> TrackingJsonLayer<W2>
    where
        W2: for<'w> MakeWriter<'w> + 'static,
    {
        TrackingJsonLayer {
            filter: self.filter,
            formatter: self.formatter,
            make_writer,
            rendered_events: self.rendered_events,
            failed_events: self.failed_events,
        }
    }
}

impl<S, W> Layer<S> for TrackingJsonLayer<W>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut record = capture(event);
        if !self.filter.apply(&mut record) {
            return;
        }

        match self.formatter.render(&record) {
            Ok(line) => {
                let mut writer = self.make_writer.make_writer();
                // The separator is the sink's concern, appended here in the
                // same write as the line.
                if let Err(e) = writeln!(writer, "{line}") {
                    self.failed_events.fetch_add(1, Ordering::Relaxed);
                    eprintln!("failed to write log record: {e}");
                } else {
                    self.rendered_events.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("dropping log record: {e}");
            }
        }
    }
}

/// Build a [`LogEvent`] from a `tracing` event. The message field becomes
/// the event message, every other field lands in `additional` in record
/// order, and a field recorded as an error value becomes the event's
/// exception info.
fn capture(event: &Event<'_>) -> LogEvent {
    let meta = event.metadata();
    let mut record = LogEvent {
        timestamp: Utc::now(),
        level: meta.level().to_string(),
        module: bare_module(meta.module_path().unwrap_or_else(|| meta.target())),
        target: meta.target().to_string(),
        file: meta.file().map(str::to_string),
        line: meta.line(),
        message: String::new(),
        additional: serde_json::Map::new(),
        exception: None,
        trans: None,
        corr: None,
        op: None,
    };
    event.record(&mut EventVisitor { record: &mut record });
    record
}

/// Last segment of a module path: `app::middlewares` logs as `middlewares`.
fn bare_module(path: &str) -> String {
    path.rsplit("::").next().unwrap_or(path).to_string()
}

struct EventVisitor<'a> {
    record: &'a mut LogEvent,
}

impl tracing::field::Visit for EventVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.record.message = value.to_string();
        } else {
            self.record
                .additional
                .insert(field.name().to_string(), serde_json::Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.record
            .additional
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.record
            .additional
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.record
            .additional
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.record
            .additional
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_error(
        &mut self,
        _field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.record.exception = Some(ExceptionInfo::from_error(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.record.message = format!("{value:?}");
        } else {
            self.record.additional.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{value:?}")),
            );
        }
    }
}
