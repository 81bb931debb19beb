//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber for the process
//! - Provide a structured logger that accumulates fixed fields
//! - Route finished records to a pluggable sink
//!
//! # Design Decisions
//! - Fixed fields live in a shared, append-only list: deriving a child logger
//!   copies the list once and never touches the parent's
//! - A field re-added under the same key shadows the earlier value
//! - The plain sink forwards to `tracing`, so filtering and formatting stay
//!   with the subscriber
//! - JSON output bypasses the `tracing` formatter: every field becomes a
//!   top-level key of the line

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Parse a configured level name. `warning` is accepted for `warn`.
    pub fn parse(name: &str) -> Option<Level> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        };
        f.write_str(s)
    }
}

/// Value carried by a log field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    /// String content, if this is a string field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an integer field.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) if s.is_empty() || s.contains(char::is_whitespace) => {
                write!(f, "{:?}", s)
            }
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A single key/value pair attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogField {
    pub key: String,
    pub value: FieldValue,
}

impl LogField {
    pub fn str(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Str(value.into()),
        }
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Int(value),
        }
    }
}

/// A finished log line as handed to a sink.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    /// Fields in insertion order. Duplicated keys are possible; the last wins.
    pub fields: Vec<LogField>,
}

impl LogRecord {
    /// Value of `key`, honouring shadowing (last write wins).
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().rev().find(|f| f.key == key).map(|f| &f.value)
    }

    /// Shorthand for string fields.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(FieldValue::as_str)
    }

    /// Field keys in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }

    /// Render as a flat JSON object (`level`, `message`, then fields).
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("level".into(), serde_json::Value::String(self.level.to_string()));
        map.insert("message".into(), serde_json::Value::String(self.message.clone()));
        for field in &self.fields {
            let value = match &field.value {
                FieldValue::Str(s) => serde_json::Value::String(s.clone()),
                FieldValue::Int(i) => serde_json::Value::from(*i),
                FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            };
            map.insert(field.key.clone(), value);
        }
        serde_json::Value::Object(map)
    }

    fn render_fields(&self) -> String {
        let mut out = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&field.key);
            out.push('=');
            out.push_str(&field.value.to_string());
        }
        out
    }
}

/// Destination for finished records.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord);
}

/// Sink that forwards records to the global `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, record: &LogRecord) {
        let fields = record.render_fields();
        let message = record.message.as_str();
        match record.level {
            Level::Trace => tracing::trace!(fields = %fields, "{}", message),
            Level::Debug => tracing::debug!(fields = %fields, "{}", message),
            Level::Info => tracing::info!(fields = %fields, "{}", message),
            Level::Warn => tracing::warn!(fields = %fields, "{}", message),
            Level::Error => tracing::error!(fields = %fields, "{}", message),
        }
    }
}

/// Sink writing one flat JSON object per line.
///
/// Records below `min_level` are dropped.
pub struct JsonSink<W> {
    writer: W,
    min_level: Level,
}

impl<W> JsonSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync,
{
    pub fn new(writer: W, min_level: Level) -> Self {
        Self { writer, min_level }
    }
}

impl JsonSink<fn() -> io::Stdout> {
    pub fn stdout(min_level: Level) -> Self {
        Self::new(io::stdout as fn() -> io::Stdout, min_level)
    }
}

impl<W> LogSink for JsonSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync,
{
    fn write(&self, record: &LogRecord) {
        if record.level < self.min_level {
            return;
        }

        let mut json = record.to_json();
        if let Some(map) = json.as_object_mut() {
            map.entry("timestamp").or_insert_with(|| serde_json::Value::from(now_ms()));
        }
        let mut line = json.to_string();
        line.push('\n');

        if let Err(e) = self.writer.make_writer().write_all(line.as_bytes()) {
            eprintln!("failed to write log line: {}", e);
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Primary sink for the configured output format.
pub fn sink_for(config: &ObservabilityConfig) -> Arc<dyn LogSink> {
    if config.json_logs {
        let min_level = Level::parse(&config.log_level).unwrap_or(Level::Info);
        Arc::new(JsonSink::stdout(min_level))
    } else {
        Arc::new(TracingSink)
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records whose message equals `message`.
    pub fn with_message(&self, message: &str) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.message == message)
            .collect()
    }
}

impl LogSink for CaptureSink {
    fn write(&self, record: &LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Logger carrying a fixed set of fields.
///
/// Cloning is cheap. Every `with_*` call returns a new logger; the receiver is
/// never modified.
#[derive(Clone)]
pub struct StructuredLogger {
    sink: Arc<dyn LogSink>,
    fields: Arc<[LogField]>,
}

impl fmt::Debug for StructuredLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredLogger")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl StructuredLogger {
    /// Root logger with no fixed fields.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            fields: Arc::from(Vec::new()),
        }
    }

    /// Fixed fields in the order they were added.
    pub fn fields(&self) -> &[LogField] {
        &self.fields
    }

    /// Current value of a fixed field (last write wins).
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().rev().find(|f| f.key == key).map(|f| &f.value)
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Child logger with the given fields appended.
    pub fn with_fields<I>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = LogField>,
    {
        let mut fields = self.fields.to_vec();
        fields.extend(extra);
        Self {
            sink: Arc::clone(&self.sink),
            fields: Arc::from(fields),
        }
    }

    pub fn with_str(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_fields([LogField::str(key, value)])
    }

    pub fn with_int(&self, key: impl Into<String>, value: i64) -> Self {
        self.with_fields([LogField::int(key, value)])
    }

    pub fn event(&self, level: Level) -> LogEvent {
        LogEvent {
            sink: Arc::clone(&self.sink),
            level,
            fields: self.fields.to_vec(),
        }
    }

    pub fn trace(&self) -> LogEvent {
        self.event(Level::Trace)
    }

    pub fn debug(&self) -> LogEvent {
        self.event(Level::Debug)
    }

    pub fn info(&self) -> LogEvent {
        self.event(Level::Info)
    }

    pub fn warn(&self) -> LogEvent {
        self.event(Level::Warn)
    }

    pub fn error(&self) -> LogEvent {
        self.event(Level::Error)
    }
}

/// A pending log line. Nothing is written until [`LogEvent::msg`].
#[must_use = "a LogEvent does nothing until `msg` is called"]
pub struct LogEvent {
    sink: Arc<dyn LogSink>,
    level: Level,
    fields: Vec<LogField>,
}

impl LogEvent {
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(LogField::str(key, value));
        self
    }

    pub fn int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.fields.push(LogField::int(key, value));
        self
    }

    pub fn bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.fields.push(LogField {
            key: key.into(),
            value: FieldValue::Bool(value),
        });
        self
    }

    /// Attach an error under the `error` key.
    pub fn err(self, err: &dyn std::error::Error) -> Self {
        self.str("error", err.to_string())
    }

    /// Attach a duration in whole milliseconds.
    pub fn duration_ms(self, key: impl Into<String>, elapsed: Duration) -> Self {
        let millis = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        self.int(key, millis)
    }

    /// Write the record.
    pub fn msg(self, message: impl Into<String>) {
        let record = LogRecord {
            level: self.level,
            message: message.into(),
            fields: self.fields,
        };
        self.sink.write(&record);
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level when present.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}
