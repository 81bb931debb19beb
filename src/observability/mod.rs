//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request-scoped code (ExecutionContext, ingress middleware):
//!     → logging.rs (StructuredLogger → LogSink)
//!         → TracingSink → tracing subscriber (stdout, plain text)
//!         → JsonSink → one JSON object per line (stdout)
//!         → FanoutSink (events) → external event channel
//!     → metrics.rs (counters, histograms)
//! ```
//!
//! # Design Decisions
//! - Correlation ID is a fixed field on every request-scoped logger
//! - Event types/codes are constants so log consumers can match on them
//! - Metrics are cheap and optional

pub mod event_codes;
pub mod logging;
pub mod metrics;

pub use logging::{
    sink_for, CaptureSink, FieldValue, JsonSink, Level, LogEvent, LogField, LogRecord, LogSink,
    StructuredLogger, TracingSink,
};
