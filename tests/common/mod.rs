//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tenant_runtime::config::ServiceConfig;
use tenant_runtime::events::EventDispatcher;
use tenant_runtime::observability::{CaptureSink, StructuredLogger};

/// A logger writing into a sink the test can inspect.
pub fn capture_logger() -> (CaptureSink, StructuredLogger) {
    let sink = CaptureSink::new();
    let logger = StructuredLogger::new(Arc::new(sink.clone()));
    (sink, logger)
}

/// Config bound to an ephemeral loopback port with no database.
pub fn local_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = Some("0".into());
    config.database.connect_retry_delay_secs = 0;
    config
}

/// Error a starting database server produces.
pub fn refused() -> sqlx::Error {
    sqlx::Error::Io(io::Error::new(
        io::ErrorKind::ConnectionRefused,
        "Connection refused (os error 111)",
    ))
}

/// Pool that never connects unless used.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap()
}

/// One dispatched event.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub token: String,
    pub correlation_id: String,
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Dispatcher that keeps everything it is given.
#[derive(Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<Dispatched>>,
}

impl RecordingDispatcher {
    pub fn events(&self) -> Vec<Dispatched> {
        self.events.lock().unwrap().clone()
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn dispatch_event(&self, token: &str, correlation_id: &str, topic: &str, payload: serde_json::Value) {
        self.events.lock().unwrap().push(Dispatched {
            token: token.to_string(),
            correlation_id: correlation_id.to_string(),
            topic: topic.to_string(),
            payload,
        });
    }
}
