//! Log sink that mirrors records to the event channel.

use std::sync::Arc;

use crate::events::dispatcher::EventDispatcher;
use crate::observability::event_codes::FIELD_CORRELATION_ID;
use crate::observability::logging::{LogRecord, LogSink};

/// Topic used for mirrored log records.
pub const LOG_TOPIC: &str = "log";

/// Writes to the primary sink first, then hands a JSON copy to the
/// dispatcher.
pub struct FanoutSink {
    primary: Arc<dyn LogSink>,
    dispatcher: Arc<dyn EventDispatcher>,
}

impl FanoutSink {
    pub fn new(primary: Arc<dyn LogSink>, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self { primary, dispatcher }
    }
}

impl LogSink for FanoutSink {
    fn write(&self, record: &LogRecord) {
        self.primary.write(record);
        let correlation_id = record.str_field(FIELD_CORRELATION_ID).unwrap_or_default();
        self.dispatcher
            .dispatch_event("", correlation_id, LOG_TOPIC, record.to_json());
    }
}
