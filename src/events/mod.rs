//! Event fan-out subsystem.
//!
//! # Data Flow
//! ```text
//! App::dispatch_event / FanoutSink::write
//!     → EventDispatcher::dispatch_event (non-blocking enqueue)
//!     → background task POSTs EventEnvelope to the configured endpoint
//! ```
//!
//! # Design Decisions
//! - Delivery is best-effort: a full queue or failed POST is logged and dropped
//! - Nothing on the dispatch path can fail or block the caller
//! - Primary logging always happens before the mirror

pub mod dispatcher;
pub mod fanout;

pub use dispatcher::{EventDispatcher, EventEnvelope, HttpEventDispatcher};
pub use fanout::{FanoutSink, LOG_TOPIC};
