//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! bootstrap (app.rs):
//!     logging → optional event fan-out → database (with retry)      [Initializing]
//! initialize:
//!     routes → ingress middleware → port/timeouts → Server           [Ready]
//! start:
//!     optional TLS → serve until the handle shuts down               [Running]
//! stop (signals.rs triggers it from the binary):
//!     graceful shutdown with bounded wait → close database           [Stopping → Stopped]
//! ```
//!
//! # Design Decisions
//! - Every phase returns a typed error; only `main` decides to exit
//! - Phases run strictly in order; a skipped phase is an error
//! - Shutdown has a deadline: in-flight requests are abandoned after it

pub mod app;
pub mod signals;
pub mod state;

pub use app::{App, BootstrapOptions, LifecycleError};
pub use state::LifecycleState;
