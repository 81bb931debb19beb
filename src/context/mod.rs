//! Request execution context.
//!
//! # Data Flow
//! ```text
//! Ingress middleware stamps X-Correlation-ID
//!     → handler builds root ExecutionContext (identity, scope, action)
//!     → sub-operations derive children (extra log fields, new identity/scope)
//!     → every log line carries the same correlationId and action
//! ```
//!
//! # Design Decisions
//! - Correlation ID and action are shared, never regenerated below the root
//! - Derivation returns a new value; the source is never modified
//! - In-place mutation is limited to the owning node (`add_logger_fields`,
//!   `set_scope`)

pub mod execution;
pub mod identity;
pub mod scope;

pub use execution::ExecutionContext;
pub use identity::Identity;
pub use scope::{ScopeHandle, TransactionScope};
