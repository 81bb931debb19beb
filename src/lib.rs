//! Request-lifecycle core for multi-tenant services.
//!
//! Two pieces carry the weight:
//! - [`context::ExecutionContext`]: correlation ID, identity, transactional
//!   scope and structured-log fields threaded through a call tree
//! - [`lifecycle::App`]: bootstrap with retry, HTTP serving with an ingress
//!   logging middleware, and graceful shutdown

pub mod config;
pub mod context;
pub mod database;
pub mod errors;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::ServiceConfig;
pub use context::ExecutionContext;
pub use errors::AppError;
pub use lifecycle::App;
