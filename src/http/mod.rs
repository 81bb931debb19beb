//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum-server, timeouts)
//!     → middleware/logging.rs (correlation ID, Begin/End lines, metrics)
//!     → routes registered by RouteSpecifiers
//!     → handler builds ExecutionContext from request.rs's CorrelationId
//! ```

pub mod middleware;
pub mod request;
pub mod routes;
pub mod server;

pub use request::{correlation_id_from_headers, CorrelationId, X_CORRELATION_ID};
pub use routes::{HealthRoutes, RouteSpecifier};
pub use server::Server;
