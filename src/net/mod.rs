//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Start with TLS enabled
//!     → tls.rs (validate paths, load PEM certificate + key)
//!     → http::server binds with rustls
//! ```

pub mod tls;
