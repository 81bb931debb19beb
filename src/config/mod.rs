//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → env.rs (prefixed environment overrides)
//!     → ServiceConfig (immutable, handed to the lifecycle controller)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so an empty environment still boots
//! - Environment wins over the file
//! - `API_PORT` stays a raw string; the listener falls back to a default port
//!   instead of failing when it is malformed

pub mod env;
pub mod loader;
pub mod schema;

pub use env::{EnvSource, ProcessEnv};
pub use loader::{load_config, ConfigError};
pub use schema::{
    DatabaseConfig, EventConfig, ListenerConfig, ObservabilityConfig, ServiceConfig, TimeoutConfig,
    TlsConfig,
};
