//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the service runtime.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listen address.
    pub listener: ListenerConfig,

    /// HTTP server timeouts.
    pub timeouts: TimeoutConfig,

    /// TLS material for the listener.
    pub tls: TlsConfig,

    /// Database connection settings.
    pub database: DatabaseConfig,

    /// Event fan-out settings.
    pub events: EventConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port as configured. Validated when the server is built.
    pub port: Option<String>,

    /// Methods announced in CORS preflight responses. Empty disables CORS.
    pub cors_allowed_methods: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
            cors_allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// HTTP server timeouts in seconds. Zero disables a timeout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum time to read a request body.
    pub read_secs: u64,

    /// Maximum time to produce a response.
    pub write_secs: u64,

    /// Maximum wait for the next request on a keep-alive connection.
    pub idle_secs: u64,

    /// Time in-flight requests get to finish once shutdown starts.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 15,
            write_secs: 15,
            idle_secs: 60,
            shutdown_grace_secs: 120,
        }
    }
}

impl TimeoutConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,

    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Refuse to start without a database connection.
    pub required: bool,

    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,

    /// Maximum lifetime of a pooled connection in minutes.
    pub connection_lifetime_mins: u64,

    /// Pool size.
    pub max_connections: u32,

    /// Connection attempts at bootstrap.
    pub connect_attempts: u32,

    /// Fixed pause between connection attempts in seconds.
    pub connect_retry_delay_secs: u64,

    /// Directory holding `sqlx` migrations.
    pub migrations_dir: String,

    /// Statement logging: `info`, `warn`, `error` or `silent`. Empty follows
    /// the service log level.
    pub log_level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            required: false,
            host: "localhost".to_string(),
            port: 5432,
            name: String::new(),
            user: String::new(),
            password: String::new(),
            connection_lifetime_mins: 30,
            max_connections: 10,
            connect_attempts: 3,
            connect_retry_delay_secs: 15,
            migrations_dir: "migrations".to_string(),
            log_level: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// PostgreSQL connection URL with credentials percent-encoded.
    pub fn connection_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("postgres://{}", self.host))?;
        url.set_port(Some(self.port))
            .map_err(|_| url::ParseError::InvalidPort)?;
        if !self.user.is_empty() {
            url.set_username(&self.user)
                .map_err(|_| url::ParseError::EmptyHost)?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| url::ParseError::EmptyHost)?;
        }
        url.set_path(&self.name);
        Ok(url)
    }

    /// Saturates instead of overflowing on absurd values.
    pub fn connection_lifetime(&self) -> Duration {
        Duration::from_secs(self.connection_lifetime_mins.saturating_mul(60))
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_delay_secs)
    }
}

/// Event fan-out configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventConfig {
    /// Allow application code to dispatch events.
    pub enable_dispatcher: bool,

    /// Mirror log records to the event channel.
    pub log_to_events: bool,

    /// HTTP endpoint receiving events.
    pub endpoint: Option<String>,

    /// Events buffered before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            enable_dispatcher: false,
            log_to_events: false,
            endpoint: None,
            queue_capacity: 1024,
        }
    }
}

impl EventConfig {
    pub fn enabled(&self) -> bool {
        self.enable_dispatcher || self.log_to_events
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,

    pub metrics_enabled: bool,
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
