//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::env::{parse_bool, EnvSource};
use crate::config::schema::ServiceConfig;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides. Keys are looked up as `{prefix}{KEY}`.
pub fn load_config(
    path: Option<&Path>,
    env: &dyn EnvSource,
    prefix: &str,
) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env(&mut config, &Overrides { env, prefix })?;
    Ok(config)
}

struct Overrides<'a> {
    env: &'a dyn EnvSource,
    prefix: &'a str,
}

impl Overrides<'_> {
    fn raw(&self, key: &str) -> Option<String> {
        self.env.lookup(&format!("{}{}", self.prefix, key))
    }

    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = self.raw(key) {
            *target = value;
        }
    }

    /// Comma-separated values, blanks skipped.
    fn list(&self, key: &str, target: &mut Vec<String>) {
        if let Some(value) = self.raw(key) {
            *target = value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
        }
    }

    fn bool(&self, key: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(value) = self.raw(key) {
            *target = parse_bool(&value).ok_or_else(|| self.invalid(key, value))?;
        }
        Ok(())
    }

    fn number<T: FromStr>(&self, key: &str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.raw(key) {
            *target = value.trim().parse().map_err(|_| self.invalid(key, value))?;
        }
        Ok(())
    }

    fn invalid(&self, key: &str, value: String) -> ConfigError {
        ConfigError::InvalidValue {
            key: format!("{}{}", self.prefix, key),
            value,
        }
    }
}

fn apply_env(config: &mut ServiceConfig, env: &Overrides<'_>) -> Result<(), ConfigError> {
    if let Some(port) = env.raw("API_PORT") {
        config.listener.port = Some(port);
    }
    env.list("CORS_ALLOWED_METHODS", &mut config.listener.cors_allowed_methods);

    env.number("HTTP_READ_TIMEOUT", &mut config.timeouts.read_secs)?;
    env.number("HTTP_WRITE_TIMEOUT", &mut config.timeouts.write_secs)?;
    env.number("HTTP_IDLE_TIMEOUT", &mut config.timeouts.idle_secs)?;
    env.number("HTTP_SHUTDOWN_GRACE", &mut config.timeouts.shutdown_grace_secs)?;

    env.bool("ENABLE_TLS", &mut config.tls.enabled)?;
    env.string("TLS_CRT", &mut config.tls.cert_path);
    env.string("TLS_KEY", &mut config.tls.key_path);

    let db = &mut config.database;
    env.bool("DB_REQUIRED", &mut db.required)?;
    env.string("DB_HOST", &mut db.host);
    env.number("DB_PORT", &mut db.port)?;
    env.string("DB_NAME", &mut db.name);
    env.string("DB_USER", &mut db.user);
    env.string("DB_PWD", &mut db.password);
    env.number("DB_CONNECTION_LIFETIME", &mut db.connection_lifetime_mins)?;
    env.number("DB_MAX_CONNECTIONS", &mut db.max_connections)?;
    env.string("DB_LOG_LEVEL", &mut db.log_level);

    env.bool("ENABLE_EVENT_DISPATCHER", &mut config.events.enable_dispatcher)?;
    env.bool("LOG_TO_EVENTQ", &mut config.events.log_to_events)?;
    if let Some(endpoint) = env.raw("EVENT_ENDPOINT") {
        config.events.endpoint = Some(endpoint);
    }

    env.string("LOG_LEVEL", &mut config.observability.log_level);
    env.bool("METRICS_ENABLED", &mut config.observability.metrics_enabled)?;
    env.string("METRICS_ADDRESS", &mut config.observability.metrics_address);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load_config(None, &env(&[]), "APP_").unwrap();
        assert!(config.listener.port.is_none());
        assert!(!config.database.required);
        assert_eq!(config.database.connect_attempts, 3);
        assert_eq!(config.timeouts.idle_secs, 60);
    }

    #[test]
    fn prefixed_overrides_apply() {
        let vars = env(&[
            ("APP_API_PORT", "8088"),
            ("APP_HTTP_WRITE_TIMEOUT", "30"),
            ("APP_DB_REQUIRED", "true"),
            ("APP_DB_HOST", "db"),
            ("APP_LOG_TO_EVENTQ", "1"),
            ("API_PORT", "9999"),
        ]);
        let config = load_config(None, &vars, "APP_").unwrap();

        assert_eq!(config.listener.port.as_deref(), Some("8088"));
        assert_eq!(config.timeouts.write_secs, 30);
        assert!(config.database.required);
        assert_eq!(config.database.host, "db");
        assert!(config.events.log_to_events);
    }

    #[test]
    fn huge_connection_lifetime_loads_without_overflow() {
        let config = load_config(
            None,
            &env(&[("DB_CONNECTION_LIFETIME", "18446744073709551615")]),
            "",
        )
        .unwrap();
        assert_eq!(config.database.connection_lifetime_mins, u64::MAX);
        assert_eq!(
            config.database.connection_lifetime(),
            std::time::Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn lists_and_new_keys_apply() {
        let vars = env(&[
            ("CORS_ALLOWED_METHODS", "get, POST,,"),
            ("HTTP_SHUTDOWN_GRACE", "5"),
            ("DB_LOG_LEVEL", "silent"),
        ]);
        let config = load_config(None, &vars, "").unwrap();
        assert_eq!(config.listener.cors_allowed_methods, vec!["get", "POST"]);
        assert_eq!(config.timeouts.shutdown_grace_secs, 5);
        assert_eq!(config.database.log_level, "silent");
    }

    #[test]
    fn malformed_port_is_kept_raw() {
        let config = load_config(None, &env(&[("API_PORT", "eighty")]), "").unwrap();
        assert_eq!(config.listener.port.as_deref(), Some("eighty"));
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = load_config(None, &env(&[("HTTP_READ_TIMEOUT", "soon")]), "").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, "HTTP_READ_TIMEOUT");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn file_then_environment() {
        let path = std::env::temp_dir().join(format!("tenant-runtime-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "[listener]\nport = \"7000\"\n\n[database]\nname = \"tenants\"\nrequired = true\n",
        )
        .unwrap();

        let config = load_config(Some(&path), &env(&[("DB_NAME", "override")]), "").unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.listener.port.as_deref(), Some("7000"));
        assert!(config.database.required);
        assert_eq!(config.database.name, "override");
    }
}
