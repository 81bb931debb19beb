//! Database connection bootstrap.
//!
//! # Responsibilities
//! - Open the PostgreSQL pool from configuration
//! - Retry while the server refuses connections (still starting up)
//! - Apply migrations when a migrations directory is present
//! - Map the configured statement log level onto the driver
//!
//! # Design Decisions
//! - "connection refused" is the only retryable condition; anything else
//!   (bad credentials, unknown database) fails at once
//! - The connector is injectable so bootstrap can be exercised without a server

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use log::LevelFilter;
use sqlx::migrate::{Migrate, MigrateError, Migrator};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;

use crate::config::DatabaseConfig;
use crate::observability::logging::StructuredLogger;
use crate::resilience::retries::{self, RetryError};

/// Statements slower than this are logged at warn.
pub const SLOW_STATEMENT: Duration = Duration::from_millis(200);

/// How much SQL the driver logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementLogging {
    /// Every statement at info, slow ones at warn.
    All,
    /// Slow statements only.
    Slow,
    Off,
}

impl StatementLogging {
    /// `DB_LOG_LEVEL` wins; when unset or unknown, a `trace` service level
    /// logs everything and anything else logs nothing.
    pub fn resolve(db_level: &str, service_level: &str) -> Self {
        match db_level.trim().to_ascii_lowercase().as_str() {
            "info" => StatementLogging::All,
            "warn" => StatementLogging::Slow,
            "error" | "silent" => StatementLogging::Off,
            _ if service_level.trim().eq_ignore_ascii_case("trace") => StatementLogging::All,
            _ => StatementLogging::Off,
        }
    }

    pub fn apply(self, options: PgConnectOptions) -> PgConnectOptions {
        match self {
            StatementLogging::All => options
                .log_statements(LevelFilter::Info)
                .log_slow_statements(LevelFilter::Warn, SLOW_STATEMENT),
            StatementLogging::Slow => options
                .log_statements(LevelFilter::Off)
                .log_slow_statements(LevelFilter::Warn, SLOW_STATEMENT),
            StatementLogging::Off => options.disable_statement_logging(),
        }
    }
}

/// Open a pool using the configured URL, size and connection lifetime.
pub async fn connect(config: DatabaseConfig, logging: StatementLogging) -> Result<PgPool, sqlx::Error> {
    let url = config
        .connection_url()
        .map_err(|e| sqlx::Error::Configuration(Box::new(e)))?;
    let options: PgConnectOptions = url.as_str().parse()?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .max_lifetime(config.connection_lifetime())
        .connect_with(logging.apply(options))
        .await
}

/// True when the error text reports a refused connection.
pub fn is_connection_refused(err: &sqlx::Error) -> bool {
    err.to_string()
        .to_ascii_lowercase()
        .contains("connection refused")
}

/// Run `connector` under the fixed-interval retry policy from `config`.
pub async fn connect_with_retry<C, Fut>(
    config: &DatabaseConfig,
    logger: &StructuredLogger,
    mut connector: C,
) -> Result<PgPool, sqlx::Error>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<PgPool, sqlx::Error>>,
{
    retries::run(config.connect_attempts, config.connect_retry_delay(), || {
        let attempt = connector();
        let logger = logger.clone();
        async move {
            match attempt.await {
                Ok(pool) => Ok(pool),
                Err(e) if is_connection_refused(&e) => {
                    logger
                        .warn()
                        .err(&e)
                        .msg(format!("Error connecting to database [{}]. Trying again...", e));
                    Err(RetryError::Retry(e))
                }
                Err(e) => Err(RetryError::Stop(e)),
            }
        }
    })
    .await
}

/// What [`run_migrations`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No migrations directory.
    Skipped,
    /// Every migration was already applied.
    UpToDate,
    Applied(usize),
}

/// Apply pending migrations from `dir`.
pub async fn run_migrations(
    pool: &PgPool,
    dir: &Path,
    logger: &StructuredLogger,
) -> Result<MigrationOutcome, MigrateError> {
    logger.debug().msg("DB Migration Begin...");
    if !dir.is_dir() {
        logger
            .info()
            .str("dir", dir.display().to_string())
            .msg("No migrations directory found, skipping migrations!");
        logger.info().msg("DB Migration End!");
        return Ok(MigrationOutcome::Skipped);
    }

    let migrator = Migrator::new(dir).await?;
    let applied = {
        let mut conn = pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        conn.list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect::<HashSet<i64>>()
    };

    let outcome = match pending_migrations(&migrator, &applied) {
        0 => {
            logger.info().msg("DB already in latest state.");
            MigrationOutcome::UpToDate
        }
        pending => {
            migrator.run(pool).await?;
            MigrationOutcome::Applied(pending)
        }
    };
    logger.info().msg("DB Migration End!");
    Ok(outcome)
}

/// Up migrations in `migrator` whose version is not in `applied`.
pub fn pending_migrations(migrator: &Migrator, applied: &HashSet<i64>) -> usize {
    migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| !applied.contains(&m.version))
        .count()
}
