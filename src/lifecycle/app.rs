//! The lifecycle controller.
//!
//! `App` owns everything a service needs between process start and exit:
//! the root logger, the optional event dispatcher, the database pool and the
//! HTTP server. Each phase checks and advances [`LifecycleState`].

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum_server::Handle;
use sqlx::migrate::MigrateError;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::watch;
use url::Url;
use uuid::Uuid;

use crate::config::{EventConfig, ServiceConfig};
use crate::context::{ExecutionContext, Identity, ScopeHandle};
use crate::database::{self, StatementLogging};
use crate::events::{EventDispatcher, FanoutSink, HttpEventDispatcher};
use crate::http::server::cors_layer;
use crate::http::{RouteSpecifier, Server};
use crate::lifecycle::state::LifecycleState;
use crate::net::tls::{load_tls_config, TlsError};
use crate::observability::logging::{LogSink, StructuredLogger};

/// Port used when `API_PORT` is unset or not a number.
pub const DEFAULT_API_PORT: u16 = 80;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("server was not initialized")]
    NotInitialized,

    #[error("event dispatcher unavailable: {0}")]
    EventDispatcher(String),

    #[error("failed to initialize database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] MigrateError),

    #[error("invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("unable to start server: {0}")]
    Serve(#[source] std::io::Error),
}

/// Everything bootstrap needs, passed in explicitly.
pub struct BootstrapOptions {
    pub name: String,
    pub config: ServiceConfig,
    /// Primary log sink (console in production).
    pub sink: Arc<dyn LogSink>,
    /// Dispatcher to use instead of the HTTP one when events are enabled.
    pub dispatcher: Option<Arc<dyn EventDispatcher>>,
}

impl BootstrapOptions {
    pub fn new(name: impl Into<String>, config: ServiceConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            name: name.into(),
            config,
            sink,
            dispatcher: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }
}

struct Phase {
    state: LifecycleState,
    server: Option<Server>,
}

pub struct App {
    name: String,
    config: ServiceConfig,
    logger: StructuredLogger,
    database: Option<PgPool>,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
    phase: Mutex<Phase>,
    handle: Handle,
    served: watch::Sender<bool>,
}

impl App {
    /// Bootstrap with the PostgreSQL connector from configuration.
    pub async fn bootstrap(options: BootstrapOptions) -> Result<Self, LifecycleError> {
        let db_config = options.config.database.clone();
        let logging = StatementLogging::resolve(&db_config.log_level, &options.config.observability.log_level);
        Self::bootstrap_with(options, move || database::connect(db_config.clone(), logging)).await
    }

    /// Bootstrap with a caller-supplied database connector.
    ///
    /// The connector is only invoked when the database is required.
    pub async fn bootstrap_with<C, Fut>(options: BootstrapOptions, connector: C) -> Result<Self, LifecycleError>
    where
        C: FnMut() -> Fut,
        Fut: Future<Output = Result<PgPool, sqlx::Error>>,
    {
        let BootstrapOptions {
            name,
            config,
            sink,
            dispatcher,
        } = options;

        let mut state = LifecycleState::Unconfigured;
        advance(&mut state, LifecycleState::Initializing)?;

        let console = StructuredLogger::new(Arc::clone(&sink)).with_str("service", name.as_str());
        console.info().msg(format!("Starting: {}", name));

        let (dispatcher, sink) = if config.events.enabled() {
            let dispatcher = match dispatcher {
                Some(dispatcher) => dispatcher,
                None => http_dispatcher(&config.events)?,
            };
            let sink: Arc<dyn LogSink> = if config.events.log_to_events {
                Arc::new(FanoutSink::new(sink, Arc::clone(&dispatcher)))
            } else {
                sink
            };
            (Some(dispatcher), sink)
        } else {
            console.warn().msg(
                "Event dispatcher not enabled. Set ENABLE_EVENT_DISPATCHER or LOG_TO_EVENTQ to '1' to enable it.",
            );
            (None, sink)
        };
        let logger = StructuredLogger::new(sink);

        let database = if config.database.required {
            let pool = database::connect_with_retry(&config.database, &logger, connector).await?;
            logger.info().msg("Database connected!");
            Some(pool)
        } else {
            None
        };

        let (served, _) = watch::channel(false);
        Ok(Self {
            name,
            config,
            logger,
            database,
            dispatcher,
            phase: Mutex::new(Phase { state, server: None }),
            handle: Handle::new(),
            served,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn database(&self) -> Option<&PgPool> {
        self.database.as_ref()
    }

    pub fn state(&self) -> LifecycleState {
        self.phase().state
    }

    /// Logger tagged with the service name and `module`.
    pub fn logger(&self, module: &str) -> StructuredLogger {
        self.logger
            .with_str("service", self.name.as_str())
            .with_str("module", module)
    }

    /// Apply migrations from the configured directory, if a database is
    /// connected and the directory exists.
    pub async fn migrate_db(&self) -> Result<(), LifecycleError> {
        let Some(pool) = &self.database else {
            return Ok(());
        };
        let dir = Path::new(&self.config.database.migrations_dir);
        database::run_migrations(pool, dir, &self.logger("Migration")).await?;
        Ok(())
    }

    /// Register routes, install the ingress middleware and build the server.
    pub fn initialize(&self, specifiers: &[&dyn RouteSpecifier]) -> Result<(), LifecycleError> {
        let routes = specifiers
            .iter()
            .fold(Router::new(), |router, specifier| specifier.register_routes(router));

        let port = resolve_port(self.config.listener.port.as_deref(), &self.logger);
        let ip: IpAddr = self.config.listener.host.parse()?;
        let address = SocketAddr::new(ip, port);

        self.logger
            .debug()
            .str("appname", self.name.as_str())
            .msg(format!("Api server will start on port: {}", port));

        let cors = cors_layer(&self.config.listener.cors_allowed_methods);
        let server = Server::new(address, &self.config.timeouts, cors, routes, self.logger("Ingress"));

        let mut phase = self.phase();
        advance(&mut phase.state, LifecycleState::Ready)?;
        phase.server = Some(server);
        Ok(())
    }

    /// Serve until [`App::stop`] shuts the server down.
    ///
    /// A clean shutdown returns `Ok(())`; anything else is fatal.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let server = {
            let mut phase = self.phase();
            advance(&mut phase.state, LifecycleState::Running)?;
            phase.server.take().ok_or(LifecycleError::NotInitialized)?
        };

        let result = self.serve(server).await;
        self.served.send_replace(true);
        result
    }

    async fn serve(&self, server: Server) -> Result<(), LifecycleError> {
        let tls = if self.config.tls.enabled {
            Some(load_tls_config(&self.config.tls).await?)
        } else {
            None
        };
        server
            .serve(self.handle.clone(), tls)
            .await
            .map_err(LifecycleError::Serve)
    }

    /// Address the running server is bound to, once it is listening.
    pub async fn listening_addr(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }

    /// Shut down gracefully, giving in-flight requests the configured grace
    /// period, then close the database pool.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        {
            let mut phase = self.phase();
            advance(&mut phase.state, LifecycleState::Stopping)?;
        }

        self.logger.info().msg("Stopping server");
        let grace = self.config.timeouts.shutdown_grace();
        let mut served = self.served.subscribe();
        self.handle.graceful_shutdown(Some(grace));

        let drained = matches!(
            tokio::time::timeout(grace, served.wait_for(|done| *done)).await,
            Ok(Ok(_))
        );
        if !drained {
            self.logger
                .warn()
                .msg("Graceful shutdown window elapsed, in-flight requests abandoned");
        }

        if self.config.database.required {
            if let Some(pool) = &self.database {
                pool.close().await;
                self.logger.info().msg("Database connection closed");
            }
        }

        let mut phase = self.phase();
        advance(&mut phase.state, LifecycleState::Stopped)?;
        Ok(())
    }

    /// Forward an event to the dispatcher, if one is configured.
    pub fn dispatch_event(&self, token: &str, correlation_id: &str, topic: &str, payload: serde_json::Value) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.dispatch_event(token, correlation_id, topic, payload);
        }
    }

    pub fn execution_context(
        &self,
        scope: Option<ScopeHandle>,
        identity: Option<Arc<Identity>>,
        correlation_id: &str,
        action: &str,
    ) -> ExecutionContext {
        ExecutionContext::new(identity, scope, Some(correlation_id), action, &self.logger)
    }

    /// Context running as the built-in system identity.
    pub fn execution_context_with_system_identity(
        &self,
        scope: Option<ScopeHandle>,
        correlation_id: &str,
        action: &str,
        admin: bool,
    ) -> ExecutionContext {
        self.execution_context(scope, Some(Arc::new(Identity::system(admin))), correlation_id, action)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn execution_context_with_custom_identity(
        &self,
        scope: Option<ScopeHandle>,
        tenant_id: Uuid,
        user_id: Uuid,
        user_name: &str,
        correlation_id: &str,
        action: &str,
        admin: bool,
    ) -> ExecutionContext {
        let identity = Identity::custom(tenant_id, user_id, user_name, admin);
        self.execution_context(scope, Some(Arc::new(identity)), correlation_id, action)
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn advance(state: &mut LifecycleState, to: LifecycleState) -> Result<(), LifecycleError> {
    state
        .advance(to)
        .map_err(|(from, to)| LifecycleError::InvalidTransition { from, to })
}

fn http_dispatcher(config: &EventConfig) -> Result<Arc<dyn EventDispatcher>, LifecycleError> {
    let endpoint = config
        .endpoint
        .as_deref()
        .ok_or_else(|| LifecycleError::EventDispatcher("EVENT_ENDPOINT is not set".to_string()))?;
    let url = Url::parse(endpoint).map_err(|e| LifecycleError::EventDispatcher(format!("{}: {}", endpoint, e)))?;
    Ok(Arc::new(HttpEventDispatcher::spawn(url, config.queue_capacity)))
}

/// Port from configuration, falling back to [`DEFAULT_API_PORT`].
///
/// A malformed value is logged, not fatal.
pub fn resolve_port(raw: Option<&str>, logger: &StructuredLogger) -> u16 {
    match raw {
        None => DEFAULT_API_PORT,
        Some(port) => match port.trim().parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                logger
                    .error()
                    .msg(format!("API port needs to be a number. {} is not a number.", port));
                DEFAULT_API_PORT
            }
        },
    }
}
