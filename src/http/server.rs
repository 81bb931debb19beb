//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap registered routes with timeouts, CORS and the ingress logging
//!   middleware
//! - Serve plain HTTP or TLS through `axum-server`
//! - Share a [`Handle`] so the lifecycle controller can shut down gracefully

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::Method;
use axum::{middleware, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

use crate::config::TimeoutConfig;
use crate::http::middleware::logging_middleware;
use crate::observability::logging::StructuredLogger;

/// A configured, not yet running, HTTP server.
pub struct Server {
    address: SocketAddr,
    read_timeout: Duration,
    write_timeout: Duration,
    idle_timeout: Duration,
    router: Router,
}

impl Server {
    /// Build the server around `routes`.
    ///
    /// Layer order, outermost first: ingress logging, CORS, write timeout,
    /// read timeout. Logging sits outside so timed-out requests and
    /// preflights still get an `End.` line with their final status.
    #[allow(deprecated)]
    pub fn new(
        address: SocketAddr,
        timeouts: &TimeoutConfig,
        cors: Option<CorsLayer>,
        routes: Router,
        ingress: StructuredLogger,
    ) -> Self {
        let read_timeout = Duration::from_secs(timeouts.read_secs);
        let write_timeout = Duration::from_secs(timeouts.write_secs);
        let idle_timeout = Duration::from_secs(timeouts.idle_secs);

        let mut router = routes;
        if !read_timeout.is_zero() {
            router = router.layer(RequestBodyTimeoutLayer::new(read_timeout));
        }
        if !write_timeout.is_zero() {
            router = router.layer(TimeoutLayer::new(write_timeout));
        }
        if let Some(cors) = cors {
            router = router.layer(cors);
        }
        let router = router.layer(middleware::from_fn_with_state(ingress, logging_middleware));

        Self {
            address,
            read_timeout,
            write_timeout,
            idle_timeout,
            router,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `handle` shuts the server down. A clean shutdown returns
    /// `Ok(())`.
    pub async fn serve(self, handle: Handle, tls: Option<RustlsConfig>) -> Result<(), std::io::Error> {
        tracing::info!(address = %self.address, tls = tls.is_some(), "HTTP server starting");
        let app = self.router.into_make_service();

        match tls {
            Some(config) => {
                let mut server = axum_server::bind_rustls(self.address, config).handle(handle);
                tune(server.http_builder(), self.idle_timeout);
                server.serve(app).await?;
            }
            None => {
                let mut server = axum_server::bind(self.address).handle(handle);
                tune(server.http_builder(), self.idle_timeout);
                server.serve(app).await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// CORS layer announcing `methods` in preflight responses.
///
/// Names that are not valid HTTP methods are skipped. `None` when nothing
/// valid remains.
pub fn cors_layer(methods: &[String]) -> Option<CorsLayer> {
    let parsed: Vec<Method> = methods
        .iter()
        .filter_map(|m| match Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()) {
            Ok(method) => Some(method),
            Err(_) => {
                tracing::warn!(method = %m, "Ignoring invalid CORS method");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        None
    } else {
        Some(CorsLayer::new().allow_methods(parsed))
    }
}

/// Bound the wait for the next request header on keep-alive connections.
fn tune(builder: &mut Builder<TokioExecutor>, idle_timeout: Duration) {
    if !idle_timeout.is_zero() {
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(idle_timeout);
    }
}
