//! Route registration.

use axum::{http::StatusCode, routing::get, Router};

/// Implemented by each feature area to mount its endpoints.
pub trait RouteSpecifier {
    fn register_routes(&self, router: Router) -> Router;
}

/// Liveness endpoint at `GET /health`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthRoutes;

impl RouteSpecifier for HealthRoutes {
    fn register_routes(&self, router: Router) -> Router {
        router.route("/health", get(|| async { StatusCode::OK }))
    }
}
