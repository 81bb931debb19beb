//! Ingress logging middleware.
//!
//! Stamps every request with a correlation ID (generating one when the
//! caller sent none), then logs `Begin` before and `End.` after the handler.
//! `End.` is logged at error level for 5xx responses.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::http::request::{correlation_id_from_headers, X_CLIENT, X_CORRELATION_ID};
use crate::observability::event_codes::FIELD_CORRELATION_ID;
use crate::observability::logging::{LogField, StructuredLogger};
use crate::observability::metrics;

pub async fn logging_middleware(
    State(logger): State<StructuredLogger>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    let existing = correlation_id_from_headers(request.headers()).map(str::to_string);
    let correlation_id = match existing {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            // a v4 UUID is always a valid header value
            if let Ok(value) = HeaderValue::from_str(&id) {
                request.headers_mut().insert(X_CORRELATION_ID, value);
            }
            id
        }
    };

    let caller = request
        .headers()
        .get(X_CLIENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let method = request.method().to_string();
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let logger = logger.with_fields([
        LogField::str("caller", caller),
        LogField::str(FIELD_CORRELATION_ID, correlation_id),
        LogField::str("method", method.as_str()),
        LogField::str("requestURI", target),
    ]);

    logger.info().msg("Begin");
    let response = next.run(request).await;

    let status = response.status();
    let event = if status.is_server_error() {
        logger.error()
    } else {
        logger.info()
    };
    event
        .int("status", i64::from(status.as_u16()))
        .duration_ms("responseTime", start_time.elapsed())
        .msg("End.");

    metrics::record_request(&method, status.as_u16(), start_time);
    response
}
