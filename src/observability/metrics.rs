//! Metrics collection and exposition.
//!
//! # Metrics
//! - `service_requests_total` (counter): inbound requests by method, status
//! - `service_request_duration_seconds` (histogram): latency by method
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed inbound request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "service_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("service_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}
