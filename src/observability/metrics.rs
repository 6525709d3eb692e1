//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by endpoint, status
//! - `proxy_request_duration_seconds` (histogram): latency by endpoint
//! - `proxy_decorations_total` (counter): listing decorations by kind, outcome

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::resource_control::ResourceKind;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(endpoint: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one listing decoration.
pub fn record_decoration(kind: ResourceKind, outcome: &'static str) {
    counter!(
        "proxy_decorations_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
