//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chainline_requests_total` (counter): requests by method, status
//! - `chainline_request_duration_seconds` (histogram): latency by method
//! - `chainline_error_fallbacks_total` (counter): error responses that
//!   degraded to plain text
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; no recorder, no cost
//! - The Prometheus exporter is opt-in via configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start_time: Instant) {
    metrics::counter!(
        "chainline_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("chainline_request_duration_seconds", "method" => method.to_string())
        .record(start_time.elapsed().as_secs_f64());
}

pub fn record_error_fallback() {
    metrics::counter!("chainline_error_fallbacks_total").increment(1);
}
