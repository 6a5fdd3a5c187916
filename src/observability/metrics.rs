//! Metrics collection and exposition.
//!
//! # Metrics
//! - `httpd_connections_accepted_total` (counter)
//! - `httpd_connections_closed_total` (counter): by pipeline outcome
//! - `httpd_requests_total` (counter): by method, status
//! - `httpd_request_duration_seconds` (histogram): read-to-write latency
//! - `httpd_queue_depth` (gauge): connections waiting for a worker
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Method labels are clamped to known values to bound label cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_accepted() {
    metrics::counter!("httpd_connections_accepted_total").increment(1);
}

pub fn record_closed(outcome: &'static str) {
    metrics::counter!("httpd_connections_closed_total", "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = match method {
        "GET" => "GET",
        "POST" => "POST",
        _ => "OTHER",
    };
    metrics::counter!(
        "httpd_requests_total",
        "method" => method,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("httpd_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("httpd_queue_depth").set(depth as f64);
}
