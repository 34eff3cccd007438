//! Metrics collection and exposition.
//!
//! # Metrics
//! - `orchestrator_requests_total` (counter): settled calls by method, outcome
//! - `orchestrator_request_duration_seconds` (histogram): dispatch latency
//! - `orchestrator_requests_cancelled_total` (counter): aborted calls by reason
//! - `orchestrator_in_flight` (gauge): pending registry entries
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed by `init_metrics`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::pipeline::registry::CancelReason;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

/// Record a settled call.
pub fn record_request(method: &str, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "orchestrator_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("orchestrator_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cancelled(reason: CancelReason) {
    let label = match reason {
        CancelReason::Superseded => "superseded",
        CancelReason::Aborted => "aborted",
    };
    metrics::counter!("orchestrator_requests_cancelled_total", "reason" => label).increment(1);
}

pub fn record_in_flight(count: usize) {
    metrics::gauge!("orchestrator_in_flight").set(count as f64);
}
