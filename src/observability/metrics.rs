//! Metrics collection and exposition.
//!
//! # Metrics
//! - `poap_key_validations_total` (counter): claim key checks by result
//! - `poap_submissions_total` (counter): wallet submissions by result
//! - `poap_mints_total` (counter): mint attempts by outcome
//! - `poap_claim_links_total` (counter): generated claim links
//! - `poap_registry_rows` (gauge): rows held by the registry store
//! - `poap_backend_request_duration_seconds` (histogram): registry client latency

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_key_validation(valid: bool) {
    let result = if valid { "valid" } else { "invalid" };
    metrics::counter!("poap_key_validations_total", "result" => result).increment(1);
}

pub fn record_submission(result: &'static str) {
    metrics::counter!("poap_submissions_total", "result" => result).increment(1);
}

pub fn record_mint(outcome: &'static str) {
    metrics::counter!("poap_mints_total", "outcome" => outcome).increment(1);
}

pub fn record_claim_link() {
    metrics::counter!("poap_claim_links_total").increment(1);
}

pub fn record_registry_rows(rows: usize) {
    metrics::gauge!("poap_registry_rows").set(rows as f64);
}

pub fn record_backend_request(endpoint: &'static str, start: Instant) {
    metrics::histogram!("poap_backend_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}
