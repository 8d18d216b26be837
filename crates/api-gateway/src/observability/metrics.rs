//! Metrics definitions for the API gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gateway_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code, never by request content:
//! - `outcome`: 8 values (exempt, authorized, and one per rejection cause)
//! - `status`: 3 values for revocation lookups (success, error, timeout)
//! - `status_class`: 1xx-5xx or `error` for upstream forwarding

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded. Revocation lookups sit on
/// the request path with a few-hundred-millisecond budget, so their buckets
/// are sub-second.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gateway_revocation_lookup".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500,
            ],
        )
        .map_err(|e| format!("Failed to set revocation lookup buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("gateway_upstream_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set upstream request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record one authentication decision.
///
/// Metric: `gateway_auth_decisions_total`
/// Labels: `outcome`
pub fn record_auth_decision(outcome: &'static str) {
    counter!("gateway_auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Record a revocation store lookup.
///
/// Metric: `gateway_revocation_lookup_duration_seconds`
/// Labels: `status` (success, error, timeout)
pub fn record_revocation_lookup(status: &'static str, duration: Duration) {
    histogram!("gateway_revocation_lookup_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
}

// ============================================================================
// Forwarding Metrics
// ============================================================================

/// Record a forwarded upstream request.
///
/// Metric: `gateway_upstream_requests_total`, `gateway_upstream_request_duration_seconds`
/// Labels: `status_class`
pub fn record_upstream_request(status_code: Option<u16>, duration: Duration) {
    let status_class = categorize_status_code(status_code);

    histogram!("gateway_upstream_request_duration_seconds", "status_class" => status_class)
        .record(duration.as_secs_f64());

    counter!("gateway_upstream_requests_total", "status_class" => status_class).increment(1);
}

/// Collapse a status code into its class; `None` means the request never got a response.
fn categorize_status_code(status_code: Option<u16>) -> &'static str {
    match status_code {
        Some(100..=199) => "1xx",
        Some(200..=299) => "2xx",
        Some(300..=399) => "3xx",
        Some(400..=499) => "4xx",
        Some(500..=599) => "5xx",
        _ => "error",
    }
}
