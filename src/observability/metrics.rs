//! Client-side metrics.
//!
//! Recorded through the `metrics` facade; the embedding application decides
//! whether and how to export them.
//!
//! # Metrics
//! - `creditcoin_rpc_requests_total` (counter): node calls by method, outcome
//! - `creditcoin_rpc_request_duration_seconds` (histogram): call latency by method
//! - `creditcoin_backend_health` (gauge): 1=healthy, 0=unhealthy, by endpoint
//! - `creditcoin_transactions_submitted_total` (counter): submissions by call, outcome

use std::time::Duration;

/// Record the outcome and latency of one node call.
pub fn record_rpc_call(method: &'static str, success: bool, elapsed: Duration) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!("creditcoin_rpc_requests_total", "method" => method, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("creditcoin_rpc_request_duration_seconds", "method" => method)
        .record(elapsed.as_secs_f64());
}

/// Record the health of a node endpoint.
pub fn record_backend_health(endpoint: &str, healthy: bool) {
    metrics::gauge!("creditcoin_backend_health", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Record an extrinsic submission.
pub fn record_submission(call: &str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!(
        "creditcoin_transactions_submitted_total",
        "call" => call.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
