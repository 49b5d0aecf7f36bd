//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_state` (gauge): 0=initializing, 1=running, 2=shutting_down, 3=terminated
//! - `lifecycle_shutdown_outcomes_total` (counter): by subsystem, outcome
//! - `lifecycle_shutdown_duration_seconds` (histogram): wall time of one coordination
//! - `http_responses_total` (counter): by status
//! - `http_rate_limited_total` (counter)
//! - `scheduler_job_runs_total` (counter): by job, result

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::{LifecycleState, ShutdownOutcome};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within the tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_lifecycle_state(state: LifecycleState) {
    metrics::gauge!("lifecycle_state").set(state as u8 as f64);
}

pub fn record_shutdown_outcome(subsystem: &str, outcome: &ShutdownOutcome) {
    metrics::counter!(
        "lifecycle_shutdown_outcomes_total",
        "subsystem" => subsystem.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_shutdown_duration(elapsed: Duration) {
    metrics::histogram!("lifecycle_shutdown_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_response(status: u16) {
    metrics::counter!("http_responses_total", "status" => status.to_string()).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("http_rate_limited_total").increment(1);
}

pub fn record_job_run(job: &str, ok: bool) {
    metrics::counter!(
        "scheduler_job_runs_total",
        "job" => job.to_string(),
        "result" => if ok { "ok" } else { "failed" }
    )
    .increment(1);
}
