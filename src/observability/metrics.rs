//! Metrics collection and exposition.
//!
//! # Metrics
//! - `weather_requests_total` (counter): requests by outcome
//! - `weather_request_duration_seconds` (histogram): end-to-end latency
//! - `weather_step_duration_seconds` (histogram): latency per pipeline step
//! - `weather_cache_lookups_total` (counter): hit, miss, error
//! - `weather_cache_write_failures_total` (counter)
//! - `weather_cache_entries` (gauge): entries held by the in-process store
//! - `weather_faults_injected_total` (counter)
//! - `weather_upstream_requests_total` (counter): by status
//! - `weather_downstream_requests_total` (counter): by status
//!
//! Without an installed recorder every call here is a no-op, so tests need
//! no setup.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str, start: Instant) {
    counter!("weather_requests_total", "outcome" => outcome).increment(1);
    histogram!("weather_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(result: &'static str) {
    counter!("weather_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_write_failure() {
    counter!("weather_cache_write_failures_total").increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("weather_cache_entries").set(entries as f64);
}

pub fn record_fault_injected() {
    counter!("weather_faults_injected_total").increment(1);
}

/// `status` is the HTTP status code, or "error" for transport failures.
pub fn record_upstream(status: String) {
    counter!("weather_upstream_requests_total", "status" => status).increment(1);
}

pub fn record_downstream(status: String) {
    counter!("weather_downstream_requests_total", "status" => status).increment(1);
}

/// Records the duration of a pipeline step when dropped.
///
/// Held for the whole step so the measurement is taken on every exit path,
/// including early returns and `?`.
pub struct StepTimer {
    step: &'static str,
    start: Instant,
}

impl StepTimer {
    pub fn start(step: &'static str) -> Self {
        Self {
            step,
            start: Instant::now(),
        }
    }
}

impl Drop for StepTimer {
    fn drop(&mut self) {
        histogram!("weather_step_duration_seconds", "step" => self.step)
            .record(self.start.elapsed().as_secs_f64());
    }
}
