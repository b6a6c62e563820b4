//! Prometheus metrics for gateway observability.
//!
//! Exposes metrics compatible with Prometheus/OpenMetrics format:
//! - `bastion_requests_total{api,status}` - Counter of inbound requests
//! - `bastion_request_duration_seconds{api}` - Histogram of request durations
//! - `bastion_attempts_total{api,outcome}` - Counter of connector attempts by outcome
//! - `bastion_circuit_trips_total` - Counter of breaker openings
//! - `bastion_circuit_rejections_total{api}` - Counter of requests rejected by an open breaker
//! - `bastion_apis_deployed` - Gauge of deployed APIs
//! - `bastion_uptime_seconds` - Gauge of server uptime

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global Prometheus handle for rendering metrics
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global server start time for uptime calculation
static METRICS_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Latency buckets around typical slow-call thresholds (100ms - 30s).
const GATEWAY_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 2.0, 5.0, 10.0, 30.0];

/// Initialize the Prometheus metrics recorder.
///
/// Safe to call more than once; only the first call installs the recorder.
pub fn init_metrics() -> PrometheusHandle {
    let _ = METRICS_START_TIME.get_or_init(Instant::now);

    let handle = PROMETHEUS_HANDLE.get_or_init(|| {
        let builder = PrometheusBuilder::new()
            .set_buckets(GATEWAY_LATENCY_BUCKETS)
            .unwrap_or_else(|_| PrometheusBuilder::new());
        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("A metrics recorder was already installed, Prometheus output may be empty");
        }

        describe_counter!("bastion_requests_total", "Total number of inbound requests");
        describe_histogram!("bastion_request_duration_seconds", "Request duration in seconds");
        describe_counter!("bastion_attempts_total", "Connector attempts by outcome");
        describe_counter!("bastion_circuit_trips_total", "Total circuit breaker openings");
        describe_counter!(
            "bastion_circuit_rejections_total",
            "Requests rejected by an open circuit breaker"
        );
        describe_gauge!("bastion_apis_deployed", "Number of deployed APIs");
        describe_gauge!("bastion_uptime_seconds", "Server uptime in seconds");

        handle
    });

    handle.clone()
}

/// Get the Prometheus handle for rendering metrics.
/// Returns None if metrics have not been initialized.
pub fn get_prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Record a completed request.
pub fn record_request(api: &str, status: u16, duration: Duration) {
    let labels = [("api", api.to_string()), ("status", status.to_string())];
    counter!("bastion_requests_total", &labels).increment(1);
    histogram!("bastion_request_duration_seconds", "api" => api.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_attempt(api: &str, outcome: &'static str) {
    counter!("bastion_attempts_total", "api" => api.to_string(), "outcome" => outcome).increment(1);
}

pub fn record_circuit_trip() {
    counter!("bastion_circuit_trips_total").increment(1);
}

pub fn record_circuit_rejection(api: &str) {
    counter!("bastion_circuit_rejections_total", "api" => api.to_string()).increment(1);
}

pub fn update_deployed_gauge(count: usize) {
    gauge!("bastion_apis_deployed").set(count as f64);
}

/// Update uptime gauge.
/// Should be called periodically or on metrics render.
pub fn update_uptime_gauge() {
    if let Some(start) = METRICS_START_TIME.get() {
        gauge!("bastion_uptime_seconds").set(start.elapsed().as_secs_f64());
    }
}

/// Render all metrics in Prometheus text format.
pub fn render_metrics() -> String {
    match get_prometheus_handle() {
        Some(handle) => {
            handle.run_upkeep();
            handle.render()
        },
        None => "# Metrics not initialized\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_after_init_contains_recorded_counters() {
        let _ = init_metrics();
        record_request("orders", 502, Duration::from_millis(750));
        record_attempt("orders", "slow_call");
        record_circuit_trip();

        let output = render_metrics();
        assert!(output.contains("bastion_requests_total"));
        assert!(output.contains("bastion_attempts_total"));
    }
}
