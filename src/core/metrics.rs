//! Prometheus metrics for monitoring the LLM gateway.
//!
//! This module provides a centralized metrics registry for tracking requests,
//! admission outcomes, and per-model load.

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, GaugeVec, Histogram,
    IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by endpoint and status code
    pub request_count: IntCounterVec,

    /// Admission outcomes by model (admitted, race_lost, capacity_exhausted)
    pub admission_outcomes: IntCounterVec,

    /// Number of currently admitted requests per model
    pub inflight_requests: GaugeVec,

    /// Selection latency histogram in seconds
    pub selection_duration: Histogram,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// This should be called once at application startup. Subsequent calls will
/// return the same instance.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "llm_gateway_requests_total",
            "Total number of requests",
            &["endpoint", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let admission_outcomes = register_int_counter_vec!(
            "llm_gateway_admissions_total",
            "Admission outcomes by model",
            &["model", "outcome"]
        )
        .expect("Failed to register admission_outcomes metric");

        let inflight_requests = register_gauge_vec!(
            "llm_gateway_inflight_requests",
            "Number of currently admitted requests",
            &["model"]
        )
        .expect("Failed to register inflight_requests metric");

        let selection_duration = register_histogram!(
            "llm_gateway_selection_duration_seconds",
            "Model/key selection latency in seconds",
            vec![0.000001, 0.00001, 0.0001, 0.001, 0.01]
        )
        .expect("Failed to register selection_duration metric");

        Metrics {
            request_count,
            admission_outcomes,
            inflight_requests,
            selection_duration,
        }
    })
}

/// Get the global metrics instance, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = init_metrics();

        metrics
            .request_count
            .with_label_values(&["/llm/chat", "200"])
            .inc();
        metrics
            .admission_outcomes
            .with_label_values(&["zhipu", "admitted"])
            .inc();
        metrics.inflight_requests.with_label_values(&["zhipu"]).set(1.0);

        // Second init returns the same instance
        let again = init_metrics();
        assert!(std::ptr::eq(metrics, again));
    }
}
