//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CopyFlow metrics
pub const METRICS_PREFIX: &str = "copyflow";

/// SLO-aligned histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Buckets for generation latency (upstream model calls are slow)
pub const GENERATION_BUCKETS: &[f64] = &[
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Generation metrics
    describe_counter!(
        format!("{}_generations_total", METRICS_PREFIX),
        Unit::Count,
        "Total content generations"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total generation failures"
    );

    // Bulk pipeline metrics
    describe_counter!(
        format!("{}_bulk_jobs_total", METRICS_PREFIX),
        Unit::Count,
        "Total bulk jobs by terminal status"
    );

    describe_counter!(
        format!("{}_bulk_items_processed_total", METRICS_PREFIX),
        Unit::Count,
        "Total bulk items processed by outcome"
    );

    describe_histogram!(
        format!("{}_bulk_job_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Bulk job wall-clock duration in seconds"
    );

    // Rate limiting & ledger metrics
    describe_counter!(
        format!("{}_rate_limit_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Total rate-limited requests"
    );

    describe_counter!(
        format!("{}_usage_records_total", METRICS_PREFIX),
        Unit::Count,
        "Total usage ledger records"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record generation metrics
pub fn record_generation(duration_secs: f64, variant: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generations_total", METRICS_PREFIX),
        "variant" => variant.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_generation_duration_seconds", METRICS_PREFIX),
            "variant" => variant.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_generation_errors_total", METRICS_PREFIX),
            "variant" => variant.to_string()
        )
        .increment(1);
    }
}

/// Helper to record one processed bulk item
pub fn record_bulk_item(success: bool) {
    let outcome = if success { "succeeded" } else { "failed" };

    counter!(
        format!("{}_bulk_items_processed_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record a finished bulk job
pub fn record_bulk_job(duration_secs: f64, terminal_status: &str) {
    counter!(
        format!("{}_bulk_jobs_total", METRICS_PREFIX),
        "status" => terminal_status.to_string()
    )
    .increment(1);

    histogram!(format!("{}_bulk_job_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        let mut prev = 0.0;
        for &bucket in GENERATION_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_generation_buckets_cover_model_latency() {
        // Upstream model calls run to the 30s client timeout.
        assert!(GENERATION_BUCKETS.contains(&30.00));
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/v1/usage");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
