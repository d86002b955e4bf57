//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions
//! for the extraction, retrieval, generation, and publication stages.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all LexForge metrics
pub const METRICS_PREFIX: &str = "lexforge";

/// Histogram buckets for pipeline stage latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
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
    30.00, // 30s
    60.00, // 60s - generation timeout ceiling
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of analysis queries processed"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end query processing latency in seconds"
    );

    // Extraction metrics
    describe_histogram!(
        format!("{}_extraction_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Term extraction latency in seconds"
    );

    describe_counter!(
        format!("{}_extraction_degraded_total", METRICS_PREFIX),
        Unit::Count,
        "Extractions that fell back to lexical-only after a tagger failure"
    );

    describe_gauge!(
        format!("{}_extraction_terms_count", METRICS_PREFIX),
        Unit::Count,
        "Number of key terms extracted from the last query"
    );

    // Retrieval metrics
    describe_counter!(
        format!("{}_layer_matches_total", METRICS_PREFIX),
        Unit::Count,
        "Context segments contributed, labeled by retrieval layer"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Layered context build latency in seconds"
    );

    // Generation metrics
    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total generation backend requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation backend latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Stricter re-prompts issued after malformed output"
    );

    describe_counter!(
        format!("{}_generation_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Generation failures, labeled by reason"
    );

    // Publication metrics
    describe_counter!(
        format!("{}_results_published_total", METRICS_PREFIX),
        Unit::Count,
        "Result documents published, labeled by status"
    );

    tracing::info!("Metrics registered");
}

/// Helper to time a pipeline stage
pub struct StageTimer {
    start: Instant,
}

impl StageTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Record a completed term extraction
pub fn record_extraction(duration_secs: f64, term_count: usize, degraded: bool) {
    histogram!(format!("{}_extraction_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_extraction_terms_count", METRICS_PREFIX)).set(term_count as f64);

    if degraded {
        counter!(format!("{}_extraction_degraded_total", METRICS_PREFIX)).increment(1);
    }
}

/// Record matches contributed by one retrieval layer
pub fn record_layer(layer: &'static str, matches: usize) {
    counter!(
        format!("{}_layer_matches_total", METRICS_PREFIX),
        "layer" => layer
    )
    .increment(matches as u64);
}

/// Record the layered context build
pub fn record_retrieval(duration_secs: f64) {
    histogram!(format!("{}_retrieval_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a generation backend call
pub fn record_generation(duration_secs: f64, success: bool, reason: Option<&'static str>) {
    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "status" => if success { "success" } else { "error" }
    )
    .increment(1);

    if success {
        histogram!(format!("{}_generation_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    } else if let Some(reason) = reason {
        counter!(
            format!("{}_generation_errors_total", METRICS_PREFIX),
            "reason" => reason
        )
        .increment(1);
    }
}

/// Record a stricter re-prompt after malformed output
pub fn record_generation_retry() {
    counter!(format!("{}_generation_retries_total", METRICS_PREFIX)).increment(1);
}

/// Record a published result document
pub fn record_publish(status: &'static str) {
    counter!(
        format!("{}_results_published_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);
}

/// Record a completed query
pub fn record_query(duration_secs: f64, status: &'static str) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    histogram!(format!("{}_query_duration_seconds", METRICS_PREFIX)).record(duration_secs);
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
        // Generation timeout ceiling should be covered
        assert!(LATENCY_BUCKETS.contains(&60.00));
    }

    #[test]
    fn test_stage_timer() {
        let timer = StageTimer::start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_secs() > 0.0);
    }
}
