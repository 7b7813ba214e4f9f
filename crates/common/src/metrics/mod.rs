//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Brandlens metrics
pub const METRICS_PREFIX: &str = "brandlens";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
];

/// Buckets for classifier round trips (a batch through a transformer model)
pub const CLASSIFIER_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
];

/// Outcome of a classifier call, used as a metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierOutcome {
    Success,
    Error,
    Timeout,
}

impl ClassifierOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierOutcome::Success => "success",
            ClassifierOutcome::Error => "error",
            ClassifierOutcome::Timeout => "timeout",
        }
    }
}

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

    // Ranking metrics
    describe_counter!(
        format!("{}_rankings_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of ranking runs"
    );

    describe_histogram!(
        format!("{}_ranking_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Ranking latency in seconds, classification included"
    );

    describe_gauge!(
        format!("{}_graph_nodes", METRICS_PREFIX),
        Unit::Count,
        "Participants in the last interaction graph built"
    );

    // Classifier metrics
    describe_counter!(
        format!("{}_classifier_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total sentiment classifier requests"
    );

    describe_counter!(
        format!("{}_classifier_texts_total", METRICS_PREFIX),
        Unit::Count,
        "Total texts sent to the sentiment classifier"
    );

    describe_histogram!(
        format!("{}_classifier_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Sentiment classifier latency in seconds"
    );

    describe_counter!(
        format!("{}_classifier_fallback_texts_total", METRICS_PREFIX),
        Unit::Count,
        "Texts of failed batches sent again one by one"
    );

    describe_counter!(
        format!("{}_classifier_skipped_texts_total", METRICS_PREFIX),
        Unit::Count,
        "Texts left unclassified after classifier failures"
    );

    // Dataset metrics
    describe_counter!(
        format!("{}_dataset_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Crawl datasets found by crawling id"
    );

    describe_counter!(
        format!("{}_dataset_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Crawling ids with no stored dataset"
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

/// Helper to record a ranking run
pub fn record_ranking(duration_secs: f64, ranker: &str, node_count: usize) {
    counter!(
        format!("{}_rankings_total", METRICS_PREFIX),
        "ranker" => ranker.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_ranking_duration_seconds", METRICS_PREFIX),
        "ranker" => ranker.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_graph_nodes", METRICS_PREFIX),
        "ranker" => ranker.to_string()
    )
    .set(node_count as f64);
}

/// Helper to record a classifier call
pub fn record_classifier(duration_secs: f64, batch_size: usize, outcome: ClassifierOutcome) {
    counter!(
        format!("{}_classifier_requests_total", METRICS_PREFIX),
        "status" => outcome.as_str()
    )
    .increment(1);

    counter!(format!("{}_classifier_texts_total", METRICS_PREFIX)).increment(batch_size as u64);

    if outcome == ClassifierOutcome::Success {
        histogram!(format!("{}_classifier_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    }
}

/// Helper to record a failed batch call
///
/// The texts are counted on their own counter; each is counted again on
/// `classifier_texts_total` when it is retried alone.
pub fn record_batch_fallback(batch_size: usize, outcome: ClassifierOutcome) {
    counter!(
        format!("{}_classifier_requests_total", METRICS_PREFIX),
        "status" => outcome.as_str()
    )
    .increment(1);

    counter!(format!("{}_classifier_fallback_texts_total", METRICS_PREFIX))
        .increment(batch_size as u64);
}

/// Helper to record texts dropped from a sentiment aggregate
pub fn record_skipped_texts(count: usize) {
    counter!(format!("{}_classifier_skipped_texts_total", METRICS_PREFIX)).increment(count as u64);
}

/// Helper to record dataset lookups
pub fn record_dataset_lookup(hit: bool) {
    if hit {
        counter!(format!("{}_dataset_hits_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_dataset_misses_total", METRICS_PREFIX)).increment(1);
    }
}
