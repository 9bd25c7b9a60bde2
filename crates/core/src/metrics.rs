//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Tiered cache (operations, failures per namespace)
//! - Resolution (terminal paths, degraded fallbacks, coalescing, timeouts)
//! - External services (indexer, title lookup)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Cache Metrics
// =============================================================================

/// Cache operations total by namespace and operation.
pub static CACHE_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mirador_cache_operations_total", "Total cache operations"),
        &["namespace", "op"], // op: "get", "set", "del"
    )
    .unwrap()
});

/// Cache operations that failed after all attempts.
pub static CACHE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mirador_cache_failures_total",
            "Total failed cache operations",
        ),
        &["namespace"],
    )
    .unwrap()
});

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Resolutions by terminal path.
pub static STREAM_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mirador_stream_resolutions_total",
            "Total stream resolutions by terminal path",
        ),
        &["path"], // "cache", "store", "live", "degraded", "timeout"
    )
    .unwrap()
});

/// Resolution duration in seconds.
pub static RESOLUTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mirador_resolution_duration_seconds",
            "Duration of stream resolution",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["path"],
    )
    .unwrap()
});

/// Callers that joined an in-flight resolution.
pub static COALESCED_JOINS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mirador_coalesced_joins_total",
        "Requests served by an in-flight resolution",
    )
    .unwrap()
});

/// Live searches abandoned by the timeout race.
pub static LIVE_SEARCH_TIMEOUTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mirador_live_search_timeouts_total",
        "Live searches that exceeded the request timeout",
    )
    .unwrap()
});

/// Resolutions that fell back to stored results.
pub static DEGRADED_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mirador_degraded_fallbacks_total",
            "Resolutions served from the store after a failed step",
        ),
        &["reason"], // "title_lookup", "no_indexer", "search_failed", "search_panicked"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mirador_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mirador_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Search results returned from the indexer.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mirador_search_results",
            "Number of search results returned per query",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Cache
        Box::new(CACHE_OPERATIONS.clone()),
        Box::new(CACHE_FAILURES.clone()),
        // Resolution
        Box::new(STREAM_RESOLUTIONS.clone()),
        Box::new(RESOLUTION_DURATION.clone()),
        Box::new(COALESCED_JOINS.clone()),
        Box::new(LIVE_SEARCH_TIMEOUTS.clone()),
        Box::new(DEGRADED_FALLBACKS.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
        Box::new(SEARCH_RESULTS.clone()),
    ]
}
