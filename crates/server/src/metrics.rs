//! Prometheus metrics for the HTTP surface.
//!
//! The global registry holds the HTTP metrics defined here plus every
//! resolution metric exported by `mirador_core::metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mirador_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mirador_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mirador_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Stream requests rejected for a missing or unknown API key.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mirador_auth_failures_total", "Total API key rejections"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    for metric in mirador_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

static STREAM_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/[^/]+)?/stream/[^/]+/[^/]+$").unwrap());
static RESOLVE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/resolve/[^/]+/[^/]+$").unwrap());

/// Collapse a request path to its route shape for metric labels.
///
/// Content ids, info hashes and user configuration segments are replaced
/// with placeholders; unknown paths share one label.
pub fn normalize_path(path: &str) -> String {
    if let Some(caps) = STREAM_PATH.captures(path) {
        return if caps.get(1).is_some() {
            "/{config}/stream/{type}/{id}".to_string()
        } else {
            "/stream/{type}/{id}".to_string()
        };
    }
    if RESOLVE_PATH.is_match(path) {
        return "/resolve/{hash}/{index}".to_string();
    }
    match path {
        "/options" | "/metrics" => path.to_string(),
        p if p.starts_with("/api/v1/") => p.to_string(),
        _ => "other".to_string(),
    }
}
