//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the PokeIndex server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Cache and sync status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::{Captures, Regex};

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
            "pokeindex_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pokeindex_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pokeindex_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Cache and Sync Metrics (collected dynamically)
// =============================================================================

/// Records saved in the local store.
pub static RECORDS_CACHED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("pokeindex_records_cached", "Number of records in the local store").unwrap()
});

/// Remote requests currently in flight.
pub static SYNC_PENDING_REQUESTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pokeindex_sync_pending_requests",
        "Number of remote requests currently in flight",
    )
    .unwrap()
});

/// Catalog pagination finished (1) or not (0).
pub static CATALOG_COMPLETE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pokeindex_catalog_complete",
        "Whether all catalog pages have been downloaded (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Cache and sync
    registry.register(Box::new(RECORDS_CACHED.clone())).unwrap();
    registry
        .register(Box::new(SYNC_PENDING_REQUESTS.clone()))
        .unwrap();
    registry
        .register(Box::new(CATALOG_COMPLETE.clone()))
        .unwrap();

    // Core metrics (fetches, record writes)
    for metric in pokeindex_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the store and the sync controller.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(count) = state.store().count() {
        RECORDS_CACHED.set(count as i64);
    }

    if let Ok(status) = state.sync().status().await {
        SYNC_PENDING_REQUESTS.set(status.pending_requests as i64);
        CATALOG_COMPLETE.set(if status.resume.all_pages_downloaded { 1 } else { 0 });
    }
}

static NAME_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/pokemon/[^/]+").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace names and IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = NAME_SEGMENT.replace_all(path, |caps: &Captures| {
        if &caps[0] == "/pokemon/by-number" {
            caps[0].to_string()
        } else {
            "/pokemon/{name}".to_string()
        }
    });
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
