//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Remote fetches (requests, durations, suppressed duplicates)
//! - Local cache writes (records created, records hydrated)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Fetches completed total by operation and outcome.
pub static FETCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pokeindex_fetch_requests_total",
            "Total remote fetches completed",
        ),
        &["operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Fetch duration in seconds.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pokeindex_fetch_duration_seconds",
            "Duration of remote fetches",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"], // "catalog_page", "details", "image"
    )
    .unwrap()
});

/// Requests skipped because the same URL was already in flight.
pub static DUPLICATE_REQUESTS_SUPPRESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pokeindex_duplicate_requests_suppressed_total",
            "Total requests skipped because the URL was already in flight",
        ),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics
// =============================================================================

/// Stub records created from catalog pages.
pub static RECORDS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pokeindex_records_created_total",
        "Total records created from catalog pages",
    )
    .unwrap()
});

/// Records enriched by a follow-up download.
pub static RECORDS_HYDRATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pokeindex_records_hydrated_total",
            "Total records enriched with details or images",
        ),
        &["kind"], // "details", "image"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Fetches
        Box::new(FETCH_REQUESTS.clone()),
        Box::new(FETCH_DURATION.clone()),
        Box::new(DUPLICATE_REQUESTS_SUPPRESSED.clone()),
        // Cache
        Box::new(RECORDS_CREATED.clone()),
        Box::new(RECORDS_HYDRATED.clone()),
    ]
}
