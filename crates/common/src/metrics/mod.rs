//! Metrics and observability utilities
//!
//! Emits through the `metrics` facade; whichever recorder the host process
//! installs receives them. Nothing is exported by this crate.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all Paper Pulse metrics
pub const METRICS_PREFIX: &str = "pulse";

/// Register all metric descriptions
pub fn register_metrics() {
    // Sync metrics
    describe_counter!(
        format!("{}_sync_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total standing-query sync passes"
    );

    describe_counter!(
        format!("{}_papers_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total papers inserted by ingestion"
    );

    describe_histogram!(
        format!("{}_sync_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Per-query sync latency in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record one standing-query sync pass
pub fn record_sync(duration_secs: f64, provenance: &str, new_saved: usize, failed: bool) {
    let status = if failed { "error" } else { "success" };

    counter!(
        format!("{}_sync_queries_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    counter!(
        format!("{}_papers_ingested_total", METRICS_PREFIX),
        "query" => provenance.to_string()
    )
    .increment(new_saved as u64);

    histogram!(format!("{}_sync_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, mode: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}
