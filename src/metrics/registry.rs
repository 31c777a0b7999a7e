// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Fetch events by lookup outcome
    pub static ref CACHE_LOOKUPS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_lookups_total", "Fetch events by cache lookup outcome"),
        &["result"], // result: hit, miss
        REGISTRY
    ).unwrap();

    /// Entries currently stored per bucket
    pub static ref BUCKET_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("bucket_entries", "Entries stored in a cache bucket"),
        &["bucket"],
        REGISTRY
    ).unwrap();

    /// Install attempts
    pub static ref INSTALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("installs_total", "Install phase attempts"),
        &["status"], // status: success, failure
        REGISTRY
    ).unwrap();

    // ============================================================================
    // NETWORK METRICS
    // ============================================================================

    /// Network fetches issued
    pub static ref NETWORK_FETCHES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("network_fetches_total", "Network fetches issued"),
        &["phase", "outcome"], // phase: install, fallback; outcome: ok, error
        REGISTRY
    ).unwrap();

    /// Time to answer a fetch event
    pub static ref FETCH_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("fetch_duration_seconds", "Time to answer a fetch event")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["source"], // source: cache, network
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
