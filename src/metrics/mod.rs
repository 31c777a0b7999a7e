// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    CACHE_LOOKUPS,
    BUCKET_ENTRIES,
    INSTALLS,
    NETWORK_FETCHES,
    FETCH_DURATION,
};

/// Helper to record a fetch event answered from the bucket
pub fn record_cache_hit(duration_secs: f64) {
    CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
    FETCH_DURATION.with_label_values(&["cache"]).observe(duration_secs);
}

/// Helper to record a fetch event forwarded to the network
pub fn record_cache_miss(success: bool, duration_secs: f64) {
    CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
    record_network_fetch("fallback", success);
    FETCH_DURATION.with_label_values(&["network"]).observe(duration_secs);
}

pub fn record_network_fetch(phase: &str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    NETWORK_FETCHES.with_label_values(&[phase, outcome]).inc();
}

/// Helper to record install outcomes
pub fn record_install(success: bool) {
    let status = if success { "success" } else { "failure" };
    INSTALLS.with_label_values(&[status]).inc();
}

pub fn update_bucket_entries(bucket: &str, count: usize) {
    BUCKET_ENTRIES.with_label_values(&[bucket]).set(count as f64);
}
