//! Resolver counters, recorded through the `metrics` facade.
//!
//! No exporter is installed here; the embedding application decides where the
//! counters go.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "rolegate_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "rolegate_cache_misses_total";
    pub const CACHE_ERRORS_TOTAL: &str = "rolegate_cache_errors_total";
    pub const STORE_FETCHES_TOTAL: &str = "rolegate_store_fetches_total";
    pub const DECODE_FAILURES_TOTAL: &str = "rolegate_decode_failures_total";
}

pub fn record_cache_hits(count: usize) {
    counter!(names::CACHE_HITS_TOTAL).increment(count as u64);
}

pub fn record_cache_misses(count: usize) {
    counter!(names::CACHE_MISSES_TOTAL).increment(count as u64);
}

/// Record a failed or timed-out cache call.
pub fn record_cache_error(op: &'static str) {
    counter!(names::CACHE_ERRORS_TOTAL, "op" => op).increment(1);
}

pub fn record_store_fetch() {
    counter!(names::STORE_FETCHES_TOTAL).increment(1);
}

pub fn record_decode_failure() {
    counter!(names::DECODE_FAILURES_TOTAL).increment(1);
}
