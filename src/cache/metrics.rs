//! Cache outcome accounting.
//!
//! The orchestrator reports every decision to a [`CacheMetrics`] it was built
//! with. [`RecorderMetrics`] forwards to whatever `metrics` recorder the
//! application installed:
//!
//! - `http_cache_operations_total{path, operation, reason}` counter, where
//!   `operation` is one of `add`, `hit`, `miss`, `evict`, `err` and `reason` is
//!   only filled in for `evict`;
//! - `http_cache_eviction_age_seconds{path}` histogram of stale entry ages.

use metrics::{counter, histogram};

use super::control::ValidationContext;

pub const METRIC_OPERATIONS_TOTAL: &str = "http_cache_operations_total";
pub const METRIC_EVICTION_AGE_SECONDS: &str = "http_cache_eviction_age_seconds";

/// Sink for cache outcomes, keyed by request path.
pub trait CacheMetrics: Send + Sync {
    /// A computed entry was written to the store.
    fn add(&self, path: &str);
    /// No entry was stored for the key.
    fn miss(&self, path: &str);
    /// The response was served from the store.
    fn hit(&self, path: &str);
    /// A store read, write or codec step failed.
    fn err(&self, path: &str);
    /// A stored entry of `age` seconds was replaced because `reason` rejected it.
    fn evict(&self, path: &str, reason: ValidationContext, age: i64);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    fn add(&self, _path: &str) {}
    fn miss(&self, _path: &str) {}
    fn hit(&self, _path: &str) {}
    fn err(&self, _path: &str) {}
    fn evict(&self, _path: &str, _reason: ValidationContext, _age: i64) {}
}

/// Emits through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderMetrics;

impl RecorderMetrics {
    fn count(&self, path: &str, operation: &'static str, reason: &'static str) {
        counter!(
            METRIC_OPERATIONS_TOTAL,
            "path" => path.to_owned(),
            "operation" => operation,
            "reason" => reason
        )
        .increment(1);
    }
}

impl CacheMetrics for RecorderMetrics {
    fn add(&self, path: &str) {
        self.count(path, "add", "");
    }

    fn miss(&self, path: &str) {
        self.count(path, "miss", "");
    }

    fn hit(&self, path: &str) {
        self.count(path, "hit", "");
    }

    fn err(&self, path: &str) {
        self.count(path, "err", "");
    }

    fn evict(&self, path: &str, reason: ValidationContext, age: i64) {
        self.count(path, "evict", reason.as_reason());
        histogram!(METRIC_EVICTION_AGE_SECONDS, "path" => path.to_owned()).record(age as f64);
    }
}
