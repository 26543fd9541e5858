//! Backend Statistics Module
//!
//! Tracks in-process backend activity: hits, misses and read-time expirations.

use serde::Serialize;

// == Backend Stats ==
/// Counters kept by the in-process backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendStats {
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries removed because a read or enumeration found them expired
    pub expirations: u64,
    /// Current number of resident entries
    pub total_entries: usize,
}

impl BackendStats {
    // == Constructor ==
    /// Creates a new BackendStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
