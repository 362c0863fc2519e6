//! Engine Statistics Module
//!
//! Tracks admission, refresh, deletion and expiry counters for a cache engine.

use serde::Serialize;

// == Engine Stats ==
/// Counters describing what an engine has done since it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// New entries admitted
    pub inserts: u64,
    /// Existing entries whose timer was reset
    pub refreshes: u64,
    /// Insertions refused because the prefix group was full
    pub rejections: u64,
    /// Entries removed by an explicit delete
    pub deletions: u64,
    /// Entries removed by their timer
    pub expirations: u64,
    /// Entries currently live
    pub live_entries: usize,
}

impl EngineStats {
    // == Constructor ==
    /// Creates a new EngineStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Admission Rate ==
    /// Fraction of first-time insertions that were admitted.
    ///
    /// Returns inserts / (inserts + rejections), or 0.0 if nothing was attempted.
    pub fn admission_rate(&self) -> f64 {
        let total = self.inserts + self.rejections;
        if total == 0 {
            0.0
        } else {
            self.inserts as f64 / total as f64
        }
    }

    pub fn record_insert(&mut self) {
        self.inserts += 1;
    }

    pub fn record_refresh(&mut self) {
        self.refreshes += 1;
    }

    pub fn record_rejection(&mut self) {
        self.rejections += 1;
    }

    /// Adds `count` explicit deletions.
    pub fn record_deletions(&mut self, count: usize) {
        self.deletions += count as u64;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    // == Snapshot ==
    /// Returns a copy of the counters with the live entry count filled in.
    pub fn snapshot(&self, live_entries: usize) -> Self {
        Self {
            live_entries,
            ..self.clone()
        }
    }
}
