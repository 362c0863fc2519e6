//! Cache Engine Interface
//!
//! The contract shared by the trie and flat-map engines. The ingestion
//! pipeline only ever talks to an `Arc<dyn CacheEngine>`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;

use crate::cache::{EngineStats, FlatMapCache, TrieCache};

// == Cache Engine ==
/// An expiring, admission-capped set of `(prefix, suffix)` entries.
#[async_trait]
pub trait CacheEngine: Send + Sync {
    /// Inserts `(prefix, suffix)` or resets the timer of an existing entry.
    ///
    /// A new entry is refused when `prefix` already holds `max_count` live
    /// suffixes. Refreshing an existing entry ignores `max_count`. A `ttl` of
    /// `None` uses the engine's default TTL. Empty fields always fail.
    async fn insert_or_refresh(
        &self,
        prefix: &str,
        suffix: &str,
        ttl: Option<Duration>,
        max_count: usize,
    ) -> bool;

    /// Removes `(prefix, suffix)` and its timer. Returns whether it was live.
    async fn delete(&self, prefix: &str, suffix: &str) -> bool;

    /// Returns whether `(prefix, suffix)` is live.
    async fn contains(&self, prefix: &str, suffix: &str) -> bool;

    /// Renders every live entry as the text body of a list reply.
    async fn list_live(&self) -> Vec<u8>;

    /// Current counters, including the live entry count.
    async fn stats(&self) -> EngineStats;

    /// TTL applied when a request does not carry its own.
    fn default_ttl(&self) -> Duration;
}

// == Engine Kind ==
/// Selects which engine implementation backs the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// Two-level hash map, one timer per suffix
    #[default]
    Map,
    /// Shared-prefix tree with generation-tagged timers
    Trie,
}

impl EngineKind {
    /// Builds a fresh engine of this kind.
    pub fn build(self, default_ttl: Duration) -> Arc<dyn CacheEngine> {
        match self {
            EngineKind::Map => Arc::new(FlatMapCache::new(default_ttl)),
            EngineKind::Trie => Arc::new(TrieCache::new(default_ttl)),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Map => f.write_str("map"),
            EngineKind::Trie => f.write_str("trie"),
        }
    }
}
