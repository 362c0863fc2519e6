//! Cache Module
//!
//! Expiring, admission-capped entry storage with two interchangeable engines.

mod engine;
mod flat_map;
mod stats;
mod timer;
mod trie;


// Re-export public types
pub use engine::{CacheEngine, EngineKind};
pub use flat_map::FlatMapCache;
pub use stats::EngineStats;
pub use trie::TrieCache;
