//! Flat Map Cache Module
//!
//! Two-level hash map engine: `prefix -> suffix -> timer`. An entry is live
//! while its timer sits in the inner map, and a prefix is dropped as soon as
//! its inner map empties.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::timer::ExpiryTimer;
use crate::cache::{CacheEngine, EngineStats};

#[derive(Debug, Default)]
struct FlatMapState {
    groups: HashMap<String, HashMap<String, ExpiryTimer>>,
    stats: EngineStats,
}

impl FlatMapState {
    fn remove(&mut self, prefix: &str, suffix: &str) -> bool {
        let Some(group) = self.groups.get_mut(prefix) else {
            return false;
        };
        if group.remove(suffix).is_none() {
            return false;
        }
        if group.is_empty() {
            self.groups.remove(prefix);
        }
        true
    }

    fn len(&self) -> usize {
        self.groups.values().map(HashMap::len).sum()
    }
}

// == Flat Map Cache ==
/// Hash-map engine. No shared-prefix storage and no prefix-range deletes.
#[derive(Debug)]
pub struct FlatMapCache {
    state: Arc<RwLock<FlatMapState>>,
    default_ttl: Duration,
}

impl FlatMapCache {
    /// Creates an empty engine using `default_ttl` for inserts without a TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(FlatMapState::default())),
            default_ttl,
        }
    }

    fn arm(&self, prefix: &str, suffix: &str, ttl: Duration) -> ExpiryTimer {
        let (prefix, suffix) = (prefix.to_string(), suffix.to_string());
        ExpiryTimer::schedule(&self.state, ttl, move |state: &mut FlatMapState| {
            if state.remove(&prefix, &suffix) {
                state.stats.record_expiration();
                debug!(%prefix, %suffix, "map entry expired");
            }
        })
    }

    /// Number of live entries across all prefixes.
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    #[cfg(test)]
    async fn prefix_count(&self) -> usize {
        self.state.read().await.groups.len()
    }
}

#[async_trait]
impl CacheEngine for FlatMapCache {
    async fn insert_or_refresh(
        &self,
        prefix: &str,
        suffix: &str,
        ttl: Option<Duration>,
        max_count: usize,
    ) -> bool {
        if prefix.is_empty() || suffix.is_empty() {
            return false;
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if let Some(timer) = state
            .groups
            .get_mut(prefix)
            .and_then(|group| group.get_mut(suffix))
        {
            *timer = self.arm(prefix, suffix, ttl);
            state.stats.record_refresh();
            return true;
        }

        let live = state.groups.get(prefix).map_or(0, HashMap::len);
        if live >= max_count {
            state.stats.record_rejection();
            return false;
        }

        let timer = self.arm(prefix, suffix, ttl);
        state
            .groups
            .entry(prefix.to_string())
            .or_default()
            .insert(suffix.to_string(), timer);
        state.stats.record_insert();
        true
    }

    async fn delete(&self, prefix: &str, suffix: &str) -> bool {
        if prefix.is_empty() || suffix.is_empty() {
            return false;
        }

        let mut state = self.state.write().await;
        let removed = state.remove(prefix, suffix);
        if removed {
            state.stats.record_deletions(1);
        }
        removed
    }

    async fn contains(&self, prefix: &str, suffix: &str) -> bool {
        let state = self.state.read().await;
        state
            .groups
            .get(prefix)
            .is_some_and(|group| group.contains_key(suffix))
    }

    /// Each prefix on its own line, followed by one tab-indented line per suffix.
    async fn list_live(&self) -> Vec<u8> {
        let state = self.state.read().await;
        let mut prefixes: Vec<(&String, &HashMap<String, ExpiryTimer>)> =
            state.groups.iter().collect();
        prefixes.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = Vec::new();
        for (prefix, group) in prefixes {
            out.extend_from_slice(prefix.as_bytes());
            out.extend_from_slice(b"\r\n");

            let mut suffixes: Vec<&String> = group.keys().collect();
            suffixes.sort();
            for suffix in suffixes {
                out.push(b'\t');
                out.extend_from_slice(suffix.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
        }
        out
    }

    async fn stats(&self) -> EngineStats {
        let state = self.state.read().await;
        state.stats.snapshot(state.len())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_insert_and_contains() {
        let cache = FlatMapCache::new(LONG);

        assert!(cache.insert_or_refresh("user", "42", None, 3).await);
        assert!(cache.contains("user", "42").await);
        assert!(!cache.contains("user", "43").await);
        assert!(!cache.contains("other", "42").await);
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let cache = FlatMapCache::new(LONG);

        assert!(!cache.insert_or_refresh("", "a", None, 3).await);
        assert!(!cache.insert_or_refresh("a", "", None, 3).await);
        assert_eq!(cache.len().await, 0);
        assert_eq!(cache.prefix_count().await, 0);
    }

    #[tokio::test]
    async fn test_admission_cap() {
        let cache = FlatMapCache::new(LONG);

        for suffix in ["a", "b", "c"] {
            assert!(cache.insert_or_refresh("p", suffix, None, 3).await);
        }
        assert!(!cache.insert_or_refresh("p", "d", None, 3).await);
        assert!(!cache.contains("p", "d").await);

        // Refreshing an admitted suffix never re-checks the cap
        assert!(cache.insert_or_refresh("p", "b", None, 1).await);
        assert_eq!(cache.len().await, 3);

        // Other prefixes have their own budget
        assert!(cache.insert_or_refresh("q", "d", None, 3).await);
    }

    #[tokio::test]
    async fn test_rejection_leaves_no_empty_group() {
        let cache = FlatMapCache::new(LONG);

        assert!(!cache.insert_or_refresh("p", "a", None, 0).await);
        assert_eq!(cache.prefix_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_drops_empty_prefix() {
        let cache = FlatMapCache::new(LONG);

        cache.insert_or_refresh("p", "a", None, 3).await;
        cache.insert_or_refresh("p", "b", None, 3).await;

        assert!(cache.delete("p", "a").await);
        assert_eq!(cache.prefix_count().await, 1);
        assert!(cache.delete("p", "b").await);
        assert_eq!(cache.prefix_count().await, 0);

        assert!(!cache.delete("p", "b").await);
        assert!(!cache.delete("", "b").await);
    }

    #[tokio::test]
    async fn test_list_live_format() {
        let cache = FlatMapCache::new(LONG);

        cache.insert_or_refresh("beta", "2", None, 3).await;
        cache.insert_or_refresh("alpha", "y", None, 3).await;
        cache.insert_or_refresh("alpha", "x", None, 3).await;

        assert_eq!(
            cache.list_live().await,
            b"alpha\r\n\tx\r\n\ty\r\nbeta\r\n\t2\r\n".to_vec()
        );
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = FlatMapCache::new(LONG);

        cache
            .insert_or_refresh("tok", "1", Some(Duration::from_millis(100)), 3)
            .await;
        cache.insert_or_refresh("tok", "2", None, 3).await;

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!cache.contains("tok", "1").await);
        assert!(cache.contains("tok", "2").await);
        assert_eq!(cache.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn test_expiry_drops_empty_prefix() {
        let cache = FlatMapCache::new(LONG);

        cache
            .insert_or_refresh("tok", "1", Some(Duration::from_millis(100)), 3)
            .await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(cache.prefix_count().await, 0);
        assert!(cache.list_live().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_extends_deadline() {
        let cache = FlatMapCache::new(LONG);
        let ttl = Some(Duration::from_millis(400));

        cache.insert_or_refresh("tok", "1", ttl, 3).await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(cache.insert_or_refresh("tok", "1", ttl, 3).await);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(cache.contains("tok", "1").await);

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert!(!cache.contains("tok", "1").await);
    }

    #[tokio::test]
    async fn test_deleted_entry_timer_does_not_count_expiry() {
        let cache = FlatMapCache::new(LONG);

        cache
            .insert_or_refresh("tok", "1", Some(Duration::from_millis(100)), 3)
            .await;
        assert!(cache.delete("tok", "1").await);
        tokio::time::sleep(Duration::from_millis(300)).await;

        let stats = cache.stats().await;
        assert_eq!(stats.expirations, 0);
        assert_eq!(stats.deletions, 1);
    }
}
