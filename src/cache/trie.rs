//! Trie Cache Module
//!
//! Shared-prefix tree engine. Every full key (`prefix + suffix`) ends on a
//! terminal node; a separate timer index keyed by the full key is the ground
//! truth for liveness. Timers carry a generation so an expiry that lost a race
//! against a refresh leaves the entry alone.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::timer::ExpiryTimer;
use crate::cache::{CacheEngine, EngineStats};

// == Trie Node ==
#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    terminal: bool,
}

impl TrieNode {
    fn insert(&mut self, key: &str) {
        let mut node = self;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.terminal = true;
    }

    fn find(&self, key: &str) -> Option<&TrieNode> {
        key.chars().try_fold(self, |node, ch| node.children.get(&ch))
    }

    fn is_prunable(&self) -> bool {
        self.children.is_empty() && !self.terminal
    }

    /// Appends every terminal key at or below this node. `path` holds the
    /// characters leading here and is restored before returning.
    fn collect_keys(&self, path: &mut String, out: &mut BTreeSet<String>) {
        if self.terminal {
            out.insert(path.clone());
        }
        for (ch, child) in &self.children {
            path.push(*ch);
            child.collect_keys(path, out);
            path.pop();
        }
    }

    fn count_terminals(&self) -> usize {
        let below: usize = self.children.values().map(TrieNode::count_terminals).sum();
        below + usize::from(self.terminal)
    }

    // == Edit And Prune ==
    /// Descends along `path`, applies `edit` to the node at its end, then
    /// removes every child on the way back up that was left empty.
    ///
    /// Returns whether `self` is now prunable. Callers holding the root ignore
    /// the result. A path that does not exist is left untouched.
    fn edit_and_prune<F>(&mut self, path: &[char], edit: F) -> bool
    where
        F: FnOnce(&mut TrieNode),
    {
        match path.split_first() {
            None => edit(self),
            Some((ch, rest)) => {
                let Some(child) = self.children.get_mut(ch) else {
                    return false;
                };
                if child.edit_and_prune(rest, edit) {
                    self.children.remove(ch);
                }
            }
        }
        self.is_prunable()
    }
}

// == Timer Entry ==
#[derive(Debug)]
struct TimerEntry {
    generation: u64,
    timer: ExpiryTimer,
}

// == Trie State ==
/// Everything guarded by the engine lock: the tree and the timer index.
#[derive(Debug, Default)]
struct TrieState {
    root: TrieNode,
    timers: HashMap<String, TimerEntry>,
    stats: EngineStats,
}

impl TrieState {
    fn remove_key(&mut self, key: &str) -> bool {
        if self.timers.remove(key).is_none() {
            return false;
        }
        let path: Vec<char> = key.chars().collect();
        self.root.edit_and_prune(&path, |node| node.terminal = false);
        true
    }

    /// Runs when a timer fires. A generation mismatch means the entry was
    /// refreshed after this timer was armed.
    fn expire(&mut self, key: &str, generation: u64) {
        let current = self.timers.get(key).map(|entry| entry.generation);
        if current == Some(generation) && self.remove_key(key) {
            self.stats.record_expiration();
            debug!(key, generation, "trie entry expired");
        }
    }
}

// == Trie Cache ==
/// Trie-backed engine. Supports prefix queries and prefix-range deletion on
/// top of the shared engine contract.
#[derive(Debug)]
pub struct TrieCache {
    state: Arc<RwLock<TrieState>>,
    default_ttl: Duration,
}

impl TrieCache {
    // == Constructor ==
    /// Creates an empty trie engine.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL used when an insert does not specify one
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(TrieState::default())),
            default_ttl,
        }
    }

    fn arm(&self, key: String, generation: u64, ttl: Duration) -> ExpiryTimer {
        ExpiryTimer::schedule(&self.state, ttl, move |state: &mut TrieState| {
            state.expire(&key, generation)
        })
    }

    // == Lookup ==
    /// Returns whether `key` is stored, or with `as_prefix` whether any stored
    /// key starts with it.
    pub async fn lookup(&self, key: &str, as_prefix: bool) -> bool {
        if key.is_empty() {
            return false;
        }

        let state = self.state.read().await;
        state
            .root
            .find(key)
            .is_some_and(|node| as_prefix || node.terminal)
    }

    // == List Prefixed ==
    /// Returns every stored key starting with `prefix`.
    pub async fn list_prefixed(&self, prefix: &str) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        if prefix.is_empty() {
            return keys;
        }

        let state = self.state.read().await;
        if let Some(node) = state.root.find(prefix) {
            let mut path = prefix.to_string();
            node.collect_keys(&mut path, &mut keys);
        }
        keys
    }

    // == Delete Key ==
    /// Removes a single full key, its timer, and any branch it leaves empty.
    pub async fn delete_key(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }

        let mut state = self.state.write().await;
        let removed = state.remove_key(key);
        if removed {
            state.stats.record_deletions(1);
        }
        removed
    }

    // == Delete Prefix ==
    /// Removes every key starting with `prefix` together with their timers,
    /// then prunes the ancestors left empty. Returns the number of keys removed.
    pub async fn delete_prefix(&self, prefix: &str) -> usize {
        if prefix.is_empty() {
            return 0;
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(node) = state.root.find(prefix) else {
            return 0;
        };
        let mut keys = BTreeSet::new();
        node.collect_keys(&mut prefix.to_string(), &mut keys);

        for key in &keys {
            state.timers.remove(key);
        }

        let path: Vec<char> = prefix.chars().collect();
        state.root.edit_and_prune(&path, |node| {
            node.children.clear();
            node.terminal = false;
        });

        state.stats.record_deletions(keys.len());
        debug!(prefix, removed = keys.len(), "trie prefix deleted");
        keys.len()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        self.state.read().await.timers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheEngine for TrieCache {
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
        let key = format!("{prefix}{suffix}");
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        // Refresh: new generation, new timer, no admission check
        if let Some(entry) = state.timers.get_mut(&key) {
            entry.generation += 1;
            entry.timer = self.arm(key, entry.generation, ttl);
            state.stats.record_refresh();
            return true;
        }

        let live = state.root.find(prefix).map_or(0, TrieNode::count_terminals);
        if live >= max_count {
            state.stats.record_rejection();
            return false;
        }

        state.root.insert(&key);
        let timer = self.arm(key.clone(), 0, ttl);
        state.timers.insert(key, TimerEntry { generation: 0, timer });
        state.stats.record_insert();
        true
    }

    async fn delete(&self, prefix: &str, suffix: &str) -> bool {
        if prefix.is_empty() || suffix.is_empty() {
            return false;
        }
        self.delete_key(&format!("{prefix}{suffix}")).await
    }

    async fn contains(&self, prefix: &str, suffix: &str) -> bool {
        if prefix.is_empty() || suffix.is_empty() {
            return false;
        }
        let key = format!("{prefix}{suffix}");
        self.state.read().await.timers.contains_key(&key)
    }

    /// One `\r\n`-terminated line per live key, read from the timer index
    /// rather than the tree.
    async fn list_live(&self) -> Vec<u8> {
        let state = self.state.read().await;
        let mut keys: Vec<&String> = state.timers.keys().collect();
        keys.sort();

        let mut out = Vec::new();
        for key in keys {
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    async fn stats(&self) -> EngineStats {
        let state = self.state.read().await;
        state.stats.snapshot(state.timers.len())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
