//! Session-wide cache of action results keyed by signature.
//!
//! Bounded by entry count and by the serialized size of the stored values;
//! entries older than the configured TTL are treated as misses.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Limits for a [`ResultCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached results.
    pub max_entries: usize,
    /// Maximum total size of cached results, measured as serialized JSON.
    pub max_bytes: usize,
    /// Age after which a result is discarded.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            max_bytes: 16 * 1024 * 1024,
            ttl: Some(Duration::from_secs(300)),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Counters of a [`ResultCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes: usize,
}

impl CacheStats {
    /// Hits over lookups, `0.0` before the first lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry {
    value: Value,
    size: usize,
    inserted: Instant,
}

struct State {
    entries: LruCache<String, Entry>,
    stats: CacheStats,
}

/// LRU cache of action results.
pub struct ResultCache {
    config: CacheConfig,
    state: Mutex<State>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ResultCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            state: Mutex::new(State {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached result for `signature`, refreshing its recency.
    pub fn get(&self, signature: &str) -> Option<Value> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let expired = match state.entries.get(signature) {
            None => {
                state.stats.misses += 1;
                return None;
            }
            Some(entry) => self
                .config
                .ttl
                .is_some_and(|ttl| entry.inserted.elapsed() > ttl),
        };

        if expired {
            if let Some(entry) = state.entries.pop(signature) {
                state.stats.bytes -= entry.size;
            }
            state.stats.misses += 1;
            tracing::trace!(signature, "cached result expired");
            return None;
        }

        state.stats.hits += 1;
        state.entries.get(signature).map(|entry| entry.value.clone())
    }

    /// Store `value` under `signature`, evicting least recently used results
    /// until it fits. Values larger than the whole budget are not cached.
    pub fn insert(&self, signature: impl Into<String>, value: Value) {
        let signature = signature.into();
        let size = match serde_json::to_vec(&value) {
            Ok(bytes) => bytes.len(),
            Err(err) => {
                tracing::warn!(signature = %signature, error = %err, "result not cacheable");
                return;
            }
        };
        if size > self.config.max_bytes {
            tracing::debug!(signature = %signature, size, "result exceeds cache budget");
            return;
        }

        let mut state = self.state.lock();
        if let Some(previous) = state.entries.pop(&signature) {
            state.stats.bytes -= previous.size;
        }
        while state.stats.bytes + size > self.config.max_bytes {
            let Some((_, evicted)) = state.entries.pop_lru() else {
                break;
            };
            state.stats.bytes -= evicted.size;
            state.stats.evictions += 1;
        }

        let entry = Entry {
            value,
            size,
            inserted: Instant::now(),
        };
        if let Some((_, evicted)) = state.entries.push(signature, entry) {
            state.stats.bytes -= evicted.size;
            state.stats.evictions += 1;
        }
        state.stats.bytes += size;
    }

    /// Drop a single result.
    pub fn remove(&self, signature: &str) -> Option<Value> {
        let mut state = self.state.lock();
        let entry = state.entries.pop(signature)?;
        state.stats.bytes -= entry.size;
        Some(entry.value)
    }

    /// Drop every result. Counters other than size survive.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.stats.bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            ..state.stats
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
