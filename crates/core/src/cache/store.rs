//! Bounded TTL cache with least-recently-used eviction.
//!
//! Freshness and memory pressure are independent: each entry expires on its
//! own TTL, while the entry count is capped by evicting whichever entry was
//! read or written longest ago. Expired entries are removed lazily when
//! touched, when evicted, or by an explicit [`ApiCache::purge_expired`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};

/// Default capacity of a cache.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default time-to-live applied when `set` gets no explicit TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry<V> {
    value: V,
    /// `None` when `now + ttl` overflows; such entries never expire.
    expires_at: Option<Instant>,
    /// Position in the recency order.
    tick: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Entries plus their recency order, guarded together by one lock.
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// tick -> key, oldest first.
    recency: BTreeMap<u64, String>,
    next_tick: u64,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self { entries: HashMap::new(), recency: BTreeMap::new(), next_tick: 0 }
    }

    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn insert(&mut self, key: String, value: V, expires_at: Option<Instant>) {
        let tick = self.bump();
        if let Some(old) = self.entries.insert(key.clone(), CacheEntry { value, expires_at, tick }) {
            self.recency.remove(&old.tick);
        }
        self.recency.insert(tick, key);
    }

    fn promote(&mut self, key: &str) {
        let tick = self.bump();
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry)
    }

    /// Remove the least recently used entry other than `keep`.
    fn evict_lru(&mut self, keep: &str) -> Option<String> {
        let victim = self.recency.values().find(|k| k.as_str() != keep)?.clone();
        self.remove(&victim);
        Some(victim)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheStats {
    /// Entries physically present, including expired ones not yet swept.
    pub size: usize,
    /// Configured capacity.
    pub max_entries: usize,
}

/// Bounded in-memory cache keyed by string.
///
/// All operations are synchronous and take `&self`; the internal lock is
/// never held across an await point, so a single instance can be shared
/// between tasks behind an `Arc`.
pub struct ApiCache<V> {
    state: Mutex<CacheState<V>>,
    max_entries: usize,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ApiCache<V> {
    /// Create a cache holding at most `max_entries` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self::with_clock(max_entries, default_ttl, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(max_entries: usize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { state: Mutex::new(CacheState::new()), max_entries: max_entries.max(1), default_ttl, clock }
    }

    fn state(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite `key`, expiring after `ttl` (or the default TTL).
    ///
    /// The entry becomes the most recently used. If the cache is then over
    /// capacity, exactly one other entry, the least recently used, is evicted.
    /// A zero TTL stores an entry that is already stale.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at = self.clock.now().checked_add(ttl);

        let mut state = self.state();
        state.insert(key.clone(), value, expires_at);

        if state.entries.len() > self.max_entries
            && let Some(evicted) = state.evict_lru(&key)
        {
            tracing::debug!(key = %evicted, "evicted least recently used cache entry");
        }
    }

    /// Look up a live entry and mark it most recently used.
    ///
    /// Returns `None` for missing or expired keys; expired entries are
    /// deleted on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.state();

        if state.entries.get(key)?.is_expired(now) {
            state.remove(key);
            tracing::debug!(key, "cache entry expired");
            return None;
        }

        state.promote(key);
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Check for a live entry without changing recency.
    ///
    /// Expired entries report `false` and are deleted.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state();

        match state.entries.get(key).map(|entry| entry.is_expired(now)) {
            Some(false) => true,
            Some(true) => {
                state.remove(key);
                false
            }
            None => false,
        }
    }

    /// Remove `key` if present. Returns whether an entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.state().remove(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.state().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { size: self.state().entries.len(), max_entries: self.max_entries }
    }

    /// Sweep all expired entries. Returns the number removed.
    ///
    /// Reads and writes never sweep; call this when the capacity taken by
    /// stale entries matters.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state();

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }

        expired.len()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl<V> fmt::Debug for ApiCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.state.lock().unwrap_or_else(PoisonError::into_inner).entries.len();
        f.debug_struct("ApiCache")
            .field("size", &size)
            .field("max_entries", &self.max_entries)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
