//! Request cache keyed by [`QueryKey`].
//!
//! Entries are fresh for `stale_time` after they were stored. A stale or
//! invalidated entry is still returned so callers can show it while a
//! refetch runs. Every store sweeps out entries unused for `gc_time`.

pub mod key;
pub mod store;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

pub use key::{KeyScope, QueryKey};
pub use store::{CacheStats, Cacheable};

use store::MemoryStore;

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    /// Usable without a refetch.
    Fresh(Arc<T>),
    /// Present but due for a refetch.
    Stale(Arc<T>),
    Miss,
}

impl<T> Lookup<T> {
    /// The cached value, fresh or not.
    pub fn value(&self) -> Option<&Arc<T>> {
        match self {
            Self::Fresh(value) | Self::Stale(value) => Some(value),
            Self::Miss => None,
        }
    }
}

/// The shared request cache.
#[derive(Debug)]
pub struct QueryCache {
    enabled: bool,
    stale_time: Duration,
    gc_time: Duration,
    store: Mutex<MemoryStore>,
}

impl QueryCache {
    /// Create a cache with the given freshness and idle windows.
    pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            enabled: true,
            stale_time,
            gc_time,
            store: Mutex::new(MemoryStore::new()),
        }
    }

    /// A cache that never returns hits. Generations are still tracked so
    /// obsolete fetches are detected.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            stale_time: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Look up `key`, classifying the entry as fresh or stale.
    pub fn lookup<T: Cacheable>(&self, key: &QueryKey) -> Lookup<T> {
        if !self.enabled {
            return Lookup::Miss;
        }
        let Some(hit) = self.lock().get(key, Instant::now()) else {
            return Lookup::Miss;
        };
        let Some(value) = T::from_cached(&hit.value) else {
            return Lookup::Miss;
        };
        if hit.invalidated || hit.age >= self.stale_time {
            Lookup::Stale(value)
        } else {
            Lookup::Fresh(value)
        }
    }

    /// Cached value regardless of freshness.
    pub fn peek<T: Cacheable>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.lookup(key).value().cloned()
    }

    /// Current generation of `key`. Capture before fetching.
    pub fn generation(&self, key: &QueryKey) -> u64 {
        self.lock().generation(key, Instant::now())
    }

    /// Store a fetched value unless `key` changed since `generation` was
    /// captured. Returns `false` when the result was discarded.
    pub fn store_if_current<T: Cacheable>(
        &self,
        key: &QueryKey,
        generation: u64,
        value: Arc<T>,
    ) -> bool {
        let now = Instant::now();
        let mut store = self.lock();
        if store.generation(key, now) != generation {
            tracing::debug!(key = %key, "discarding obsolete response");
            return false;
        }
        if self.enabled {
            store.put(key, T::into_cached(value), now);
        }
        self.sweep(&mut store, now);
        true
    }

    /// Write a value directly, obsoleting any fetch in progress for `key`.
    pub fn set<T: Cacheable>(&self, key: QueryKey, value: Arc<T>) {
        let now = Instant::now();
        let mut store = self.lock();
        store.bump(&key, now);
        if self.enabled {
            store.put(&key, T::into_cached(value), now);
        }
        self.sweep(&mut store, now);
    }

    /// Mark every entry under `scope` for refetch.
    pub fn invalidate(&self, scope: &KeyScope) -> usize {
        let count = self.lock().invalidate(scope, Instant::now());
        tracing::debug!(?scope, count, "invalidated cache entries");
        count
    }

    /// Drop every entry under `scope`.
    pub fn remove(&self, scope: &KeyScope) -> usize {
        self.lock().remove(scope)
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats(Instant::now(), self.stale_time)
    }

    fn sweep(&self, store: &mut MemoryStore, now: Instant) {
        let evicted = store.evict_idle(now, self.gc_time);
        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle cache entries");
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStore> {
        // The store holds no invariants a panicking holder could break.
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(crate::config::DEFAULT_STALE_SECS),
            Duration::from_secs(crate::config::DEFAULT_GC_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchParams, UserList};

    fn page(total: u64) -> Arc<UserList> {
        Arc::new(UserList {
            users: vec![],
            total,
            page: 1,
            limit: 10,
        })
    }

    fn key() -> QueryKey {
        QueryKey::user_list(&SearchParams::default())
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_then_stale_after_stale_time() {
        let cache = QueryCache::new(Duration::from_secs(300), Duration::from_secs(600));
        let generation = cache.generation(&key());
        assert!(cache.store_if_current(&key(), generation, page(5)));

        assert!(matches!(cache.lookup::<UserList>(&key()), Lookup::Fresh(_)));
        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(matches!(cache.lookup::<UserList>(&key()), Lookup::Stale(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidated_entry_is_stale_but_kept() {
        let cache = QueryCache::default();
        cache.set(key(), page(5));
        cache.invalidate(&KeyScope::UserLists);

        match cache.lookup::<UserList>(&key()) {
            Lookup::Stale(list) => assert_eq!(list.total, 5),
            other => panic!("expected stale entry, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn obsolete_fetch_is_discarded() {
        let cache = QueryCache::default();
        let generation = cache.generation(&key());
        cache.invalidate(&KeyScope::Users);

        assert!(!cache.store_if_current(&key(), generation, page(5)));
        assert!(matches!(cache.lookup::<UserList>(&key()), Lookup::Miss));
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_type_is_a_miss() {
        let cache = QueryCache::default();
        cache.set(key(), page(5));
        assert!(matches!(
            cache.lookup::<crate::models::User>(&key()),
            Lookup::Miss
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn storing_sweeps_out_idle_entries() {
        let cache = QueryCache::new(Duration::from_secs(1), Duration::from_secs(10));
        cache.set(key(), page(5));
        tokio::time::advance(Duration::from_secs(11)).await;

        let other = QueryKey::user_detail("1");
        let generation = cache.generation(&other);
        assert!(cache.store_if_current(&other, generation, page(1)));
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.tracked, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn removal_obsoletes_fetch_in_progress() {
        let cache = QueryCache::default();
        let detail = QueryKey::user_detail("3");
        let generation = cache.generation(&detail);
        cache.remove(&KeyScope::UserDetail("3".into()));

        assert!(!cache.store_if_current(&detail, generation, page(1)));
        assert!(matches!(cache.lookup::<UserList>(&detail), Lookup::Miss));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_cache_never_hits() {
        let cache = QueryCache::disabled();
        cache.set(key(), page(5));
        assert!(matches!(cache.lookup::<UserList>(&key()), Lookup::Miss));
        assert_eq!(cache.stats().entries, 0);
    }
}
