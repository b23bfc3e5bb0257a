//! In-memory entry store behind [`super::QueryCache`].
//!
//! Pure bookkeeping: every method takes the current instant explicitly so
//! freshness and eviction can be tested without a clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::{User, UserList};

use super::key::{KeyScope, QueryKey};

/// A cached response body.
#[derive(Debug, Clone)]
pub enum CachedValue {
    UserList(Arc<UserList>),
    User(Arc<User>),
}

/// Types that can live in the cache.
pub trait Cacheable: Sized {
    fn into_cached(value: Arc<Self>) -> CachedValue;
    fn from_cached(value: &CachedValue) -> Option<Arc<Self>>;
}

impl Cacheable for UserList {
    fn into_cached(value: Arc<Self>) -> CachedValue {
        CachedValue::UserList(value)
    }

    fn from_cached(value: &CachedValue) -> Option<Arc<Self>> {
        match value {
            CachedValue::UserList(list) => Some(Arc::clone(list)),
            CachedValue::User(_) => None,
        }
    }
}

impl Cacheable for User {
    fn into_cached(value: Arc<Self>) -> CachedValue {
        CachedValue::User(value)
    }

    fn from_cached(value: &CachedValue) -> Option<Arc<Self>> {
        match value {
            CachedValue::User(user) => Some(Arc::clone(user)),
            CachedValue::UserList(_) => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: CachedValue,
    updated_at: Instant,
    last_access: Instant,
    invalidated: bool,
}

/// Everything known about one key: its entry, if any, and its generation.
#[derive(Debug)]
struct Slot {
    key: QueryKey,
    entry: Option<Entry>,
    generation: u64,
    touched: Instant,
}

/// A hit returned by [`MemoryStore::get`].
#[derive(Debug, Clone)]
pub struct Hit {
    pub value: CachedValue,
    pub age: Duration,
    pub invalidated: bool,
}

/// Slots addressed by [`QueryKey::digest`].
///
/// A key's generation changes whenever its entry is invalidated or
/// overwritten directly, and is forgotten when the slot is dropped.
/// Generations are drawn from one store-wide counter and never reused, so
/// a fetch that captured a generation may store its result only if the
/// slot still carries that exact number.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: HashMap<String, Slot>,
    next_generation: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry and mark it as used.
    pub fn get(&mut self, key: &QueryKey, now: Instant) -> Option<Hit> {
        let entry = self.slots.get_mut(&key.digest())?.entry.as_mut()?;
        entry.last_access = now;
        Some(Hit {
            value: entry.value.clone(),
            age: now.saturating_duration_since(entry.updated_at),
            invalidated: entry.invalidated,
        })
    }

    /// Insert or replace an entry.
    pub fn put(&mut self, key: &QueryKey, value: CachedValue, now: Instant) {
        let slot = self.slot_mut(key, now);
        slot.entry = Some(Entry {
            value,
            updated_at: now,
            last_access: now,
            invalidated: false,
        });
    }

    /// Current generation of `key`, registering the key if it is unknown.
    pub fn generation(&mut self, key: &QueryKey, now: Instant) -> u64 {
        let slot = self.slot_mut(key, now);
        slot.touched = now;
        slot.generation
    }

    /// Give `key` a new generation.
    pub fn bump(&mut self, key: &QueryKey, now: Instant) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let slot = self.slot_mut(key, now);
        slot.generation = generation;
        slot.touched = now;
    }

    /// Mark every entry under `scope` as needing a refetch and obsolete
    /// fetches in progress for any known key under it.
    pub fn invalidate(&mut self, scope: &KeyScope, now: Instant) -> usize {
        let mut count = 0;
        for slot in self.slots.values_mut().filter(|s| scope.contains(&s.key)) {
            if let Some(entry) = slot.entry.as_mut() {
                entry.invalidated = true;
                count += 1;
            }
            self.next_generation += 1;
            slot.generation = self.next_generation;
            slot.touched = now;
        }
        count
    }

    /// Drop every slot under `scope`, entry and generation alike.
    pub fn remove(&mut self, scope: &KeyScope) -> usize {
        let mut count = 0;
        self.slots.retain(|_, slot| {
            let keep = !scope.contains(&slot.key);
            if !keep && slot.entry.is_some() {
                count += 1;
            }
            keep
        });
        count
    }

    /// Drop entries not used for longer than `max_idle`, then forget keys
    /// left without an entry whose generation nobody read in that window.
    pub fn evict_idle(&mut self, now: Instant, max_idle: Duration) -> usize {
        let mut evicted = 0;
        for slot in self.slots.values_mut() {
            let idle = slot
                .entry
                .as_ref()
                .is_some_and(|e| now.saturating_duration_since(e.last_access) > max_idle);
            if idle {
                slot.entry = None;
                evicted += 1;
            }
        }
        self.slots.retain(|_, slot| {
            slot.entry.is_some() || now.saturating_duration_since(slot.touched) <= max_idle
        });
        evicted
    }

    pub fn stats(&self, now: Instant, stale_time: Duration) -> CacheStats {
        let mut stats = CacheStats {
            tracked: self.slots.len(),
            ..Default::default()
        };
        for slot in self.slots.values() {
            let Some(ref entry) = slot.entry else {
                continue;
            };
            stats.entries += 1;
            match slot.key {
                QueryKey::UserList(_) => stats.lists += 1,
                QueryKey::UserDetail(_) => stats.details += 1,
            }
            if entry.invalidated || now.saturating_duration_since(entry.updated_at) >= stale_time {
                stats.stale += 1;
            }
        }
        stats
    }

    fn slot_mut(&mut self, key: &QueryKey, now: Instant) -> &mut Slot {
        let next_generation = &mut self.next_generation;
        self.slots.entry(key.digest()).or_insert_with(|| {
            *next_generation += 1;
            Slot {
                key: key.clone(),
                entry: None,
                generation: *next_generation,
                touched: now,
            }
        })
    }
}

/// Statistics about the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries.
    pub entries: usize,
    /// Entries holding list pages.
    pub lists: usize,
    /// Entries holding single users.
    pub details: usize,
    /// Entries that will be refetched on next use.
    pub stale: usize,
    /// Keys with an entry or a live generation.
    pub tracked: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchParams;

    fn list(total: u64) -> CachedValue {
        CachedValue::UserList(Arc::new(UserList {
            users: vec![],
            total,
            page: 1,
            limit: 10,
        }))
    }

    fn list_key(page: u32) -> QueryKey {
        QueryKey::user_list(&SearchParams {
            page,
            ..Default::default()
        })
    }

    #[test]
    fn roundtrip_entry() {
        let mut store = MemoryStore::new();
        let now = Instant::now();
        store.put(&list_key(1), list(5), now);

        let hit = store.get(&list_key(1), now + Duration::from_secs(3)).unwrap();
        assert_eq!(hit.age, Duration::from_secs(3));
        assert!(!hit.invalidated);
        assert!(UserList::from_cached(&hit.value).is_some());
        assert!(User::from_cached(&hit.value).is_none());
    }

    #[test]
    fn miss_on_unknown_key() {
        let mut store = MemoryStore::new();
        assert!(store.get(&list_key(1), Instant::now()).is_none());
    }

    #[test]
    fn generation_is_stable_until_bumped() {
        let mut store = MemoryStore::new();
        let now = Instant::now();
        let first = store.generation(&list_key(1), now);
        assert_eq!(store.generation(&list_key(1), now), first);
        assert_ne!(store.generation(&list_key(2), now), first);

        store.bump(&list_key(1), now);
        assert_ne!(store.generation(&list_key(1), now), first);
    }

    #[test]
    fn invalidate_marks_and_bumps() {
        let mut store = MemoryStore::new();
        let now = Instant::now();
        store.put(&list_key(1), list(5), now);
        store.put(&list_key(2), list(5), now);
        store.put(&QueryKey::user_detail("1"), list(0), now);
        let list_before = store.generation(&list_key(1), now);
        let detail_before = store.generation(&QueryKey::user_detail("1"), now);

        assert_eq!(store.invalidate(&KeyScope::UserLists, now), 2);
        assert!(store.get(&list_key(1), now).unwrap().invalidated);
        assert!(!store.get(&QueryKey::user_detail("1"), now).unwrap().invalidated);
        assert_ne!(store.generation(&list_key(1), now), list_before);
        assert_eq!(store.generation(&QueryKey::user_detail("1"), now), detail_before);
    }

    #[test]
    fn invalidate_reaches_keys_without_entries() {
        let mut store = MemoryStore::new();
        let now = Instant::now();
        let before = store.generation(&list_key(3), now);
        assert_eq!(store.invalidate(&KeyScope::Users, now), 0);
        assert_ne!(store.generation(&list_key(3), now), before);
    }

    #[test]
    fn removed_key_never_returns_an_old_generation() {
        let mut store = MemoryStore::new();
        let now = Instant::now();
        let detail = QueryKey::user_detail("9");
        let before = store.generation(&detail, now);
        assert_eq!(store.remove(&KeyScope::UserDetail("9".into())), 0);
        assert_ne!(store.generation(&detail, now), before);
    }

    #[test]
    fn put_clears_invalidated_flag() {
        let mut store = MemoryStore::new();
        let now = Instant::now();
        store.put(&list_key(1), list(5), now);
        store.invalidate(&KeyScope::Users, now);
        store.put(&list_key(1), list(4), now);
        assert!(!store.get(&list_key(1), now).unwrap().invalidated);
    }

    #[test]
    fn evicts_idle_entries_only() {
        let mut store = MemoryStore::new();
        let start = Instant::now();
        store.put(&list_key(1), list(5), start);
        store.put(&list_key(2), list(5), start);
        store.get(&list_key(2), start + Duration::from_secs(50));

        let evicted = store.evict_idle(start + Duration::from_secs(61), Duration::from_secs(60));
        assert_eq!(evicted, 1);
        assert!(store.get(&list_key(2), start + Duration::from_secs(61)).is_some());
    }

    #[test]
    fn eviction_forgets_unused_generations() {
        let mut store = MemoryStore::new();
        let start = Instant::now();
        store.put(&list_key(1), list(5), start);
        store.generation(&list_key(2), start);
        store.generation(&list_key(3), start + Duration::from_secs(30));

        let later = start + Duration::from_secs(61);
        store.evict_idle(later, Duration::from_secs(60));
        // page 3 was read within the window
        assert_eq!(store.stats(later, Duration::ZERO).tracked, 1);
    }

    #[test]
    fn stats_count_kinds_and_staleness() {
        let mut store = MemoryStore::new();
        let start = Instant::now();
        store.put(&list_key(1), list(5), start);
        store.put(&QueryKey::user_detail("1"), list(0), start + Duration::from_secs(10));
        store.generation(&list_key(2), start);

        let stats = store.stats(start + Duration::from_secs(12), Duration::from_secs(5));
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.lists, 1);
        assert_eq!(stats.details, 1);
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.tracked, 3);
    }
}
