//! Bounded-TTL caches.
//!
//! Caches are explicit objects owned by the component that uses them. They
//! are read-mostly: two callers racing on a miss may both fetch, and the last
//! insert wins. Readers always see a whole value.
//!
//! Keyed caches sit on `moka` so the entry count is capped; keys come from
//! request input (hosts, section names, scoping keys). Freshness is judged
//! against `tokio::time::Instant` so tests can pause the clock.

use std::hash::Hash;
use std::time::Duration;

use moka::sync::Cache;
use parking_lot::RwLock;
use tokio::time::Instant;

#[derive(Clone)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> Entry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Keyed cache where every entry expires on its own. Holds at most
/// `capacity` entries; past that, the least valuable ones are evicted.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Cache<K, Entry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let mut builder = Cache::builder().max_capacity(capacity);
        if !ttl.is_zero() {
            builder = builder.time_to_live(ttl);
        }
        Self {
            ttl,
            entries: builder.build(),
        }
    }

    /// The cached value, if present and younger than the TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|e| e.is_fresh(self.ttl))
            .map(|e| e.value)
    }

    pub fn insert(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Entry count after pending evictions have been applied.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single cached value that stays readable after it goes stale, so callers
/// can fall back to the last-known-good copy when a refresh fails.
pub struct TtlCell<V> {
    ttl: Duration,
    slot: RwLock<Option<Entry<V>>>,
}

impl<V: Clone> TtlCell<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn get_fresh(&self) -> Option<V> {
        self.slot
            .read()
            .as_ref()
            .filter(|e| e.is_fresh(self.ttl))
            .map(|e| e.value.clone())
    }

    /// Whatever was stored last, fresh or not.
    pub fn get_stale(&self) -> Option<V> {
        self.slot.read().as_ref().map(|e| e.value.clone())
    }

    pub fn set(&self, value: V) {
        *self.slot.write() = Some(Entry {
            value,
            stored_at: Instant::now(),
        });
    }

    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_independently() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60), 100);
        cache.insert("hero", 1);
        tokio::time::advance(Duration::from_secs(40)).await;
        cache.insert("footer", 2);
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(cache.get(&"hero"), None);
        assert_eq!(cache.get(&"footer"), Some(2));
    }

    #[test]
    fn distinct_keys_do_not_grow_past_capacity() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60), 64);
        for i in 0..5_000 {
            cache.insert(format!("junk-{i}.example"), i);
        }
        assert!(cache.len() <= 64);
    }

    #[tokio::test(start_paused = true)]
    async fn cell_keeps_stale_value() {
        let cell = TtlCell::new(Duration::from_secs(10));
        cell.set(vec!["acme"]);
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cell.get_fresh(), None);
        assert_eq!(cell.get_stale(), Some(vec!["acme"]));
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache: TtlCache<u8, u8> = TtlCache::new(Duration::ZERO, 16);
        cache.insert(1, 1);
        assert!(cache.is_empty());
    }
}
