//! Bounded, thread-safe memo cache shared by the filter compiler and the
//! type introspector.
//!
//! Keys live in an [`LruCache`] of per-key slots. Concurrent callers asking
//! for the same missing key wait on that key's slot while the first one
//! computes, so a value is computed once. Past the size bound the least
//! recently used settled slot is evicted; slots still being computed are
//! skipped. Entries expire lazily when read.

use std::{
    hash::Hash,
    sync::Arc,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::CacheSpec;

/// Counters describing cache use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

struct Entry<V> {
    value: Arc<V>,
    written: Instant,
    accessed: Instant,
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

pub struct Cache<K: Hash + Eq, V> {
    name: &'static str,
    spec: CacheSpec,
    slots: Mutex<LruCache<K, Slot<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(name: &'static str, spec: CacheSpec) -> Self {
        // The bound is enforced on insert so in-flight slots are never evicted
        let slots = LruCache::unbounded();
        Cache {
            name,
            spec,
            slots: Mutex::new(slots),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn spec(&self) -> &CacheSpec {
        &self.spec
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        let written_out = self
            .spec
            .expire_after_write
            .is_some_and(|ttl| now.duration_since(entry.written) >= ttl);
        let idle_out = self
            .spec
            .expire_after_access
            .is_some_and(|idle| now.duration_since(entry.accessed) >= idle);

        written_out || idle_out
    }

    /// Live value in `entry`, marking it accessed
    fn read(&self, entry: &mut Option<Entry<V>>, now: Instant) -> Option<Arc<V>> {
        match entry {
            Some(e) if !self.is_expired(e, now) => {
                e.accessed = now;
                Some(e.value.clone())
            }
            Some(_) => {
                debug!(cache = self.name, "entry expired");
                *entry = None;
                None
            }
            None => None,
        }
    }

    /// Cached value for `key`, if present and not expired
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slot = self.slots.lock().get(key).cloned();
        let value = match slot {
            Some(slot) => {
                let mut entry = slot.lock();
                self.read(&mut entry, Instant::now())
            }
            None => None,
        };

        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    /// Return the cached value for `key`, computing it with `compute` when
    /// missing or expired. A failed computation caches nothing.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if self.spec.maximum_size == Some(0) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return compute().map(Arc::new);
        }

        let slot = {
            let mut slots = self.slots.lock();
            match slots.get(&key) {
                Some(slot) => slot.clone(),
                None => {
                    let slot = Slot::default();
                    slots.put(key.clone(), slot.clone());
                    slot
                }
            }
        };

        let mut guard = slot.lock();
        let now = Instant::now();

        if let Some(value) = self.read(&mut guard, now) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(cache = self.name, "hit");
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, "miss");

        match compute() {
            Ok(value) => {
                let value = Arc::new(value);
                *guard = Some(Entry {
                    value: value.clone(),
                    written: now,
                    accessed: now,
                });
                drop(guard);

                self.evict_over_capacity(&key);
                Ok(value)
            }
            Err(e) => {
                drop(guard);
                self.discard_empty(&key, &slot);
                Err(e)
            }
        }
    }

    fn evict_over_capacity(&self, keep: &K) {
        let Some(max) = self.spec.maximum_size else {
            return;
        };

        let mut slots = self.slots.lock();

        while slots.len() > max {
            // Least recently used first; a locked slot is still computing
            let victim = slots
                .iter()
                .rev()
                .find(|(k, slot)| *k != keep && slot.try_lock().is_some_and(|entry| entry.is_some()))
                .map(|(k, _)| k.clone());

            let Some(k) = victim else {
                break;
            };
            slots.pop(&k);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(cache = self.name, size = slots.len(), "evicted entry");
        }
    }

    fn discard_empty(&self, key: &K, slot: &Slot<V>) {
        let mut slots = self.slots.lock();

        let is_same = slots.peek(key).is_some_and(|current| Arc::ptr_eq(current, slot));
        // A slot busy with another computation is left alone
        if is_same && slot.try_lock().is_some_and(|entry| entry.is_none()) {
            slots.pop(key);
        }
    }

    pub fn invalidate(&self, key: &K) {
        self.slots.lock().pop(key);
    }

    pub fn invalidate_all(&self) {
        self.slots.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{Barrier, atomic::AtomicUsize, mpsc},
        thread,
        time::Duration,
    };

    fn ok(n: i32) -> Result<i32, ()> {
        Ok(n)
    }

    #[test]
    fn test_hit_after_miss() {
        let cache: Cache<String, i32> = Cache::new("test", CacheSpec::unbounded());

        assert_eq!(*cache.get_or_try_insert_with("a".into(), || ok(1)).unwrap(), 1);
        assert_eq!(*cache.get_or_try_insert_with("a".into(), || ok(2)).unwrap(), 1);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    }

    #[test]
    fn test_get_counts_misses() {
        let cache: Cache<&str, i32> = Cache::new("test", CacheSpec::unbounded());

        assert!(cache.get(&"a").is_none());
        cache.get_or_try_insert_with("a", || ok(1)).unwrap();
        assert_eq!(cache.get(&"a").as_deref(), Some(&1));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 2));
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache: Cache<&str, i32> = Cache::new("test", CacheSpec::unbounded().with_maximum_size(2));

        cache.get_or_try_insert_with("a", || ok(1)).unwrap();
        cache.get_or_try_insert_with("b", || ok(2)).unwrap();
        cache.get(&"a");
        cache.get_or_try_insert_with("c", || ok(3)).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"a").is_some());
        assert!(cache.get(&"b").is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_zero_size_keeps_nothing() {
        let cache: Cache<&str, i32> = Cache::new("test", CacheSpec::unbounded().with_maximum_size(0));

        cache.get_or_try_insert_with("a", || ok(1)).unwrap();
        assert_eq!(*cache.get_or_try_insert_with("a", || ok(2)).unwrap(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_recomputed() {
        let cache: Cache<&str, i32> =
            Cache::new("test", CacheSpec::unbounded().with_expire_after_write(Duration::ZERO));

        cache.get_or_try_insert_with("a", || ok(1)).unwrap();
        let value = cache.get_or_try_insert_with("a", || ok(2)).unwrap();
        assert_eq!(*value, 2);
    }

    #[test]
    fn test_failure_caches_nothing() {
        let cache: Cache<&str, i32> = Cache::new("test", CacheSpec::unbounded());

        let result = cache.get_or_try_insert_with("a", || Err::<i32, _>("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_callers_compute_once() {
        let cache: Arc<Cache<&str, usize>> = Arc::new(Cache::new("test", CacheSpec::unbounded()));
        let computed = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let computed = computed.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let value = cache
                        .get_or_try_insert_with("key", || {
                            computed.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok::<_, ()>(7)
                        })
                        .unwrap();
                    *value
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_in_flight_slot_survives_eviction() {
        let cache: Arc<Cache<&str, i32>> =
            Arc::new(Cache::new("test", CacheSpec::unbounded().with_maximum_size(1)));
        let computed = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let slow = {
            let cache = cache.clone();
            let computed = computed.clone();
            thread::spawn(move || {
                cache
                    .get_or_try_insert_with("slow", || {
                        computed.fetch_add(1, Ordering::SeqCst);
                        started_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        ok(1)
                    })
                    .unwrap();
            })
        };

        started_rx.recv().unwrap();
        cache.get_or_try_insert_with("fast", || ok(2)).unwrap();
        release_tx.send(()).unwrap();
        slow.join().unwrap();

        // "slow" was computing when "fast" pushed the cache over its bound
        let value = cache
            .get_or_try_insert_with("slow", || {
                computed.fetch_add(1, Ordering::SeqCst);
                ok(3)
            })
            .unwrap();
        assert_eq!(*value, 1);
        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }
}
