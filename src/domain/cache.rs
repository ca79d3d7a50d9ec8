//! Time-to-live memoization with an injectable clock.
//!
//! Entries older than the TTL are treated as absent and silently recomputed by
//! the next caller; nothing invalidates them explicitly. The clock is a trait
//! object so tests can step time by hand instead of sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

struct Entry<V> {
    stored_at: Instant,
    value: V,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_fresh(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if self.is_fresh(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let stored_at = self.clock.now();
        self.lock().insert(key, Entry { stored_at, value });
    }

    /// Return the fresh cached value or compute, store and return a new one.
    /// Errors are passed through and never cached. Storing a new value also
    /// evicts every expired entry. The lock is not held while `compute` runs,
    /// so two callers racing on the same key may both compute.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.purge_expired();
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.stored_at) < ttl);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn cache_with_clock(ttl_secs: u64) -> (TtlCache<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn hit_within_ttl() {
        let (cache, clock) = cache_with_clock(60);
        cache.insert("INFY".into(), 7);
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(&"INFY".to_string()), Some(7));
    }

    #[test]
    fn expires_at_ttl() {
        let (cache, clock) = cache_with_clock(60);
        cache.insert("INFY".into(), 7);
        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get(&"INFY".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_entry_is_recomputed() {
        let (cache, clock) = cache_with_clock(10);
        let calls = Cell::new(0);
        let compute = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };

        assert_eq!(cache.get_or_try_insert_with("K".into(), compute), Ok(1));
        assert_eq!(cache.get_or_try_insert_with("K".into(), compute), Ok(1));
        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.get_or_try_insert_with("K".into(), compute), Ok(2));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let (cache, _clock) = cache_with_clock(10);
        let failed: Result<u32, &str> = cache.get_or_try_insert_with("K".into(), || Err("boom"));
        assert_eq!(failed, Err("boom"));
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_drops_only_expired() {
        let (cache, clock) = cache_with_clock(10);
        cache.insert("old".into(), 1);
        clock.advance(Duration::from_secs(6));
        cache.insert("new".into(), 2);
        clock.advance(Duration::from_secs(5));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"new".to_string()), Some(2));
    }

    #[test]
    fn computing_a_new_key_evicts_stale_ones() {
        let (cache, clock) = cache_with_clock(10);
        cache.insert("A".into(), 1);
        cache.insert("B".into(), 2);
        clock.advance(Duration::from_secs(10));

        let fresh: Result<u32, ()> = cache.get_or_try_insert_with("C".into(), || Ok(3));
        assert_eq!(fresh, Ok(3));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"C".to_string()), Some(3));
    }

    #[test]
    fn zero_ttl_never_hits() {
        let (cache, _clock) = cache_with_clock(0);
        cache.insert("K".into(), 1);
        assert_eq!(cache.get(&"K".to_string()), None);
    }
}
