//! Size-bounded keyed store with oldest-touch eviction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

#[derive(Clone, Debug)]
struct Slot<V> {
    value: V,
    written_at: DateTime<Utc>,
    /// Last read or write.
    touched_at: DateTime<Utc>,
}

/// Map with a hard entry limit.
///
/// On overflow the entry with the oldest access/update time is removed. The
/// victim is found by a full scan, so a store of a few thousand entries pays
/// one pass per overflowing insert.
#[derive(Debug)]
pub struct BoundedStore<V> {
    entries: HashMap<String, Slot<V>>,
    max_entries: usize,
}

impl<V: Clone> BoundedStore<V> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read an entry and bump its access time.
    ///
    /// Returns the value and when it was written.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<(V, DateTime<Utc>)> {
        self.entries.get_mut(key).map(|slot| {
            slot.touched_at = now;
            (slot.value.clone(), slot.written_at)
        })
    }

    /// Read without counting as an access.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Insert or replace. Returns the key evicted to make room, if any.
    pub fn insert(&mut self, key: String, value: V, now: DateTime<Utc>) -> Option<String> {
        if self.max_entries == 0 {
            return None;
        }

        let mut evicted = None;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            evicted = self.oldest_key();
            if let Some(victim) = &evicted {
                self.entries.remove(victim);
            }
        }

        self.entries.insert(
            key,
            Slot {
                value,
                written_at: now,
                touched_at: now,
            },
        );
        evicted
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry for which `expired(value, written_at)` holds.
    /// Returns how many were removed.
    pub fn remove_expired<F>(&mut self, mut expired: F) -> usize
    where
        F: FnMut(&V, DateTime<Utc>) -> bool,
    {
        let before = self.entries.len();
        self.entries
            .retain(|_, slot| !expired(&slot.value, slot.written_at));
        before - self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|slot| &slot.value)
    }

    /// Entry with the oldest touch; ties go to the smallest key so the choice
    /// doesn't depend on hash order.
    fn oldest_key(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by(|(ka, a), (kb, b)| a.touched_at.cmp(&b.touched_at).then_with(|| ka.cmp(kb)))
            .map(|(key, _)| key.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_evicts_oldest_touch() {
        let t0 = Utc::now();
        let mut store = BoundedStore::new(2);
        store.insert("A".to_string(), 1, t0);
        store.insert("B".to_string(), 2, t0 + Duration::seconds(1));

        // Reading A makes B the oldest
        assert_eq!(store.get("A", t0 + Duration::seconds(2)).map(|(v, _)| v), Some(1));

        let evicted = store.insert("C".to_string(), 3, t0 + Duration::seconds(3));
        assert_eq!(evicted.as_deref(), Some("B"));
        assert_eq!(store.len(), 2);
        assert!(store.peek("A").is_some());
        assert!(store.peek("B").is_none());
    }

    #[test]
    fn test_replace_does_not_evict() {
        let t0 = Utc::now();
        let mut store = BoundedStore::new(2);
        store.insert("A".to_string(), 1, t0);
        store.insert("B".to_string(), 2, t0);

        assert_eq!(store.insert("A".to_string(), 10, t0 + Duration::seconds(1)), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.peek("A"), Some(&10));
    }

    #[test]
    fn test_get_keeps_written_at() {
        let t0 = Utc::now();
        let mut store = BoundedStore::new(4);
        store.insert("A".to_string(), 1, t0);
        let (_, written) = store.get("A", t0 + Duration::seconds(30)).unwrap();
        assert_eq!(written, t0);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut store = BoundedStore::new(0);
        assert_eq!(store.insert("A".to_string(), 1, Utc::now()), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_expired() {
        let t0 = Utc::now();
        let mut store = BoundedStore::new(8);
        store.insert("OLD".to_string(), 1, t0);
        store.insert("NEW".to_string(), 2, t0 + Duration::seconds(90));

        let cutoff = t0 + Duration::seconds(60);
        assert_eq!(store.remove_expired(|_, written| written <= cutoff), 1);
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["NEW"]);
    }
}
