//! In-memory overlay above [`KeyValueStore`](crate::storage::kv::KeyValueStore)
//! (§4.1 bullet 2). Tracks per-key dirtiness so a flush only touches what
//! actually changed, and preserves insertion order so a flush's batch write
//! is reproducible across runs given the same sequence of mutations.

use std::collections::HashMap;
use std::hash::Hash as StdHash;

use crate::storage::kv::{KeyValueStore, WriteBatch};
use crate::storage::columns::Column;
use crate::error::Result;

/// State of one cached key relative to what's on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry<V> {
    /// Mirrors the on-disk value unchanged.
    Cached(V),
    /// Overwrites the on-disk value once flushed.
    Modified(V),
    /// Deletes the on-disk value once flushed.
    Removed,
}

impl<V> CacheEntry<V> {
    fn value(&self) -> Option<&V> {
        match self {
            CacheEntry::Cached(v) | CacheEntry::Modified(v) => Some(v),
            CacheEntry::Removed => None,
        }
    }

    fn is_dirty(&self) -> bool {
        !matches!(self, CacheEntry::Cached(_))
    }
}

/// A write-through-capable cache keyed by `K`, with values round-tripped to
/// bytes by the caller. `K` is kept in insertion order in `order` so
/// `persist` applies mutations in the order the caller made them.
pub struct Cache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    order: Vec<K>,
}

impl<K: StdHash + Eq + Clone, V: Clone> Default for Cache<K, V> {
    fn default() -> Self {
        Cache { entries: HashMap::new(), order: Vec::new() }
    }
}

impl<K: StdHash + Eq + Clone, V: Clone> Cache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch_order(&mut self, key: &K) {
        if !self.order.iter().any(|k| k == key) {
            self.order.push(key.clone());
        }
    }

    /// Seeds the cache with a value loaded from disk; does not mark it dirty.
    pub fn load(&mut self, key: K, value: V) {
        self.touch_order(&key);
        self.entries.insert(key, CacheEntry::Cached(value));
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).and_then(CacheEntry::value)
    }

    pub fn put(&mut self, key: K, value: V) {
        self.touch_order(&key);
        self.entries.insert(key, CacheEntry::Modified(value));
    }

    /// Marks `key` for deletion. A no-op against a key the cache never saw
    /// loaded or written still records the tombstone so `persist` propagates it.
    pub fn remove(&mut self, key: K) {
        self.touch_order(&key);
        self.entries.insert(key, CacheEntry::Removed);
    }

    pub fn contains(&self, key: &K) -> bool {
        matches!(self.entries.get(key), Some(CacheEntry::Cached(_)) | Some(CacheEntry::Modified(_)))
    }

    /// Every dirty entry (`Modified`/`Removed`), in insertion order.
    pub fn dirty_entries(&self) -> impl Iterator<Item = (&K, &CacheEntry<V>)> {
        self.order.iter().filter_map(move |k| {
            let entry = self.entries.get(k)?;
            entry.is_dirty().then_some((k, entry))
        })
    }

    /// Every key with a live value (`Cached`/`Modified`, not `Removed`),
    /// regardless of dirtiness. Used to compute a full commitment over the
    /// cache's current contents rather than just what changed.
    pub fn iter_live(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().filter_map(move |k| self.entries.get(k).and_then(|e| e.value().map(|v| (k, v))))
    }

    /// Flushes dirty entries into `store` under `column` via a single atomic
    /// batch, then marks them `Cached`. `encode`/`key_bytes` convert `V`/`K`
    /// to their on-disk byte form.
    pub fn persist(
        &mut self,
        store: &KeyValueStore,
        column: Column,
        key_bytes: impl Fn(&K) -> Vec<u8>,
        encode: impl Fn(&V) -> Result<Vec<u8>>,
    ) -> Result<()> {
        let mut batch = WriteBatch::new();
        let dirty_keys: Vec<K> = self.order.iter().filter(|k| self.entries.get(*k).is_some_and(CacheEntry::is_dirty)).cloned().collect();
        for key in &dirty_keys {
            match self.entries.get(key).expect("dirty key present") {
                CacheEntry::Modified(v) => batch.put(column, key_bytes(key), encode(v)?),
                CacheEntry::Removed => batch.delete(column, key_bytes(key)),
                CacheEntry::Cached(_) => unreachable!("filtered by is_dirty"),
            }
        }
        if batch.is_empty() {
            return Ok(());
        }
        store.write_batch(batch)?;
        for key in dirty_keys {
            match self.entries.remove(&key) {
                Some(CacheEntry::Modified(v)) => {
                    self.entries.insert(key, CacheEntry::Cached(v));
                }
                Some(CacheEntry::Removed) | None => {
                    self.order.retain(|k| k != &key);
                }
                Some(CacheEntry::Cached(_)) => unreachable!(),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_modified_value() {
        let mut cache: Cache<u32, String> = Cache::new();
        cache.put(1, "a".to_string());
        assert_eq!(cache.get(&1), Some(&"a".to_string()));
    }

    #[test]
    fn remove_hides_value_but_keeps_tombstone() {
        let mut cache: Cache<u32, String> = Cache::new();
        cache.load(1, "a".to_string());
        cache.remove(1);
        assert_eq!(cache.get(&1), None);
        assert!(cache.dirty_entries().any(|(k, e)| *k == 1 && matches!(e, CacheEntry::Removed)));
    }

    #[test]
    fn cached_entries_are_not_dirty() {
        let mut cache: Cache<u32, String> = Cache::new();
        cache.load(1, "a".to_string());
        assert_eq!(cache.dirty_entries().count(), 0);
    }

    #[test]
    fn dirty_entries_preserve_insertion_order() {
        let mut cache: Cache<u32, String> = Cache::new();
        cache.put(3, "c".to_string());
        cache.put(1, "a".to_string());
        cache.put(2, "b".to_string());
        let keys: Vec<u32> = cache.dirty_entries().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![3, 1, 2]);
    }
}
