//! Transient overlay atop a [`Cache`] (§4.1 bullet 3). Used while validating
//! a candidate block's state transition: reads fall through to the
//! underlying cache, writes stay local until `commit`, and `rollback`
//! discards them for free by dropping the `Staging` value.

use std::collections::HashMap;
use std::hash::Hash as StdHash;

use crate::storage::cache::Cache;

enum StagedEntry<V> {
    Put(V),
    Removed,
}

/// A scratch layer on top of a [`Cache`]: reads check the overlay first,
/// then fall through; writes never touch the underlying cache until
/// [`Staging::commit`].
pub struct Staging<'a, K, V> {
    base: &'a mut Cache<K, V>,
    overlay: HashMap<K, StagedEntry<V>>,
    order: Vec<K>,
}

impl<'a, K: StdHash + Eq + Clone, V: Clone> Staging<'a, K, V> {
    pub fn new(base: &'a mut Cache<K, V>) -> Self {
        Staging { base, overlay: HashMap::new(), order: Vec::new() }
    }

    fn touch_order(&mut self, key: &K) {
        if !self.order.iter().any(|k| k == key) {
            self.order.push(key.clone());
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match self.overlay.get(key) {
            Some(StagedEntry::Put(v)) => Some(v),
            Some(StagedEntry::Removed) => None,
            None => self.base.get(key),
        }
    }

    pub fn put(&mut self, key: K, value: V) {
        self.touch_order(&key);
        self.overlay.insert(key, StagedEntry::Put(value));
    }

    pub fn remove(&mut self, key: K) {
        self.touch_order(&key);
        self.overlay.insert(key, StagedEntry::Removed);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Applies every staged mutation into the underlying cache, in the
    /// order they were staged. After this call the `Staging` is spent;
    /// its overlay is drained, not merely copied.
    pub fn commit(mut self) {
        for key in std::mem::take(&mut self.order) {
            match self.overlay.remove(&key) {
                Some(StagedEntry::Put(v)) => self.base.put(key, v),
                Some(StagedEntry::Removed) => self.base.remove(key),
                None => {}
            }
        }
    }

    /// Discards every staged mutation, leaving the underlying cache untouched.
    pub fn rollback(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fall_through_to_base() {
        let mut base: Cache<u32, String> = Cache::new();
        base.load(1, "base".to_string());
        let staging = Staging::new(&mut base);
        assert_eq!(staging.get(&1), Some(&"base".to_string()));
    }

    #[test]
    fn staged_write_shadows_base_until_commit() {
        let mut base: Cache<u32, String> = Cache::new();
        base.load(1, "base".to_string());
        {
            let mut staging = Staging::new(&mut base);
            staging.put(1, "staged".to_string());
            assert_eq!(staging.get(&1), Some(&"staged".to_string()));
        }
        assert_eq!(base.get(&1), Some(&"base".to_string()));
    }

    #[test]
    fn commit_applies_staged_writes_to_base() {
        let mut base: Cache<u32, String> = Cache::new();
        {
            let mut staging = Staging::new(&mut base);
            staging.put(1, "staged".to_string());
            staging.commit();
        }
        assert_eq!(base.get(&1), Some(&"staged".to_string()));
    }

    #[test]
    fn rollback_discards_staged_removal() {
        let mut base: Cache<u32, String> = Cache::new();
        base.load(1, "base".to_string());
        {
            let mut staging = Staging::new(&mut base);
            staging.remove(1);
            staging.rollback();
        }
        assert_eq!(base.get(&1), Some(&"base".to_string()));
    }
}
