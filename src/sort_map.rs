//! SortMap: flat array of key/value pairs with an explicit sort step.
//!
//! Writes append or overwrite and leave the array unsorted; lookups binary
//! search and are only meaningful after `sort`. This suits tables that are
//! filled in one pass and then queried many times.

use crate::allocator::Allocator;
use crate::array::Array;
use crate::map::Entry;
use core::cmp::Ordering;
use core::fmt;

pub struct SortMap<'a, K: Ord + Copy, V: Copy> {
    data: Array<'a, Entry<K, V>>,
    sorted: bool,
}

impl<'a, K: Ord + Copy, V: Copy> SortMap<'a, K, V> {
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            data: Array::new(allocator),
            sorted: true,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether lookups are currently valid.
    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Overwrites the value of `key` if present, otherwise appends a pair.
    pub fn set(&mut self, key: K, value: V) {
        match self.position(&key) {
            Some(i) => self.data[i].value = value,
            None => {
                self.data.push(Entry { key, value });
                self.sorted = false;
            }
        }
    }

    /// Removes `key` by moving the last pair into its slot; absent keys are a
    /// no-op.
    pub fn remove(&mut self, key: &K) {
        if let Some(i) = self.position(key) {
            self.data.swap_remove(i);
            self.sorted = false;
        }
    }

    pub fn sort(&mut self) {
        self.data.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        self.sorted = true;
    }

    pub fn has(&self, key: &K) -> bool {
        self.search(key).is_ok()
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    pub fn get<'m>(&'m self, key: &K, default: &'m V) -> &'m V {
        match self.search(key) {
            Ok(i) => &self.data[i].value,
            Err(_) => default,
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.sorted = true;
    }

    /// Pairs in storage order, which is key order right after `sort`.
    pub fn iter(&self) -> core::slice::Iter<'_, Entry<K, V>> {
        self.data.iter()
    }

    fn search(&self, key: &K) -> Result<usize, usize> {
        debug_assert!(self.sorted, "SortMap queried before sort()");
        self.data.binary_search_by(|e| e.key.cmp(key))
    }

    // Writers may run on an unsorted map, so they fall back to a scan.
    fn position(&self, key: &K) -> Option<usize> {
        if self.sorted {
            self.data.binary_search_by(|e| e.key.cmp(key)).ok()
        } else {
            self.data.iter().position(|e| e.key.cmp(key) == Ordering::Equal)
        }
    }
}

impl<'a, K: Ord + Copy + fmt::Debug, V: Copy + fmt::Debug> fmt::Debug for SortMap<'a, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|e| (&e.key, &e.value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapAllocator;
    use crate::scope_arena::ScopeArena256;

    /// Invariant: after `sort`, iteration is in key order and lookups find every key.
    #[test]
    fn sort_then_lookup() {
        let heap = HeapAllocator::new();
        let mut m: SortMap<u32, char> = SortMap::new(&heap);
        for (k, v) in [(30, 'c'), (10, 'a'), (20, 'b'), (40, 'd')] {
            m.set(k, v);
        }
        assert!(!m.is_sorted());
        m.sort();
        assert!(m.is_sorted());
        assert!(m.iter().map(|e| e.key).eq([10, 20, 30, 40]));
        assert_eq!(*m.get(&20, &'?'), 'b');
        assert_eq!(*m.get(&25, &'?'), '?');
        assert!(m.has(&40));
        assert!(!m.has(&0));
    }

    /// Invariant: `set` on a present key overwrites rather than duplicating,
    /// both before and after sorting.
    #[test]
    fn set_overwrites_sorted_and_unsorted() {
        let heap = HeapAllocator::new();
        let mut m: SortMap<i8, i8> = SortMap::new(&heap);
        m.set(2, 0);
        m.set(1, 0);
        m.set(2, 5);
        assert_eq!(m.len(), 2);
        m.sort();
        m.set(1, 7);
        assert!(m.is_sorted(), "overwrite keeps order");
        assert_eq!(*m.get(&1, &0), 7);
        assert_eq!(*m.get(&2, &0), 5);
    }

    /// Invariant: `remove` drops the pair and requires a re-sort before lookups.
    #[test]
    fn remove_unsorts() {
        let heap = HeapAllocator::new();
        let arena = ScopeArena256::new(&heap);
        let mut m: SortMap<u8, u8> = SortMap::new(&arena);
        for k in 0..8 {
            m.set(k, k);
        }
        m.sort();
        m.remove(&0);
        m.remove(&100);
        assert!(!m.is_sorted());
        assert_eq!(m.len(), 7);
        m.sort();
        assert!(!m.has(&0));
        assert!((1..8).all(|k| m.has(&k)));
        m.clear();
        assert!(m.is_empty() && m.is_sorted());
    }

    /// Invariant: querying before `sort` is a contract violation caught in debug builds.
    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "before sort")]
    fn lookup_before_sort_panics() {
        let heap = HeapAllocator::new();
        let mut m: SortMap<u8, u8> = SortMap::new(&heap);
        m.set(1, 1);
        m.set(0, 0);
        let _ = m.has(&1);
    }
}
