//! Hash: chained hash table from `u64` keys to `Copy` values.
//!
//! Two arrays: `buckets` holds the index of the first entry of each chain,
//! `entries` holds every entry contiguously with an intrusive `next` index.
//! Removal swap-removes from `entries`, so the entry that was last is
//! relinked at its new position. Keys of other types are expected to be
//! hashed to a `u64` by the caller.

use crate::allocator::Allocator;
use crate::array::Array;
use core::fmt;

const END_OF_LIST: u32 = u32::MAX;
const MAX_LOAD_FACTOR: f32 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashEntry<T: Copy> {
    pub key: u64,
    next: u32,
    pub value: T,
}

#[derive(Clone, Copy, Debug)]
struct FindResult {
    bucket: usize,
    prev: u32,
    entry: u32,
}

pub struct Hash<'a, T: Copy> {
    buckets: Array<'a, u32>,
    entries: Array<'a, HashEntry<T>>,
}

impl<'a, T: Copy> Hash<'a, T> {
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            buckets: Array::new(allocator),
            entries: Array::new(allocator),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of buckets currently allocated.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn has(&self, key: u64) -> bool {
        self.find(key).entry != END_OF_LIST
    }

    /// Returns the value for `key`, or `default` when absent.
    pub fn get(&self, key: u64, default: T) -> T {
        self.get_ref(key).copied().unwrap_or(default)
    }

    pub fn get_ref(&self, key: u64) -> Option<&T> {
        let fr = self.find(key);
        (fr.entry != END_OF_LIST).then(|| &self.entries[fr.entry as usize].value)
    }

    /// Inserts or overwrites the value for `key`.
    pub fn set(&mut self, key: u64, value: T) {
        if self.buckets.is_empty() {
            self.grow();
        }
        let i = self.find_or_make(key, value);
        self.entries[i as usize].value = value;
        if self.is_full() {
            self.grow();
        }
    }

    /// Removes the first entry for `key`, if any.
    pub fn remove(&mut self, key: u64) -> Option<T> {
        let fr = self.find(key);
        if fr.entry == END_OF_LIST {
            return None;
        }
        Some(self.erase(fr))
    }

    /// Rehashes to `size` buckets.
    pub fn reserve(&mut self, size: usize) {
        self.rehash(size);
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
    }

    /// Entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> + '_ {
        self.entries.iter().map(|e| (e.key, &e.value))
    }

    // ---- multi-hash: several entries may share a key ----

    /// Adds an entry for `key` even if the key is already present.
    pub fn multi_insert(&mut self, key: u64, value: T) {
        if self.buckets.is_empty() {
            self.grow();
        }
        self.make(key, value);
        if self.is_full() {
            self.grow();
        }
    }

    /// All values stored under `key`, most recently inserted first.
    pub fn multi_iter(&self, key: u64) -> impl Iterator<Item = &T> + '_ {
        let mut e = self.find(key).entry;
        core::iter::from_fn(move || {
            while e != END_OF_LIST {
                let entry = &self.entries[e as usize];
                e = entry.next;
                if entry.key == key {
                    return Some(&entry.value);
                }
            }
            None
        })
    }

    /// Pushes every value stored under `key` onto `out`.
    pub fn multi_get(&self, key: u64, out: &mut Array<'_, T>) {
        for &v in self.multi_iter(key) {
            out.push(v);
        }
    }

    /// Number of entries stored under `key`.
    pub fn count(&self, key: u64) -> usize {
        self.multi_iter(key).count()
    }

    /// Removes every entry stored under `key`.
    pub fn remove_all(&mut self, key: u64) {
        while self.remove(key).is_some() {}
    }

    // ---- internals ----

    fn bucket_of(&self, key: u64) -> usize {
        (key % self.buckets.len() as u64) as usize
    }

    fn find(&self, key: u64) -> FindResult {
        let mut fr = FindResult {
            bucket: usize::MAX,
            prev: END_OF_LIST,
            entry: END_OF_LIST,
        };
        if self.buckets.is_empty() {
            return fr;
        }
        fr.bucket = self.bucket_of(key);
        fr.entry = self.buckets[fr.bucket];
        while fr.entry != END_OF_LIST {
            let e = &self.entries[fr.entry as usize];
            if e.key == key {
                return fr;
            }
            fr.prev = fr.entry;
            fr.entry = e.next;
        }
        fr
    }

    /// Chain position of the entry stored at `index`.
    fn find_index(&self, index: u32) -> FindResult {
        let bucket = self.bucket_of(self.entries[index as usize].key);
        let mut fr = FindResult {
            bucket,
            prev: END_OF_LIST,
            entry: self.buckets[bucket],
        };
        while fr.entry != index {
            debug_assert!(fr.entry != END_OF_LIST, "entry {index} is not linked");
            fr.prev = fr.entry;
            fr.entry = self.entries[fr.entry as usize].next;
        }
        fr
    }

    fn link(&mut self, fr: FindResult, index: u32) {
        if fr.prev == END_OF_LIST {
            self.buckets[fr.bucket] = index;
        } else {
            self.entries[fr.prev as usize].next = index;
        }
    }

    fn push_entry(&mut self, key: u64, value: T) -> u32 {
        let i = self.entries.push(HashEntry {
            key,
            next: END_OF_LIST,
            value,
        });
        assert!(i < END_OF_LIST as usize, "hash exceeds {} entries", END_OF_LIST);
        i as u32
    }

    fn find_or_make(&mut self, key: u64, value: T) -> u32 {
        let fr = self.find(key);
        if fr.entry != END_OF_LIST {
            return fr.entry;
        }
        let i = self.push_entry(key, value);
        self.link(fr, i);
        i
    }

    // New entry goes in front of the first existing entry for `key`, or at
    // the end of the chain when there is none.
    fn make(&mut self, key: u64, value: T) -> u32 {
        let fr = self.find(key);
        let i = self.push_entry(key, value);
        self.link(fr, i);
        self.entries[i as usize].next = fr.entry;
        i
    }

    fn erase(&mut self, fr: FindResult) -> T {
        let next = self.entries[fr.entry as usize].next;
        self.link(fr, next);

        let last = (self.entries.len() - 1) as u32;
        if fr.entry != last {
            let moved = self.find_index(last);
            self.link(moved, fr.entry);
        }
        self.entries.swap_remove(fr.entry as usize).value
    }

    fn is_full(&self) -> bool {
        self.entries.len() as f32 >= self.buckets.len() as f32 * MAX_LOAD_FACTOR
    }

    fn grow(&mut self) {
        let new_size = self.entries.len() * 2 + 10;
        self.rehash(new_size);
    }

    fn append(&mut self, key: u64, value: T) {
        let i = self.push_entry(key, value);
        let bucket = self.bucket_of(key);
        let mut fr = FindResult {
            bucket,
            prev: END_OF_LIST,
            entry: self.buckets[bucket],
        };
        while fr.entry != END_OF_LIST {
            fr.prev = fr.entry;
            fr.entry = self.entries[fr.entry as usize].next;
        }
        self.link(fr, i);
    }

    fn rehash(&mut self, new_size: usize) {
        // Live entries always need at least one bucket to be reachable.
        let new_size = if self.entries.is_empty() { new_size } else { new_size.max(1) };
        let allocator = self.buckets.allocator();
        let mut rehashed = Hash {
            buckets: Array::with_capacity(allocator, new_size),
            entries: Array::with_capacity(allocator, self.entries.len()),
        };
        rehashed.buckets.resize(new_size, END_OF_LIST);
        // Chains are replayed in order and appended, so values sharing a key
        // keep their relative order.
        for b in 0..self.buckets.len() {
            let mut e = self.buckets[b];
            while e != END_OF_LIST {
                let entry = self.entries[e as usize];
                rehashed.append(entry.key, entry.value);
                e = entry.next;
            }
        }
        tracing::trace!(buckets = new_size, entries = self.entries.len(), "hash rehashed");
        *self = rehashed;
    }
}

impl<'a, T: Copy + fmt::Debug> fmt::Debug for Hash<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapAllocator;

    /// Invariant: `get` returns the default exactly when `has` is false.
    #[test]
    fn set_get_has() {
        let heap = HeapAllocator::new();
        let mut h: Hash<i32> = Hash::new(&heap);
        assert!(!h.has(7));
        assert_eq!(h.get(7, -1), -1);
        h.set(7, 70);
        h.set(8, 80);
        assert!(h.has(7));
        assert_eq!(h.get(7, -1), 70);
        h.set(7, 71);
        assert_eq!(h.get(7, -1), 71);
        assert_eq!(h.len(), 2);
    }

    /// Invariant: the load factor stays below the threshold by growing buckets.
    #[test]
    fn grows_past_load_factor() {
        let heap = HeapAllocator::new();
        let mut h: Hash<u64> = Hash::new(&heap);
        for k in 0..1000u64 {
            h.set(k * 7919, k);
            assert!((h.len() as f32) < h.bucket_count() as f32 * MAX_LOAD_FACTOR);
        }
        for k in 0..1000u64 {
            assert_eq!(h.get(k * 7919, u64::MAX), k);
        }
    }

    /// Invariant: removing from the middle of a chain and swap-moving the last
    /// entry keeps every other key reachable.
    #[test]
    fn remove_relinks_moved_entry() {
        let heap = HeapAllocator::new();
        let mut h: Hash<u32> = Hash::new(&heap);
        h.reserve(4);
        // Keys 1, 17, 33, 49 share a chain with 4 buckets and with 16.
        for k in [1u64, 17, 33, 49, 2, 18] {
            h.set(k, k as u32 * 10);
        }
        assert_eq!(h.remove(17), Some(170));
        assert_eq!(h.remove(17), None);
        for k in [1u64, 33, 49, 2, 18] {
            assert_eq!(h.get(k, 0), k as u32 * 10, "key {k}");
        }
        assert_eq!(h.remove(1), Some(10));
        assert_eq!(h.remove(18), Some(180));
        for k in [33u64, 49, 2] {
            assert_eq!(h.get(k, 0), k as u32 * 10, "key {k}");
        }
        assert_eq!(h.len(), 3);
    }

    /// Invariant: multi-hash keeps every value per key and rehashing keeps them.
    #[test]
    fn multi_hash_operations() {
        let heap = HeapAllocator::new();
        let mut h: Hash<u8> = Hash::new(&heap);
        h.multi_insert(3, 1);
        h.multi_insert(3, 2);
        h.multi_insert(4, 9);
        h.multi_insert(3, 3);
        assert_eq!(h.count(3), 3);
        assert_eq!(h.count(4), 1);
        assert_eq!(h.count(5), 0);

        let mut out: Array<u8> = Array::new(&heap);
        h.multi_get(3, &mut out);
        assert_eq!(out.as_slice(), &[3, 2, 1]);

        h.reserve(64);
        let after: Vec<u8> = h.multi_iter(3).copied().collect();
        assert_eq!(after, vec![3, 2, 1]);

        h.remove_all(3);
        assert_eq!(h.count(3), 0);
        assert_eq!(h.get(4, 0), 9);
    }

    /// Invariant: `clear` empties the table and it is reusable afterwards.
    #[test]
    fn clear_and_reuse() {
        let heap = HeapAllocator::new();
        let mut h: Hash<u16> = Hash::new(&heap);
        for k in 0..50 {
            h.set(k, k as u16);
        }
        h.clear();
        assert!(h.is_empty());
        assert!(!h.has(3));
        h.set(3, 33);
        assert_eq!(h.get(3, 0), 33);
    }
}
