//! Queue: double-ended ring buffer over an `Array`.
//!
//! The backing array's length is the ring capacity; `read` is the slot of the
//! front item and the `len` items follow it, wrapping at the end.

use crate::allocator::Allocator;
use crate::array::Array;
use core::fmt;
use core::ops::{Index, IndexMut};

pub struct Queue<'a, T: Copy + Default> {
    read: usize,
    len: usize,
    ring: Array<'a, T>,
}

impl<'a, T: Copy + Default> Queue<'a, T> {
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            read: 0,
            len: 0,
            ring: Array::new(allocator),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        (self.read + i) % self.capacity()
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        (i < self.len).then(|| &self.ring[self.slot(i)])
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        if i < self.len {
            let s = self.slot(i);
            Some(&mut self.ring[s])
        } else {
            None
        }
    }

    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn push_back(&mut self, item: T) {
        if self.len == self.capacity() {
            self.grow(0);
        }
        let s = self.slot(self.len);
        self.ring[s] = item;
        self.len += 1;
    }

    pub fn push_front(&mut self, item: T) {
        if self.len == self.capacity() {
            self.grow(0);
        }
        let cap = self.capacity();
        self.read = (self.read + cap - 1) % cap;
        self.ring[self.read] = item;
        self.len += 1;
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.ring[self.slot(self.len)])
    }

    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.ring[self.read];
        self.read = (self.read + 1) % self.capacity();
        self.len -= 1;
        Some(item)
    }

    /// Appends every item of `items` at the back.
    pub fn extend_back(&mut self, items: &[T]) {
        self.reserve(self.len + items.len());
        for &item in items {
            self.push_back(item);
        }
    }

    pub fn clear(&mut self) {
        self.read = 0;
        self.len = 0;
    }

    /// Ensures room for at least `capacity` items in total.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity() {
            self.set_ring_capacity(capacity);
        }
    }

    fn grow(&mut self, min_capacity: usize) {
        let cap = self.capacity().saturating_mul(2).saturating_add(1).max(min_capacity);
        self.set_ring_capacity(cap);
    }

    // Widens the ring; a wrapped run of items at the end of the old ring moves
    // to the end of the new one.
    fn set_ring_capacity(&mut self, new_cap: usize) {
        let old_cap = self.capacity();
        debug_assert!(new_cap >= old_cap);
        self.ring.resize(new_cap, T::default());
        if self.read + self.len > old_cap {
            let tail = old_cap - self.read;
            let new_read = new_cap - tail;
            self.ring.copy_within(self.read..old_cap, new_read);
            self.read = new_read;
        }
    }

    /// Items from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).map(move |i| &self.ring[self.slot(i)])
    }
}

impl<'a, T: Copy + Default> Index<usize> for Queue<'a, T> {
    type Output = T;
    fn index(&self, i: usize) -> &T {
        assert!(i < self.len, "index out of bounds (len = {}, index = {i})", self.len);
        &self.ring[self.slot(i)]
    }
}

impl<'a, T: Copy + Default> IndexMut<usize> for Queue<'a, T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        assert!(i < self.len, "index out of bounds (len = {}, index = {i})", self.len);
        let s = self.slot(i);
        &mut self.ring[s]
    }
}

impl<'a, T: Copy + Default + fmt::Debug> fmt::Debug for Queue<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapAllocator;
    use std::collections::VecDeque;

    /// Invariant: FIFO order through `push_back`/`pop_front`.
    #[test]
    fn fifo_order() {
        let heap = HeapAllocator::new();
        let mut q: Queue<u32> = Queue::new(&heap);
        for i in 0..20 {
            q.push_back(i);
        }
        for i in 0..20 {
            assert_eq!(q.pop_front(), Some(i));
        }
        assert!(q.is_empty());
        assert_eq!(q.pop_front(), None);
    }

    /// Invariant: growing while the items wrap around keeps their logical order.
    #[test]
    fn growth_while_wrapped_keeps_order() {
        let heap = HeapAllocator::new();
        let mut q: Queue<u32> = Queue::new(&heap);
        q.reserve(4);
        q.extend_back(&[0, 1, 2, 3]);
        q.pop_front();
        q.pop_front();
        q.push_back(4);
        q.push_back(5);
        // ring is full and wrapped: [4, 5, 2, 3] with read = 2
        q.push_back(6);
        assert!(q.iter().copied().eq(2..7));
        assert_eq!(q.front(), Some(&2));
        assert_eq!(q.back(), Some(&6));
    }

    /// Invariant: both ends behave like a deque, checked against `VecDeque`.
    #[test]
    fn matches_vecdeque_model() {
        let heap = HeapAllocator::new();
        let mut q: Queue<i32> = Queue::new(&heap);
        let mut model = VecDeque::new();
        for i in 0..200 {
            match i % 5 {
                0 | 1 => {
                    q.push_back(i);
                    model.push_back(i);
                }
                2 => {
                    q.push_front(-i);
                    model.push_front(-i);
                }
                3 => assert_eq!(q.pop_front(), model.pop_front()),
                _ => assert_eq!(q.pop_back(), model.pop_back()),
            }
            assert_eq!(q.len(), model.len());
            assert!(q.iter().eq(model.iter()));
        }
        q[0] = 1000;
        assert_eq!(q.front(), Some(&1000));
    }
}
