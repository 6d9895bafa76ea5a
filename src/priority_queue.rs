//! PriorityQueue: binary max-heap of plain `Copy` items over an `Array`.
//!
//! `heap[0]` is the largest item; the children of slot `i` are `2i + 1` and
//! `2i + 2`.

use crate::allocator::Allocator;
use crate::array::Array;
use core::fmt;

pub struct PriorityQueue<'a, T: Copy + Ord> {
    heap: Array<'a, T>,
}

impl<'a, T: Copy + Ord> PriorityQueue<'a, T> {
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            heap: Array::new(allocator),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The largest item, if any.
    pub fn peek(&self) -> Option<&T> {
        self.heap.first()
    }

    pub fn push(&mut self, item: T) {
        let i = self.heap.push(item);
        self.sift_up(i);
    }

    /// Removes and returns the largest item.
    pub fn pop(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(top)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Items in heap order, which is not sorted order.
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.heap.iter()
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[parent] >= self.heap[i] {
                break;
            }
            self.heap.swap(parent, i);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.heap[right] > self.heap[left] {
                right
            } else {
                left
            };
            if self.heap[i] >= self.heap[child] {
                break;
            }
            self.heap.swap(i, child);
            i = child;
        }
    }
}

impl<'a, T: Copy + Ord + fmt::Debug> fmt::Debug for PriorityQueue<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
