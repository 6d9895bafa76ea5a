//! Array: growable contiguous storage for plain `Copy` data.
//!
//! Values are moved in and out bitwise and never dropped, so the element type
//! is restricted to `Copy`. Use `Vector` for anything with a destructor.

use crate::allocator::Allocator;
use crate::raw_buf::RawBuf;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::slice;

pub struct Array<'a, T: Copy> {
    buf: RawBuf<'a, T>,
    len: usize,
}

impl<'a, T: Copy> Array<'a, T> {
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            buf: RawBuf::new(allocator),
            len: 0,
        }
    }

    /// Creates an empty array with room for `capacity` items.
    pub fn with_capacity(allocator: &'a dyn Allocator, capacity: usize) -> Self {
        let mut a = Self::new(allocator);
        a.set_capacity(capacity);
        a
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
        self.buf.capacity()
    }

    pub fn allocator(&self) -> &'a dyn Allocator {
        self.buf.allocator()
    }

    /// Appends `item` and returns its index.
    pub fn push(&mut self, item: T) -> usize {
        if self.len == self.capacity() {
            self.buf.grow(self.len + 1, self.len);
        }
        unsafe { self.buf.ptr().add(self.len).write(item) };
        self.len += 1;
        self.len - 1
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { self.buf.ptr().add(self.len).read() })
    }

    pub fn extend_from_slice(&mut self, items: &[T]) {
        let new_len = self.len + items.len();
        self.reserve(new_len);
        unsafe {
            ptr::copy_nonoverlapping(items.as_ptr(), self.buf.ptr().add(self.len), items.len());
        }
        self.len = new_len;
    }

    /// Sets the length to `new_len`, filling new slots with `value`.
    pub fn resize(&mut self, new_len: usize, value: T) {
        if new_len > self.capacity() {
            self.buf.grow(new_len, self.len);
        }
        for i in self.len..new_len {
            unsafe { self.buf.ptr().add(i).write(value) };
        }
        self.len = new_len;
    }

    /// Ensures room for at least `capacity` items in total.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity() {
            self.buf.grow(capacity, self.len);
        }
    }

    /// Reallocates to exactly `capacity` slots, truncating if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.len = self.len.min(capacity);
        self.buf.set_capacity(capacity, self.len);
    }

    pub fn shrink_to_fit(&mut self) {
        self.set_capacity(self.len);
    }

    /// Forgets the items; capacity is kept.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Removes the item at `index`, moving the last item into its place.
    pub fn swap_remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "index out of bounds (len = {}, index = {index})", self.len);
        let last = self.len - 1;
        let slice = self.as_mut_slice();
        slice.swap(index, last);
        self.len = last;
        unsafe { self.buf.ptr().add(last).read() }
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.buf.ptr(), self.len) }
    }
}

impl<'a, T: Copy> Deref for Array<'a, T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<'a, T: Copy> DerefMut for Array<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T: Copy> Clone for Array<'a, T> {
    /// Copies into a new block from the same allocator.
    fn clone(&self) -> Self {
        let mut a = Self::with_capacity(self.allocator(), self.len);
        a.extend_from_slice(self);
        a
    }
}

impl<'a, T: Copy + fmt::Debug> fmt::Debug for Array<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, 'b, T: Copy> IntoIterator for &'b Array<'a, T> {
    type Item = &'b T;
    type IntoIter = slice::Iter<'b, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}
