//! Vector: growable contiguous storage that owns its values and runs their
//! destructors.

use crate::allocator::Allocator;
use crate::raw_buf::RawBuf;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::slice;

pub struct Vector<'a, T> {
    buf: RawBuf<'a, T>,
    len: usize,
}

impl<'a, T> Vector<'a, T> {
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            buf: RawBuf::new(allocator),
            len: 0,
        }
    }

    pub fn with_capacity(allocator: &'a dyn Allocator, capacity: usize) -> Self {
        let mut v = Self::new(allocator);
        v.reserve(capacity);
        v
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

    /// Removes the item at `index`, moving the last item into its place.
    pub fn swap_remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "index out of bounds (len = {}, index = {index})", self.len);
        let last = self.len - 1;
        self.as_mut_slice().swap(index, last);
        self.len = last;
        unsafe { self.buf.ptr().add(last).read() }
    }

    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity() {
            self.buf.grow(capacity, self.len);
        }
    }

    pub fn shrink_to_fit(&mut self) {
        self.buf.set_capacity(self.len, self.len);
    }

    /// Drops every item past `len`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = ptr::slice_from_raw_parts_mut(unsafe { self.buf.ptr().add(len) }, self.len - len);
        // Shorten first so a panicking destructor cannot cause a double drop.
        self.len = len;
        unsafe { ptr::drop_in_place(tail) };
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Resizes to `new_len`, creating new items with `f`.
    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, mut f: F) {
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }
        self.reserve(new_len);
        while self.len < new_len {
            self.push(f());
        }
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

impl<'a, T> Drop for Vector<'a, T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'a, T> Deref for Vector<'a, T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<'a, T> DerefMut for Vector<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T: Clone> Clone for Vector<'a, T> {
    fn clone(&self) -> Self {
        let mut v = Self::with_capacity(self.allocator(), self.len);
        for item in self.iter() {
            v.push(item.clone());
        }
        v
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for Vector<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, 'b, T> IntoIterator for &'b Vector<'a, T> {
    type Item = &'b T;
    type IntoIter = slice::Iter<'b, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}
