//! RawBuf: allocator-backed, uninitialised storage for `cap` values of `T`.
//!
//! Owns the block but not the values in it; `Array` and `Vector` track how
//! many leading slots are initialised and decide whether to drop them.

use crate::allocator::Allocator;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

pub(crate) struct RawBuf<'a, T> {
    allocator: &'a dyn Allocator,
    ptr: NonNull<T>,
    cap: usize,
    _owns: PhantomData<T>,
}

impl<'a, T> RawBuf<'a, T> {
    pub(crate) fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            allocator,
            ptr: NonNull::dangling(),
            cap: 0,
            _owns: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &'a dyn Allocator {
        self.allocator
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        if mem::size_of::<T>() == 0 {
            usize::MAX
        } else {
            self.cap
        }
    }

    #[inline]
    pub(crate) fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Moves the first `len` values into a block of exactly `new_cap` slots.
    ///
    /// `len <= new_cap` and the first `len` slots must be initialised.
    pub(crate) fn set_capacity(&mut self, new_cap: usize, len: usize) {
        assert!(len <= new_cap, "capacity {new_cap} cannot hold {len} items");
        if mem::size_of::<T>() == 0 || new_cap == self.cap {
            return;
        }

        let new_ptr = if new_cap == 0 {
            NonNull::dangling()
        } else {
            let bytes = new_cap
                .checked_mul(mem::size_of::<T>())
                .expect("capacity overflow");
            let p = self.allocator.allocate(bytes, mem::align_of::<T>()).cast::<T>();
            unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), p.as_ptr(), len) };
            p
        };

        self.release();
        self.ptr = new_ptr;
        self.cap = new_cap;
    }

    /// Geometric growth: at least `min_cap`, otherwise `cap * 2 + 1`.
    pub(crate) fn grow(&mut self, min_cap: usize, len: usize) {
        let new_cap = self.cap.saturating_mul(2).saturating_add(1).max(min_cap);
        self.set_capacity(new_cap, len);
    }

    fn release(&mut self) {
        if self.cap != 0 && mem::size_of::<T>() != 0 {
            unsafe { self.allocator.deallocate(self.ptr.as_ptr().cast::<u8>()) };
        }
    }
}

impl<'a, T> Drop for RawBuf<'a, T> {
    fn drop(&mut self) {
        self.release();
    }
}
