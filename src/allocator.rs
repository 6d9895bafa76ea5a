//! Allocator capability shared by every container in the crate.
//!
//! Containers capture a `&dyn Allocator` at construction and route every
//! grow/shrink/copy through it. The allocator must outlive them, which the
//! borrow makes a compile-time fact.

use crate::error::AllocError;
use core::alloc::Layout;
use core::ptr::NonNull;

/// Alignment used when the caller has no stronger requirement.
pub const DEFAULT_ALIGN: usize = core::mem::align_of::<usize>();

/// Rounds `addr` up to the next multiple of `align` (a power of two).
#[inline]
pub const fn align_up(addr: usize, align: usize) -> usize {
    (addr + align - 1) & !(align - 1)
}

#[inline]
pub const fn is_valid_align(align: usize) -> bool {
    align.is_power_of_two()
}

/// Raw byte allocator.
///
/// # Safety
///
/// Implementors must return pointers aligned to the requested alignment and
/// valid for reads and writes of the requested size until they are passed
/// back to `deallocate` on the same instance (or, for arenas, until the
/// allocator is dropped).
pub unsafe trait Allocator {
    /// Allocates `size` bytes aligned to `align`.
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block returned by this allocator. Null is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block obtained from this same instance.
    unsafe fn deallocate(&self, ptr: *mut u8);

    /// Bytes currently held by this allocator, for leak checks and diagnostics.
    fn allocated_size(&self) -> usize;

    /// Allocates or dies. Exhausted memory goes to the process allocation
    /// error handler; a malformed request is a programming error and panics.
    #[track_caller]
    fn allocate(&self, size: usize, align: usize) -> NonNull<u8> {
        match self.try_allocate(size, align) {
            Ok(ptr) => ptr,
            Err(AllocError::OutOfMemory { size, align }) => {
                match Layout::from_size_align(size, align) {
                    Ok(layout) => std::alloc::handle_alloc_error(layout),
                    Err(_) => panic!("out of memory allocating {size} bytes (align {align})"),
                }
            }
            Err(e) => panic!("{e}"),
        }
    }
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        (**self).try_allocate(size, align)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: *mut u8) {
        (**self).deallocate(ptr)
    }

    #[inline]
    fn allocated_size(&self) -> usize {
        (**self).allocated_size()
    }
}

/// Validates an (size, align) request and returns the total span needed to
/// carve an aligned block of `size` bytes out of a region that carries
/// `overhead` extra bytes in front of it.
pub(crate) fn padded_size(size: usize, align: usize, overhead: usize) -> Result<usize, AllocError> {
    if !is_valid_align(align) {
        return Err(AllocError::InvalidAlignment(align));
    }
    size.checked_add(align)
        .and_then(|s| s.checked_add(overhead))
        .filter(|&s| s <= isize::MAX as usize)
        .ok_or(AllocError::SizeOverflow { size, align })
}
