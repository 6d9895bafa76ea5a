//! ScopeArena: bump allocator over an inline buffer that spills into a chain
//! of overflow blocks obtained from a backing allocator. Individual frees are
//! no-ops; everything is released when the arena goes out of scope.

use crate::allocator::{align_up, is_valid_align, padded_size, Allocator};
use crate::error::AllocError;
use core::cell::{Cell, UnsafeCell};
use core::mem::MaybeUninit;
use core::ptr::NonNull;

const LINK_SIZE: usize = core::mem::size_of::<*mut u8>();
const LINK_ALIGN: usize = core::mem::align_of::<*mut u8>();

/// Size of the first overflow block; doubles with every overflow.
pub const BASE_CHUNK_SIZE: usize = 4 * 1024;

/// Scope-lifetime arena with `SIZE` bytes of inline storage.
///
/// Overflow blocks form a singly linked list: the first word of each block
/// points at the previously allocated block (null for the first one), and
/// `head` tracks the newest. Pointers into the inline buffer are only valid
/// while the arena stays where it is; containers built on it borrow it, which
/// pins it for their lifetime.
pub struct ScopeArena<'a, const SIZE: usize> {
    backing: &'a dyn Allocator,
    head: Cell<*mut u8>,
    // Bump state relative to the current region (inline buffer or `head`).
    cur: Cell<usize>,
    end: Cell<usize>,
    chunk_size: Cell<usize>,
    handed_out: Cell<usize>,
    blocks: Cell<usize>,
    buffer: UnsafeCell<[MaybeUninit<u8>; SIZE]>,
}

pub type ScopeArena64<'a> = ScopeArena<'a, 64>;
pub type ScopeArena128<'a> = ScopeArena<'a, 128>;
pub type ScopeArena256<'a> = ScopeArena<'a, 256>;
pub type ScopeArena512<'a> = ScopeArena<'a, 512>;
pub type ScopeArena1024<'a> = ScopeArena<'a, 1024>;
pub type ScopeArena2048<'a> = ScopeArena<'a, 2048>;
pub type ScopeArena4096<'a> = ScopeArena<'a, 4096>;

impl<'a, const SIZE: usize> ScopeArena<'a, SIZE> {
    /// Creates an arena that spills into `backing` once the inline buffer is
    /// exhausted.
    pub fn new(backing: &'a dyn Allocator) -> Self {
        Self {
            backing,
            head: Cell::new(core::ptr::null_mut()),
            cur: Cell::new(0),
            end: Cell::new(SIZE),
            chunk_size: Cell::new(BASE_CHUNK_SIZE),
            handed_out: Cell::new(0),
            blocks: Cell::new(0),
            buffer: UnsafeCell::new([MaybeUninit::uninit(); SIZE]),
        }
    }

    /// Number of overflow blocks obtained from the backing allocator so far.
    pub fn overflow_blocks(&self) -> usize {
        self.blocks.get()
    }

    /// Size the next overflow block will have at minimum.
    pub fn next_chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    fn region_base(&self) -> *mut u8 {
        let head = self.head.get();
        if head.is_null() {
            self.buffer.get().cast::<u8>()
        } else {
            head
        }
    }

    fn aligned_offset(&self, align: usize) -> usize {
        let base = self.region_base() as usize;
        align_up(base + self.cur.get(), align) - base
    }

    /// Links a fresh block large enough for `size` bytes at `align` in front
    /// of the chain and makes it the current region.
    fn spill(&self, size: usize, align: usize) -> Result<(), AllocError> {
        let needed = padded_size(size, align, LINK_SIZE)?;
        let chunk = self.chunk_size.get();
        let block_size = needed.max(chunk);
        self.chunk_size.set(chunk.saturating_mul(2));

        let block = self.backing.try_allocate(block_size, LINK_ALIGN)?;
        unsafe { block.as_ptr().cast::<*mut u8>().write(self.head.get()) };
        self.head.set(block.as_ptr());
        self.cur.set(LINK_SIZE);
        self.end.set(block_size);
        self.blocks.set(self.blocks.get() + 1);

        tracing::debug!(
            block_size,
            blocks = self.blocks.get(),
            "scope arena spilled into an overflow block"
        );
        Ok(())
    }
}

unsafe impl<'a, const SIZE: usize> Allocator for ScopeArena<'a, SIZE> {
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        if !is_valid_align(align) {
            return Err(AllocError::InvalidAlignment(align));
        }

        let mut start = self.aligned_offset(align);
        let fits = start
            .checked_add(size)
            .map_or(false, |stop| stop <= self.end.get());
        if !fits {
            self.spill(size, align)?;
            start = self.aligned_offset(align);
        }

        let p = unsafe { self.region_base().add(start) };
        self.cur.set(start + size);
        self.handed_out.set(self.handed_out.get() + size);
        // Safety: the region base is never null.
        Ok(unsafe { NonNull::new_unchecked(p) })
    }

    unsafe fn deallocate(&self, _ptr: *mut u8) {}

    fn allocated_size(&self) -> usize {
        self.handed_out.get()
    }
}

impl<'a, const SIZE: usize> Drop for ScopeArena<'a, SIZE> {
    fn drop(&mut self) {
        let released = self.blocks.get();
        let mut p = self.head.get();
        while !p.is_null() {
            unsafe {
                let next = p.cast::<*mut u8>().read();
                self.backing.deallocate(p);
                p = next;
            }
        }
        if released > 0 {
            tracing::debug!(blocks = released, "scope arena released its overflow chain");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapAllocator;

    /// Invariant: small requests are served from the inline buffer without
    /// touching the backing allocator.
    #[test]
    fn inline_buffer_serves_small_requests() {
        let heap = HeapAllocator::new();
        let arena = ScopeArena256::new(&heap);
        for _ in 0..8 {
            let p = arena.allocate(16, 8);
            assert_eq!(p.as_ptr() as usize % 8, 0);
        }
        assert_eq!(arena.overflow_blocks(), 0);
        assert_eq!(heap.allocation_count(), 0);
        assert_eq!(arena.allocated_size(), 128);
    }

    /// Invariant: exhausting the inline buffer spills into backing blocks whose
    /// size starts at the base chunk and doubles each time.
    #[test]
    fn overflow_chunk_size_doubles() {
        let heap = HeapAllocator::new();
        {
            let arena = ScopeArena64::new(&heap);
            let _ = arena.allocate(64, 1);
            assert_eq!(arena.overflow_blocks(), 0);

            let _ = arena.allocate(BASE_CHUNK_SIZE - 64, 8);
            assert_eq!(arena.overflow_blocks(), 1);
            assert_eq!(arena.next_chunk_size(), BASE_CHUNK_SIZE * 2);

            let _ = arena.allocate(BASE_CHUNK_SIZE, 8);
            assert_eq!(arena.overflow_blocks(), 2);
            assert_eq!(arena.next_chunk_size(), BASE_CHUNK_SIZE * 4);
            assert_eq!(heap.allocation_count(), 2);
        }
        assert_eq!(heap.allocation_count(), 0);
    }

    /// Invariant: a request larger than the current chunk size gets a block big
    /// enough for it, link word and alignment slack included.
    #[test]
    fn oversized_request_gets_dedicated_block() {
        let heap = HeapAllocator::new();
        let arena = ScopeArena64::new(&heap);
        let big = 3 * BASE_CHUNK_SIZE;
        let p = arena.allocate(big, 64);
        assert_eq!(p.as_ptr() as usize % 64, 0);
        unsafe { core::ptr::write_bytes(p.as_ptr(), 0xAB, big) };
        assert_eq!(arena.overflow_blocks(), 1);
    }

    /// Invariant: many mixed-size, mixed-alignment requests spanning several
    /// overflow blocks yield aligned regions that never overlap, and every
    /// overflow block is one live backing allocation until the arena drops.
    #[test]
    fn mixed_requests_never_overlap() {
        let heap = HeapAllocator::new();
        {
            let arena: ScopeArena<64> = ScopeArena::new(&heap);
            let mut seed = 0x2545_f491_4f6c_dd1du64;
            let mut spans: Vec<(usize, usize)> = Vec::with_capacity(500);
            for _ in 0..500 {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let size = 1 + (seed >> 33) as usize % 300;
                let align = 1usize << ((seed >> 20) as usize % 7);
                let p = arena.allocate(size, align).as_ptr() as usize;
                assert_eq!(p % align, 0, "align {align}");
                spans.push((p, p + size));
            }
            spans.sort_unstable();
            for pair in spans.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "{:x?} overlaps {:x?}", pair[0], pair[1]);
            }
            assert!(arena.overflow_blocks() > 1);
            assert_eq!(arena.overflow_blocks(), heap.allocation_count());
        }
        assert_eq!(heap.allocation_count(), 0);
        assert_eq!(heap.allocated_size(), 0);
    }

    /// Invariant: `deallocate` never returns memory early.
    #[test]
    fn deallocate_is_noop() {
        let heap = HeapAllocator::new();
        let arena = ScopeArena64::new(&heap);
        let a = arena.allocate(16, 8);
        unsafe { arena.deallocate(a.as_ptr()) };
        let b = arena.allocate(16, 8);
        assert_ne!(a, b);
        assert_eq!(arena.allocated_size(), 32);
    }
}
