//! HeapAllocator: system-backed allocator with live-byte tracking and a
//! fatal leak check on drop.
//!
//! Block layout:
//!
//! ```text
//! | header: actual size | padding words ... | user data (aligned) |
//! ^ system block                            ^ returned pointer
//! ```
//!
//! The header records the full size of the system block. Every word between
//! the header and the user pointer holds `PADDING_VALUE`, so the header is
//! recovered from a bare user pointer by walking backward over the padding.
//! A header never equals `PADDING_VALUE` because no block can be that large.

use crate::allocator::{align_up, is_valid_align, padded_size, Allocator};
use crate::error::AllocError;
use core::alloc::Layout;
use core::ptr::NonNull;
use parking_lot::Mutex;

const WORD: usize = core::mem::size_of::<usize>();
const HEADER_SIZE: usize = WORD;
const BLOCK_ALIGN: usize = core::mem::align_of::<usize>();

/// Fill pattern for the words between a header and its user pointer.
pub const PADDING_VALUE: usize = usize::MAX;

#[derive(Debug, Default)]
struct Stats {
    allocated_size: usize,
    allocation_count: usize,
    // Live user pointer -> actual block size. Catches double frees and
    // foreign pointers before the header walk touches memory.
    #[cfg(debug_assertions)]
    live: hashbrown::HashMap<usize, usize>,
}

/// Tracking allocator over the process heap.
///
/// Every operation takes the same mutex, so one instance may be shared by
/// independently scheduled subsystems. The lock gives mutual exclusion only,
/// not FIFO fairness.
#[derive(Debug, Default)]
pub struct HeapAllocator {
    state: Mutex<Stats>,
}

impl HeapAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live allocations.
    pub fn allocation_count(&self) -> usize {
        self.state.lock().allocation_count
    }

    /// Actual size (header and padding included) of the block behind `data`.
    ///
    /// # Safety
    ///
    /// `data` must be a live pointer returned by this allocator.
    pub unsafe fn get_size(&self, data: NonNull<u8>) -> usize {
        let state = self.state.lock();
        #[cfg(debug_assertions)]
        assert!(
            state.live.contains_key(&(data.as_ptr() as usize)),
            "pointer {:p} is not a live HeapAllocator block",
            data
        );
        let size = header(data.as_ptr()).read();
        drop(state);
        size
    }
}

/// Walks back from a user pointer over the padding words to its header.
///
/// # Safety
///
/// `data` must be a live user pointer produced by `HeapAllocator`.
unsafe fn header(data: *mut u8) -> *mut usize {
    let mut p = data.cast::<usize>().sub(1);
    while p.read() == PADDING_VALUE {
        p = p.sub(1);
    }
    p
}

unsafe impl Allocator for HeapAllocator {
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        if !is_valid_align(align) {
            return Err(AllocError::InvalidAlignment(align));
        }
        // The backward walk reads whole words, so user pointers are at least
        // word aligned.
        let align = align.max(WORD);
        let actual = padded_size(size, align, HEADER_SIZE)?;
        let layout = Layout::from_size_align(actual, BLOCK_ALIGN)
            .map_err(|_| AllocError::SizeOverflow { size, align })?;

        let mut state = self.state.lock();

        let block = unsafe { std::alloc::alloc(layout) };
        if block.is_null() {
            return Err(AllocError::OutOfMemory { size, align });
        }

        let data = unsafe {
            let h = block.cast::<usize>();
            h.write(actual);
            let first = h.add(1);
            let pad_words = (align_up(first as usize, align) - first as usize) / WORD;
            for i in 0..pad_words {
                first.add(i).write(PADDING_VALUE);
            }
            first.add(pad_words).cast::<u8>()
        };

        state.allocated_size += actual;
        state.allocation_count += 1;
        #[cfg(debug_assertions)]
        state.live.insert(data as usize, actual);

        // Safety: derived from a non-null system block.
        Ok(unsafe { NonNull::new_unchecked(data) })
    }

    unsafe fn deallocate(&self, data: *mut u8) {
        if data.is_null() {
            return;
        }
        let mut state = self.state.lock();

        #[cfg(debug_assertions)]
        let recorded = state.live.remove(&(data as usize));
        #[cfg(debug_assertions)]
        assert!(
            recorded.is_some(),
            "pointer {:p} was not allocated by this HeapAllocator (or was already freed)",
            data
        );

        let h = header(data);
        let actual = h.read();
        #[cfg(debug_assertions)]
        debug_assert_eq!(recorded, Some(actual), "corrupted allocation header");

        state.allocated_size -= actual;
        state.allocation_count -= 1;

        std::alloc::dealloc(h.cast::<u8>(), Layout::from_size_align_unchecked(actual, BLOCK_ALIGN));
    }

    fn allocated_size(&self) -> usize {
        self.state.lock().allocated_size
    }
}

impl Drop for HeapAllocator {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.allocation_count == 0 && state.allocated_size == 0 {
            return;
        }
        tracing::error!(
            allocations = state.allocation_count,
            bytes = state.allocated_size,
            "heap allocator dropped with live allocations"
        );
        if !std::thread::panicking() {
            panic!(
                "missing {} deallocations causing a leak of {} bytes",
                state.allocation_count, state.allocated_size
            );
        }
    }
}
