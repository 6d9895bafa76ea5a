//! engine-substrate: allocators and containers for a game engine core, where
//! every container draws its memory from an explicitly injected allocator.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: make every byte a subsystem uses attributable to an allocator the
//!   caller chose, so leaks are caught at allocator teardown and short-lived
//!   work can run out of stack-resident scratch space.
//! - Layers:
//!   - `Allocator`: the one seam. `try_allocate(size, align)`,
//!     `deallocate(ptr)` (null is a no-op), `allocated_size()`.
//!   - `HeapAllocator`: system-heap backed, tracks live bytes behind a
//!     mutex and refuses to be dropped while anything is still allocated.
//!   - `ScopeArena<SIZE>`: bump allocator over an inline buffer that spills
//!     into a growing chain of blocks from a backing allocator; frees
//!     nothing until it is dropped.
//!   - Containers: `Array` (plain `Copy` data), `Vector` (owning, runs
//!     destructors), `Queue` (ring), `PriorityQueue` (max-heap), `Hash`
//!     (chained, `u64` keys, with multi-value chains), `Map` (red-black
//!     tree), `SortMap` (flat array with an explicit sort step).
//!   - `IdTable<MAX>`: fixed table of generational 32-bit ids.
//!
//! Constraints
//! - Containers borrow their allocator (`&'a dyn Allocator`); the borrow
//!   checker keeps the allocator alive for as long as anything built on it.
//! - There is no process-wide default allocator. Callers pass one in.
//! - Only `HeapAllocator` is `Sync`. Arenas and containers are
//!   single-threaded.
//! - Absent keys are not errors: `get` returns the caller's default, `remove`
//!   is a no-op.
//!
//! Map layout
//! - Nodes are indices, not pointers. Link records (`left`, `right`,
//!   `parent`, `color`) sit in one array with a shared black sentinel at
//!   slot 0; key/value pairs sit in a parallel vector. Removal moves the last
//!   node into the freed slot, so storage stays dense and iteration is a
//!   slice walk in storage order (not key order).
//! - `set` on a present key overwrites in place.
//! - With the `verify` feature every mutation re-runs `Map::validate` and
//!   panics on the first broken property.
//!
//! Failure policy
//! - Exhausted system memory is fatal (`handle_alloc_error`). The `try_`
//!   entry points expose the same conditions as `Result`s.
//! - Contract violations (stale ids, foreign pointers, out-of-bounds
//!   indices, a leak at allocator teardown) panic.
//!
//! Notes and non-goals
//! - No per-thread partitioning of allocation, no garbage collection, no
//!   lock-free structures.
//! - `Hash` keys are caller-computed `u64`s; hashing of richer keys happens
//!   above this crate.

pub mod allocator;
pub mod array;
pub mod error;
pub mod hash;
pub mod heap;
pub mod id_table;
pub mod map;
mod map_proptest;
pub mod priority_queue;
pub mod queue;
mod raw_buf;
pub mod scope_arena;
pub mod sort_map;
pub mod vector;

// Public surface
pub use allocator::{align_up, is_valid_align, Allocator, DEFAULT_ALIGN};
pub use array::Array;
pub use error::{AllocError, IdTableError, MapInvariantError};
pub use hash::{Hash, HashEntry};
pub use heap::HeapAllocator;
pub use id_table::{Id, IdTable};
pub use map::{Entry, Map};
pub use priority_queue::PriorityQueue;
pub use queue::Queue;
pub use scope_arena::{
    ScopeArena, ScopeArena1024, ScopeArena128, ScopeArena2048, ScopeArena256, ScopeArena4096, ScopeArena512,
    ScopeArena64,
};
pub use sort_map::SortMap;
pub use vector::Vector;
