//! Error types for the fallible entry points.
//!
//! The non-`try_` operations treat these as fatal, see `Allocator::allocate`
//! and `IdTable::create`.

use crate::id_table::Id;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),
    #[error("allocation of {size} bytes (align {align}) overflows the address space")]
    SizeOverflow { size: usize, align: usize },
    #[error("out of memory allocating {size} bytes (align {align})")]
    OutOfMemory { size: usize, align: usize },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IdTableError {
    #[error("id table is full ({capacity} slots)")]
    Full { capacity: usize },
    #[error("id table does not have id {0:?}")]
    InvalidId(Id),
}

/// A broken red-black or search-tree property found by `Map::validate`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MapInvariantError {
    #[error("root node {0} is red")]
    RedRoot(u32),
    #[error("root node {0} has a parent")]
    RootHasParent(u32),
    #[error("red node {0} has a red child")]
    RedRed(u32),
    #[error("children of node {0} have different black heights")]
    BlackHeight(u32),
    #[error("child of node {0} does not link back to it")]
    ParentLink(u32),
    #[error("in-order walk is not strictly increasing at node {0}")]
    Order(u32),
    #[error("{reachable} nodes reachable from the root but {stored} stored")]
    Size { reachable: usize, stored: usize },
}
