//! IdTable: fixed-capacity table that mints and recycles opaque ids.
//!
//! Each id packs a 16-bit slot index with a 16-bit generation. Destroying an
//! id returns its slot to a freelist threaded through the `index` field of
//! dead slots; the next `create` reuses the slot under a fresh generation, so
//! stale copies of the old id stop resolving.

use crate::error::IdTableError;
use core::fmt;

/// Generation stored in dead slots and freelist terminator.
const INVALID: u16 = u16::MAX;

/// Opaque handle minted by an `IdTable`.
///
/// - Lower 16 bits: slot index
/// - Upper 16 bits: generation
///
/// External systems may persist the raw value, but must only hand back ids
/// they received from the table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Id(u32);

impl Id {
    /// An id no table ever reports as live.
    pub const INVALID: Self = Self(u32::MAX);

    #[inline]
    #[must_use]
    pub(crate) const fn new(index: u16, generation: u16) -> Self {
        Self(((generation as u32) << 16) | (index as u32))
    }

    /// Slot this id refers to.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0 as u16
    }

    #[inline]
    #[must_use]
    pub const fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Rebuilds an id from a value previously returned by `raw`.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({}v{})", self.index(), self.generation())
    }
}

pub struct IdTable<const MAX: usize> {
    freelist: u16,
    next_generation: u16,
    size: u16,
    slots: [Id; MAX],
}

impl<const MAX: usize> IdTable<MAX> {
    // Index 0xFFFF terminates the freelist, so at most 0xFFFF slots.
    const CAPACITY_FITS: () = assert!(MAX > 0 && MAX <= INVALID as usize, "IdTable capacity must be in 1..=65535");

    pub fn new() -> Self {
        let () = Self::CAPACITY_FITS;
        Self {
            freelist: INVALID,
            next_generation: 0,
            size: 0,
            slots: [Id::new(INVALID, INVALID); MAX],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        MAX
    }

    /// Mints a new id. Panics when every slot is live.
    pub fn create(&mut self) -> Id {
        match self.try_create() {
            Ok(id) => id,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_create(&mut self) -> Result<Id, IdTableError> {
        if self.len() == MAX {
            return Err(IdTableError::Full { capacity: MAX });
        }

        let generation = self.next_generation;
        self.next_generation = match generation.wrapping_add(1) {
            INVALID => 0,
            g => g,
        };

        // With an empty freelist every slot below `size` is live.
        let index = if self.freelist != INVALID {
            let head = self.freelist;
            self.freelist = self.slots[head as usize].index();
            head
        } else {
            self.size
        };

        let id = Id::new(index, generation);
        self.slots[index as usize] = id;
        self.size += 1;
        Ok(id)
    }

    /// Retires `id`. Panics when `id` is not live.
    pub fn destroy(&mut self, id: Id) {
        if let Err(e) = self.try_destroy(id) {
            panic!("{e}");
        }
    }

    pub fn try_destroy(&mut self, id: Id) -> Result<(), IdTableError> {
        if !self.has(id) {
            return Err(IdTableError::InvalidId(id));
        }
        let index = id.index();
        self.slots[index as usize] = Id::new(self.freelist, INVALID);
        self.freelist = index;
        self.size -= 1;
        Ok(())
    }

    /// Whether `id` is live: its slot exists and carries the same generation.
    #[inline]
    pub fn has(&self, id: Id) -> bool {
        (id.index() as usize) < MAX && id.generation() != INVALID && self.slots[id.index() as usize] == id
    }

    /// Live ids in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
        self.slots.iter().copied().filter(|id| id.generation() != INVALID)
    }
}

impl<const MAX: usize> Default for IdTable<MAX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MAX: usize> fmt::Debug for IdTable<MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdTable")
            .field("len", &self.size)
            .field("capacity", &MAX)
            .field("live", &DebugIds(self))
            .finish()
    }
}

struct DebugIds<'t, const MAX: usize>(&'t IdTable<MAX>);

impl<const MAX: usize> fmt::Debug for DebugIds<'_, MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: a recycled slot gets a fresh generation and the old id stops resolving.
    #[test]
    fn recycled_slot_rejects_stale_id() {
        let mut t: IdTable<4> = IdTable::new();
        let a = t.create();
        let b = t.create();
        let c = t.create();
        t.destroy(b);
        assert!(!t.has(b));

        let d = t.create();
        assert_eq!(d.index(), b.index());
        assert_ne!(d.generation(), b.generation());
        assert!(!t.has(b));
        assert!(t.has(a) && t.has(c) && t.has(d));
        assert_eq!(t.len(), 3);
    }

    /// Invariant: the freelist is LIFO and slots are only appended once it is empty.
    #[test]
    fn freelist_order() {
        let mut t: IdTable<8> = IdTable::new();
        let ids: Vec<Id> = (0..5).map(|_| t.create()).collect();
        t.destroy(ids[1]);
        t.destroy(ids[3]);
        assert_eq!(t.create().index(), 3);
        assert_eq!(t.create().index(), 1);
        assert_eq!(t.create().index(), 5);
        assert_eq!(t.len(), 6);
        assert_eq!(t.iter().count(), 6);
        assert!(t.iter().map(Id::index).eq([0, 1, 2, 3, 4, 5]));
    }

    /// Invariant: a full table refuses to mint; `create` treats it as fatal.
    #[test]
    fn full_table() {
        let mut t: IdTable<2> = IdTable::new();
        t.create();
        t.create();
        assert_eq!(t.try_create(), Err(IdTableError::Full { capacity: 2 }));
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| t.create()));
        assert!(r.is_err());
    }

    /// Invariant: destroying a dead, foreign or invalid id is rejected.
    #[test]
    fn destroy_rejects_bad_ids() {
        let mut t: IdTable<4> = IdTable::new();
        let a = t.create();
        t.destroy(a);
        assert_eq!(t.try_destroy(a), Err(IdTableError::InvalidId(a)));
        assert!(t.try_destroy(Id::INVALID).is_err());
        assert!(t.try_destroy(Id::new(100, 0)).is_err());
        assert!(!t.has(Id::default()));
    }

    /// Invariant: the generation counter never produces the reserved value.
    #[test]
    fn generation_wrap_skips_invalid() {
        let mut t: IdTable<1> = IdTable::new();
        let mut seen_zero_again = false;
        for round in 0..(u16::MAX as usize + 3) {
            let id = t.create();
            assert_ne!(id.generation(), INVALID);
            if round > 0 && id.generation() == 0 {
                seen_zero_again = true;
            }
            assert!(t.has(id));
            t.destroy(id);
        }
        assert!(seen_zero_again);
    }

    /// Invariant: raw values round-trip into the same id.
    #[test]
    fn raw_round_trip_resolves() {
        let mut t: IdTable<16> = IdTable::new();
        let id = t.create();
        let stored = id.raw();
        assert!(t.has(Id::from_raw(stored)));
        assert_eq!(format!("{id:?}"), "Id(0v0)");
    }
}
