//! Slot layout utilities.
//!
//! A root store is one `SlotBlock`: a fixed-length array of 64-bit cells,
//! addressed by index, allocated once and never resized. Generated code
//! reads a slot at `byte_offset_for_slots(index)`, the collector and the
//! snapshot writer walk a `SlotRange` of it with a single loop.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::gc::{ObjectPointerVisitor, ObjectRef};

pub type Slot = u64;
pub const SLOT_BYTES: usize = 8;

#[inline]
pub const fn byte_offset_for_slots(slots: usize) -> usize {
    slots * SLOT_BYTES
}

/// Half-open range `[from, to)` of slot indices.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotRange {
    pub from: usize,
    pub to: usize,
}

impl SlotRange {
    #[inline]
    pub const fn new(from: usize, to: usize) -> Self {
        assert!(from <= to);
        Self { from, to }
    }

    /// Range covering `first..=last`.
    #[inline]
    pub const fn inclusive(first: usize, last: usize) -> Self {
        Self::new(first, last + 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index >= self.from && index < self.to
    }

    /// Is `other` entirely inside `self`?
    pub fn covers(&self, other: SlotRange) -> bool {
        other.from >= self.from && other.to <= self.to
    }

    pub fn indices(&self) -> core::ops::Range<usize> {
        self.from..self.to
    }

    /// Byte extent of the range inside its block.
    pub fn byte_span(&self) -> (usize, usize) {
        (byte_offset_for_slots(self.from), byte_offset_for_slots(self.to))
    }
}

impl fmt::Debug for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

/// Fixed-size block of root slots.
///
/// Every cell is atomic so the block can be shared by reference between
/// isolates. Plain read-write slots use relaxed accesses and rely on the
/// single-writer discipline of bootstrap; the ordering of each access is
/// decided by the owning store's schema, not here.
pub struct SlotBlock {
    cells: Box<[AtomicU64]>,
}

impl SlotBlock {
    /// Create a block of `len` null slots.
    pub fn new(len: usize) -> Self {
        let cells = (0..len).map(|_| AtomicU64::new(0)).collect();
        Self { cells }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Range covering the whole block.
    #[inline]
    pub fn full_range(&self) -> SlotRange {
        SlotRange::new(0, self.cells.len())
    }

    #[inline]
    pub fn load(&self, index: usize, order: Ordering) -> ObjectRef {
        ObjectRef::from_slot(self.cells[index].load(order))
    }

    #[inline]
    pub fn store(&self, index: usize, value: ObjectRef, order: Ordering) {
        self.cells[index].store(value.to_slot(), order);
    }

    /// Visit every slot of `range` in index order.
    ///
    /// The visitor may rewrite the reference it is handed; the new value is
    /// written back only when it changed. Must only run while every mutator
    /// of the block is stopped, so relaxed accesses suffice.
    pub fn visit(&self, range: SlotRange, visitor: &mut dyn ObjectPointerVisitor) {
        debug_assert!(self.full_range().covers(range), "range {:?} outside block", range);
        visitor.visit_range_start(range);
        for index in range.indices() {
            let cell = &self.cells[index];
            let old = ObjectRef::from_slot(cell.load(Ordering::Relaxed));
            let mut slot = old;
            visitor.visit_pointer(index, &mut slot);
            if slot != old {
                cell.store(slot.to_slot(), Ordering::Relaxed);
            }
        }
    }

    /// Number of non-null slots in `range`.
    pub fn populated(&self, range: SlotRange) -> usize {
        range
            .indices()
            .filter(|&i| !self.load(i, Ordering::Relaxed).is_null())
            .count()
    }
}

impl fmt::Debug for SlotBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotBlock")
            .field("len", &self.len())
            .field("populated", &self.populated(self.full_range()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        assert_eq!(byte_offset_for_slots(3), 24);
        assert_eq!(SlotRange::new(2, 5).byte_span(), (16, 40));
    }

    #[test]
    fn test_range() {
        let r = SlotRange::inclusive(3, 7);
        assert_eq!(r, SlotRange::new(3, 8));
        assert_eq!(r.len(), 5);
        assert!(r.contains(7));
        assert!(!r.contains(8));
        assert!(r.covers(SlotRange::new(4, 8)));
        assert!(!r.covers(SlotRange::new(2, 4)));
    }

    #[test]
    fn test_visit_in_order_and_rewrite() {
        let block = SlotBlock::new(6);
        for i in 0..6 {
            block.store(i, ObjectRef::from_slot(i as u64 + 1), Ordering::Relaxed);
        }

        let mut seen = Vec::new();
        block.visit(SlotRange::new(1, 4), &mut |index: usize, slot: &mut ObjectRef| {
            seen.push(index);
            *slot = ObjectRef::from_slot(slot.to_slot() + 100);
        });

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(block.load(0, Ordering::Relaxed).to_slot(), 1);
        assert_eq!(block.load(1, Ordering::Relaxed).to_slot(), 102);
        assert_eq!(block.load(3, Ordering::Relaxed).to_slot(), 104);
        assert_eq!(block.load(4, Ordering::Relaxed).to_slot(), 5);
    }
}
