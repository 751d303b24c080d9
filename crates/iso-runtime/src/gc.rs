//! Root references and the collector's visitor interface.

use core::fmt;

use crate::slot::{Slot, SlotRange};

/// Handle to a heap object, or null.
///
/// Stored verbatim in a slot cell: `0` is null, any other value is the
/// object's heap index plus one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[repr(transparent)]
pub struct ObjectRef(Slot);

impl ObjectRef {
    pub const NULL: ObjectRef = ObjectRef(0);

    #[inline]
    pub const fn from_slot(slot: Slot) -> Self {
        ObjectRef(slot)
    }

    #[inline]
    pub const fn to_slot(self) -> Slot {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub(crate) fn from_heap_index(index: usize) -> Self {
        ObjectRef(index as Slot + 1)
    }

    /// Heap index of the object, `None` for null.
    #[inline]
    pub fn heap_index(self) -> Option<usize> {
        if self.is_null() {
            None
        } else {
            Some((self.0 - 1) as usize)
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.heap_index() {
            None => write!(f, "ObjectRef(null)"),
            Some(i) => write!(f, "ObjectRef(#{})", i),
        }
    }
}

/// Visitor over root slots, driven by the collector or the snapshot writer.
///
/// Called once per slot, in slot order, while every mutator is parked at a
/// safepoint. Implementations may rewrite `slot` (relocation) and must not
/// assume anything about null slots: they are visited too.
pub trait ObjectPointerVisitor {
    fn visit_pointer(&mut self, index: usize, slot: &mut ObjectRef);

    /// Called before the slots of a contiguous range are visited.
    fn visit_range_start(&mut self, _range: SlotRange) {}
}

impl<F> ObjectPointerVisitor for F
where
    F: FnMut(usize, &mut ObjectRef),
{
    #[inline]
    fn visit_pointer(&mut self, index: usize, slot: &mut ObjectRef) {
        self(index, slot)
    }
}

/// Collects every non-null root it visits.
#[derive(Debug, Default)]
pub struct RootCollector {
    pub roots: Vec<ObjectRef>,
    pub visited: usize,
}

impl RootCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectPointerVisitor for RootCollector {
    fn visit_pointer(&mut self, _index: usize, slot: &mut ObjectRef) {
        self.visited += 1;
        if !slot.is_null() {
            self.roots.push(*slot);
        }
    }
}
