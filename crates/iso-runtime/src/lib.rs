//! # iso-runtime
//!
//! Runtime data structures underneath the root stores:
//! - `gc` - `ObjectRef` handles and the root visitor interface
//! - `slot` - contiguous, index-addressed blocks of root slots
//! - `heap` - the object heap the roots point into

pub mod gc;
pub mod slot;
pub mod heap;

pub use gc::{ObjectPointerVisitor, ObjectRef, RootCollector};
pub use heap::{Heap, HeapError, HeapObject};
pub use slot::{Slot, SlotBlock, SlotRange, SLOT_BYTES};
