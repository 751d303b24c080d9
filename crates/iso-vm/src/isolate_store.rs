//! Per-isolate root slots.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use iso_common_core::ObjectKind;
use iso_runtime::{Heap, HeapError, HeapObject, ObjectPointerVisitor, ObjectRef, SlotBlock};

use crate::error::StoreError;
use crate::safepoint::SafepointScope;
use crate::schema::Access;

root_fields! {
    /// Slots of an isolate's private object store, in layout order.
    pub enum IsolateField in ISOLATE_STORE_SCHEMA {
        PreallocatedUnhandledException = "preallocated_unhandled_exception": UnhandledException, rw, boot;
        PreallocatedStackTrace = "preallocated_stack_trace": StackTrace, rw, boot;
        CallArgs1 = "call_args_1": Array, rw, boot;
        CallArgs2 = "call_args_2": Array, rw, boot;
        ResumeCapabilities = "resume_capabilities": GrowableObjectArray, ro, boot;
        ExitListeners = "exit_listeners": GrowableObjectArray, ro, boot;
        ErrorListeners = "error_listeners": GrowableObjectArray, ro, boot;
    }
}

const LISTENER_LISTS: [IsolateField; 3] = [
    IsolateField::ResumeCapabilities,
    IsolateField::ExitListeners,
    IsolateField::ErrorListeners,
];

/// Root table private to one isolate. Only its own isolate writes it, so no
/// slot needs atomic or lazy access.
pub struct IsolateObjectStore {
    slots: SlotBlock,
    heap: Arc<Heap>,
}

impl IsolateObjectStore {
    pub fn new(heap: Arc<Heap>) -> Self {
        debug_assert!(
            IsolateField::iter().all(|f| matches!(f.access(), Access::ReadOnly | Access::ReadWrite)),
            "isolate slots are never atomic or lazy"
        );
        Self {
            slots: SlotBlock::new(IsolateField::COUNT),
            heap,
        }
    }

    #[inline]
    pub fn get(&self, field: IsolateField) -> ObjectRef {
        self.slots.load(field.index(), Ordering::Relaxed)
    }

    pub fn set(&self, field: IsolateField, value: ObjectRef) {
        if field.access() == Access::ReadOnly {
            let prev = self.get(field);
            debug_assert!(
                prev.is_null() || prev == value,
                "read-only isolate slot `{}` written twice",
                field
            );
        }
        self.slots.store(field.index(), value, Ordering::Relaxed);
    }

    /// Append to one of the listener lists.
    pub fn add_listener(&self, list: IsolateField, listener: ObjectRef) -> Result<usize, StoreError> {
        debug_assert!(LISTENER_LISTS.contains(&list), "`{}` is not a listener list", list);
        let target = self.get(list);
        if target.is_null() {
            return Err(StoreError::Uninitialized(list.name()));
        }
        Ok(self.heap.push_element(target, listener)?)
    }

    pub fn visit_object_pointers(&self, _scope: &SafepointScope<'_>, visitor: &mut dyn ObjectPointerVisitor) {
        self.slots.visit(IsolateField::full_range(), visitor);
    }

    /// Build the preallocated exception, the scratch argument arrays and the
    /// listener lists. `out_of_memory` is the group's preallocated
    /// out-of-memory error.
    pub fn preallocate_objects(&self, out_of_memory: ObjectRef) -> Result<(), StoreError> {
        if out_of_memory.is_null() {
            return Err(StoreError::OutOfMemorySingleton);
        }
        let stack_trace = self
            .heap
            .alloc_named(ObjectKind::StackTrace, "preallocated")
            .map_err(oom("preallocated stack trace"))?;
        let exception = self
            .heap
            .allocate(
                HeapObject::new(ObjectKind::UnhandledException, "preallocated")
                    .with_fields(vec![out_of_memory, stack_trace]),
            )
            .map_err(oom("preallocated unhandled exception"))?;
        let args_1 = self
            .heap
            .alloc_array(ObjectKind::Array, "call_args_1", vec![ObjectRef::NULL])
            .map_err(oom("argument array"))?;
        let args_2 = self
            .heap
            .alloc_array(ObjectKind::Array, "call_args_2", vec![ObjectRef::NULL; 2])
            .map_err(oom("argument array"))?;

        self.set(IsolateField::PreallocatedStackTrace, stack_trace);
        self.set(IsolateField::PreallocatedUnhandledException, exception);
        self.set(IsolateField::CallArgs1, args_1);
        self.set(IsolateField::CallArgs2, args_2);
        self.reset_listener_lists()
            .map_err(|_| StoreError::OutOfMemory { what: "listener list" })
    }

    fn reset_listener_lists(&self) -> Result<(), StoreError> {
        for list in LISTENER_LISTS {
            let empty = self
                .heap
                .alloc_array(ObjectKind::GrowableObjectArray, list.name(), Vec::new())?;
            self.slots.store(list.index(), empty, Ordering::Relaxed);
        }
        Ok(())
    }
}

fn oom(what: &'static str) -> impl FnOnce(HeapError) -> StoreError {
    move |_| StoreError::OutOfMemory { what }
}

impl std::fmt::Debug for IsolateObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolateObjectStore").field("slots", &self.slots).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safepoint::SafepointHandler;

    fn prepared() -> (Arc<Heap>, IsolateObjectStore, ObjectRef) {
        let heap = Arc::new(Heap::unbounded());
        let oom = heap.alloc_named(ObjectKind::Instance, "OutOfMemoryError").unwrap();
        let store = IsolateObjectStore::new(heap.clone());
        store.preallocate_objects(oom).unwrap();
        (heap, store, oom)
    }

    #[test]
    fn test_preallocate() {
        let (heap, store, oom) = prepared();
        for f in IsolateField::iter() {
            assert!(!store.get(f).is_null(), "{}", f);
        }
        let exc = heap.object(store.get(IsolateField::PreallocatedUnhandledException)).unwrap();
        assert_eq!(exc.fields, vec![oom, store.get(IsolateField::PreallocatedStackTrace)]);
        assert_eq!(heap.elements(store.get(IsolateField::CallArgs2)).unwrap().len(), 2);
    }

    #[test]
    fn test_preallocate_needs_oom() {
        let store = IsolateObjectStore::new(Arc::new(Heap::unbounded()));
        assert_eq!(store.preallocate_objects(ObjectRef::NULL), Err(StoreError::OutOfMemorySingleton));
    }

    #[test]
    fn test_preallocate_out_of_memory() {
        let heap = Arc::new(Heap::new(2));
        let oom = heap.alloc_named(ObjectKind::Instance, "OutOfMemoryError").unwrap();
        let store = IsolateObjectStore::new(heap.clone());
        let err = store.preallocate_objects(oom).unwrap_err();
        assert_eq!(err, StoreError::OutOfMemory { what: "preallocated unhandled exception" });
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_listeners() {
        let (heap, store, oom) = prepared();
        assert_eq!(store.add_listener(IsolateField::ExitListeners, oom), Ok(1));
        assert_eq!(store.add_listener(IsolateField::ExitListeners, oom), Ok(2));
        assert_eq!(heap.elements(store.get(IsolateField::ExitListeners)).unwrap(), vec![oom, oom]);
        assert!(heap.elements(store.get(IsolateField::ErrorListeners)).unwrap().is_empty());
    }

    #[test]
    fn test_visit() {
        let (_heap, store, _) = prepared();
        let handler = SafepointHandler::new();
        let scope = handler.stop_the_world();
        let mut collector = iso_runtime::RootCollector::new();
        store.visit_object_pointers(&scope, &mut collector);
        assert_eq!(collector.visited, IsolateField::COUNT);
        assert_eq!(collector.roots.len(), IsolateField::COUNT);
    }
}
