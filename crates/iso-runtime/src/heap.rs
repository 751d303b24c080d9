//! Object heap.
//!
//! The heap owns every object a root slot can point at. Objects are never
//! moved or freed by this module; collection is the collector's business and
//! happens through the root visitors.
//!
//! All state sits behind one mutex so the heap can be shared by every isolate
//! of a group. Capacity is counted in objects; exceeding it is reported as
//! `HeapError::OutOfMemory`, which is how bootstrap exercises its allocation
//! failure paths.

use indexmap::IndexMap;
use iso_common_core::{Nullability, ObjectKind};
use parking_lot::Mutex;

use crate::gc::ObjectRef;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
    #[error("out of memory: heap capacity of {capacity} objects exhausted")]
    OutOfMemory { capacity: usize },
    #[error("invalid object reference {0:?}")]
    InvalidRef(ObjectRef),
    #[error("{kind:?} object cannot hold elements")]
    NotAContainer { kind: ObjectKind },
}

/// A heap object.
///
/// `fields` holds ordered references (a type's class and arguments, an
/// array's elements), `members` holds named references (a library's or a
/// class's declarations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapObject {
    pub kind: ObjectKind,
    pub name: String,
    pub fields: Vec<ObjectRef>,
    pub members: IndexMap<String, ObjectRef>,
    pub nullability: Option<Nullability>,
    /// Payload of immediate objects (Smi).
    pub immediate: i64,
}

impl HeapObject {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            fields: Vec::new(),
            members: IndexMap::new(),
            nullability: None,
            immediate: 0,
        }
    }

    pub fn with_fields(mut self, fields: Vec<ObjectRef>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = Some(nullability);
        self
    }

    /// Structural identity used by canonical tables: same kind, name,
    /// fields and nullability. Members are not compared.
    pub fn same_shape(&self, other: &HeapObject) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.fields == other.fields
            && self.nullability == other.nullability
            && self.immediate == other.immediate
    }
}

struct HeapInner {
    objects: Vec<HeapObject>,
    capacity: usize,
}

impl HeapInner {
    fn alloc(&mut self, obj: HeapObject) -> Result<ObjectRef, HeapError> {
        if self.objects.len() >= self.capacity {
            tracing::warn!(
                capacity = self.capacity,
                kind = obj.kind.name(),
                name = %obj.name,
                "heap exhausted"
            );
            return Err(HeapError::OutOfMemory { capacity: self.capacity });
        }
        let r = ObjectRef::from_heap_index(self.objects.len());
        self.objects.push(obj);
        Ok(r)
    }

    fn get(&self, r: ObjectRef) -> Result<&HeapObject, HeapError> {
        r.heap_index()
            .and_then(|i| self.objects.get(i))
            .ok_or(HeapError::InvalidRef(r))
    }

    fn get_mut(&mut self, r: ObjectRef) -> Result<&mut HeapObject, HeapError> {
        r.heap_index()
            .and_then(|i| self.objects.get_mut(i))
            .ok_or(HeapError::InvalidRef(r))
    }
}

/// Shared object heap of one isolate group.
pub struct Heap {
    inner: Mutex<HeapInner>,
}

impl Heap {
    /// Create a heap holding at most `capacity` objects.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HeapInner {
                objects: Vec::new(),
                capacity,
            }),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Change the capacity. Objects already allocated are kept even if
    /// they exceed the new limit.
    pub fn set_capacity(&self, capacity: usize) {
        self.inner.lock().capacity = capacity;
    }

    pub fn allocate(&self, obj: HeapObject) -> Result<ObjectRef, HeapError> {
        self.inner.lock().alloc(obj)
    }

    pub fn alloc_named(&self, kind: ObjectKind, name: &str) -> Result<ObjectRef, HeapError> {
        self.allocate(HeapObject::new(kind, name))
    }

    pub fn alloc_smi(&self, value: i64) -> Result<ObjectRef, HeapError> {
        let mut obj = HeapObject::new(ObjectKind::Smi, "");
        obj.immediate = value;
        self.allocate(obj)
    }

    /// Allocate an array-like container holding `elements`.
    pub fn alloc_array(
        &self,
        kind: ObjectKind,
        name: &str,
        elements: Vec<ObjectRef>,
    ) -> Result<ObjectRef, HeapError> {
        if !kind.is_container() {
            return Err(HeapError::NotAContainer { kind });
        }
        self.allocate(HeapObject::new(kind, name).with_fields(elements))
    }

    /// Run `f` on the object behind `r`.
    pub fn with_object<R>(&self, r: ObjectRef, f: impl FnOnce(&HeapObject) -> R) -> Result<R, HeapError> {
        let inner = self.inner.lock();
        inner.get(r).map(f)
    }

    /// Snapshot of the object behind `r`.
    pub fn object(&self, r: ObjectRef) -> Result<HeapObject, HeapError> {
        self.with_object(r, |o| o.clone())
    }

    pub fn kind(&self, r: ObjectRef) -> Option<ObjectKind> {
        self.with_object(r, |o| o.kind).ok()
    }

    pub fn name(&self, r: ObjectRef) -> Option<String> {
        self.with_object(r, |o| o.name.clone()).ok()
    }

    /// Find a named declaration in a library or class.
    pub fn lookup_member(&self, owner: ObjectRef, name: &str) -> Option<ObjectRef> {
        self.with_object(owner, |o| o.members.get(name).copied())
            .ok()
            .flatten()
    }

    /// Add (or replace) a named declaration.
    pub fn add_member(&self, owner: ObjectRef, name: &str, member: ObjectRef) -> Result<(), HeapError> {
        let mut inner = self.inner.lock();
        inner.get(member)?;
        let obj = inner.get_mut(owner)?;
        obj.members.insert(name.to_string(), member);
        Ok(())
    }

    /// Append an element to a container.
    pub fn push_element(&self, container: ObjectRef, element: ObjectRef) -> Result<usize, HeapError> {
        let mut inner = self.inner.lock();
        let obj = inner.get_mut(container)?;
        if !obj.kind.is_container() {
            return Err(HeapError::NotAContainer { kind: obj.kind });
        }
        obj.fields.push(element);
        Ok(obj.fields.len())
    }

    pub fn elements(&self, container: ObjectRef) -> Result<Vec<ObjectRef>, HeapError> {
        self.with_object(container, |o| o.fields.clone())
    }

    /// Return the entry of `table` structurally equal to `candidate`,
    /// allocating and appending `candidate` if there is none.
    ///
    /// The lookup and the append happen under one lock, so two racing
    /// callers canonicalizing equal candidates get the same reference.
    pub fn canonicalize(&self, table: ObjectRef, candidate: HeapObject) -> Result<ObjectRef, HeapError> {
        let mut inner = self.inner.lock();
        let entries = {
            let t = inner.get(table)?;
            if !t.kind.is_container() {
                return Err(HeapError::NotAContainer { kind: t.kind });
            }
            t.fields.clone()
        };
        for entry in entries {
            if inner.get(entry)?.same_shape(&candidate) {
                return Ok(entry);
            }
        }
        let r = inner.alloc(candidate)?;
        inner.get_mut(table)?.fields.push(r);
        Ok(r)
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Heap")
            .field("objects", &inner.objects.len())
            .field("capacity", &inner.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_alloc_and_lookup() {
        let heap = Heap::unbounded();
        let lib = heap.alloc_named(ObjectKind::Library, "core").unwrap();
        let cls = heap.alloc_named(ObjectKind::Class, "Object").unwrap();
        heap.add_member(lib, "Object", cls).unwrap();

        assert_eq!(heap.lookup_member(lib, "Object"), Some(cls));
        assert_eq!(heap.lookup_member(lib, "List"), None);
        assert_eq!(heap.kind(cls), Some(ObjectKind::Class));
        assert_eq!(heap.name(lib).as_deref(), Some("core"));
        assert_eq!(heap.object_count(), 2);
    }

    #[test]
    fn test_capacity() {
        let heap = Heap::new(1);
        heap.alloc_named(ObjectKind::Class, "A").unwrap();
        assert_eq!(
            heap.alloc_named(ObjectKind::Class, "B"),
            Err(HeapError::OutOfMemory { capacity: 1 })
        );
        heap.set_capacity(2);
        assert!(heap.alloc_named(ObjectKind::Class, "B").is_ok());
    }

    #[test]
    fn test_invalid_ref() {
        let heap = Heap::unbounded();
        assert_eq!(
            heap.object(ObjectRef::NULL),
            Err(HeapError::InvalidRef(ObjectRef::NULL))
        );
        let bogus = ObjectRef::from_slot(42);
        assert_eq!(heap.kind(bogus), None);
    }

    #[test]
    fn test_containers() {
        let heap = Heap::unbounded();
        let a = heap.alloc_smi(1).unwrap();
        let list = heap
            .alloc_array(ObjectKind::GrowableObjectArray, "listeners", Vec::new())
            .unwrap();
        assert_eq!(heap.push_element(list, a), Ok(1));
        assert_eq!(heap.elements(list).unwrap(), vec![a]);
        assert_eq!(
            heap.push_element(a, list),
            Err(HeapError::NotAContainer { kind: ObjectKind::Smi })
        );
        assert!(heap.alloc_array(ObjectKind::Class, "x", Vec::new()).is_err());
    }

    #[test]
    fn test_canonicalize_dedups() {
        let heap = Heap::unbounded();
        let table = heap.alloc_array(ObjectKind::Array, "canonical_types", Vec::new()).unwrap();
        let cls = heap.alloc_named(ObjectKind::Class, "int").unwrap();

        let ty = || {
            HeapObject::new(ObjectKind::Type, "int")
                .with_fields(vec![cls])
                .with_nullability(Nullability::NonNullable)
        };
        let first = heap.canonicalize(table, ty()).unwrap();
        let second = heap.canonicalize(table, ty()).unwrap();
        let nullable = heap
            .canonicalize(table, ty().with_nullability(Nullability::Nullable))
            .unwrap();

        assert_eq!(first, second);
        assert_ne!(first, nullable);
        assert_eq!(heap.elements(table).unwrap(), vec![first, nullable]);
    }
}
