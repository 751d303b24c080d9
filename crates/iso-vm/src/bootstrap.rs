//! Bootstrap library registry and loader.
//!
//! The library references themselves live in the group store (one slot per
//! `LibraryId`, laid out in id order); the registry maps ids to those slots
//! and records the order in which they were populated.

use parking_lot::Mutex;

use iso_common_core::{LibraryId, ObjectKind};
use iso_runtime::ObjectRef;

use crate::error::StoreError;
use crate::object_store::{Field, ObjectStore};
use crate::system_libraries::{LibraryDef, SystemLibraries};

#[derive(Debug, Default)]
pub struct BootstrapRegistry {
    population: Mutex<Vec<LibraryId>>,
}

impl BootstrapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store slot holding the library for `id`.
    pub const fn field(id: LibraryId) -> Field {
        match id {
            LibraryId::Core => Field::CoreLibrary,
            LibraryId::Async => Field::AsyncLibrary,
            LibraryId::Collection => Field::CollectionLibrary,
            LibraryId::Convert => Field::ConvertLibrary,
            LibraryId::Developer => Field::DeveloperLibrary,
            LibraryId::Ffi => Field::FfiLibrary,
            LibraryId::Internal => Field::InternalLibrary,
            LibraryId::Isolate => Field::IsolateLibrary,
            LibraryId::Math => Field::MathLibrary,
            LibraryId::Mirrors => Field::MirrorsLibrary,
            LibraryId::TypedData => Field::TypedDataLibrary,
            LibraryId::VmService => Field::VmServiceLibrary,
        }
    }

    /// Library id owning `field`, if it is a library slot.
    pub fn id_of(field: Field) -> Option<LibraryId> {
        LibraryId::ALL.into_iter().find(|id| Self::field(*id) == field)
    }

    /// Note that `id` was populated. Ids must arrive in increasing order;
    /// re-populating an id already seen is allowed.
    pub(crate) fn record(&self, id: LibraryId) {
        let mut population = self.population.lock();
        if population.contains(&id) {
            return;
        }
        if let Some(&last) = population.last() {
            debug_assert!(
                last < id,
                "bootstrap library {} populated after {}, out of dependency order",
                id,
                last
            );
        }
        population.push(id);
    }

    /// Ids in the order they were populated.
    pub fn population_order(&self) -> Vec<LibraryId> {
        self.population.lock().clone()
    }

    /// Populated ids in declaration order.
    pub fn loaded(&self) -> Vec<LibraryId> {
        let mut ids = self.population_order();
        ids.sort_unstable();
        ids
    }

    pub fn is_loaded(&self, id: LibraryId) -> bool {
        self.population.lock().contains(&id)
    }
}

/// Load the bootstrap libraries named by `ids` into `store`, in dependency
/// order regardless of the order of `ids`.
pub fn load_libraries(
    store: &ObjectStore,
    libraries: &SystemLibraries,
    ids: &[LibraryId],
) -> Result<(), StoreError> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    if store.peek(Field::Libraries).is_null() {
        let list = store
            .heap()
            .alloc_array(ObjectKind::GrowableObjectArray, "libraries", Vec::new())?;
        store.set(Field::Libraries, list);
    }
    let list = store.peek(Field::Libraries);

    for id in ids {
        let def = libraries
            .get(id)
            .ok_or(StoreError::MissingLibraryDefinition(id))?;
        let library = load_library(store, def)?;
        store.set_bootstrap_library(id, library);
        store.heap().push_element(list, library)?;
        tracing::debug!(library = %id, "bootstrap library loaded");
    }
    Ok(())
}

fn load_library(store: &ObjectStore, def: &LibraryDef) -> Result<ObjectRef, StoreError> {
    let heap = store.heap();
    let library = heap.alloc_named(ObjectKind::Library, def.id.name())?;
    for class in &def.classes {
        let cls = heap.alloc_named(ObjectKind::Class, class.name)?;
        for member in &class.members {
            let m = heap.alloc_named(member.kind, member.name)?;
            heap.add_member(cls, member.name, m)?;
        }
        heap.add_member(library, class.name, cls)?;
    }
    for function in &def.functions {
        let f = heap.alloc_named(ObjectKind::Function, function)?;
        heap.add_member(library, function, f)?;
    }
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso_runtime::Heap;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_field_mapping_is_contiguous() {
        for (i, id) in LibraryId::ALL.into_iter().enumerate() {
            let field = BootstrapRegistry::field(id);
            assert_eq!(field.index(), Field::CoreLibrary.index() + i);
            assert_eq!(BootstrapRegistry::id_of(field), Some(id));
        }
        assert_eq!(BootstrapRegistry::id_of(Field::ObjectClass), None);
    }

    #[test]
    fn test_load_sorts_ids() {
        let store = ObjectStore::new(Arc::new(Heap::unbounded()));
        load_libraries(
            &store,
            &SystemLibraries::standard(),
            &[LibraryId::Isolate, LibraryId::Core, LibraryId::Async, LibraryId::Core],
        )
        .unwrap();
        assert_eq!(
            store.registry().population_order(),
            vec![LibraryId::Core, LibraryId::Async, LibraryId::Isolate]
        );
        let list = store.peek(Field::Libraries);
        assert_eq!(store.heap().elements(list).unwrap().len(), 3);
        assert!(store.bootstrap_library(LibraryId::Collection).is_null());
    }

    #[test]
    fn test_missing_definition() {
        let store = ObjectStore::new(Arc::new(Heap::unbounded()));
        let mut libs = SystemLibraries::standard();
        libs.remove(LibraryId::Math);
        assert_eq!(
            load_libraries(&store, &libs, &[LibraryId::Core, LibraryId::Math]),
            Err(StoreError::MissingLibraryDefinition(LibraryId::Math))
        );
    }

    #[test]
    #[should_panic(expected = "out of dependency order")]
    #[cfg(debug_assertions)]
    fn test_out_of_order_population() {
        let registry = BootstrapRegistry::new();
        registry.record(LibraryId::Async);
        registry.record(LibraryId::Core);
    }
}
