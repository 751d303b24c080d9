//! Isolate groups and isolates.
//!
//! An `IsolateGroup` owns the heap, the shared object store and the
//! safepoint handler. Every `Isolate` spawned from it owns a private
//! `IsolateObjectStore` and is registered with the group until dropped.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use iso_common_core::{ExperimentalFeature, LibraryId};
use iso_runtime::Heap;

use crate::bootstrap;
use crate::config::{FeatureSet, GroupConfig};
use crate::error::StoreError;
use crate::isolate_store::IsolateObjectStore;
use crate::known_objects;
use crate::object_store::{Field, ObjectStore};
use crate::safepoint::{MutatorScope, SafepointHandler};
use crate::snapshot::RootImage;
use crate::system_libraries::SystemLibraries;

pub type IsolateId = u32;

pub struct IsolateGroup {
    config: GroupConfig,
    features: FeatureSet,
    heap: Arc<Heap>,
    object_store: ObjectStore,
    safepoint: SafepointHandler,
    pub(crate) isolates: Mutex<Vec<(IsolateId, Arc<IsolateObjectStore>)>>,
    next_isolate_id: AtomicU32,
}

impl IsolateGroup {
    /// Bootstrap a new group: load the configured libraries in dependency
    /// order, then populate known objects, stubs and preallocated errors.
    pub fn create(config: GroupConfig, libraries: &SystemLibraries) -> Result<Arc<Self>, StoreError> {
        let features = config.features()?;
        if !config.libraries.contains(&LibraryId::Core) {
            return Err(StoreError::LibraryNotLoaded(LibraryId::Core));
        }
        let heap = Arc::new(Heap::new(config.heap_capacity));
        let object_store = ObjectStore::new(heap.clone());

        let result = bootstrap::load_libraries(&object_store, libraries, &config.libraries)
            .and_then(|_| object_store.init_known_objects())
            .and_then(|_| object_store.init_stubs())
            .and_then(|_| object_store.preallocate_objects());
        if let Err(err) = result {
            tracing::error!(%err, fatal = err.is_fatal(), "isolate group bootstrap failed");
            return Err(err);
        }

        let group = Self::assemble(config, features, heap, object_store);
        tracing::info!(
            libraries = group.object_store.registry().loaded().len(),
            objects = group.heap.object_count(),
            "isolate group created"
        );
        Ok(group)
    }

    /// Rebuild a group from a root image over an already restored heap.
    /// Code is regenerated when the image does not carry it.
    pub fn restore(config: GroupConfig, heap: Arc<Heap>, image: &RootImage) -> Result<Arc<Self>, StoreError> {
        let features = config.features()?;
        let object_store = ObjectStore::new(heap.clone());
        object_store.read_snapshot(image)?;
        known_objects::refill(&object_store, image.range)?;
        if !image.kind.includes_code() {
            object_store.init_stubs()?;
        }
        let group = Self::assemble(config, features, heap, object_store);
        tracing::info!(kind = %image.kind, "isolate group restored");
        Ok(group)
    }

    fn assemble(config: GroupConfig, features: FeatureSet, heap: Arc<Heap>, object_store: ObjectStore) -> Arc<Self> {
        if config.seal_after_bootstrap {
            object_store.seal();
        }
        Arc::new(Self {
            config,
            features,
            heap,
            object_store,
            safepoint: SafepointHandler::new(),
            isolates: Mutex::new(Vec::new()),
            next_isolate_id: AtomicU32::new(1),
        })
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    pub fn object_store(&self) -> &ObjectStore {
        &self.object_store
    }

    pub fn safepoint_handler(&self) -> &SafepointHandler {
        &self.safepoint
    }

    pub fn feature_enabled(&self, feature: ExperimentalFeature) -> bool {
        self.features.is_enabled(feature)
    }

    pub fn isolate_count(&self) -> usize {
        self.isolates.lock().len()
    }

    /// Start a new isolate with its own preallocated roots.
    pub fn spawn_isolate(self: &Arc<Self>) -> Result<Isolate, StoreError> {
        let store = Arc::new(IsolateObjectStore::new(self.heap.clone()));
        store.preallocate_objects(self.object_store.peek(Field::OutOfMemory))?;

        let id = self.next_isolate_id.fetch_add(1, Ordering::Relaxed);
        self.isolates.lock().push((id, store.clone()));
        tracing::info!(isolate = id, "isolate started");
        Ok(Isolate {
            id,
            group: self.clone(),
            store,
        })
    }

    fn unregister(&self, id: IsolateId) {
        self.isolates.lock().retain(|(i, _)| *i != id);
        tracing::info!(isolate = id, "isolate shut down");
    }
}

impl std::fmt::Debug for IsolateGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolateGroup")
            .field("object_store", &self.object_store)
            .field("isolates", &self.isolate_count())
            .finish()
    }
}

/// A running isolate. Unregisters from its group when dropped.
pub struct Isolate {
    id: IsolateId,
    group: Arc<IsolateGroup>,
    store: Arc<IsolateObjectStore>,
}

impl Isolate {
    pub fn id(&self) -> IsolateId {
        self.id
    }

    pub fn group(&self) -> &Arc<IsolateGroup> {
        &self.group
    }

    pub fn object_store(&self) -> &IsolateObjectStore {
        &self.store
    }

    /// Enter managed code; safepoints wait until the scope is dropped.
    pub fn enter(&self) -> MutatorScope<'_> {
        self.group.safepoint.enter_mutator()
    }
}

impl Drop for Isolate {
    fn drop(&mut self) {
        self.group.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolate_store::IsolateField;
    use iso_common_core::SnapshotKind;

    #[test]
    fn test_create_and_spawn() {
        let group = IsolateGroup::create(GroupConfig::default(), &SystemLibraries::standard()).unwrap();
        assert!(group.object_store().is_sealed());
        assert_eq!(group.object_store().missing_required(), Vec::<Field>::new());

        let a = group.spawn_isolate().unwrap();
        let b = group.spawn_isolate().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(group.isolate_count(), 2);
        assert_ne!(
            a.object_store().get(IsolateField::PreallocatedStackTrace),
            b.object_store().get(IsolateField::PreallocatedStackTrace)
        );
        drop(a);
        assert_eq!(group.isolate_count(), 1);
    }

    #[test]
    fn test_core_required() {
        let config = GroupConfig::default().with_libraries(&[LibraryId::Async]);
        assert_eq!(
            IsolateGroup::create(config, &SystemLibraries::standard()).unwrap_err(),
            StoreError::LibraryNotLoaded(LibraryId::Core)
        );
    }

    #[test]
    fn test_features() {
        let config = GroupConfig::default().with_experiments(["no-enhanced-enums"]);
        let group = IsolateGroup::create(config, &SystemLibraries::standard()).unwrap();
        assert!(!group.feature_enabled(ExperimentalFeature::EnhancedEnums));
        assert!(group.feature_enabled(ExperimentalFeature::TripleShift));
    }

    #[test]
    fn test_restore_regenerates_code() {
        let group = IsolateGroup::create(GroupConfig::default(), &SystemLibraries::standard()).unwrap();
        let image = group
            .object_store()
            .write_snapshot(&group.safepoint_handler().stop_the_world(), SnapshotKind::Full)
            .unwrap();

        let restored = IsolateGroup::restore(GroupConfig::default(), group.heap().clone(), &image).unwrap();
        let store = restored.object_store();
        assert!(!store.peek(Field::SlowTtsStub).is_null());
        assert_ne!(store.peek(Field::SlowTtsStub), group.object_store().peek(Field::SlowTtsStub));
        assert_eq!(store.peek(Field::ObjectClass), group.object_store().peek(Field::ObjectClass));
        assert!(restored.spawn_isolate().is_ok());
    }

    #[test]
    fn test_restore_fills_required_slots() {
        let group = IsolateGroup::create(GroupConfig::default(), &SystemLibraries::standard()).unwrap();
        for kind in SnapshotKind::FULL_KINDS {
            let image = group
                .object_store()
                .write_snapshot(&group.safepoint_handler().stop_the_world(), kind)
                .unwrap();
            let restored = IsolateGroup::restore(GroupConfig::default(), group.heap().clone(), &image).unwrap();
            let store = restored.object_store();
            assert_eq!(store.registry().loaded(), LibraryId::ALL.to_vec(), "{}", kind);
            assert_eq!(store.missing_required(), Vec::<Field>::new(), "{}", kind);
            assert_eq!(
                store.peek(Field::FfiPointerClass),
                group.object_store().peek(Field::FfiPointerClass),
                "{}",
                kind
            );
        }
    }
}
