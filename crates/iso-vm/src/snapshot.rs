//! Root partition of persisted images.
//!
//! Only the slot values of `ObjectStore::snapshot_range(kind)` are captured,
//! in slot order; the objects they point at belong to the image's heap
//! section, which is not this module's business.

use serde::{Deserialize, Serialize};

use iso_common_core::SnapshotKind;
use iso_runtime::{ObjectPointerVisitor, ObjectRef, SlotRange};

use crate::bootstrap::BootstrapRegistry;
use crate::error::StoreError;
use crate::object_store::{Field, ObjectStore};
use crate::safepoint::SafepointScope;

/// Root slots of one image, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootImage {
    pub kind: SnapshotKind,
    pub range: SlotRange,
    pub roots: Vec<ObjectRef>,
}

impl RootImage {
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::MalformedImage(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        serde_json::from_str(text).map_err(|e| StoreError::MalformedImage(e.to_string()))
    }
}

struct ImageWriter {
    roots: Vec<ObjectRef>,
}

impl ObjectPointerVisitor for ImageWriter {
    fn visit_pointer(&mut self, _index: usize, slot: &mut ObjectRef) {
        self.roots.push(*slot);
    }
}

struct ImageReader<'a> {
    from: usize,
    roots: &'a [ObjectRef],
}

impl ObjectPointerVisitor for ImageReader<'_> {
    fn visit_pointer(&mut self, index: usize, slot: &mut ObjectRef) {
        *slot = self.roots[index - self.from];
    }
}

impl ObjectStore {
    /// Capture the partition of an image of `kind`.
    pub fn write_snapshot(&self, scope: &SafepointScope<'_>, kind: SnapshotKind) -> Result<RootImage, StoreError> {
        let range = Self::snapshot_range(kind)?;
        let mut writer = ImageWriter {
            roots: Vec::with_capacity(range.len()),
        };
        self.visit_range(scope, range, &mut writer);
        tracing::debug!(%kind, slots = range.len(), "root partition written");
        Ok(RootImage {
            kind,
            range,
            roots: writer.roots,
        })
    }

    /// Replay an image into this freshly created store.
    ///
    /// Library slots present in the image are registered with the bootstrap
    /// registry in id order. Slots past the partition stay untouched.
    pub fn read_snapshot(&self, image: &RootImage) -> Result<(), StoreError> {
        debug_assert!(!self.is_sealed(), "read_snapshot into a sealed store");
        let expected = Self::snapshot_range(image.kind)?;
        if image.range != expected || image.roots.len() != expected.len() {
            return Err(StoreError::ImageMismatch {
                expected,
                found: image.range,
            });
        }

        let mut reader = ImageReader {
            from: expected.from,
            roots: &image.roots,
        };
        // The store is not shared yet, so no safepoint is needed.
        self.slots().visit(expected, &mut reader);

        for field in expected.indices().filter_map(Field::from_index) {
            if let Some(id) = BootstrapRegistry::id_of(field) {
                if !self.peek(field).is_null() {
                    self.registry().record(id);
                }
            }
        }
        tracing::debug!(kind = %image.kind, slots = expected.len(), "root partition read");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap;
    use crate::object_store::Field;
    use crate::safepoint::SafepointHandler;
    use crate::system_libraries::SystemLibraries;
    use iso_common_core::LibraryId;
    use iso_runtime::Heap;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn bootstrapped(heap: &Arc<Heap>) -> ObjectStore {
        let store = ObjectStore::new(heap.clone());
        bootstrap::load_libraries(&store, &SystemLibraries::standard(), &[LibraryId::Core, LibraryId::Async])
            .unwrap();
        store.init_known_objects().unwrap();
        store.init_stubs().unwrap();
        store.preallocate_objects().unwrap();
        store
    }

    #[test]
    fn test_round_trip() {
        let heap = Arc::new(Heap::unbounded());
        let source = bootstrapped(&heap);
        let handler = SafepointHandler::new();

        for kind in SnapshotKind::FULL_KINDS {
            let image = source.write_snapshot(&handler.stop_the_world(), kind).unwrap();
            let restored = ObjectStore::new(heap.clone());
            restored.read_snapshot(&image).unwrap();

            for index in image.range.indices() {
                let field = Field::from_index(index).unwrap();
                assert_eq!(restored.peek(field), source.peek(field), "{} / {}", kind, field);
            }
            assert_eq!(
                restored.registry().population_order(),
                vec![LibraryId::Core, LibraryId::Async]
            );
            if !kind.includes_code() {
                assert!(restored.peek(Field::SlowTtsStub).is_null());
            }
        }
    }

    #[test]
    fn test_json_round_trip() {
        let heap = Arc::new(Heap::unbounded());
        let source = bootstrapped(&heap);
        let handler = SafepointHandler::new();
        let image = source.write_snapshot(&handler.stop_the_world(), SnapshotKind::FullJit).unwrap();
        let text = image.to_json().unwrap();
        assert!(text.contains("\"full-jit\""));
        assert_eq!(RootImage::from_json(&text).unwrap(), image);
    }

    #[test]
    fn test_non_full_kinds_rejected() {
        let store = ObjectStore::new(Arc::new(Heap::unbounded()));
        let handler = SafepointHandler::new();
        assert_eq!(
            store.write_snapshot(&handler.stop_the_world(), SnapshotKind::Message),
            Err(StoreError::NoSnapshotPartition(SnapshotKind::Message))
        );
    }

    #[test]
    fn test_mismatched_image() {
        let heap = Arc::new(Heap::unbounded());
        let source = bootstrapped(&heap);
        let handler = SafepointHandler::new();
        let mut image = source.write_snapshot(&handler.stop_the_world(), SnapshotKind::Full).unwrap();
        image.kind = SnapshotKind::FullAot;

        let restored = ObjectStore::new(heap);
        let err = restored.read_snapshot(&image).unwrap_err();
        assert!(matches!(err, StoreError::ImageMismatch { .. }));
        assert_eq!(restored.populated(), 0);
    }
}
