//! Machine-readable description of an object store.

use serde::Serialize;

use iso_common_core::SnapshotKind;

use crate::object_store::{Field, ObjectStore};

#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub index: usize,
    pub offset: usize,
    pub name: &'static str,
    pub kind: &'static str,
    pub access: &'static str,
    pub populated: bool,
    /// Name of the object the slot points at, if it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeReport {
    pub kind: SnapshotKind,
    pub from: usize,
    pub to: usize,
    pub slots: usize,
    /// Byte offsets `[start, end)` of the range inside the store.
    pub bytes: (usize, usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreReport {
    pub slots: Vec<SlotReport>,
    pub snapshot_ranges: Vec<RangeReport>,
    pub libraries: Vec<String>,
    pub populated: usize,
    pub heap_objects: usize,
}

impl StoreReport {
    /// Describe the schema alone, as for an empty store.
    pub fn layout() -> Vec<SlotReport> {
        Field::iter()
            .map(|f| SlotReport {
                index: f.index(),
                offset: f.offset(),
                name: f.name(),
                kind: f.kind().name(),
                access: f.access().tag(),
                populated: false,
                object: None,
            })
            .collect()
    }

    pub fn snapshot_ranges() -> Vec<RangeReport> {
        SnapshotKind::FULL_KINDS
            .into_iter()
            .filter_map(|kind| {
                ObjectStore::snapshot_range(kind).ok().map(|r| RangeReport {
                    kind,
                    from: r.from,
                    to: r.to,
                    slots: r.len(),
                    bytes: r.byte_span(),
                })
            })
            .collect()
    }

    /// Describe the current contents of `store`.
    pub fn capture(store: &ObjectStore) -> Self {
        let heap = store.heap();
        let slots = Self::layout()
            .into_iter()
            .zip(Field::iter())
            .map(|(mut slot, field)| {
                let value = store.peek(field);
                slot.populated = !value.is_null();
                slot.object = heap.name(value).filter(|n| !n.is_empty());
                slot
            })
            .collect();
        Self {
            slots,
            snapshot_ranges: Self::snapshot_ranges(),
            libraries: store
                .registry()
                .population_order()
                .into_iter()
                .map(|id| id.to_string())
                .collect(),
            populated: store.populated(),
            heap_objects: heap.object_count(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupConfig;
    use crate::group::IsolateGroup;
    use crate::system_libraries::SystemLibraries;
    use iso_common_core::LibraryId;

    #[test]
    fn test_layout() {
        let layout = StoreReport::layout();
        assert_eq!(layout.len(), Field::COUNT);
        assert_eq!(layout[0].name, "list_class");
        assert_eq!(layout[0].access, "lazy-core");
        assert_eq!(layout[1].offset, 8);
    }

    #[test]
    fn test_capture() {
        let config = GroupConfig::default().with_libraries(&[LibraryId::Core, LibraryId::Isolate]);
        let group = IsolateGroup::create(config, &SystemLibraries::standard()).unwrap();
        let report = StoreReport::capture(group.object_store());

        assert_eq!(report.libraries, vec!["sys:core", "sys:isolate"]);
        let object_class = &report.slots[Field::ObjectClass.index()];
        assert!(object_class.populated);
        assert_eq!(object_class.object.as_deref(), Some("Object"));
        assert!(!report.slots[Field::ListClass.index()].populated);
        assert_eq!(report.snapshot_ranges.len(), 4);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"global_object_pool\""));
        assert!(json.contains("\"full-core\""));
    }
}
