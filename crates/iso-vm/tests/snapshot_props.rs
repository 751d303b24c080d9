//! Property tests: root image round trips and bootstrap ordering

use std::sync::Arc;

use iso_common_core::{LibraryId, SnapshotKind};
use iso_vm::{bootstrap, Field, GroupConfig, IsolateGroup, LazyGroup, ObjectStore, RootImage, SystemLibraries};
use proptest::prelude::*;

fn library_subset() -> impl Strategy<Value = Vec<LibraryId>> {
    proptest::sample::subsequence(LibraryId::ALL[1..].to_vec(), 0..LibraryId::COUNT).prop_map(|mut ids| {
        ids.push(LibraryId::Core);
        ids
    })
}

fn full_kind() -> impl Strategy<Value = SnapshotKind> {
    proptest::sample::select(SnapshotKind::FULL_KINDS.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_round_trip_preserves_partition(
        ids in library_subset(),
        kind in full_kind(),
        touched in proptest::collection::vec(any::<bool>(), LazyGroup::COUNT),
    ) {
        let config = GroupConfig::default().with_libraries(&ids);
        let group = IsolateGroup::create(config, &SystemLibraries::standard()).unwrap();
        let store = group.object_store();
        for (g, touch) in LazyGroup::ALL.into_iter().zip(touched) {
            if touch && ids.contains(&g.library()) {
                let first = Field::iter().find(|f| f.access().lazy_group() == Some(g)).unwrap();
                store.get(first).unwrap();
            }
        }

        let image = store
            .write_snapshot(&group.safepoint_handler().stop_the_world(), kind)
            .unwrap();
        let image = RootImage::from_json(&image.to_json().unwrap()).unwrap();

        let restored = ObjectStore::new(group.heap().clone());
        restored.read_snapshot(&image).unwrap();
        for index in image.range.indices() {
            let field = Field::from_index(index).unwrap();
            prop_assert_eq!(restored.peek(field), store.peek(field), "{}", field);
        }
        let mut expected = ids.clone();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(restored.registry().population_order(), expected);
    }

    #[test]
    fn test_population_order_is_declaration_order(ids in proptest::collection::vec(0u8..12, 1..24)) {
        let mut ids: Vec<LibraryId> = ids.into_iter().map(|raw| LibraryId::from_raw(raw).unwrap()).collect();
        ids.reverse();
        let store = ObjectStore::new(Arc::new(iso_runtime::Heap::unbounded()));
        bootstrap::load_libraries(&store, &SystemLibraries::standard(), &ids).unwrap();

        let order = store.registry().population_order();
        prop_assert!(order.windows(2).all(|w| w[0] < w[1]));
        for id in LibraryId::ALL {
            prop_assert_eq!(order.contains(&id), ids.contains(&id));
            prop_assert_eq!(store.bootstrap_library(id).is_null(), !ids.contains(&id));
        }
    }

    #[test]
    fn test_unknown_raw_library_rejected(raw in 12u8..) {
        let store = ObjectStore::new(Arc::new(iso_runtime::Heap::unbounded()));
        prop_assert!(store.bootstrap_library_raw(raw).is_err());
    }
}
