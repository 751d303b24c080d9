//! GC root scanning for an isolate group.

use std::sync::Arc;

use iso_runtime::ObjectPointerVisitor;

use crate::group::IsolateGroup;
use crate::isolate_store::IsolateObjectStore;
use crate::safepoint::SafepointScope;

impl IsolateGroup {
    /// Stop every mutator and visit all roots: the group store first, then
    /// each live isolate's store in spawn order.
    ///
    /// Must not be called from a thread that holds a `MutatorScope` of this
    /// group.
    pub fn visit_roots(&self, visitor: &mut dyn ObjectPointerVisitor) {
        let scope = self.safepoint_handler().stop_the_world();
        self.visit_roots_at(&scope, visitor);
    }

    /// Visit all roots at a safepoint the caller already reached.
    pub fn visit_roots_at(&self, scope: &SafepointScope<'_>, visitor: &mut dyn ObjectPointerVisitor) {
        self.object_store().visit_object_pointers(scope, visitor);
        let isolates: Vec<Arc<IsolateObjectStore>> =
            self.isolates.lock().iter().map(|(_, store)| store.clone()).collect();
        scan_isolates(scope, &isolates, visitor);
    }
}

fn scan_isolates(
    scope: &SafepointScope<'_>,
    isolates: &[Arc<IsolateObjectStore>],
    visitor: &mut dyn ObjectPointerVisitor,
) {
    for store in isolates {
        store.visit_object_pointers(scope, visitor);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GroupConfig;
    use crate::group::IsolateGroup;
    use crate::isolate_store::IsolateField;
    use crate::object_store::Field;
    use crate::system_libraries::SystemLibraries;
    use iso_runtime::RootCollector;

    #[test]
    fn test_visit_roots_covers_isolates() {
        let group = IsolateGroup::create(GroupConfig::default(), &SystemLibraries::standard()).unwrap();
        let _a = group.spawn_isolate().unwrap();
        let _b = group.spawn_isolate().unwrap();

        let mut collector = RootCollector::new();
        group.visit_roots(&mut collector);
        assert_eq!(collector.visited, Field::COUNT + 2 * IsolateField::COUNT);
        assert_eq!(group.safepoint_handler().safepoint_count(), 1);
    }
}
