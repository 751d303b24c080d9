//! Lazy population of rarely used root groups.
//!
//! Each group has a state word:
//!
//! ```text
//! Uninitialized --CAS--> Running --> Initialized
//!                               \--> Failed
//! ```
//!
//! The thread whose compare-and-swap installs `Running` runs the group
//! initializer; every other first-toucher parks on the group's condition
//! variable until the state leaves `Running`. A failed initializer is never
//! retried.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use iso_common_core::{LibraryId, Nullability};

use crate::error::StoreError;
use crate::object_store::{Field, ObjectStore};
use crate::schema::LazyGroup;

const UNINITIALIZED: u8 = 0;
const RUNNING: u8 = 1;
const INITIALIZED: u8 = 2;
const FAILED: u8 = 3;

struct LazyCell {
    state: AtomicU8,
    runs: AtomicUsize,
    runner: Mutex<Option<ThreadId>>,
    failure: Mutex<Option<StoreError>>,
    lock: Mutex<()>,
    done: Condvar,
}

impl LazyCell {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINITIALIZED),
            runs: AtomicUsize::new(0),
            runner: Mutex::new(None),
            failure: Mutex::new(None),
            lock: Mutex::new(()),
            done: Condvar::new(),
        }
    }

    fn ensure(
        &self,
        group: LazyGroup,
        init: impl FnOnce() -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        match self.state.load(Ordering::Acquire) {
            INITIALIZED => return Ok(()),
            FAILED => return Err(self.failed(group)),
            _ => {}
        }

        if self
            .state
            .compare_exchange(UNINITIALIZED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return self.wait(group);
        }

        *self.runner.lock() = Some(thread::current().id());
        self.runs.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%group, "running lazy initializer");

        let mut running = Running {
            cell: self,
            group,
            finished: false,
        };
        let result = init();
        let next = match &result {
            Ok(()) => INITIALIZED,
            Err(err) => {
                tracing::error!(%group, %err, "lazy initializer failed");
                *self.failure.lock() = Some(err.clone());
                FAILED
            }
        };
        running.finished = true;
        self.finish(next);
        result
    }

    /// Leave `RUNNING` and wake the waiters.
    fn finish(&self, next: u8) {
        *self.runner.lock() = None;
        {
            let _guard = self.lock.lock();
            self.state.store(next, Ordering::Release);
        }
        self.done.notify_all();
    }

    fn wait(&self, group: LazyGroup) -> Result<(), StoreError> {
        debug_assert!(
            *self.runner.lock() != Some(thread::current().id()),
            "lazy {} initializer re-entered its own group",
            group
        );
        let mut guard = self.lock.lock();
        loop {
            match self.state.load(Ordering::Acquire) {
                INITIALIZED => return Ok(()),
                FAILED => return Err(self.failed(group)),
                _ => self.done.wait(&mut guard),
            }
        }
    }

    fn failed(&self, group: LazyGroup) -> StoreError {
        let source = self
            .failure
            .lock()
            .clone()
            .unwrap_or(StoreError::Uninitialized(group.name()));
        StoreError::LazyInitFailed {
            group,
            source: Box::new(source),
        }
    }
}

/// Marks the group failed if its initializer unwinds.
struct Running<'a> {
    cell: &'a LazyCell,
    group: LazyGroup,
    finished: bool,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!(group = %self.group, "lazy initializer panicked");
            *self.cell.failure.lock() = Some(StoreError::InitializerPanicked(self.group));
            self.cell.finish(FAILED);
        }
    }
}

/// Per-store state of the lazy groups.
pub(crate) struct LazyInit {
    cells: [LazyCell; LazyGroup::COUNT],
}

impl LazyInit {
    pub(crate) fn new() -> Self {
        Self {
            cells: [LazyCell::new(), LazyCell::new(), LazyCell::new()],
        }
    }

    /// Make sure `group` is initialized, running `init` if this caller wins
    /// the race.
    pub(crate) fn ensure(
        &self,
        group: LazyGroup,
        init: impl FnOnce() -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        self.cells[group.index()].ensure(group, init)
    }

    pub(crate) fn runs(&self, group: LazyGroup) -> usize {
        self.cells[group.index()].runs.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Group initializers
// =============================================================================
//
// Each initializer resolves everything first and publishes afterwards, so a
// failed lookup leaves every slot of the group null. Initializers only read
// slots outside their own group.

pub(crate) fn run(group: LazyGroup, store: &ObjectStore) -> Result<(), StoreError> {
    match group {
        LazyGroup::Core => init_core(store),
        LazyGroup::Async => init_async(store),
        LazyGroup::Isolate => init_isolate(store),
    }
}

fn init_core(store: &ObjectStore) -> Result<(), StoreError> {
    let list_class = store.lookup(LibraryId::Core, "List")?;
    let map_class = store.lookup(LibraryId::Core, "Map")?;
    let equals = store.lookup(LibraryId::Core, "Object._objectEquals")?;
    let hash_code = store.lookup(LibraryId::Core, "Object._objectHashCode")?;
    let to_string = store.lookup(LibraryId::Core, "Object._objectToString")?;

    let list_type = store.canonical_type(list_class, &[], Nullability::NonNullable)?;
    let map_type = store.canonical_type(map_class, &[], Nullability::NonNullable)?;

    store.publish_lazy(
        LazyGroup::Core,
        &[
            (Field::ListClass, list_class),
            (Field::NonNullableListRareType, list_type),
            (Field::NonNullableMapRareType, map_type),
            (Field::ObjectEqualsFunction, equals),
            (Field::ObjectHashCodeFunction, hash_code),
            (Field::ObjectToStringFunction, to_string),
        ],
    );
    Ok(())
}

fn init_async(store: &ObjectStore) -> Result<(), StoreError> {
    let future_class = store.lookup(LibraryId::Async, "Future")?;
    let never_type = store.require(Field::NeverType)?;
    let null_type = store.require(Field::NullType)?;

    let rare = store.canonical_type(future_class, &[], Nullability::NonNullable)?;
    let future_never = store.canonical_type(future_class, &[never_type], Nullability::NonNullable)?;
    let future_null = store.canonical_type(future_class, &[null_type], Nullability::Nullable)?;

    store.publish_lazy(
        LazyGroup::Async,
        &[
            (Field::NonNullableFutureRareType, rare),
            (Field::NonNullableFutureNeverType, future_never),
            (Field::NullableFutureNullType, future_null),
        ],
    );
    Ok(())
}

fn init_isolate(store: &ObjectStore) -> Result<(), StoreError> {
    let lookup_handler = store.lookup(LibraryId::Isolate, "_RawReceivePort._lookupHandler")?;
    let lookup_open_ports = store.lookup(LibraryId::Isolate, "_RawReceivePort._lookupOpenPorts")?;
    let handle_message = store.lookup(LibraryId::Isolate, "_RawReceivePort._handleMessage")?;

    store.publish_lazy(
        LazyGroup::Isolate,
        &[
            (Field::LookupPortHandler, lookup_handler),
            (Field::LookupOpenPorts, lookup_open_ports),
            (Field::HandleMessageFunction, handle_message),
        ],
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_cell_runs_once() {
        let cell = LazyCell::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            cell.ensure(LazyGroup::Core, || {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
        }
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(cell.runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_cell_failure_is_terminal() {
        let cell = LazyCell::new();
        let err = cell
            .ensure(LazyGroup::Async, || Err(StoreError::LibraryNotLoaded(LibraryId::Async)))
            .unwrap_err();
        assert_eq!(err, StoreError::LibraryNotLoaded(LibraryId::Async));

        let again = cell.ensure(LazyGroup::Async, || Ok(())).unwrap_err();
        assert_eq!(
            again,
            StoreError::LazyInitFailed {
                group: LazyGroup::Async,
                source: Box::new(StoreError::LibraryNotLoaded(LibraryId::Async)),
            }
        );
        assert_eq!(cell.runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_cell_panic_fails_group() {
        let cell = LazyCell::new();
        let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
            cell.ensure(LazyGroup::Core, || panic!("initializer blew up"))
        }));
        assert!(unwound.is_err());
        assert_eq!(
            cell.ensure(LazyGroup::Core, || Ok(())),
            Err(StoreError::LazyInitFailed {
                group: LazyGroup::Core,
                source: Box::new(StoreError::InitializerPanicked(LazyGroup::Core)),
            })
        );
        assert_eq!(cell.runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_cell_panic_wakes_waiters() {
        let cell = Arc::new(LazyCell::new());
        let runner = {
            let cell = cell.clone();
            thread::spawn(move || {
                panic::catch_unwind(AssertUnwindSafe(|| {
                    cell.ensure(LazyGroup::Async, || {
                        thread::sleep(std::time::Duration::from_millis(50));
                        panic!("initializer blew up")
                    })
                }))
                .is_err()
            })
        };
        while cell.state.load(Ordering::Acquire) == UNINITIALIZED {
            thread::yield_now();
        }
        let waited = cell.ensure(LazyGroup::Async, || Ok(()));
        assert!(matches!(waited, Err(StoreError::LazyInitFailed { group: LazyGroup::Async, .. })));
        assert!(runner.join().unwrap());
    }

    #[test]
    fn test_cell_waiters_see_result() {
        let cell = Arc::new(LazyCell::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                let calls = calls.clone();
                thread::spawn(move || {
                    cell.ensure(LazyGroup::Isolate, || {
                        thread::sleep(std::time::Duration::from_millis(20));
                        calls.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    })
                })
            })
            .collect();
        for t in threads {
            assert_eq!(t.join().unwrap(), Ok(()));
        }
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
