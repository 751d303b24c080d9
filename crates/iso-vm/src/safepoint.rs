//! Safepoint handling.
//!
//! Mutators hold a `MutatorScope` while they may touch roots; the collector
//! (or the snapshot writer) takes a `SafepointScope`, which waits until every
//! mutator scope is gone and keeps new ones out until it is dropped. Root
//! visitation APIs take `&SafepointScope` as proof.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct SafepointHandler {
    lock: RwLock<()>,
    safepoints: AtomicU64,
}

/// A mutator running managed code.
pub struct MutatorScope<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

/// Every mutator of the group is stopped.
pub struct SafepointScope<'a> {
    _guard: RwLockWriteGuard<'a, ()>,
    epoch: u64,
}

impl SafepointScope<'_> {
    /// Sequence number of this safepoint, starting at 1.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl SafepointHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter managed code. Blocks while a safepoint is in progress.
    pub fn enter_mutator(&self) -> MutatorScope<'_> {
        MutatorScope {
            _guard: self.lock.read(),
        }
    }

    /// Stop every mutator. Must not be called by a thread holding a
    /// `MutatorScope` of the same handler.
    pub fn stop_the_world(&self) -> SafepointScope<'_> {
        let guard = self.lock.write();
        let epoch = self.safepoints.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(epoch, "safepoint reached");
        SafepointScope { _guard: guard, epoch }
    }

    /// Number of safepoints taken so far.
    pub fn safepoint_count(&self) -> u64 {
        self.safepoints.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_epochs() {
        let handler = SafepointHandler::new();
        assert_eq!(handler.stop_the_world().epoch(), 1);
        assert_eq!(handler.stop_the_world().epoch(), 2);
        assert_eq!(handler.safepoint_count(), 2);
    }

    #[test]
    fn test_safepoint_waits_for_mutators() {
        let handler = Arc::new(SafepointHandler::new());
        let stopped = Arc::new(AtomicBool::new(false));

        let mutator = handler.enter_mutator();
        let collector = {
            let handler = handler.clone();
            let stopped = stopped.clone();
            thread::spawn(move || {
                let _scope = handler.stop_the_world();
                stopped.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!stopped.load(Ordering::SeqCst));
        drop(mutator);
        collector.join().unwrap();
        assert!(stopped.load(Ordering::SeqCst));
    }
}
