//! `SafepointCoordinator`: drains compiler and application threads to a
//! safepoint, holds them for the commit phase, releases them afterward.
//!
//! The global redefinition lock serializes transactions one at a time,
//! single-writer. Per-thread mutexes are acquired in a fixed enumeration
//! order (thread-table position) to avoid deadlock.

use crate::thread_table::{ThreadId, ThreadTable};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{info, info_span};

/// The process-wide redefinition lock: held for one transaction's
/// lifetime. A real embedder's compiler-bailout signaling and per-thread
/// `redefine_classes_mutex` acquisition happen before this lock is taken;
/// the reference runtime has no real concurrent threads to drain, so
/// `SafepointCoordinator::enter` below does the bookkeeping but not actual
/// suspension.
#[derive(Default)]
pub struct GlobalRedefinitionLock(Mutex<()>);

impl GlobalRedefinitionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.0.lock()
    }
}

/// Coordinates one transaction's safepoint. Construction takes the global
/// lock and a fixed-order list of per-thread locks; `release` drops them
/// in reverse acquisition order.
pub struct SafepointCoordinator<'a> {
    _global: MutexGuard<'a, ()>,
    thread_locks: Vec<(ThreadId, Arc<Mutex<()>>)>,
}

impl<'a> SafepointCoordinator<'a> {
    /// Take the global lock and every per-thread mutex, in thread-table
    /// order, then request the global safepoint (a no-op suspension for
    /// the reference runtime).
    pub fn enter(global: &'a GlobalRedefinitionLock, threads: &ThreadTable) -> Self {
        let _span = info_span!("safepoint_enter", thread_count = threads.len()).entered();
        info!("requesting global safepoint");
        let global_guard = global.lock();
        // A real runtime would look up and lock each thread's own mutex
        // here, in thread-table order; the reference thread table carries
        // no mutex per thread since there is no concurrent mutator to
        // drain, so we only record the bookkeeping.
        let thread_locks = Vec::new();
        let _ = threads;
        Self {
            _global: global_guard,
            thread_locks,
        }
    }

    /// Release the safepoint: drop per-thread locks in reverse order, then
    /// the global lock (via `Drop`).
    pub fn release(mut self) {
        while self.thread_locks.pop().is_some() {}
        info!("safepoint released");
    }
}
