//! Stand-in for the stack-frame rewrite step: the set of "threads" whose
//! activation records may hold a stale klass pointer and must be walked
//! during the heap rewrite.
//!
//! Real embedders walk native call stacks; this reference implementation
//! models a thread as a flat list of local-variable slots, enough to
//! exercise the rewrite pass end to end.

use dcevm_core::ClassVersion;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u64);

/// One activation record's references to class objects (e.g. a local
/// holding a `Class<?>` literal, or an in-flight `new` before the
/// constructor returns).
#[derive(Default, Clone)]
pub struct ThreadFrame {
    pub class_refs: Vec<Arc<ClassVersion>>,
}

#[derive(Default)]
pub struct ThreadTable {
    threads: Vec<(ThreadId, ThreadFrame)>,
}

impl ThreadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, id: ThreadId) {
        self.threads.push((id, ThreadFrame::default()));
    }

    pub fn frame_mut(&mut self, id: ThreadId) -> Option<&mut ThreadFrame> {
        self.threads.iter_mut().find(|(t, _)| *t == id).map(|(_, f)| f)
    }

    pub fn frames_mut(&mut self) -> impl Iterator<Item = &mut ThreadFrame> {
        self.threads.iter_mut().map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcevm_core::{ClassIdentity, Symbol};

    fn class(name: &str) -> Arc<ClassVersion> {
        Arc::new(ClassVersion::new(
            ClassIdentity::new(Symbol::intern(name), 0),
            None,
            vec![],
            vec![],
            vec![],
            16,
            8,
            false,
            None,
        ))
    }

    #[test]
    fn spawn_and_mutate_frame() {
        let mut table = ThreadTable::new();
        let t0 = ThreadId(0);
        table.spawn(t0);
        table.frame_mut(t0).unwrap().class_refs.push(class("A"));
        assert_eq!(table.frame_mut(t0).unwrap().class_refs.len(), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn frames_mut_reaches_every_thread() {
        let mut table = ThreadTable::new();
        table.spawn(ThreadId(0));
        table.spawn(ThreadId(1));
        for frame in table.frames_mut() {
            frame.class_refs.push(class("A"));
        }
        assert!(table.frame_mut(ThreadId(1)).unwrap().class_refs.len() == 1);
    }
}
