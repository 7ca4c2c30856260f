//! Stand-in for the JIT/`CompilerBroker` collaborator: code-cache
//! invalidation and deoptimization on next activation. Real embedders
//! flush compiled code and mark frames for
//! deopt; this reference implementation just records which methods were
//! told to deoptimize, so tests can assert the engine asked.

use std::collections::HashSet;

/// A compiled-method handle, identified by the `method_id` carried on
/// `dcevm_core::MethodDescriptor`.
#[derive(Default)]
pub struct CodeCache {
    compiled: HashSet<u64>,
    deoptimized: HashSet<u64>,
}

impl CodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `method_id` has a compiled entry, for test setup.
    pub fn mark_compiled(&mut self, method_id: u64) {
        self.compiled.insert(method_id);
    }

    pub fn is_compiled(&self, method_id: u64) -> bool {
        self.compiled.contains(&method_id)
    }

    /// Invalidate the compiled entry for `method_id`. Idempotent:
    /// deoptimizing a method with no compiled entry is
    /// a no-op, matching `is_modifiable_class`-style tolerance for methods
    /// that were never JIT-compiled.
    pub fn deoptimize(&mut self, method_id: u64) {
        self.compiled.remove(&method_id);
        self.deoptimized.insert(method_id);
    }

    pub fn was_deoptimized(&self, method_id: u64) -> bool {
        self.deoptimized.contains(&method_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deoptimize_clears_compiled_and_records() {
        let mut cache = CodeCache::new();
        cache.mark_compiled(1);
        assert!(cache.is_compiled(1));
        cache.deoptimize(1);
        assert!(!cache.is_compiled(1));
        assert!(cache.was_deoptimized(1));
    }

    #[test]
    fn deoptimizing_uncompiled_method_is_noop() {
        let mut cache = CodeCache::new();
        cache.deoptimize(99);
        assert!(cache.was_deoptimized(99));
        assert!(!cache.is_compiled(99));
    }
}
