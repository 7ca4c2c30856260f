//! Stand-in for the debugger `BreakpointTable` collaborator: breakpoints
//! must be re-installed against the new method bodies, since method
//! identity changes across redefinition.
//!
//! A flat table keyed by method id, the same shape as this workspace's
//! other debug-state tables.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub method_id: u64,
    pub bytecode_offset: u32,
}

/// Active breakpoints, keyed by the method they were installed on.
#[derive(Default)]
pub struct BreakpointTable {
    by_method: HashMap<u64, Vec<Breakpoint>>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, bp: Breakpoint) {
        self.by_method.entry(bp.method_id).or_default().push(bp);
    }

    pub fn for_method(&self, method_id: u64) -> &[Breakpoint] {
        self.by_method.get(&method_id).map_or(&[], Vec::as_slice)
    }

    /// Re-key every breakpoint installed on `old_method_id` onto
    /// `new_method_id`, preserving offsets. Called once per matched method
    /// pair during commit, EMCP or not — a changed method body keeps its
    /// breakpoints re-pointed at the new bytecode rather than dropping
    /// them, since the offsets are still meaningful against recompiled
    /// code at the same source line.
    pub fn rebind(&mut self, old_method_id: u64, new_method_id: u64) {
        if let Some(bps) = self.by_method.remove(&old_method_id) {
            let rebound = bps
                .into_iter()
                .map(|bp| Breakpoint { method_id: new_method_id, ..bp })
                .collect();
            self.by_method.insert(new_method_id, rebound);
        }
    }
}
