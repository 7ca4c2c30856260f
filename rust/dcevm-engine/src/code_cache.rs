//! Code-cache invalidation and constant-pool cache adjustment, run after
//! per-class install, before the heap walk commits class identities.

use crate::compiler::CodeCache;
use crate::heap_rewrite::RewritePlan;
use dcevm_core::{ClassVersion, ConstantPoolEntry};
use std::sync::Arc;

/// Mark every compiled method of each redefined pair's old class for
/// deoptimization, and make them not-entrant (modeled here as simply
/// removing the compiled entry — the reference `CodeCache` has no
/// separate not-entrant state since there is no real JIT to recompile
/// into).
pub fn invalidate(plans: &[RewritePlan], code_cache: &mut CodeCache) {
    for plan in plans {
        for method in &plan.old.methods {
            if code_cache.is_compiled(method.method_id) {
                code_cache.deoptimize(method.method_id);
            }
        }
    }
}

/// Walk every loaded class's constant pool; any resolved klass reference
/// whose target has a newer version (present in `plans`) is rewritten, and
/// the entry's resolution is invalidated (`resolved_klass` cleared) so the
/// interpreter's slow path re-resolves it.
pub fn adjust_constant_pools(all_loaded: &[Arc<ClassVersion>], plans: &[RewritePlan]) {
    for version in all_loaded {
        let mut pool = version.constant_pool.write();
        for entry in pool.iter_mut() {
            if let Some(target_name) = entry.resolved_klass {
                let redefined = plans.iter().any(|p| p.old.name() == target_name);
                if redefined {
                    *entry = ConstantPoolEntry { index: entry.index, resolved_klass: None };
                }
            }
        }
    }
}
