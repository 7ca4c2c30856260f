//! dcevm-engine — the transactional redefinition pipeline.
//!
//! `redefine_classes` is the single entry point: given a
//! batch of class definitions, a `RedefinitionConfig`, and a
//! `ManagedRuntime` to operate against, it either commits every class in
//! the batch atomically or leaves the runtime untouched.
#![warn(clippy::all)]

pub mod affected_set;
pub mod analyzer;
pub mod breakpoints;
pub mod class_def;
pub mod code_cache;
pub mod commit;
pub mod compiler;
pub mod config;
pub mod error;
pub mod heap;
pub mod heap_rewrite;
pub mod loader;
pub mod method_match;
pub mod migration_plan;
pub mod native_binding;
pub mod registry;
pub mod runtime;
pub mod safepoint;
pub mod thread_table;
pub mod validate;

pub use class_def::ClassDefinition;
pub use config::{PhaseTimings, RedefinitionConfig};
pub use dcevm_core::{ClassIdentity, ErrorCode, RedefinitionFlags};
pub use error::RedefineError;
pub use registry::ClassRegistry;
pub use runtime::{InMemoryRuntime, ManagedRuntime};

use std::time::Instant;
use tracing::{error, info, instrument};

/// Per-class and aggregate results of one `redefine_classes` call.
#[derive(Debug, Default)]
pub struct RedefinitionReport {
    pub flags: Vec<(ClassIdentity, RedefinitionFlags)>,
    pub instances_rewritten_in_place: usize,
    pub instances_needing_migration: usize,
    pub full_gc_ran: bool,
    pub timings: Option<PhaseTimings>,
}

/// The operation: `redefine_classes(defs, config, runtime) -> Result<RedefinitionReport, ErrorCode>`.
///
/// Runs `check_arguments`, then the full pipeline
/// (`AffectedSetBuilder` → `NewVersionLoader` → `ChangeAnalyzer` →
/// `FieldMigrationPlanner` → safepoint → `MethodMatcher` + per-class
/// install → `HeapRewriter` → epilogue). On any error the runtime is left
/// exactly as it was found — nothing is attached to the registry until
/// every class in the batch analyzes cleanly.
#[instrument(skip_all)]
pub fn redefine_classes(
    defs: &[ClassDefinition],
    config: &RedefinitionConfig,
    runtime: &mut dyn ManagedRuntime,
) -> Result<RedefinitionReport, ErrorCode> {
    let total_start = Instant::now();

    if let Err(e) = validate::check_arguments(defs, runtime) {
        error!(error = %e, "check_arguments rejected request");
        return Err(e.code());
    }

    match commit::run_transaction(defs, config, runtime) {
        Ok((flags, outcome, mut phase_timings)) => {
            info!(
                classes = flags.len(),
                rewritten = outcome.instances_rewritten_in_place,
                needs_migration = outcome.instances_needing_migration,
                "redefinition committed"
            );
            phase_timings.total = total_start.elapsed();
            let timings = config.time_redefine_classes.then_some(phase_timings);
            Ok(RedefinitionReport {
                flags,
                instances_rewritten_in_place: outcome.instances_rewritten_in_place,
                instances_needing_migration: outcome.instances_needing_migration,
                full_gc_ran: outcome.instances_needing_migration > 0,
                timings,
            })
        }
        Err(e) => {
            error!(error = %e, "redefinition rolled back");
            Err(e.code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcevm_core::{ClassVersion, Symbol};
    use std::sync::Arc;

    fn id(name: &str) -> ClassIdentity {
        ClassIdentity::new(Symbol::intern(name), 0)
    }

    #[test]
    fn empty_defs_returns_null_pointer() {
        let mut runtime = InMemoryRuntime::new();
        let config = RedefinitionConfig::default();
        let err = redefine_classes(&[], &config, &mut runtime).unwrap_err();
        assert_eq!(err, ErrorCode::NullPointer);
    }

    #[test]
    fn successful_redefinition_returns_report() {
        let mut runtime = InMemoryRuntime::new();
        runtime.registry().load_initial(Arc::new(ClassVersion::new(
            id("pkg.lib.A"), None, vec![], vec![], vec![], 0, 0, false, None,
        )));
        let defs = vec![ClassDefinition::new(
            id("pkg.lib.A"),
            br#"{"name":"pkg.lib.A"}"#.to_vec(),
        )];
        let config = RedefinitionConfig::default();
        let report = redefine_classes(&defs, &config, &mut runtime).unwrap();
        assert_eq!(report.flags.len(), 1);
    }

    #[test]
    fn unloaded_class_returns_invalid_class() {
        let mut runtime = InMemoryRuntime::new();
        let defs = vec![ClassDefinition::new(id("pkg.lib.Ghost"), vec![])];
        let config = RedefinitionConfig::default();
        let err = redefine_classes(&defs, &config, &mut runtime).unwrap_err();
        assert_eq!(err, ErrorCode::InvalidClass);
    }
}
