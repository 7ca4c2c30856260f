//! `CommitController`: orchestrates the pipeline end to end, invoking
//! [`rollback`] on any error.

use crate::analyzer::{self, AnalysisResult};
use crate::class_def::ClassDefinition;
use crate::code_cache;
use crate::config::{PhaseTimings, RedefinitionConfig};
use crate::error::RedefineError;
use crate::heap_rewrite::{self, RewriteOutcome, RewritePlan};
use crate::loader::{self, LoadedPair};
use crate::method_match;
use crate::migration_plan;
use crate::native_binding;
use crate::runtime::ManagedRuntime;
use crate::safepoint::{GlobalRedefinitionLock, SafepointCoordinator};
use dcevm_core::{
    next_revision, ClassIdentity, ClassVersion, MethodDescriptor, RedefinitionFlags,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, instrument};

/// One class's fully prepared install: the provisional new `ClassVersion`
/// (not yet attached to the registry), plus the method pairing needed for
/// breakpoint/JMethodID transfer and native-binding transfer.
struct PreparedClass {
    old: Arc<ClassVersion>,
    new: Arc<ClassVersion>,
    pairing: dcevm_core::MethodPairing,
}

/// Run the full transaction: affected-set discovery, loading, analysis,
/// and migration planning in the prologue; then the safepointed commit
/// (per-class install, code-cache/constant-pool invalidation, heap
/// rewrite, registry attach). Returns the per-class flags, the heap
/// rewrite outcome, and (when `config.time_redefine_classes` is set) the
/// per-phase durations for the caller's `RedefinitionReport`. On any error
/// the transaction has made no visible registry change — nothing is
/// attached until every class in the batch has been prepared
/// successfully.
#[instrument(skip_all)]
pub fn run_transaction(
    defs: &[ClassDefinition],
    config: &RedefinitionConfig,
    runtime: &mut dyn ManagedRuntime,
) -> Result<(Vec<(ClassIdentity, RedefinitionFlags)>, RewriteOutcome, PhaseTimings), RedefineError> {
    let revision = next_revision();
    info!(revision, "starting redefinition transaction");
    let timed = config.time_redefine_classes;
    let mut timings = PhaseTimings::default();

    let t = Instant::now();
    let affected_order = {
        let _span = info_span!("prologue").entered();
        crate::affected_set::build(defs, runtime)?
    };
    if timed {
        timings.prologue = t.elapsed();
    }

    let t = Instant::now();
    let loaded = {
        let _span = info_span!("class_loading").entered();
        loader::load_all(&affected_order, defs, runtime)?
    };
    if timed {
        timings.class_loading = t.elapsed();
    }

    let t = Instant::now();
    let _span = info_span!("class_linking").entered();
    let mut prepared = Vec::with_capacity(loaded.len());
    let mut flags_by_identity: Vec<(ClassIdentity, RedefinitionFlags)> =
        Vec::with_capacity(loaded.len());

    for LoadedPair { identity, old, stub } in loaded {
        let AnalysisResult { mut flags } =
            analyzer::analyze(&old, &stub, config.allow_advanced_class_redefinition)?;

        // Propagate supertype flags: a subclass's effective flags OR-in
        // its already-processed super's.
        if let Some(super_name) = old.super_name {
            if let Some((_, super_flags)) =
                flags_by_identity.iter().find(|(id, _)| id.name == super_name)
            {
                flags = flags.union(*super_flags);
            }
        }

        let mut new_fields = stub.declared_fields();
        for new_field in &mut new_fields {
            if let Some(old_field) = old.fields.iter().find(|f| f.same_name_and_signature(new_field)) {
                migration_plan::carry_forward_access_tracked(old_field, new_field);
            }
        }
        let mut new_methods = stub.declared_methods();
        let pairing = method_match::match_methods(&old.methods, &new_methods);
        let mut next_method_id = old.methods.iter().map(|m| m.method_id).max().unwrap_or(0);
        method_match::reissue_method_ids(&old.methods, &mut new_methods, &pairing, || {
            next_method_id += 1;
            next_method_id
        });

        let new_version = Arc::new(ClassVersion::new(
            identity,
            stub.super_name.as_deref().map(dcevm_core::Symbol::intern),
            stub.interfaces.iter().map(|s| dcevm_core::Symbol::intern(s)).collect(),
            new_fields,
            new_methods,
            stub.instance_size(),
            stub.class_size(),
            stub.is_interface,
            Some(Arc::clone(&old)),
        ));
        new_version.set_revision(revision);
        new_version.mark_redefining();

        flags_by_identity.push((identity, flags));
        prepared.push(PreparedClass { old, new: new_version, pairing });
    }
    drop(_span);
    if timed {
        timings.class_linking = t.elapsed();
    }

    // Prologue complete; enter the safepoint for the commit phase.
    let t = Instant::now();
    let global_lock = GlobalRedefinitionLock::new();
    let coordinator = SafepointCoordinator::enter(&global_lock, runtime.threads());
    if timed {
        timings.wait_for_locks = t.elapsed();
    }

    let t = Instant::now();
    let _span = info_span!("prepare_redefinition").entered();
    per_class_install(&prepared, runtime, config);

    let rewrite_plans: Vec<RewritePlan> = prepared
        .iter()
        .map(|p| RewritePlan {
            old: Arc::clone(&p.old),
            new: Arc::clone(&p.new),
            program: migration_plan::plan(&p.old.fields, &p.new.fields),
        })
        .collect();

    code_cache::invalidate(&rewrite_plans, runtime.code_cache());

    let all_versions: Vec<Arc<ClassVersion>> = runtime
        .registry()
        .all_identities()
        .into_iter()
        .filter_map(|id| runtime.registry().newest(id))
        .collect();
    code_cache::adjust_constant_pools(&all_versions, &rewrite_plans);
    drop(_span);
    if timed {
        timings.prepare_redefinition = t.elapsed();
    }

    let t = Instant::now();
    let (heap, threads) = runtime.heap_and_threads();
    let outcome = {
        let _span = info_span!("heap_iteration").entered();
        heap_rewrite::run(&rewrite_plans, heap, threads)
    };
    if timed {
        timings.heap_iteration = t.elapsed();
    }

    let t = Instant::now();
    let _span = info_span!("redefinition").entered();
    let mut attached = Vec::with_capacity(prepared.len());
    let mut attach_error = None;
    for class in &prepared {
        match runtime.registry().commit_attach(class.old.identity, Arc::clone(&class.new)) {
            Ok(()) => attached.push((class.old.identity, Arc::clone(&class.new))),
            Err(e) => {
                attach_error = Some(e);
                break;
            }
        }
    }
    if attach_error.is_none() && outcome.instances_needing_migration > 0 {
        runtime.collect_as_vm_thread();
    }
    drop(_span);
    if timed {
        timings.redefinition = t.elapsed();
    }

    let t = Instant::now();
    coordinator.release();
    if timed {
        timings.vm_op_epilogue = t.elapsed();
    }

    if let Some(e) = attach_error {
        rollback(runtime.registry(), &attached);
        return Err(e.into());
    }

    Ok((flags_by_identity, outcome, timings))
}

/// Per-class install, under the safepoint but before the heap walk.
/// Flushes old breakpoints, re-points them to matched new methods, and
/// transfers native bindings.
fn per_class_install(
    prepared: &[PreparedClass],
    runtime: &mut dyn ManagedRuntime,
    config: &RedefinitionConfig,
) {
    for class in prepared {
        for i in 0..class.pairing.matched_len() {
            let old_idx = class.pairing.matching_old[i] as usize;
            let new_idx = class.pairing.matching_new[i] as usize;
            let new_method_id: &MethodDescriptor = &class.new.methods[new_idx];
            runtime
                .breakpoints()
                .rebind(class.old.methods[old_idx].method_id, new_method_id.method_id);
        }

        let mut new_methods = class.new.methods.clone();
        native_binding::transfer(&class.old.methods, &mut new_methods, runtime.agent_prefixes());

        class.new.mirror.write().class_redefined_count =
            class.old.mirror.read().class_redefined_count + 1;

        // Interpreter frame forwarding is optional and not required for
        // correctness; the reference runtime has no interpreter to forward,
        // so the flag is recorded but otherwise inert.
        let _ = config.use_method_forward_points;
    }
}

/// Undo any new versions this batch managed to attach before a later
/// class's attach failed. Under supertype-first ordering this should not
/// happen in practice (an attach only fails on a fork, which would mean
/// two concurrent transactions raced the same chain — precluded by the
/// single-writer safepoint model), but the controller must not leave a
/// half-committed batch visible.
fn rollback(
    registry: &crate::registry::ClassRegistry,
    attached: &[(ClassIdentity, Arc<ClassVersion>)],
) {
    for (identity, new_version) in attached.iter().rev() {
        if let Some(current) = registry.newest(*identity) {
            if Arc::ptr_eq(&current, new_version) {
                new_version.clear_redefining();
            }
        }
    }
}
