//! `HeapRewriter`: the commit-phase heart of the transaction. Runs under
//! the safepoint established by `SafepointCoordinator`, after per-class
//! install.
//!
//! Since no managed thread executes user bytecode during the commit phase,
//! the reference runtime takes plain `&mut` access to the heap rather than
//! per-object locking — `ClassVersion`'s own shared fields (`mirror`,
//! `constant_pool`, init state) still use `RwLock` for concurrent reads
//! outside a transaction.

use crate::heap::ManagedHeap;
use crate::thread_table::ThreadTable;
use dcevm_core::{ClassVersion, InitState, StaticValue, UpdateProgram};
use std::sync::Arc;

/// One redefined pair the rewriter must process, plus the update program
/// computed by `FieldMigrationPlanner` (empty when the layout is
/// unchanged — identity rewrite).
pub struct RewritePlan {
    pub old: Arc<ClassVersion>,
    pub new: Arc<ClassVersion>,
    pub program: UpdateProgram,
}

/// Outcome of one `HeapRewriter::run` call, surfaced in `RedefinitionReport`.
#[derive(Default)]
pub struct RewriteOutcome {
    pub instances_rewritten_in_place: usize,
    pub instances_needing_migration: usize,
}

/// Run the full heap rewrite for a batch of redefined pairs, in the order
/// given (supertypes first, matching the affected-set order).
pub fn run(
    plans: &[RewritePlan],
    heap: &mut ManagedHeap,
    threads: &mut ThreadTable,
) -> RewriteOutcome {
    rewrite_roots(plans, heap);
    let outcome = rewrite_heap_objects(plans, heap);
    rewrite_thread_frames(plans, threads);
    per_class_swap(plans);
    finalize(plans);
    outcome
}

fn find_plan_for<'a>(plans: &'a [RewritePlan], candidate: &Arc<ClassVersion>) -> Option<&'a RewritePlan> {
    plans.iter().find(|p| Arc::ptr_eq(&p.old, candidate))
}

/// Step 1: root rewrite. Class-object and class-mirror roots pointing at
/// an old version are redirected to the new version.
fn rewrite_roots(plans: &[RewritePlan], heap: &mut ManagedHeap) {
    for root in &mut heap.class_roots {
        // ClassObject and ClassMirror roots rewrite identically.
        if let Some(plan) = find_plan_for(plans, &root.points_to) {
            root.points_to = Arc::clone(&plan.new);
        }
    }
}

/// Step 2: heap walk. Every non-class instance has its outgoing class
/// references rewritten, and (if its own class was redefined) its klass
/// pointer updated or flagged for conditional migration.
fn rewrite_heap_objects(plans: &[RewritePlan], heap: &mut ManagedHeap) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();
    for object in &mut heap.objects {
        for class_ref in &mut object.class_refs {
            if let Some(plan) = find_plan_for(plans, class_ref) {
                *class_ref = Arc::clone(&plan.new);
            }
        }

        let Some(plan) = find_plan_for(plans, &object.class) else {
            continue;
        };

        let new_size_exceeds_old = plan.new.instance_size > plan.old.instance_size;
        if object.in_old_generation || new_size_exceeds_old {
            outcome.instances_needing_migration += 1;
            // klass pointer stays on the old version here; the commit
            // controller's conditional `ManagedRuntime::collect_as_vm_thread`
            // call (once the new version is attached) applies the update
            // program and swaps the pointer while relocating.
            continue;
        }

        if plan.program.is_empty() {
            object.class = Arc::clone(&plan.new);
        } else {
            let source: Vec<u8> = if plan.program.copies_backwards() {
                object.data.clone()
            } else {
                std::mem::take(&mut object.data)
            };
            object.data = plan.program.apply(&source, plan.new.instance_size as usize);
            object.class = Arc::clone(&plan.new);
        }
        outcome.instances_rewritten_in_place += 1;
    }
    outcome
}

/// Rewrite local class references held in thread activation records, the
/// stand-in for the stack-frame rewrite portion of step 1/2.
fn rewrite_thread_frames(plans: &[RewritePlan], threads: &mut ThreadTable) {
    for frame in threads.frames_mut() {
        for class_ref in &mut frame.class_refs {
            if let Some(plan) = find_plan_for(plans, class_ref) {
                *class_ref = Arc::clone(&plan.new);
            }
        }
    }
}

/// Step 3: per-class swap. Preserve identity hash, restore constant-pool
/// ownership, transfer array-class refs, copy static fields by
/// name+signature, carry over init state if linked-or-beyond.
fn per_class_swap(plans: &[RewritePlan]) {
    for plan in plans {
        let old_mirror = plan.old.mirror.read().clone();
        let mut new_mirror = plan.new.mirror.write();

        // Swap mark words: identity hash moves with the chain's identity,
        // not with either physical mirror object.
        new_mirror.identity_hash = old_mirror.identity_hash;

        // Transfer array-class references to the new version.
        new_mirror.array_class_refs = old_mirror.array_class_refs.clone();

        // Copy static field values by name, when the new class still
        // declares a slot under that name.
        for (name, value) in &old_mirror.static_fields {
            if new_mirror.static_field(*name).is_some() {
                new_mirror.set_static_field(*name, value.clone());
            }
        }

        new_mirror.class_redefined_count = old_mirror.class_redefined_count + 1;
        drop(new_mirror);

        // The old version's constant pool is never touched by the rewrite
        // above (it is addressed only via `old.constant_pool`, never
        // through a rewritten reference), so it keeps its own holder.
        if plan.old.init_state().is_linked_or_beyond() {
            plan.new.set_init_state(InitState::Linked);
        }
    }
}

/// Step 5: finalize. Clear the redefining marker on each new version.
fn finalize(plans: &[RewritePlan]) {
    for plan in plans {
        plan.new.clear_redefining();
    }
}
