//! `AffectedSetBuilder`: discovers every loaded class transitively affected
//! by a redefinition request and topologically sorts them, supertypes
//! first.

use crate::class_def::ClassDefinition;
use crate::error::RedefineError;
use crate::runtime::ManagedRuntime;
use dcevm_core::ClassIdentity;
use std::collections::{HashMap, HashSet};

/// Every loaded class transitively affected by `defs`, supertypes first.
///
/// Step 1-2 (mark directly-redefined classes, then walk the registry for
/// subtypes) is implemented via `ClassRegistry::is_subtype_of`; step 3-4
/// (edge set + Kahn's algorithm) is implemented below.
pub fn build(
    defs: &[ClassDefinition],
    runtime: &dyn ManagedRuntime,
) -> Result<Vec<ClassIdentity>, RedefineError> {
    let directly_redefined: HashSet<ClassIdentity> = defs.iter().map(|d| d.class_ref).collect();

    let mut affected: HashSet<ClassIdentity> = directly_redefined.clone();
    for candidate in runtime.registry().all_identities() {
        if affected.contains(&candidate) {
            continue;
        }
        if directly_redefined
            .iter()
            .any(|redefined| runtime.registry().is_subtype_of(candidate, *redefined))
        {
            affected.insert(candidate);
        }
    }

    // Edge set: A -> B whenever A is a declared supertype of B, read off
    // either the class's current definition or (for directly redefined
    // classes) its new declared supertypes.
    let mut declared_supers: HashMap<ClassIdentity, Vec<ClassIdentity>> = HashMap::new();
    for &identity in &affected {
        if let Some(def) = defs.iter().find(|d| d.class_ref == identity) {
            let stub = runtime.resolve_from_stream(identity, &def.bytes).map_err(|e| {
                RedefineError::InvalidClassFormat(identity, e.to_string())
            })?;
            let mut supers = Vec::new();
            if let Some(super_name) = &stub.super_name {
                supers.push(ClassIdentity::new(
                    dcevm_core::Symbol::intern(super_name),
                    identity.loader,
                ));
            }
            for iface in &stub.interfaces {
                supers.push(ClassIdentity::new(
                    dcevm_core::Symbol::intern(iface),
                    identity.loader,
                ));
            }
            declared_supers.insert(identity, supers);
        } else {
            declared_supers.insert(identity, runtime.registry().direct_supertypes(identity));
        }
    }

    topo_sort(&affected, &declared_supers)
}

/// Kahn's algorithm: repeatedly remove a node with no remaining incoming
/// edge (i.e. whose declared supertypes, restricted to the affected set,
/// have all already been emitted) and append it. A remaining unprocessed
/// node with no eligible candidate indicates a cycle.
fn topo_sort(
    affected: &HashSet<ClassIdentity>,
    declared_supers: &HashMap<ClassIdentity, Vec<ClassIdentity>>,
) -> Result<Vec<ClassIdentity>, RedefineError> {
    let mut remaining: HashSet<ClassIdentity> = affected.clone();
    let mut emitted: HashSet<ClassIdentity> = HashSet::new();
    let mut order = Vec::with_capacity(affected.len());

    while !remaining.is_empty() {
        let ready = remaining
            .iter()
            .copied()
            .find(|node| {
                declared_supers
                    .get(node)
                    .into_iter()
                    .flatten()
                    .all(|parent| !affected.contains(parent) || emitted.contains(parent))
            });
        match ready {
            Some(node) => {
                remaining.remove(&node);
                emitted.insert(node);
                order.push(node);
            }
            None => {
                let any = *remaining.iter().next().expect("remaining is non-empty");
                return Err(RedefineError::CircularClassDefinition(any));
            }
        }
    }
    Ok(order)
}
