//! `NewVersionLoader`: resolves each affected class's new bytes into a
//! provisional `ClassVersion`, paired with its old version.
//!
//! Class bytes are user-supplied only for directly redefined classes;
//! affected-but-not-directly-redefined classes (subtypes dragged in by
//! `AffectedSetBuilder`) are reconstituted from their current
//! `ClassVersion` — round-trip reconstitution of real bytecode is out of
//! scope, so the reference loader rebuilds an equivalent `ClassStub`
//! directly from the existing descriptors rather than via a byte stream.

use crate::class_def::ClassDefinition;
use crate::error::RedefineError;
use crate::runtime::{ClassStub, ManagedRuntime, StubField, StubMethod};
use dcevm_core::{ClassIdentity, ClassVersion, Symbol};
use std::sync::Arc;

/// One affected class's old and provisional new version, linked but not
/// yet installed into the registry.
pub struct LoadedPair {
    pub identity: ClassIdentity,
    pub old: Arc<ClassVersion>,
    pub stub: ClassStub,
}

/// Load every class in `affected_order` (supertypes first), pairing each
/// with its current registry entry. Directly redefined classes resolve
/// the caller-supplied bytes and run them through `ManagedRuntime::verify`;
/// others are reconstituted from their live descriptors without
/// re-verification (their declared shape never changed).
pub fn load_all(
    affected_order: &[ClassIdentity],
    defs: &[ClassDefinition],
    runtime: &dyn ManagedRuntime,
) -> Result<Vec<LoadedPair>, RedefineError> {
    let mut out = Vec::with_capacity(affected_order.len());
    for &identity in affected_order {
        let old = runtime
            .registry()
            .newest(identity)
            .ok_or(RedefineError::InvalidClass(identity))?;

        let stub = match defs.iter().find(|d| d.class_ref == identity) {
            Some(def) => {
                let stub = runtime
                    .resolve_from_stream(identity, &def.bytes)
                    .map_err(|e| RedefineError::InvalidClassFormat(identity, e.to_string()))?;
                runtime
                    .verify(&stub)
                    .map_err(|e| RedefineError::FailsVerification(identity, e))?;
                stub
            }
            None => reconstitute(&old),
        };

        out.push(LoadedPair { identity, old, stub });
    }
    Ok(out)
}

/// Rebuild a `ClassStub` equivalent to `version`'s current declared shape,
/// standing in for real bytecode reconstitution.
fn reconstitute(version: &ClassVersion) -> ClassStub {
    ClassStub {
        name: version.name().to_string(),
        super_name: version.super_name.map(|s| s.to_string()),
        interfaces: version.interfaces.iter().map(Symbol::to_string).collect(),
        is_interface: version.is_interface,
        fields: version
            .fields
            .iter()
            .map(|f| StubField {
                name: f.name.to_string(),
                descriptor: f.descriptor.to_string(),
                is_static: f.modifiers.is_static,
                is_final: f.modifiers.is_final,
                is_private: f.modifiers.is_private,
            })
            .collect(),
        methods: version
            .methods
            .iter()
            .map(|m| StubMethod {
                name: m.name.to_string(),
                signature: m.signature.to_string(),
                is_static: m.modifiers.is_static,
                is_private: m.modifiers.is_private,
                is_final: m.modifiers.is_final,
                is_native: m.modifiers.is_native,
                bytecode: m.bytecode.clone(),
            })
            .collect(),
    }
}
