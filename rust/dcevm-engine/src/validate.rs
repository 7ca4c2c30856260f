//! `check_arguments`: input validation that runs before any class touches
//! the loader — a dedicated pass distinct from the structural errors
//! `NewVersionLoader`/`ChangeAnalyzer` raise later.

use crate::class_def::ClassDefinition;
use crate::error::RedefineError;
use crate::runtime::ManagedRuntime;

/// Reject malformed requests before the loader or analyzer is invoked:
/// - the definition list must be non-empty (`NULL_POINTER`)
/// - no class name may repeat within one request (`INVALID_CLASS`)
/// - every named class must already be loaded and modifiable (`INVALID_CLASS`)
pub fn check_arguments(
    defs: &[ClassDefinition],
    runtime: &dyn ManagedRuntime,
) -> Result<(), RedefineError> {
    if defs.is_empty() {
        return Err(RedefineError::NullPointer);
    }

    let mut seen = std::collections::HashSet::new();
    for def in defs {
        if !seen.insert(def.class_ref) {
            return Err(RedefineError::InvalidClass(def.class_ref));
        }
        if !runtime.registry().is_loaded(def.class_ref) {
            return Err(RedefineError::InvalidClass(def.class_ref));
        }
        if !runtime.is_modifiable(def.class_ref) {
            return Err(RedefineError::InvalidClass(def.class_ref));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_def::ClassDefinition;
    use crate::runtime::InMemoryRuntime;
    use dcevm_core::{ClassIdentity, ClassVersion, Symbol};
    use std::sync::Arc;

    fn id(name: &str) -> ClassIdentity {
        ClassIdentity::new(Symbol::intern(name), 0)
    }

    fn seeded(name: &str) -> InMemoryRuntime {
        let mut runtime = InMemoryRuntime::new();
        runtime.registry().load_initial(Arc::new(ClassVersion::new(
            id(name), None, vec![], vec![], vec![], 16, 8, false, None,
        )));
        runtime
    }

    #[test]
    fn empty_list_is_null_pointer() {
        let runtime = InMemoryRuntime::new();
        let err = check_arguments(&[], &runtime).unwrap_err();
        assert!(matches!(err, RedefineError::NullPointer));
    }

    #[test]
    fn unloaded_class_is_invalid() {
        let runtime = InMemoryRuntime::new();
        let defs = vec![ClassDefinition::new(id("pkg.A"), vec![])];
        let err = check_arguments(&defs, &runtime).unwrap_err();
        assert!(matches!(err, RedefineError::InvalidClass(_)));
    }

    #[test]
    fn duplicate_class_in_request_is_invalid() {
        let runtime = seeded("pkg.A");
        let defs = vec![
            ClassDefinition::new(id("pkg.A"), vec![]),
            ClassDefinition::new(id("pkg.A"), vec![]),
        ];
        let err = check_arguments(&defs, &runtime).unwrap_err();
        assert!(matches!(err, RedefineError::InvalidClass(_)));
    }

    #[test]
    fn loaded_unique_classes_pass() {
        let runtime = seeded("pkg.A");
        let defs = vec![ClassDefinition::new(id("pkg.A"), vec![])];
        assert!(check_arguments(&defs, &runtime).is_ok());
    }
}
