//! `ChangeAnalyzer`: compares an old `ClassVersion` against a new
//! `ClassStub`, in either compatibility or advanced mode.

use crate::error::RedefineError;
use crate::runtime::ClassStub;
use dcevm_core::{ClassVersion, MethodModifiers, RedefinitionFlags, Symbol};

/// Result of analyzing one class pair: the flags to attach to the new
/// version, plus whether the method set changed (consumed by
/// `MethodMatcher` downstream so it doesn't redo the comparison).
pub struct AnalysisResult {
    pub flags: RedefinitionFlags,
}

/// Analyze `old` against `new`, enforcing compatibility-mode equalities or
/// computing advanced-mode flags per `allow_advanced`.
pub fn analyze(
    old: &ClassVersion,
    new: &ClassStub,
    allow_advanced: bool,
) -> Result<AnalysisResult, RedefineError> {
    if allow_advanced {
        analyze_advanced(old, new)
    } else {
        analyze_compatibility(old, new)
    }
}

fn analyze_compatibility(
    old: &ClassVersion,
    new: &ClassStub,
) -> Result<AnalysisResult, RedefineError> {
    let new_super = new.super_name.as_deref().map(Symbol::intern);
    if new_super != old.super_name {
        return Err(RedefineError::HierarchyChanged(old.identity));
    }
    let new_interfaces: Vec<Symbol> = new.interfaces.iter().map(|s| Symbol::intern(s)).collect();
    if new_interfaces != old.interfaces {
        return Err(RedefineError::HierarchyChanged(old.identity));
    }
    if new.is_interface != old.is_interface {
        return Err(RedefineError::ClassModifiersChanged(old.identity));
    }

    let new_fields = new.declared_fields();
    if new_fields.len() != old.fields.len() {
        return Err(RedefineError::SchemaChanged(
            old.identity,
            "field count changed".into(),
        ));
    }
    for (new_field, old_field) in new_fields.iter().zip(&old.fields) {
        let same_shape = new_field.same_name_and_signature(old_field)
            && new_field.offset == old_field.offset
            && new_field.size == old_field.size
            && new_field.modifiers.is_static == old_field.modifiers.is_static
            && new_field.modifiers.is_final == old_field.modifiers.is_final
            && new_field.modifiers.is_private == old_field.modifiers.is_private;
        if !same_shape {
            return Err(RedefineError::SchemaChanged(
                old.identity,
                format!("field `{}` changed shape", new_field.name),
            ));
        }
    }

    let new_methods = new.declared_methods();
    let mut matched_old = vec![false; old.methods.len()];
    for new_method in &new_methods {
        match old
            .methods
            .iter()
            .position(|m| m.same_name_and_signature(new_method))
        {
            Some(idx) => {
                matched_old[idx] = true;
                if !new_method.modifiers.eq_excluding_native(&old.methods[idx].modifiers) {
                    return Err(RedefineError::MethodModifiersChanged(
                        old.identity,
                        new_method.name.to_string(),
                    ));
                }
            }
            None => {
                if !is_private_final_or_static(&new_method.modifiers) {
                    return Err(RedefineError::MethodAdded(
                        old.identity,
                        new_method.name.to_string(),
                    ));
                }
            }
        }
    }
    for (idx, matched) in matched_old.iter().enumerate() {
        if !matched && !is_private_final_or_static(&old.methods[idx].modifiers) {
            return Err(RedefineError::MethodDeleted(
                old.identity,
                old.methods[idx].name.to_string(),
            ));
        }
    }

    Ok(AnalysisResult {
        flags: RedefinitionFlags::NONE,
    })
}

fn is_private_final_or_static(modifiers: &MethodModifiers) -> bool {
    modifiers.is_private && (modifiers.is_final || modifiers.is_static)
}

fn analyze_advanced(old: &ClassVersion, new: &ClassStub) -> Result<AnalysisResult, RedefineError> {
    let mut flags = RedefinitionFlags::NONE;

    let new_super = new.super_name.as_deref().map(Symbol::intern);
    if old.super_name.is_some() && new_super.is_none() {
        return Err(RedefineError::HierarchyChanged(old.identity));
    }
    if new_super != old.super_name {
        flags.modify_class = true;
    }
    let new_interfaces: Vec<Symbol> = new.interfaces.iter().map(|s| Symbol::intern(s)).collect();
    let dropped_interface = old.interfaces.iter().any(|i| !new_interfaces.contains(i));
    if dropped_interface {
        return Err(RedefineError::HierarchyChanged(old.identity));
    }
    if new_interfaces != old.interfaces {
        flags.modify_class = true;
    }

    let new_fields = new.declared_fields();
    if new_fields.len() != old.fields.len() {
        flags.modify_instances = true;
    }
    for new_field in &new_fields {
        match old.fields.iter().find(|f| f.same_name_and_signature(new_field)) {
            Some(old_field) if old_field.offset == new_field.offset && old_field.size == new_field.size => {}
            _ => flags.modify_instances = true,
        }
    }

    let new_instance_size = new.instance_size();
    if new_instance_size != old.instance_size {
        flags.modify_instance_size = true;
        flags.modify_instances = true;
    }
    let new_class_size = new.class_size();
    if new_class_size != old.class_size {
        flags.modify_class_size = true;
    }

    let new_methods = new.declared_methods();
    for new_method in &new_methods {
        match old.methods.iter().find(|m| m.same_name_and_signature(new_method)) {
            Some(old_method) if new_method.modifiers.eq_excluding_native(&old_method.modifiers) => {}
            _ => flags.modify_class = true,
        }
    }
    if new_methods.len() != old.methods.len() {
        flags.modify_class = true;
    }

    if new_methods
        .iter()
        .any(|m| m.name.as_str() == "$$transformer" && m.signature.as_str() == "()V")
    {
        flags.has_instance_transformer = true;
    }

    Ok(AnalysisResult { flags })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcevm_core::{ClassIdentity, FieldDescriptor, FieldModifiers};

    fn id(name: &str) -> ClassIdentity {
        ClassIdentity::new(Symbol::intern(name), 0)
    }

    fn stub(json: &str) -> ClassStub {
        ClassStub::parse(json.as_bytes()).unwrap()
    }

    #[test]
    fn compatibility_mode_rejects_superclass_change() {
        let old = ClassVersion::new(id("A"), Some(Symbol::intern("Object")), vec![], vec![], vec![], 0, 0, false, None);
        let new = stub(r#"{"name":"A","super_name":"OtherBase"}"#);
        let err = analyze(&old, &new, false).unwrap_err();
        assert!(matches!(err, RedefineError::HierarchyChanged(_)));
    }

    #[test]
    fn compatibility_mode_allows_private_added_method() {
        let old = ClassVersion::new(id("A"), None, vec![], vec![], vec![], 0, 0, false, None);
        let new = stub(r#"{"name":"A","methods":[{"name":"helper","signature":"()V","is_private":true,"is_final":true}]}"#);
        assert!(analyze(&old, &new, false).is_ok());
    }

    #[test]
    fn compatibility_mode_rejects_public_added_method() {
        let old = ClassVersion::new(id("A"), None, vec![], vec![], vec![], 0, 0, false, None);
        let new = stub(r#"{"name":"A","methods":[{"name":"pub_helper","signature":"()V"}]}"#);
        let err = analyze(&old, &new, false).unwrap_err();
        assert!(matches!(err, RedefineError::MethodAdded(..)));
    }

    #[test]
    fn advanced_mode_rejects_removed_supertype() {
        let old = ClassVersion::new(id("A"), Some(Symbol::intern("Base")), vec![], vec![], vec![], 0, 0, false, None);
        let new = stub(r#"{"name":"A"}"#);
        let err = analyze(&old, &new, true).unwrap_err();
        assert!(matches!(err, RedefineError::HierarchyChanged(_)));
    }

    #[test]
    fn advanced_mode_flags_added_field_as_modify_instances() {
        let old = ClassVersion::new(id("A"), None, vec![], vec![], vec![], 0, 0, false, None);
        let new = stub(r#"{"name":"A","fields":[{"name":"x","descriptor":"I"}]}"#);
        let result = analyze(&old, &new, true).unwrap();
        assert!(result.flags.modify_instances);
    }

    #[test]
    fn advanced_mode_detects_transformer_method() {
        let old = ClassVersion::new(id("A"), None, vec![], vec![], vec![], 0, 0, false, None);
        let new = stub(r#"{"name":"A","methods":[{"name":"$$transformer","signature":"()V"}]}"#);
        let result = analyze(&old, &new, true).unwrap();
        assert!(result.flags.has_instance_transformer);
        assert!(result.flags.modify_class);
    }

    #[test]
    fn advanced_mode_unchanged_class_has_no_flags() {
        let field = FieldDescriptor {
            name: Symbol::intern("x"),
            descriptor: Symbol::intern("I"),
            offset: 0,
            size: 4,
            modifiers: FieldModifiers::default(),
        };
        let old = ClassVersion::new(id("A"), None, vec![], vec![field], vec![], 4, 0, false, None);
        let new = stub(r#"{"name":"A","fields":[{"name":"x","descriptor":"I"}]}"#);
        let result = analyze(&old, &new, true).unwrap();
        assert!(result.flags.is_none());
    }
}
