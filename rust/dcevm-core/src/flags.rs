//! Redefinition flags: a sum-of-booleans record rather than a magic integer.
//!
//! Deliberately not a raw bitmask type — each flag is a named field, and
//! combining two flag sets is a field-wise OR. HotSpot-style
//! implementations attach a bitmask `RedefinitionFlags` to each new
//! `ClassVersion`; this keeps the same semantics without the C-style
//! integer encoding.

use serde::{Deserialize, Serialize};

/// Describes how a new `ClassVersion` differs from its predecessor.
///
/// All fields default to `false` (`NoRedefinition`). [`RedefinitionFlags::union`]
/// implements supertype propagation: "a subclass's effective flags OR-in its
/// super's".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RedefinitionFlags {
    /// Superclass replaced, interface set changed, or a method's modifiers
    /// changed (excluding the native bit).
    pub modify_class: bool,
    /// At least one live instance's field layout must change.
    pub modify_instances: bool,
    /// The instance size changed (implies `modify_instances`).
    pub modify_instance_size: bool,
    /// The class-object (static/mirror) size changed.
    pub modify_class_size: bool,
    /// The new class drops a supertype the old class declared.
    pub remove_super_type: bool,
    /// The class declares a zero-arg instance method named `$$transformer`.
    pub has_instance_transformer: bool,
}

impl RedefinitionFlags {
    /// The empty flag set — `NoRedefinition`.
    pub const NONE: Self = Self {
        modify_class: false,
        modify_instances: false,
        modify_instance_size: false,
        modify_class_size: false,
        remove_super_type: false,
        has_instance_transformer: false,
    };

    /// Whether no bit is set at all.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Field-wise OR, used to propagate a supertype's flags into a subclass.
    pub fn union(self, other: Self) -> Self {
        Self {
            modify_class: self.modify_class || other.modify_class,
            modify_instances: self.modify_instances || other.modify_instances,
            modify_instance_size: self.modify_instance_size || other.modify_instance_size,
            modify_class_size: self.modify_class_size || other.modify_class_size,
            remove_super_type: self.remove_super_type || other.remove_super_type,
            has_instance_transformer: self.has_instance_transformer || other.has_instance_transformer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_none() {
        assert_eq!(RedefinitionFlags::default(), RedefinitionFlags::NONE);
        assert!(RedefinitionFlags::default().is_none());
    }

    #[test]
    fn union_ors_each_field() {
        let a = RedefinitionFlags {
            modify_class: true,
            ..Default::default()
        };
        let b = RedefinitionFlags {
            modify_instances: true,
            ..Default::default()
        };
        let u = a.union(b);
        assert!(u.modify_class);
        assert!(u.modify_instances);
        assert!(!u.modify_instance_size);
    }

    #[test]
    fn union_is_idempotent() {
        let a = RedefinitionFlags {
            remove_super_type: true,
            ..Default::default()
        };
        assert_eq!(a.union(a), a);
    }

    #[test]
    fn non_empty_is_not_none() {
        let a = RedefinitionFlags {
            has_instance_transformer: true,
            ..Default::default()
        };
        assert!(!a.is_none());
    }
}
