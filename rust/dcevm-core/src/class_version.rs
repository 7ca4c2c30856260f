//! `ClassVersion`: one loaded definition of a class, and the descriptors
//! that make it up (fields, methods, constant pool, mirror).

use crate::symbol::Symbol;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Identifies a class loader. Two classes with the same name but different
/// loader identity are distinct and never participate in the same
/// redefinition chain.
pub type LoaderId = u64;

/// Identity of a class within the registry: its interned name plus the
/// loader that defined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassIdentity {
    pub name: Symbol,
    pub loader: LoaderId,
}

impl ClassIdentity {
    pub fn new(name: Symbol, loader: LoaderId) -> Self {
        Self { name, loader }
    }
}

/// Lifecycle state of a `ClassVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitState {
    Allocated,
    Loaded,
    Linked,
    BeingInitialized,
    FullyInitialized,
    Error,
}

impl InitState {
    /// Whether this state is `Linked` or later — the boundary `HeapRewriter`
    /// step 3 uses to decide whether init state carries over to a new
    /// mirror.
    pub fn is_linked_or_beyond(self) -> bool {
        !matches!(self, InitState::Allocated | InitState::Loaded)
    }
}

/// Access and kind modifiers on a field, relevant subset for redefinition
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldModifiers {
    pub is_static: bool,
    pub is_final: bool,
    pub is_private: bool,
    /// Set when the field has been observed via reflection/watch APIs; this
    /// bit is carried forward by `FieldMigrationPlanner` across a matched
    /// field even when other modifiers change.
    pub access_tracked: bool,
}

/// One field of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: Symbol,
    pub descriptor: Symbol,
    pub offset: u32,
    pub size: u32,
    pub modifiers: FieldModifiers,
}

impl FieldDescriptor {
    /// Whether `self` and `other` name+describe the same field (used by
    /// `FieldMigrationPlanner` to find a field's old counterpart).
    pub fn same_name_and_signature(&self, other: &FieldDescriptor) -> bool {
        self.name == other.name && self.descriptor == other.descriptor
    }
}

/// Access and kind modifiers on a method, relevant subset for redefinition
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodModifiers {
    pub is_private: bool,
    pub is_static: bool,
    pub is_final: bool,
    pub is_native: bool,
}

impl MethodModifiers {
    /// Equality ignoring the native bit: matched methods may differ only in
    /// access-flag bits excluding the native bit.
    pub fn eq_excluding_native(&self, other: &MethodModifiers) -> bool {
        self.is_private == other.is_private
            && self.is_static == other.is_static
            && self.is_final == other.is_final
    }
}

/// One method of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: Symbol,
    pub signature: Symbol,
    pub modifiers: MethodModifiers,
    /// Opaque identity number, reissued by `MethodMatcher` on install.
    pub method_id: u64,
    /// Simplified bytecode body, used only to decide EMCP-ness: two matched
    /// methods are EMCP when their bodies compare byte-for-byte equal.
    /// Real bytecode would need constant-pool-index normalization first
    /// (two methods can be equivalent modulo constant pool while indexing
    /// into differently-ordered pools); this reference matcher skips that
    /// step and accepts the stricter, raw-equality criterion.
    pub bytecode: Vec<u8>,
    /// Bound native function, represented as an opaque token (stands in
    /// for a real function pointer, out of scope here).
    pub native_function: Option<u64>,
}

impl MethodDescriptor {
    pub fn is_native(&self) -> bool {
        self.modifiers.is_native
    }

    pub fn same_name_and_signature(&self, other: &MethodDescriptor) -> bool {
        self.name == other.name && self.signature == other.signature
    }
}

/// A static field's value, preserved by name+descriptor across a matched
/// redefinition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StaticValue {
    Int(i64),
    Ref(Option<u64>),
    Bytes(Vec<u8>),
}

/// The class-mirror object: the first-class object exposed to user code for
/// a `ClassVersion`, carrying identity hash, static fields, and bookkeeping
/// counters that must survive across redefinition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMirror {
    pub identity_hash: u64,
    pub class_redefined_count: u32,
    pub static_fields: Vec<(Symbol, StaticValue)>,
    pub array_class_refs: Vec<Symbol>,
}

impl ClassMirror {
    pub fn static_field(&self, name: Symbol) -> Option<&StaticValue> {
        self.static_fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn set_static_field(&mut self, name: Symbol, value: StaticValue) {
        if let Some(slot) = self.static_fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.static_fields.push((name, value));
        }
    }
}

/// A resolved klass reference in a constant pool, subject to rewriting when
/// its target is redefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantPoolEntry {
    pub index: u32,
    pub resolved_klass: Option<Symbol>,
}

/// One loaded definition of a class.
///
/// Two `ClassVersion`s of the same class are joined by `old_version`: the
/// newer version owns (via `Arc`) its predecessor. There is deliberately no
/// forward ("new_version") field here — "newest" is a registry-level
/// lookup by identity, not a mutual pointer on the node itself. See
/// `dcevm_engine::registry::VersionChain`.
#[derive(Debug)]
pub struct ClassVersion {
    pub identity: ClassIdentity,
    pub super_name: Option<Symbol>,
    pub interfaces: Vec<Symbol>,
    pub fields: Vec<FieldDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub instance_size: u32,
    pub class_size: u32,
    pub is_interface: bool,
    pub constant_pool: RwLock<Vec<ConstantPoolEntry>>,
    pub mirror: RwLock<ClassMirror>,
    init_state: RwLock<InitState>,
    /// The predecessor this version redefines, if any.
    pub old_version: Option<Arc<ClassVersion>>,
    /// Monotonically increasing, assigned at transaction start. `-1` before
    /// any transaction has ever touched this chain.
    revision: AtomicI64,
    /// Set while this version is mid-transaction (provisionally loaded, not
    /// yet committed); cleared by `HeapRewriter`'s finalize step or by
    /// `Rollback`.
    redefining: AtomicBool,
}

impl ClassVersion {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: ClassIdentity,
        super_name: Option<Symbol>,
        interfaces: Vec<Symbol>,
        fields: Vec<FieldDescriptor>,
        methods: Vec<MethodDescriptor>,
        instance_size: u32,
        class_size: u32,
        is_interface: bool,
        old_version: Option<Arc<ClassVersion>>,
    ) -> Self {
        Self {
            identity,
            super_name,
            interfaces,
            fields,
            methods,
            instance_size,
            class_size,
            is_interface,
            constant_pool: RwLock::new(Vec::new()),
            mirror: RwLock::new(ClassMirror::default()),
            init_state: RwLock::new(InitState::Loaded),
            old_version,
            revision: AtomicI64::new(-1),
            redefining: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> Symbol {
        self.identity.name
    }

    pub fn init_state(&self) -> InitState {
        *self.init_state.read()
    }

    pub fn set_init_state(&self, state: InitState) {
        *self.init_state.write() = state;
    }

    pub fn revision(&self) -> i64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn set_revision(&self, revision: i64) {
        self.revision.store(revision, Ordering::Release);
    }

    pub fn is_redefining(&self) -> bool {
        self.redefining.load(Ordering::Acquire)
    }

    pub fn mark_redefining(&self) {
        self.redefining.store(true, Ordering::Release);
    }

    pub fn clear_redefining(&self) {
        self.redefining.store(false, Ordering::Release);
    }

    /// Find a field by name+signature, used when diffing against another
    /// version.
    pub fn find_field(&self, name: Symbol, descriptor: Symbol) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.descriptor == descriptor)
    }

    /// Find a method by name+signature.
    pub fn find_method(&self, name: Symbol, signature: Symbol) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.signature == signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ClassIdentity {
        ClassIdentity::new(Symbol::intern(name), 0)
    }

    #[test]
    fn new_version_starts_loaded_not_redefining() {
        let v = ClassVersion::new(id("A"), None, vec![], vec![], vec![], 16, 8, false, None);
        assert_eq!(v.init_state(), InitState::Loaded);
        assert!(!v.is_redefining());
        assert_eq!(v.revision(), -1);
    }

    #[test]
    fn mark_and_clear_redefining() {
        let v = ClassVersion::new(id("A"), None, vec![], vec![], vec![], 16, 8, false, None);
        v.mark_redefining();
        assert!(v.is_redefining());
        v.clear_redefining();
        assert!(!v.is_redefining());
    }

    #[test]
    fn old_version_is_owned_by_new() {
        let old = Arc::new(ClassVersion::new(
            id("A"),
            None,
            vec![],
            vec![],
            vec![],
            16,
            8,
            false,
            None,
        ));
        let new = ClassVersion::new(
            id("A"),
            None,
            vec![],
            vec![],
            vec![],
            24,
            8,
            false,
            Some(Arc::clone(&old)),
        );
        assert!(new.old_version.is_some());
        assert_eq!(new.old_version.as_ref().unwrap().instance_size, 16);
    }

    #[test]
    fn init_state_linked_or_beyond() {
        assert!(!InitState::Allocated.is_linked_or_beyond());
        assert!(!InitState::Loaded.is_linked_or_beyond());
        assert!(InitState::Linked.is_linked_or_beyond());
        assert!(InitState::FullyInitialized.is_linked_or_beyond());
    }

    #[test]
    fn method_modifiers_eq_excluding_native() {
        let a = MethodModifiers {
            is_private: true,
            is_native: false,
            ..Default::default()
        };
        let b = MethodModifiers {
            is_private: true,
            is_native: true,
            ..Default::default()
        };
        assert!(a.eq_excluding_native(&b));
    }

    #[test]
    fn mirror_static_field_roundtrip() {
        let mut mirror = ClassMirror::default();
        let name = Symbol::intern("counter");
        mirror.set_static_field(name, StaticValue::Int(42));
        assert_eq!(mirror.static_field(name), Some(&StaticValue::Int(42)));
        mirror.set_static_field(name, StaticValue::Int(43));
        assert_eq!(mirror.static_field(name), Some(&StaticValue::Int(43)));
        assert_eq!(mirror.static_fields.len(), 1);
    }

    #[test]
    fn find_field_and_method() {
        let f = FieldDescriptor {
            name: Symbol::intern("x"),
            descriptor: Symbol::intern("I"),
            offset: 0,
            size: 4,
            modifiers: FieldModifiers::default(),
        };
        let m = MethodDescriptor {
            name: Symbol::intern("f"),
            signature: Symbol::intern("()I"),
            modifiers: MethodModifiers::default(),
            method_id: 1,
            bytecode: vec![],
            native_function: None,
        };
        let v = ClassVersion::new(
            id("A"),
            None,
            vec![],
            vec![f],
            vec![m],
            8,
            8,
            false,
            None,
        );
        assert!(v.find_field(Symbol::intern("x"), Symbol::intern("I")).is_some());
        assert!(v.find_field(Symbol::intern("y"), Symbol::intern("I")).is_none());
        assert!(v.find_method(Symbol::intern("f"), Symbol::intern("()I")).is_some());
    }
}
