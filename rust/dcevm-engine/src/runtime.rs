//! `ManagedRuntime`: the collaborator boundary a real embedder implements.
//!
//! Class loading, bytecode verification, the GC heap, the JIT, and the
//! debugger stay out of this crate — `redefine_classes` only needs a narrow
//! slice of each. This trait is that slice; [`InMemoryRuntime`] is the one
//! concrete implementation, used by tests and the CLI demo.

use crate::breakpoints::BreakpointTable;
use crate::compiler::CodeCache;
use crate::heap::{ClassRootKind, ManagedHeap};
use crate::registry::ClassRegistry;
use crate::thread_table::ThreadTable;
use dcevm_core::{
    ClassIdentity, FieldDescriptor, FieldModifiers, MethodDescriptor, MethodModifiers, Symbol,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Failure to parse the bytes of a `ClassDefinition` into a declared class
/// shape, corresponding to the `INVALID_CLASS_FORMAT` error code.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed class bytes: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("class name in bytes `{found}` does not match requested identity `{expected}`")]
    NameMismatch { expected: String, found: String },
}

/// The declared shape of a class, as carried by the new bytes. Real class
/// files are a binary format parsed by a verifier; out of scope here. This
/// reference runtime instead deserializes a small JSON stand-in,
/// `ClassStub`, carrying exactly what the redefinition pipeline needs:
/// supertype, interfaces, fields, and methods.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassStub {
    pub name: String,
    pub super_name: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub fields: Vec<StubField>,
    #[serde(default)]
    pub methods: Vec<StubMethod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StubField {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StubMethod {
    pub name: String,
    pub signature: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_native: bool,
    /// Opaque body bytes, compared only for EMCP equality.
    #[serde(default)]
    pub bytecode: Vec<u8>,
}

impl ClassStub {
    pub fn parse(bytes: &[u8]) -> Result<Self, LoadError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn declared_fields(&self) -> Vec<FieldDescriptor> {
        let mut instance_offset = 0u32;
        let mut static_offset = 0u32;
        self.fields
            .iter()
            .map(|f| {
                let size = descriptor_size(&f.descriptor);
                let offset = if f.is_static { &mut static_offset } else { &mut instance_offset };
                let descriptor = FieldDescriptor {
                    name: Symbol::intern(&f.name),
                    descriptor: Symbol::intern(&f.descriptor),
                    offset: *offset,
                    size,
                    modifiers: FieldModifiers {
                        is_static: f.is_static,
                        is_final: f.is_final,
                        is_private: f.is_private,
                        access_tracked: false,
                    },
                };
                *offset += size;
                descriptor
            })
            .collect()
    }

    pub fn declared_methods(&self) -> Vec<MethodDescriptor> {
        self.methods
            .iter()
            .map(|m| MethodDescriptor {
                name: Symbol::intern(&m.name),
                signature: Symbol::intern(&m.signature),
                modifiers: MethodModifiers {
                    is_private: m.is_private,
                    is_static: m.is_static,
                    is_final: m.is_final,
                    is_native: m.is_native,
                },
                method_id: 0,
                bytecode: m.bytecode.clone(),
                native_function: None,
            })
            .collect()
    }

    pub fn instance_size(&self) -> u32 {
        self.declared_fields()
            .iter()
            .filter(|f| !f.modifiers.is_static)
            .map(|f| f.offset + f.size)
            .max()
            .unwrap_or(0)
    }

    pub fn class_size(&self) -> u32 {
        self.declared_fields()
            .iter()
            .filter(|f| f.modifiers.is_static)
            .map(|f| f.offset + f.size)
            .max()
            .unwrap_or(0)
    }
}

/// Field descriptor sizes, JVM-style single-letter codes plus a catch-all
/// for reference types. Good enough for instance-size bookkeeping; a real
/// verifier would reject anything else.
fn descriptor_size(descriptor: &str) -> u32 {
    match descriptor {
        "B" | "Z" => 1,
        "S" | "C" => 2,
        "I" | "F" => 4,
        "J" | "D" => 8,
        _ => 8, // reference type
    }
}

/// The collaborator surface `redefine_classes` needs from a host runtime:
/// class loader, verifier, heap, and debugger, none of which this crate
/// implements. This trait is the seam where a real embedder plugs in its
/// own, and where [`InMemoryRuntime`] plugs in the reference ones.
pub trait ManagedRuntime {
    /// The class registry owning every loaded version chain.
    fn registry(&self) -> &ClassRegistry;

    /// Parse `bytes` into a declared class shape, validating that its name
    /// matches `expected` (mismatch is `NAMES_DONT_MATCH`).
    fn resolve_from_stream(
        &self,
        expected: ClassIdentity,
        bytes: &[u8],
    ) -> Result<ClassStub, LoadError> {
        let stub = ClassStub::parse(bytes)?;
        if Symbol::intern(&stub.name) != expected.name {
            return Err(LoadError::NameMismatch {
                expected: expected.name.to_string(),
                found: stub.name,
            });
        }
        Ok(stub)
    }

    /// Whether `identity`'s loaded class can be redefined at all (some
    /// runtime classes, e.g. primitives, are permanently unmodifiable).
    /// Default `true`, matching the reference runtime, which has no
    /// VM-internal classes; real embedders override this.
    fn is_modifiable(&self, identity: ClassIdentity) -> bool {
        self.registry().is_loaded(identity)
    }

    /// Verify `stub`'s declared shape before it is accepted as a
    /// provisional new version. A real embedder runs the full bytecode
    /// verifier here; the reference runtime performs a weaker structural
    /// check and reports failures as plain text.
    fn verify(&self, stub: &ClassStub) -> Result<(), String>;

    /// Agent-added method-name prefixes consulted by `NativeBindingTransfer`
    /// when re-resolving native method bindings. Default empty; a real
    /// embedder with retransformation agents attached overrides this.
    fn agent_prefixes(&self) -> &[String] {
        &[]
    }

    fn heap(&mut self) -> &mut ManagedHeap;
    fn threads(&mut self) -> &mut ThreadTable;
    fn code_cache(&mut self) -> &mut CodeCache;
    fn breakpoints(&mut self) -> &mut BreakpointTable;

    /// `HeapRewriter` needs simultaneous `&mut` access to the heap and the
    /// thread table (it rewrites both in one pass); a trait object can't
    /// hand out two independent `&mut self` borrows from separate methods,
    /// so this accessor exists to give implementors a way to split their
    /// own disjoint fields.
    fn heap_and_threads(&mut self) -> (&mut ManagedHeap, &mut ThreadTable);

    /// Run a full collection as the VM thread. Real embedders hand this to
    /// the GC, which relocates every object still flagged for migration
    /// (left pointing at its old klass by the heap rewrite's conditional
    /// branch) and applies its deferred update program while moving it.
    /// The reference runtime has no separate GC; it performs the same
    /// migration inline over its flat object arena.
    fn collect_as_vm_thread(&mut self);
}

/// Reference [`ManagedRuntime`]: owns a registry, a flat heap, a thread
/// table, a code cache, and a breakpoint table, all in plain process
/// memory. Used by `rust/dcevm-engine/tests` and `dcevm-cli`'s demo
/// command.
#[derive(Default)]
pub struct InMemoryRuntime {
    registry: ClassRegistry,
    heap: ManagedHeap,
    threads: ThreadTable,
    code_cache: CodeCache,
    breakpoints: BreakpointTable,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every class object/mirror strong root for `identity`'s
    /// newest version, for test setup that wants roots pre-populated.
    pub fn seed_class_roots(&mut self, identity: ClassIdentity) {
        if let Some(version) = self.registry.newest(identity) {
            self.heap.push_class_root(ClassRootKind::ClassObject, std::sync::Arc::clone(&version));
            self.heap.push_class_root(ClassRootKind::ClassMirror, version);
        }
    }
}

impl ManagedRuntime for InMemoryRuntime {
    fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    fn verify(&self, stub: &ClassStub) -> Result<(), String> {
        for (i, field) in stub.fields.iter().enumerate() {
            if stub.fields[..i]
                .iter()
                .any(|f| f.name == field.name && f.descriptor == field.descriptor)
            {
                return Err(format!("duplicate field `{}:{}`", field.name, field.descriptor));
            }
        }
        for (i, method) in stub.methods.iter().enumerate() {
            if stub.methods[..i]
                .iter()
                .any(|m| m.name == method.name && m.signature == method.signature)
            {
                return Err(format!("duplicate method `{}{}`", method.name, method.signature));
            }
        }
        Ok(())
    }

    fn heap(&mut self) -> &mut ManagedHeap {
        &mut self.heap
    }

    fn threads(&mut self) -> &mut ThreadTable {
        &mut self.threads
    }

    fn code_cache(&mut self) -> &mut CodeCache {
        &mut self.code_cache
    }

    fn breakpoints(&mut self) -> &mut BreakpointTable {
        &mut self.breakpoints
    }

    fn heap_and_threads(&mut self) -> (&mut ManagedHeap, &mut ThreadTable) {
        (&mut self.heap, &mut self.threads)
    }

    fn collect_as_vm_thread(&mut self) {
        let registry = &self.registry;
        for object in &mut self.heap.objects {
            let Some(newest) = registry.newest(object.class.identity) else {
                continue;
            };
            if Arc::ptr_eq(&object.class, &newest) {
                continue;
            }
            let program = crate::migration_plan::plan(&object.class.fields, &newest.fields);
            let source = if program.copies_backwards() {
                object.data.clone()
            } else {
                std::mem::take(&mut object.data)
            };
            object.data = program.apply(&source, newest.instance_size as usize);
            object.class = newest;
        }
    }
}
