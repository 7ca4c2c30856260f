//! User-facing input to `redefine_classes`.

use dcevm_core::ClassIdentity;

/// One class the caller wants redefined: the identity of the already-loaded
/// class, plus the new bytes to load in its place.
///
/// Mirrors the JVMTI `jvmtiClassDefinition` shape (`class_ref`, `bytes`,
/// `byte_count`) accepted by the entry point.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub class_ref: ClassIdentity,
    pub bytes: Vec<u8>,
}

impl ClassDefinition {
    pub fn new(class_ref: ClassIdentity, bytes: Vec<u8>) -> Self {
        Self { class_ref, bytes }
    }

    /// `byte_count` as a standalone accessor, matching the source API shape
    /// even though `Vec::len` already gives us this.
    pub fn byte_count(&self) -> usize {
        self.bytes.len()
    }
}
