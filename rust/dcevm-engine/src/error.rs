//! Engine-internal error type, mapped down to the wire-stable
//! [`ErrorCode`] taxonomy at the `redefine_classes` boundary.
//!
//! Internally we want `thiserror` variants carrying enough context for
//! `tracing` to log something useful; externally the contract is just one
//! of sixteen fixed codes.

use dcevm_core::{ChainError, ClassIdentity, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedefineError {
    #[error("class definitions list was empty")]
    NullPointer,

    #[error("class `{0:?}` is not currently loaded")]
    InvalidClass(ClassIdentity),

    #[error("class bytes for `{0:?}` could not be parsed: {1}")]
    InvalidClassFormat(ClassIdentity, String),

    #[error("class file version for `{0:?}` is unsupported")]
    UnsupportedVersion(ClassIdentity),

    #[error("redefinition set contains a cycle through {0:?}")]
    CircularClassDefinition(ClassIdentity),

    #[error("new bytes for `{0:?}` declare a different class name")]
    NamesDontMatch(ClassIdentity),

    #[error("out of memory while preparing the redefinition transaction")]
    OutOfMemory,

    #[error("class `{0:?}` fails verification: {1}")]
    FailsVerification(ClassIdentity, String),

    #[error("class `{0:?}` changed its class hierarchy, which is unsupported")]
    HierarchyChanged(ClassIdentity),

    #[error("class `{0:?}` changed its class-level modifiers, which is unsupported")]
    ClassModifiersChanged(ClassIdentity),

    #[error("class `{0:?}` changed its instance schema incompatibly: {1}")]
    SchemaChanged(ClassIdentity, String),

    #[error("class `{0:?}` added method `{1}` in compatibility mode")]
    MethodAdded(ClassIdentity, String),

    #[error("class `{0:?}` deleted method `{1}` in compatibility mode")]
    MethodDeleted(ClassIdentity, String),

    #[error("class `{0:?}` changed modifiers on method `{1}`")]
    MethodModifiersChanged(ClassIdentity, String),

    #[error("internal engine error: {0}")]
    Internal(String),
}

impl RedefineError {
    /// Map to the wire-stable code returned by `redefine_classes`.
    pub fn code(&self) -> ErrorCode {
        match self {
            RedefineError::NullPointer => ErrorCode::NullPointer,
            RedefineError::InvalidClass(_) => ErrorCode::InvalidClass,
            RedefineError::InvalidClassFormat(..) => ErrorCode::InvalidClassFormat,
            RedefineError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            RedefineError::CircularClassDefinition(_) => ErrorCode::CircularClassDefinition,
            RedefineError::NamesDontMatch(_) => ErrorCode::NamesDontMatch,
            RedefineError::OutOfMemory => ErrorCode::OutOfMemory,
            RedefineError::FailsVerification(..) => ErrorCode::FailsVerification,
            RedefineError::HierarchyChanged(_) => ErrorCode::UnsupportedRedefinitionHierarchyChanged,
            RedefineError::ClassModifiersChanged(_) => {
                ErrorCode::UnsupportedRedefinitionClassModifiersChanged
            }
            RedefineError::SchemaChanged(..) => ErrorCode::UnsupportedRedefinitionSchemaChanged,
            RedefineError::MethodAdded(..) => ErrorCode::UnsupportedRedefinitionMethodAdded,
            RedefineError::MethodDeleted(..) => ErrorCode::UnsupportedRedefinitionMethodDeleted,
            RedefineError::MethodModifiersChanged(..) => {
                ErrorCode::UnsupportedRedefinitionMethodModifiersChanged
            }
            RedefineError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<ChainError> for RedefineError {
    fn from(e: ChainError) -> Self {
        RedefineError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcevm_core::Symbol;

    fn id() -> ClassIdentity {
        ClassIdentity::new(Symbol::intern("pkg.A"), 0)
    }

    #[test]
    fn code_mapping_matches_variant() {
        assert_eq!(RedefineError::NullPointer.code(), ErrorCode::NullPointer);
        assert_eq!(
            RedefineError::CircularClassDefinition(id()).code(),
            ErrorCode::CircularClassDefinition
        );
        assert_eq!(
            RedefineError::MethodAdded(id(), "foo".into()).code(),
            ErrorCode::UnsupportedRedefinitionMethodAdded
        );
    }

    #[test]
    fn chain_error_maps_to_internal() {
        let err: RedefineError = ChainError::Fork.into();
        assert_eq!(err.code(), ErrorCode::Internal);
    }
}
