//! The bit-stable error-code taxonomy returned by `redefine_classes`.
//!
//! Tool integrations (debuggers, agents) match on these discriminants, so
//! the variant order — and therefore the numeric value of each variant —
//! must never change once published. New codes are appended at the end,
//! never inserted.

use std::fmt;

/// Outcome of a `redefine_classes` call.
///
/// `NONE` (0) is success; every other variant identifies a specific
/// rejection reason.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    None = 0,
    NullPointer = 1,
    InvalidClass = 2,
    InvalidClassFormat = 3,
    UnsupportedVersion = 4,
    CircularClassDefinition = 5,
    NamesDontMatch = 6,
    OutOfMemory = 7,
    FailsVerification = 8,
    UnsupportedRedefinitionHierarchyChanged = 9,
    UnsupportedRedefinitionClassModifiersChanged = 10,
    UnsupportedRedefinitionSchemaChanged = 11,
    UnsupportedRedefinitionMethodAdded = 12,
    UnsupportedRedefinitionMethodDeleted = 13,
    UnsupportedRedefinitionMethodModifiersChanged = 14,
    Internal = 15,
}

impl ErrorCode {
    /// Whether this code represents success.
    pub fn is_success(self) -> bool {
        matches!(self, ErrorCode::None)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::None => "NONE",
            ErrorCode::NullPointer => "NULL_POINTER",
            ErrorCode::InvalidClass => "INVALID_CLASS",
            ErrorCode::InvalidClassFormat => "INVALID_CLASS_FORMAT",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::CircularClassDefinition => "CIRCULAR_CLASS_DEFINITION",
            ErrorCode::NamesDontMatch => "NAMES_DONT_MATCH",
            ErrorCode::OutOfMemory => "OUT_OF_MEMORY",
            ErrorCode::FailsVerification => "FAILS_VERIFICATION",
            ErrorCode::UnsupportedRedefinitionHierarchyChanged => {
                "UNSUPPORTED_REDEFINITION_HIERARCHY_CHANGED"
            }
            ErrorCode::UnsupportedRedefinitionClassModifiersChanged => {
                "UNSUPPORTED_REDEFINITION_CLASS_MODIFIERS_CHANGED"
            }
            ErrorCode::UnsupportedRedefinitionSchemaChanged => {
                "UNSUPPORTED_REDEFINITION_SCHEMA_CHANGED"
            }
            ErrorCode::UnsupportedRedefinitionMethodAdded => {
                "UNSUPPORTED_REDEFINITION_METHOD_ADDED"
            }
            ErrorCode::UnsupportedRedefinitionMethodDeleted => {
                "UNSUPPORTED_REDEFINITION_METHOD_DELETED"
            }
            ErrorCode::UnsupportedRedefinitionMethodModifiersChanged => {
                "UNSUPPORTED_REDEFINITION_METHOD_MODIFIERS_CHANGED"
            }
            ErrorCode::Internal => "INTERNAL",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_are_bit_stable() {
        let table: &[(ErrorCode, u32)] = &[
            (ErrorCode::None, 0),
            (ErrorCode::NullPointer, 1),
            (ErrorCode::InvalidClass, 2),
            (ErrorCode::InvalidClassFormat, 3),
            (ErrorCode::UnsupportedVersion, 4),
            (ErrorCode::CircularClassDefinition, 5),
            (ErrorCode::NamesDontMatch, 6),
            (ErrorCode::OutOfMemory, 7),
            (ErrorCode::FailsVerification, 8),
            (ErrorCode::UnsupportedRedefinitionHierarchyChanged, 9),
            (ErrorCode::UnsupportedRedefinitionClassModifiersChanged, 10),
            (ErrorCode::UnsupportedRedefinitionSchemaChanged, 11),
            (ErrorCode::UnsupportedRedefinitionMethodAdded, 12),
            (ErrorCode::UnsupportedRedefinitionMethodDeleted, 13),
            (
                ErrorCode::UnsupportedRedefinitionMethodModifiersChanged,
                14,
            ),
            (ErrorCode::Internal, 15),
        ];
        for (code, expected) in table {
            assert_eq!(*code as u32, *expected, "{code:?} discriminant drifted");
        }
    }

    #[test]
    fn none_is_success() {
        assert!(ErrorCode::None.is_success());
        assert!(!ErrorCode::Internal.is_success());
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(ErrorCode::CircularClassDefinition.to_string(), "CIRCULAR_CLASS_DEFINITION");
        assert_eq!(ErrorCode::None.to_string(), "NONE");
    }
}
