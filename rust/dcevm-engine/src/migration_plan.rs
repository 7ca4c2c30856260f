//! `FieldMigrationPlanner`: builds the `UpdateProgram` that rewrites an old
//! instance's byte image into the new layout.

use dcevm_core::{FieldDescriptor, UpdateProgram};

/// Build the update program migrating an instance from `old_fields`'
/// layout to `new_fields`' layout. `new_fields` must be in offset order
/// (the shape `ClassStub::declared_fields` already produces).
pub fn plan(old_fields: &[FieldDescriptor], new_fields: &[FieldDescriptor]) -> UpdateProgram {
    let mut program = UpdateProgram::new();
    let mut cursor = 0u32;

    for new_field in new_fields.iter().filter(|f| !f.modifiers.is_static) {
        if cursor < new_field.offset {
            program.push_zero(new_field.offset - cursor);
            cursor = new_field.offset;
        }
        match old_fields
            .iter()
            .find(|f| !f.modifiers.is_static && f.same_name_and_signature(new_field))
        {
            Some(old_field) => {
                program.push_copy(new_field.offset, new_field.size, old_field.offset);
            }
            None => {
                program.push_zero(new_field.size);
            }
        }
        cursor += new_field.size;
    }
    program
}

/// Whether a matched field should carry forward access/watch-tracking
/// flags from its old descriptor, the field-level counterpart of native
/// binding transfer.
pub fn carry_forward_access_tracked(old_field: &FieldDescriptor, new_field: &mut FieldDescriptor) {
    if old_field.same_name_and_signature(new_field) {
        new_field.modifiers.access_tracked = old_field.modifiers.access_tracked;
    }
}
