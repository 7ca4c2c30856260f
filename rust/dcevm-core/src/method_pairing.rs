//! The matched/added/deleted partition over one class's old and new method
//! tables, computed by `MethodMatcher` (see `dcevm-engine::method_match`).

use serde::{Deserialize, Serialize};

/// Result of matching one class's old method list against its new one.
///
/// `matching_old[i]` and `matching_new[i]` index into the old and new
/// method lists respectively and describe the same logical method.
/// `emcp[i]` is `true` when that matched pair is Equivalent Modulo Constant
/// Pool (bytecode identical once constant-pool indices are normalized).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodPairing {
    pub matching_old: Vec<u32>,
    pub matching_new: Vec<u32>,
    pub emcp: Vec<bool>,
    pub added: Vec<u32>,
    pub deleted: Vec<u32>,
}

impl MethodPairing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a matched pair. `emcp` marks whether the two method bodies
    /// are equivalent modulo constant-pool indices.
    pub fn push_matched(&mut self, old_index: u32, new_index: u32, emcp: bool) {
        self.matching_old.push(old_index);
        self.matching_new.push(new_index);
        self.emcp.push(emcp);
    }

    pub fn push_added(&mut self, new_index: u32) {
        self.added.push(new_index);
    }

    pub fn push_deleted(&mut self, old_index: u32) {
        self.deleted.push(old_index);
    }

    /// Number of matched pairs.
    pub fn matched_len(&self) -> usize {
        self.matching_old.len()
    }

    /// Whether the matched pair at `i` is EMCP.
    pub fn is_emcp(&self, i: usize) -> bool {
        self.emcp[i]
    }

    /// Whether any non-EMCP matched pair, added method, or deleted method
    /// exists — i.e. the method set actually changed.
    pub fn has_method_changes(&self) -> bool {
        !self.added.is_empty()
            || !self.deleted.is_empty()
            || self.emcp.iter().any(|&e| !e)
    }
}
