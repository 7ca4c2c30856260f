//! `MethodMatcher`: the matched/added/deleted partition over a class's old
//! and new method lists, EMCP tagging, and method-identity reissue.

use dcevm_core::{MethodDescriptor, MethodPairing};

/// Match `old` against `new`, name+signature equality defining a match.
/// A parallel walk over name-sorted lists with forward search on signature
/// mismatch would work too; a direct lookup produces the same
/// matched/added/deleted partition without requiring pre-sorted input.
pub fn match_methods(old: &[MethodDescriptor], new: &[MethodDescriptor]) -> MethodPairing {
    let mut pairing = MethodPairing::new();
    let mut matched_old = vec![false; old.len()];

    for (new_idx, new_method) in new.iter().enumerate() {
        match old.iter().position(|m| m.same_name_and_signature(new_method)) {
            Some(old_idx) => {
                matched_old[old_idx] = true;
                let emcp = old[old_idx].bytecode == new_method.bytecode;
                pairing.push_matched(old_idx as u32, new_idx as u32, emcp);
            }
            None => pairing.push_added(new_idx as u32),
        }
    }
    for (old_idx, matched) in matched_old.iter().enumerate() {
        if !matched {
            pairing.push_deleted(old_idx as u32);
        }
    }
    pairing
}

/// Reissue method identity numbers for the new method list: matched
/// methods keep their old `method_id` (so breakpoints/JMethodIDs can be
/// re-pointed rather than re-created), added methods get a fresh id drawn
/// from `next_id`.
pub fn reissue_method_ids(
    old: &[MethodDescriptor],
    new: &mut [MethodDescriptor],
    pairing: &MethodPairing,
    mut next_id: impl FnMut() -> u64,
) {
    for i in 0..pairing.matched_len() {
        let old_idx = pairing.matching_old[i] as usize;
        let new_idx = pairing.matching_new[i] as usize;
        new[new_idx].method_id = old[old_idx].method_id;
    }
    for &new_idx in &pairing.added {
        new[new_idx as usize].method_id = next_id();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcevm_core::{MethodModifiers, Symbol};

    fn method(name: &str, id: u64, bytecode: &[u8]) -> MethodDescriptor {
        MethodDescriptor {
            name: Symbol::intern(name),
            signature: Symbol::intern("()V"),
            modifiers: MethodModifiers::default(),
            method_id: id,
            bytecode: bytecode.to_vec(),
            native_function: None,
        }
    }

    #[test]
    fn identical_bytecode_is_emcp() {
        let old = vec![method("f", 1, &[1, 2, 3])];
        let new = vec![method("f", 0, &[1, 2, 3])];
        let pairing = match_methods(&old, &new);
        assert_eq!(pairing.matched_len(), 1);
        assert!(pairing.is_emcp(0));
    }

    #[test]
    fn changed_bytecode_is_not_emcp() {
        let old = vec![method("f", 1, &[1, 2, 3])];
        let new = vec![method("f", 0, &[9, 9, 9])];
        let pairing = match_methods(&old, &new);
        assert!(!pairing.is_emcp(0));
    }

    #[test]
    fn added_and_deleted_methods_are_partitioned() {
        let old = vec![method("gone", 1, &[]), method("stay", 2, &[])];
        let new = vec![method("stay", 0, &[]), method("fresh", 0, &[])];
        let pairing = match_methods(&old, &new);
        assert_eq!(pairing.matched_len(), 1);
        assert_eq!(pairing.added, vec![1]);
        assert_eq!(pairing.deleted, vec![0]);
    }

    #[test]
    fn reissue_keeps_matched_ids_and_assigns_fresh_ones() {
        let old = vec![method("stay", 42, &[])];
        let mut new = vec![method("stay", 0, &[]), method("fresh", 0, &[])];
        let pairing = match_methods(&old, &new);
        let mut counter = 100u64;
        reissue_method_ids(&old, &mut new, &pairing, || {
            counter += 1;
            counter
        });
        assert_eq!(new[0].method_id, 42);
        assert_eq!(new[1].method_id, 101);
    }
}
