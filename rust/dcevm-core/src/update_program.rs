//! Update programs: compact instructions for migrating an instance's byte
//! image from an old field layout to a new one.
//!
//! HotSpot-style implementations encode this as a flat list of signed
//! integers (`positive n, off` = copy, `negative n` = zero-fill, trailing
//! `0` = terminator). We keep that semantics but use a tagged-variant
//! encoding ([`UpdateStep`]) rather than re-deriving sign tricks — a
//! language-neutral form is easier to reason about and test.

use serde::{Deserialize, Serialize};

/// One step of an [`UpdateProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateStep {
    /// Copy `len` bytes from the old instance's byte image starting at
    /// `from_offset`, written at the planner's current destination cursor.
    Copy { len: u32, from_offset: u32 },
    /// Write `len` zero bytes at the current destination cursor.
    Zero { len: u32 },
}

/// A compact, ordered program describing how to rewrite one class's old
/// instance layout into its new layout.
///
/// `copies_backwards` is set when any `Copy` step's source offset precedes
/// its own destination offset in the new layout — in that case the heap
/// rewriter must stage the source bytes in a scratch buffer before writing,
/// since an in-place forward copy would clobber the source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateProgram {
    steps: Vec<UpdateStep>,
    copies_backwards: bool,
}

impl UpdateProgram {
    /// Start building an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a copy step, merging it with the previous step when they are
    /// contiguous (same kind, adjoining source and destination ranges).
    pub fn push_copy(&mut self, dest_offset: u32, len: u32, from_offset: u32) {
        if from_offset < dest_offset {
            self.copies_backwards = true;
        }
        if let Some(UpdateStep::Copy {
            len: prev_len,
            from_offset: prev_from,
        }) = self.steps.last_mut()
        {
            if *prev_from + *prev_len == from_offset {
                *prev_len += len;
                return;
            }
        }
        self.steps.push(UpdateStep::Copy { len, from_offset });
    }

    /// Append a zero-fill step, merging it with a preceding zero-fill step.
    pub fn push_zero(&mut self, len: u32) {
        if len == 0 {
            return;
        }
        if let Some(UpdateStep::Zero { len: prev_len }) = self.steps.last_mut() {
            *prev_len += len;
            return;
        }
        self.steps.push(UpdateStep::Zero { len });
    }

    /// The steps of this program, in execution order.
    pub fn steps(&self) -> &[UpdateStep] {
        &self.steps
    }

    /// Whether any copy step's source precedes its destination, requiring a
    /// scratch-buffer staged copy.
    pub fn copies_backwards(&self) -> bool {
        self.copies_backwards
    }

    /// Whether this program performs no work at all (identity layout).
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Execute this program, producing the new instance's byte image.
    ///
    /// `source` is the old instance's byte image (or, when
    /// [`copies_backwards`](Self::copies_backwards) requires it, a scratch
    /// copy of it); `new_size` is the new instance's total body size.
    pub fn apply(&self, source: &[u8], new_size: usize) -> Vec<u8> {
        let mut out = vec![0u8; new_size];
        let mut cursor = 0usize;
        for step in &self.steps {
            match *step {
                UpdateStep::Copy { len, from_offset } => {
                    let len = len as usize;
                    let from = from_offset as usize;
                    out[cursor..cursor + len].copy_from_slice(&source[from..from + len]);
                    cursor += len;
                }
                UpdateStep::Zero { len } => {
                    cursor += len as usize;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_program_is_empty() {
        let p = UpdateProgram::new();
        assert!(p.is_empty());
        assert!(!p.copies_backwards());
    }

    #[test]
    fn added_field_appends_zero_fill() {
        // old: { int x } at offset 0; new: { int x; int y } x@0, y@4
        let mut p = UpdateProgram::new();
        p.push_copy(0, 4, 0);
        p.push_zero(4);
        assert_eq!(
            p.steps(),
            &[
                UpdateStep::Copy {
                    len: 4,
                    from_offset: 0
                },
                UpdateStep::Zero { len: 4 }
            ]
        );
        let old_bytes = [1, 2, 3, 4];
        let new_bytes = p.apply(&old_bytes, 8);
        assert_eq!(new_bytes, vec![1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn contiguous_copies_merge() {
        let mut p = UpdateProgram::new();
        p.push_copy(0, 4, 0);
        p.push_copy(4, 4, 4);
        assert_eq!(p.steps().len(), 1);
        assert_eq!(
            p.steps()[0],
            UpdateStep::Copy {
                len: 8,
                from_offset: 0
            }
        );
    }

    #[test]
    fn contiguous_zero_fills_merge() {
        let mut p = UpdateProgram::new();
        p.push_zero(4);
        p.push_zero(4);
        assert_eq!(p.steps(), &[UpdateStep::Zero { len: 8 }]);
    }

    #[test]
    fn zero_length_zero_fill_is_noop() {
        let mut p = UpdateProgram::new();
        p.push_zero(0);
        assert!(p.is_empty());
    }

    #[test]
    fn detects_backwards_copy() {
        // Field reordering: new offset 0 sources from old offset 4.
        let mut p = UpdateProgram::new();
        p.push_copy(0, 4, 4);
        assert!(p.copies_backwards());
    }

    #[test]
    fn forward_copy_is_not_backwards() {
        let mut p = UpdateProgram::new();
        p.push_copy(0, 4, 0);
        p.push_copy(4, 4, 8);
        assert!(!p.copies_backwards());
    }

    #[test]
    fn apply_handles_gap_then_copy() {
        // new layout: [gap 4][copy 4 from old@0]
        let mut p = UpdateProgram::new();
        p.push_zero(4);
        p.push_copy(4, 4, 0);
        let old_bytes = [9, 9, 9, 9];
        let out = p.apply(&old_bytes, 8);
        assert_eq!(out, vec![0, 0, 0, 0, 9, 9, 9, 9]);
    }
}
