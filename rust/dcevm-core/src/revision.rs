//! Process-wide monotonically increasing revision counter.
//!
//! Initializes to -1 at process start, increments at the start of every
//! transaction. Diagnostic only — not load-bearing for correctness.

use std::sync::atomic::{AtomicI64, Ordering};

static NEXT_REVISION: AtomicI64 = AtomicI64::new(-1);

/// Allocate the next revision number for a transaction.
pub fn next_revision() -> i64 {
    NEXT_REVISION.fetch_add(1, Ordering::SeqCst) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revisions_are_strictly_increasing() {
        let a = next_revision();
        let b = next_revision();
        let c = next_revision();
        assert!(a < b);
        assert!(b < c);
    }
}
