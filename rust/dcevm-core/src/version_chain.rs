//! `VersionChain`: the sequence of successive `ClassVersion`s for one class.
//!
//! The chain is realized as a single owning pointer to the newest version;
//! each version owns its predecessor
//! via `old_version`. There is no forward pointer — finding "the version
//! that redefines X" is a backward walk from the newest, which is cheap
//! because chains are short (bounded by how many times a class has been
//! redefined in this process's lifetime).

use crate::class_version::ClassVersion;
use std::sync::Arc;
use thiserror::Error;

/// Errors that violate a `VersionChain` invariant: at most one newest, at
/// most one oldest, chains never fork, never cycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("new version's old_version does not point at the chain's current newest (fork attempted)")]
    Fork,
    #[error("new version's old_version is unset; a redefinition must link to a predecessor")]
    NoPredecessor,
}

/// A non-empty, fork-free, cycle-free sequence of `ClassVersion`s for one
/// class, newest first.
#[derive(Debug, Clone)]
pub struct VersionChain {
    newest: Arc<ClassVersion>,
}

impl VersionChain {
    /// Start a chain with a single (oldest == newest) version.
    pub fn new(first: Arc<ClassVersion>) -> Self {
        Self { newest: first }
    }

    /// The current newest version.
    pub fn newest(&self) -> &Arc<ClassVersion> {
        &self.newest
    }

    /// The oldest (original) version — walks to the bottom of the chain.
    pub fn oldest(&self) -> &Arc<ClassVersion> {
        let mut cur = &self.newest;
        while let Some(older) = &cur.old_version {
            cur = older;
        }
        cur
    }

    /// Iterate from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClassVersion>> {
        std::iter::successors(Some(&self.newest), |v| v.old_version.as_ref())
    }

    /// Number of versions in the chain.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Find the version whose `old_version` is `target`, i.e. the version
    /// that directly redefined it. `None` if `target` is the newest or is
    /// not part of this chain.
    pub fn successor_of(&self, target: &Arc<ClassVersion>) -> Option<Arc<ClassVersion>> {
        self.iter()
            .find(|v| {
                v.old_version
                    .as_ref()
                    .is_some_and(|p| Arc::ptr_eq(p, target))
            })
            .cloned()
    }

    /// Extend the chain with `new_version`, which must own (via
    /// `old_version`) a strong reference to the current newest — otherwise
    /// this would fork the chain. Consumes and returns `self` with the new
    /// head, so a failed attach leaves the caller holding the original
    /// chain value (it was never mutated).
    pub fn attach(self, new_version: Arc<ClassVersion>) -> Result<Self, (Self, ChainError)> {
        match &new_version.old_version {
            None => Err((self, ChainError::NoPredecessor)),
            Some(pred) if !Arc::ptr_eq(pred, &self.newest) => Err((self, ChainError::Fork)),
            Some(_) => Ok(Self {
                newest: new_version,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_version::ClassIdentity;
    use crate::symbol::Symbol;

    fn version(name: &str, old: Option<Arc<ClassVersion>>) -> Arc<ClassVersion> {
        Arc::new(ClassVersion::new(
            ClassIdentity::new(Symbol::intern(name), 0),
            None,
            vec![],
            vec![],
            vec![],
            16,
            8,
            false,
            old,
        ))
    }

    #[test]
    fn single_version_chain_oldest_is_newest() {
        let v0 = version("A", None);
        let chain = VersionChain::new(Arc::clone(&v0));
        assert!(Arc::ptr_eq(chain.newest(), &v0));
        assert!(Arc::ptr_eq(chain.oldest(), &v0));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn attach_extends_chain() {
        let v0 = version("A", None);
        let chain = VersionChain::new(Arc::clone(&v0));
        let v1 = version("A", Some(Arc::clone(&v0)));
        let chain = chain.attach(Arc::clone(&v1)).unwrap();
        assert!(Arc::ptr_eq(chain.newest(), &v1));
        assert!(Arc::ptr_eq(chain.oldest(), &v0));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn attach_rejects_fork() {
        let v0 = version("A", None);
        let chain = VersionChain::new(Arc::clone(&v0));
        // v1 claims a predecessor that isn't the chain's current newest.
        let unrelated = version("A", None);
        let v1 = version("A", Some(Arc::clone(&unrelated)));
        let (chain, err) = chain.attach(v1).unwrap_err();
        assert_eq!(err, ChainError::Fork);
        assert!(Arc::ptr_eq(chain.newest(), &v0));
    }

    #[test]
    fn attach_rejects_missing_predecessor() {
        let v0 = version("A", None);
        let chain = VersionChain::new(Arc::clone(&v0));
        let orphan = version("A", None);
        let (chain, err) = chain.attach(orphan).unwrap_err();
        assert_eq!(err, ChainError::NoPredecessor);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn successor_of_finds_direct_child() {
        let v0 = version("A", None);
        let v1 = version("A", Some(Arc::clone(&v0)));
        let chain = VersionChain::new(Arc::clone(&v0))
            .attach(Arc::clone(&v1))
            .unwrap();
        let found = chain.successor_of(&v0).unwrap();
        assert!(Arc::ptr_eq(&found, &v1));
        assert!(chain.successor_of(&v1).is_none());
    }

    #[test]
    fn three_version_chain_walks_correctly() {
        let v0 = version("A", None);
        let v1 = version("A", Some(Arc::clone(&v0)));
        let v2 = version("A", Some(Arc::clone(&v1)));
        let chain = VersionChain::new(Arc::clone(&v0))
            .attach(Arc::clone(&v1))
            .unwrap()
            .attach(Arc::clone(&v2))
            .unwrap();
        assert_eq!(chain.len(), 3);
        assert!(Arc::ptr_eq(chain.newest(), &v2));
        assert!(Arc::ptr_eq(chain.oldest(), &v0));
        let names: Vec<_> = chain.iter().map(|v| v.revision()).collect();
        assert_eq!(names.len(), 3);
    }
}
