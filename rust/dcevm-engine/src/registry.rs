//! `ClassRegistry`: the owner of the newest `ClassVersion` of every loaded
//! class chain.
//!
//! Written only under the global redefinition lock; read concurrently via
//! ordinary lookups otherwise. Guarded with a
//! `parking_lot::RwLock` over the chain map, the same way other shared
//! registry maps in this workspace are guarded.

use dcevm_core::{ChainError, ClassIdentity, ClassVersion, VersionChain};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of every loaded class's version chain.
#[derive(Default)]
pub struct ClassRegistry {
    chains: RwLock<HashMap<ClassIdentity, VersionChain>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the first version of a newly loaded class. Used by test
    /// fixtures and the CLI demo to seed the registry; the real class
    /// loader's insertion path is out of scope.
    pub fn load_initial(&self, version: Arc<ClassVersion>) {
        let identity = version.identity;
        self.chains
            .write()
            .insert(identity, VersionChain::new(version));
    }

    /// The newest version of `identity`, if it is loaded.
    pub fn newest(&self, identity: ClassIdentity) -> Option<Arc<ClassVersion>> {
        self.chains
            .read()
            .get(&identity)
            .map(|chain| Arc::clone(chain.newest()))
    }

    /// Whether any version of `identity` is loaded.
    pub fn is_loaded(&self, identity: ClassIdentity) -> bool {
        self.chains.read().contains_key(&identity)
    }

    /// Every loaded class identity, in unspecified order.
    pub fn all_identities(&self) -> Vec<ClassIdentity> {
        self.chains.read().keys().copied().collect()
    }

    /// Atomically extend `identity`'s chain with `new_version` — the
    /// commit-time attach that makes a redefinition visible to new lookups.
    pub fn commit_attach(
        &self,
        identity: ClassIdentity,
        new_version: Arc<ClassVersion>,
    ) -> Result<(), ChainError> {
        let mut chains = self.chains.write();
        let chain = chains
            .remove(&identity)
            .expect("commit_attach called for an identity with no existing chain");
        match chain.attach(new_version) {
            Ok(updated) => {
                chains.insert(identity, updated);
                Ok(())
            }
            Err((original, err)) => {
                chains.insert(identity, original);
                Err(err)
            }
        }
    }

    /// Direct supertypes (primary super + interfaces) of `identity`'s
    /// *current newest* version, resolved to identities in the same
    /// loader. Real multi-loader delegation is out of scope; this reference
    /// registry assumes one loader namespace per redefinition request.
    pub fn direct_supertypes(&self, identity: ClassIdentity) -> Vec<ClassIdentity> {
        let Some(version) = self.newest(identity) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if let Some(super_name) = version.super_name {
            out.push(ClassIdentity::new(super_name, identity.loader));
        }
        for iface in &version.interfaces {
            out.push(ClassIdentity::new(*iface, identity.loader));
        }
        out
    }

    /// Whether `sub`'s newest version is a transitive subtype of `sup`
    /// (primary super chain plus secondary interfaces).
    pub fn is_subtype_of(&self, sub: ClassIdentity, sup: ClassIdentity) -> bool {
        if sub == sup {
            return true;
        }
        let mut seen = std::collections::HashSet::new();
        let mut stack = self.direct_supertypes(sub);
        while let Some(candidate) = stack.pop() {
            if candidate == sup {
                return true;
            }
            if seen.insert(candidate) {
                stack.extend(self.direct_supertypes(candidate));
            }
        }
        false
    }
}
