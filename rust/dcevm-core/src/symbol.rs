//! Global symbol interning for class, field, and method names.
//!
//! Names are compared constantly during affected-set discovery, method
//! matching, and field migration planning, so they are interned once into a
//! process-wide [`SymbolTable`] and compared by [`Symbol`] equality
//! afterwards instead of by string content.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// An interned name. Cheap to copy and compare.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

/// Symbols serialize as their string form, not their interned id — the id
/// is only stable within one process.
impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Symbol::intern(&s))
    }
}

impl Symbol {
    /// Intern `s` into the global table, returning its `Symbol`.
    pub fn intern(s: &str) -> Self {
        GLOBAL_TABLE.lock().intern(s)
    }

    /// Resolve this symbol back to its string form.
    pub fn as_str(&self) -> &'static str {
        GLOBAL_TABLE.lock().resolve_static(self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::intern(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::intern(&s)
    }
}

/// Intern table mapping strings to unique IDs.
///
/// Entries are leaked to `'static` on insertion so that [`Symbol::as_str`]
/// can hand out `&'static str` without holding the table lock — names are
/// never interned at a rate that makes this leak material (class, field,
/// and method names are bounded by the size of loaded code).
#[derive(Default)]
struct SymbolTable {
    strings: Vec<&'static str>,
    lookup: HashMap<&'static str, u32>,
}

impl SymbolTable {
    fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&id) = self.lookup.get(s) {
            return Symbol(id);
        }
        let leaked: &'static str = Box::leak(s.to_string().into_boxed_str());
        let id = self.strings.len() as u32;
        self.strings.push(leaked);
        self.lookup.insert(leaked, id);
        Symbol(id)
    }

    fn resolve_static(&self, id: u32) -> &'static str {
        self.strings[id as usize]
    }
}

static GLOBAL_TABLE: Lazy<Mutex<SymbolTable>> = Lazy::new(|| Mutex::new(SymbolTable::default()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_string_interns_to_same_symbol() {
        let a = Symbol::intern("java.lang.Object");
        let b = Symbol::intern("java.lang.Object");
        assert_eq!(a, b);
    }

    #[test]
    fn different_strings_intern_differently() {
        let a = Symbol::intern("pkg.A");
        let b = Symbol::intern("pkg.B");
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_as_str() {
        let s = Symbol::intern("com.example.Widget");
        assert_eq!(s.as_str(), "com.example.Widget");
    }

    #[test]
    fn from_impls_match_intern() {
        let a: Symbol = "pkg.C".into();
        let b = Symbol::intern("pkg.C");
        assert_eq!(a, b);
    }
}
