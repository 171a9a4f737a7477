//! The builtin registry.
//!
//! Maps names to callables with declared safety sets. Lookup is a
//! hash probe plus a reference-count bump, no allocation. The safety
//! check runs both here (at binding time, via `lookup_checked`) and
//! again inside every call, so a callable smuggled past the registry
//! still refuses to run.

use std::rc::Rc;

use indexmap::IndexMap;

use lark_util::{EvalError, Result};
use lark_value::{NativeBuiltin, Thread, Value};

use crate::builtins;

pub struct Universe {
    builtins: IndexMap<&'static str, Rc<NativeBuiltin>>,
}

impl Universe {
    /// An empty registry, for hosts that assemble their own surface.
    pub fn empty() -> Universe {
        Universe {
            builtins: IndexMap::new(),
        }
    }

    /// The standard registry: every universal builtin.
    pub fn standard() -> Universe {
        let mut universe = Universe::empty();
        for builtin in builtins::all() {
            universe.register(builtin);
        }
        universe
            .validate()
            .expect("the standard registry validates");
        universe
    }

    /// Adds (or replaces) an entry.
    pub fn register(&mut self, builtin: NativeBuiltin) {
        self.builtins.insert(builtin.name(), Rc::new(builtin));
    }

    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }

    /// Registration-ordered names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builtins.keys().copied()
    }

    /// Allocation-free lookup.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.builtins
            .get(name)
            .map(|b| Value::Builtin(Rc::clone(b)))
    }

    /// Lookup plus the load-time safety check: the thread's
    /// requirement must be covered by the entry's declared set.
    pub fn lookup_checked(&self, thread: &Thread, name: &str) -> Result<Value> {
        let builtin = self
            .builtins
            .get(name)
            .ok_or_else(|| EvalError::name_lookup(format!("undefined builtin {:?}", name)))?;
        thread.permits(builtin.safety())?;
        Ok(Value::Builtin(Rc::clone(builtin)))
    }

    /// Cross-checks the table. Run once at load; failures are engine
    /// bugs, not user errors.
    pub fn validate(&self) -> Result<()> {
        for (name, builtin) in &self.builtins {
            if name.is_empty() {
                return Err(EvalError::internal("registry entry with empty name"));
            }
            if *name != builtin.name() {
                return Err(EvalError::internal(format!(
                    "registry key {:?} does not match builtin name {:?}",
                    name,
                    builtin.name()
                )));
            }
            if builtin.receiver().is_some() {
                return Err(EvalError::internal(format!(
                    "registry entry {:?} has a bound receiver",
                    name
                )));
            }
        }
        log::debug!("builtin registry validated: {} entries", self.builtins.len());
        Ok(())
    }
}

impl Default for Universe {
    fn default() -> Self {
        Universe::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lark_util::{ErrorKind, SafetyFlags};

    const EXPECTED: &[&str] = &[
        "all", "any", "bool", "bytes", "chr", "dict", "dir", "enumerate", "fail", "float",
        "getattr", "hasattr", "hash", "int", "len", "list", "max", "min", "ord", "print",
        "range", "repr", "reversed", "set", "sorted", "str", "tuple", "type", "zip",
    ];

    #[test]
    fn test_standard_has_every_universal_builtin() {
        let universe = Universe::standard();
        for name in EXPECTED {
            assert!(universe.lookup(name).is_some(), "missing builtin {}", name);
        }
        assert_eq!(universe.len(), EXPECTED.len());
    }

    #[test]
    fn test_unknown_name() {
        let universe = Universe::standard();
        let thread = Thread::new();
        let err = universe.lookup_checked(&thread, "eval").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameLookup);
    }

    #[test]
    fn test_lookup_checked_enforces_safety() {
        let universe = Universe::standard();
        let thread = Thread::new();
        thread.require_safety(SafetyFlags::SAFE);
        // Every standard entry declares full safety, so even a fully
        // demanding thread may bind them.
        for name in EXPECTED {
            assert!(universe.lookup_checked(&thread, name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_every_entry_declares_full_safety() {
        // The standard library is fully metered; a weaker declaration
        // is a table bug.
        let universe = Universe::standard();
        let thread = Thread::new();
        thread.require_safety(SafetyFlags::SAFE);
        for name in universe.names() {
            assert!(
                universe.lookup_checked(&thread, name).is_ok(),
                "{} declares weaker-than-full safety",
                name
            );
        }
    }
}
