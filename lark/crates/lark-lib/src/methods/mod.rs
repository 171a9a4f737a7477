//! Per-type method tables.
//!
//! Every type's methods live in a compile-time table of
//! (name, declared safety, implementation) entries; attribute lookup
//! binds the receiver and wraps the entry as a callable value. A
//! per-receiver test enforces that the tables and the implementations
//! agree both ways.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use lark_value::{NativeBuiltin, NativeFn, SafetyFlags, Value};

pub mod bytes;
pub mod dict;
pub mod list;
pub mod set;
pub mod string;

/// One method table entry. Plain data so the tables can be shared
/// statics; binding to a receiver happens at lookup time.
pub struct MethodSpec {
    pub name: &'static str,
    pub safety: SafetyFlags,
    pub f: NativeFn,
}

impl MethodSpec {
    pub const fn new(name: &'static str, safety: SafetyFlags, f: NativeFn) -> MethodSpec {
        MethodSpec { name, safety, f }
    }
}

/// The methods of one receiver type.
pub struct MethodTable {
    type_name: &'static str,
    by_name: FxHashMap<&'static str, &'static MethodSpec>,
    /// Names in sorted order, for `dir`.
    names: Vec<&'static str>,
}

impl MethodTable {
    fn new(type_name: &'static str, specs: &'static [MethodSpec]) -> MethodTable {
        let mut by_name = FxHashMap::default();
        let mut names = Vec::with_capacity(specs.len());
        for spec in specs {
            let clash = by_name.insert(spec.name, spec);
            assert!(
                clash.is_none(),
                "duplicate method {}.{}",
                type_name,
                spec.name
            );
            names.push(spec.name);
        }
        names.sort_unstable();
        MethodTable {
            type_name,
            by_name,
            names,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&'static MethodSpec> {
        self.by_name.get(name).copied()
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// A callable bound to `recv`, or `None` if the name is unknown.
    pub fn bind(&self, name: &str, recv: &Value) -> Option<NativeBuiltin> {
        self.get(name)
            .map(|spec| NativeBuiltin::new(spec.name, spec.safety, spec.f).bind(recv.clone()))
    }
}

lazy_static! {
    pub static ref LIST_METHODS: MethodTable = MethodTable::new("list", list::SPECS);
    pub static ref DICT_METHODS: MethodTable = MethodTable::new("dict", dict::SPECS);
    pub static ref SET_METHODS: MethodTable = MethodTable::new("set", set::SPECS);
    pub static ref STRING_METHODS: MethodTable = MethodTable::new("string", string::SPECS);
    pub static ref BYTES_METHODS: MethodTable = MethodTable::new("bytes", bytes::SPECS);
}

/// The method table for a value's type, if it has one.
pub fn table_for(value: &Value) -> Option<&'static MethodTable> {
    match value {
        Value::List(_) => Some(&LIST_METHODS),
        Value::Dict(_) => Some(&DICT_METHODS),
        Value::Set(_) => Some(&SET_METHODS),
        Value::Str(_) => Some(&STRING_METHODS),
        Value::Bytes(_) => Some(&BYTES_METHODS),
        _ => None,
    }
}
