//! The polymorphic value type.
//!
//! The built-in universe is a closed enum dispatched by match; host
//! programs extend it through the [`ForeignValue`] trait object. Every
//! value answers the core protocol (type name, truth, hash, freeze,
//! equality); the capability surfaces (indexing, iteration, calling,
//! attributes) live in [`crate::ops`], [`crate::iter`], and the
//! library layer.

use std::rc::Rc;

use lark_safety::Thread;
use lark_util::{EvalError, Result, SafetyFlags};

use crate::call::{Arguments, NativeBuiltin};
use crate::dict::Dict;
use crate::float::integral_low64;
use crate::int::LarkInt;
use crate::list::List;
use crate::range::RangeValue;
use crate::set::Set;
use crate::string::SeqView;

/// A Lark value.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(LarkInt),
    Float(f64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    List(Rc<List>),
    Tuple(Rc<[Value]>),
    Dict(Rc<Dict>),
    Set(Rc<Set>),
    Range(Rc<RangeValue>),
    /// Lazy per-element views over strings and bytes
    /// (`elems`/`elem_ords`/`codepoints`/`codepoint_ords`).
    View(Rc<SeqView>),
    Builtin(Rc<NativeBuiltin>),
    Foreign(Rc<dyn ForeignValue>),
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.type_name())
    }
}

impl Value {
    pub fn int(v: i64) -> Value {
        Value::Int(LarkInt::from(v))
    }

    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn from_string(s: String) -> Value {
        Value::Str(Rc::from(s.as_str()))
    }

    pub fn bytes(b: &[u8]) -> Value {
        Value::Bytes(Rc::from(b))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(List::from_vec(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    /// The type name surfaced by `type()` and in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            Value::Range(_) => "range",
            Value::View(view) => view.type_name(),
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Foreign(f) => f.type_name(),
        }
    }

    /// Truth value. O(1) for everything except big ints, whose
    /// emptiness predicate scans the digit array.
    pub fn truth(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => !i.is_zero(),
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(l) => l.len() > 0,
            Value::Tuple(t) => !t.is_empty(),
            Value::Dict(d) => d.len() > 0,
            Value::Set(s) => s.len() > 0,
            Value::Range(r) => r.len() > 0,
            Value::View(v) => !v.base_is_empty(),
            Value::Builtin(_) => true,
            Value::Foreign(f) => f.truth(),
        }
    }

    /// Transitive freeze. Idempotent and cycle-safe: a container's
    /// freeze bit is set before its children are visited, so a cycle
    /// terminates on the second encounter.
    pub fn freeze(&self) {
        match self {
            Value::List(l) => {
                if l.state().freeze() {
                    for item in l.items().iter() {
                        item.freeze();
                    }
                }
            }
            Value::Dict(d) => d.freeze(),
            Value::Set(s) => s.freeze(),
            Value::Tuple(t) => {
                for item in t.iter() {
                    item.freeze();
                }
            }
            Value::Foreign(f) => f.freeze(),
            _ => {}
        }
    }

    /// 32-bit hash. Deterministic for the value's lifetime; freezing
    /// does not change it. Mutable containers and lazy views are
    /// unhashable.
    pub fn hash_value(&self) -> Result<u32> {
        match self {
            Value::None => Ok(0x_9e37_79b9),
            Value::Bool(false) => Ok(0x_7c67_88a5),
            Value::Bool(true) => Ok(0x_55ce_4d32),
            Value::Int(i) => Ok(mix64(i.hash_low64())),
            Value::Float(f) => Ok(match integral_low64(*f) {
                // Agree with the int of equal value.
                Some(low) => mix64(low),
                None => {
                    let bits = if f.is_nan() {
                        f64::NAN.to_bits()
                    } else {
                        f.to_bits()
                    };
                    mix64(bits)
                }
            }),
            Value::Str(s) => Ok(fnv1a32(s.as_bytes())),
            Value::Bytes(b) => Ok(fnv1a32(b)),
            Value::Tuple(t) => {
                let mut h: u32 = 0x_345678;
                for item in t.iter() {
                    h = h.wrapping_mul(31).wrapping_add(item.hash_value()?);
                }
                Ok(h)
            }
            Value::Builtin(b) => Ok(fnv1a32(b.name().as_bytes())),
            Value::Foreign(f) => f.hash_value(),
            _ => Err(EvalError::type_mismatch(format!(
                "unhashable type: {}",
                self.type_name()
            ))),
        }
    }

    /// Structural equality. Not metered; operators charge separately
    /// before calling in. Int/float comparison is exact. Equality of
    /// cyclic containers is undefined and may not terminate.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                crate::float::cmp_int_float(a, *b) == Some(std::cmp::Ordering::Equal)
            }
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Bytes(a), Value::Bytes(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (av, bv) = (a.items(), b.items());
                av.len() == bv.len() && av.iter().zip(bv.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b) || a.equals(b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b) || a.equals(b),
            (Value::Range(a), Value::Range(b)) => a.same_sequence(b),
            (Value::View(a), Value::View(b)) => a.equals(b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::Foreign(a), Value::Foreign(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Identity of the heap cell backing this value, for cycle
    /// detection. `None` for values that cannot participate in a
    /// cycle.
    pub fn container_ptr(&self) -> Option<usize> {
        match self {
            Value::List(l) => Some(Rc::as_ptr(l) as usize),
            Value::Dict(d) => Some(Rc::as_ptr(d) as usize),
            Value::Set(s) => Some(Rc::as_ptr(s) as usize),
            Value::Tuple(t) => Some(t.as_ptr() as usize),
            _ => None,
        }
    }

    /// The safety a value's collaborator surfaces (iteration,
    /// attributes) provide. Built-in types are fully metered and
    /// therefore completely safe; foreign values declare their own.
    pub fn provided_safety(&self) -> SafetyFlags {
        match self {
            Value::Foreign(f) => f.safety(),
            Value::Builtin(b) => b.safety(),
            _ => SafetyFlags::SAFE,
        }
    }

    /// Constant-time length, for the types that have one.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.len()),
            Value::Bytes(b) => Some(b.len()),
            Value::List(l) => Some(l.len()),
            Value::Tuple(t) => Some(t.len()),
            Value::Dict(d) => Some(d.len()),
            Value::Set(s) => Some(s.len()),
            Value::Range(r) => Some(r.len()),
            Value::View(v) => v.constant_len(),
            Value::Foreign(f) => f.length(),
            _ => None,
        }
    }

    /// Invokes a callable value.
    pub fn call(&self, thread: &Thread, args: &Arguments) -> Result<Value> {
        match self {
            Value::Builtin(b) => b.call(thread, args),
            Value::Foreign(f) => {
                thread.permits(f.safety())?;
                f.call(thread, args)
            }
            _ => Err(EvalError::type_mismatch(format!(
                "{} is not callable",
                self.type_name()
            ))),
        }
    }
}

/// Finalizer folding a 64-bit value into 32 bits (splitmix64 tail).
fn mix64(v: u64) -> u32 {
    let mut z = v.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    (z ^ (z >> 32)) as u32
}

/// FNV-1a over a byte slice, the string/bytes hash.
pub(crate) fn fnv1a32(data: &[u8]) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for &b in data {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

/// Host-supplied extension values.
///
/// The core methods are required; every capability method defaults to
/// refusing, so a host type opts into exactly the surfaces it
/// supports. [`ForeignValue::safety`] declares what those surfaces
/// provide; a thread whose requirement is not covered refuses to use
/// them before any work is done.
pub trait ForeignValue {
    fn type_name(&self) -> &'static str;

    fn truth(&self) -> bool {
        true
    }

    fn freeze(&self) {}

    fn hash_value(&self) -> Result<u32> {
        Err(EvalError::type_mismatch(format!(
            "unhashable type: {}",
            self.type_name()
        )))
    }

    /// Safety provided by this value's iteration, attribute, and call
    /// surfaces.
    fn safety(&self) -> SafetyFlags {
        SafetyFlags::NOT_SAFE
    }

    /// Metered stringification. The default writes `<type>` without
    /// charging anything beyond the builder's own accounting.
    fn safe_string(
        &self,
        _thread: &Thread,
        out: &mut lark_safety::SafeStringBuilder<'_>,
    ) -> Result<()> {
        out.write_str("<")?;
        out.write_str(self.type_name())?;
        out.write_str(">")
    }

    fn length(&self) -> Option<usize> {
        None
    }

    /// Conservative upper bound on this value's owned bytes, for the
    /// size estimator. Over-estimation is safe; under-estimation is a
    /// bug in the host type.
    fn size_estimate(&self) -> u64 {
        64
    }

    fn index(&self, _thread: &Thread, _i: usize) -> Result<Value> {
        Err(EvalError::type_mismatch(format!(
            "{} is not indexable",
            self.type_name()
        )))
    }

    /// Ordered attribute names, for `dir`.
    fn attr_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether [`ForeignValue::safe_attr`] is implemented. When
    /// false, attribute access from a safety-required thread is
    /// refused outright.
    fn has_safe_attr(&self) -> bool {
        false
    }

    /// Unmetered attribute lookup.
    fn attr(&self, _name: &str) -> Result<Value> {
        Err(EvalError::no_such_attr(format!(
            "{} has no attributes",
            self.type_name()
        )))
    }

    /// Resource-bounded attribute lookup.
    fn safe_attr(&self, _thread: &Thread, name: &str) -> Result<Value> {
        self.attr(name)
    }

    /// Produces an iterator, if this value is iterable.
    fn iterate(self: Rc<Self>) -> Option<Box<dyn ForeignIter>> {
        None
    }

    fn call(&self, _thread: &Thread, _args: &Arguments) -> Result<Value> {
        Err(EvalError::type_mismatch(format!(
            "{} is not callable",
            self.type_name()
        )))
    }

    /// Binary-operator overload, tried after built-in dispatch fails.
    /// `Ok(None)` declines.
    fn binary(
        &self,
        _thread: &Thread,
        _op: crate::ops::BinOp,
        _other: &Value,
        _this_on_left: bool,
    ) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Unary-operator overload. `Ok(None)` declines.
    fn unary(&self, _thread: &Thread, _op: crate::ops::UnOp) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Iterator over a foreign value.
pub trait ForeignIter {
    /// Yields the next element, charging whatever the production
    /// costs through `thread`.
    fn next(&mut self, thread: &Thread) -> Result<Option<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::None.type_name(), "NoneType");
        assert_eq!(Value::int(1).type_name(), "int");
        assert_eq!(Value::str("x").type_name(), "string");
        assert_eq!(Value::list(vec![]).type_name(), "list");
    }

    #[test]
    fn test_truth() {
        assert!(!Value::None.truth());
        assert!(!Value::int(0).truth());
        assert!(Value::int(-1).truth());
        assert!(!Value::str("").truth());
        assert!(Value::str("x").truth());
        assert!(Value::Float(f64::NAN).truth());
        assert!(!Value::Float(0.0).truth());
        assert!(!Value::list(vec![]).truth());
        assert!(Value::list(vec![Value::None]).truth());
    }

    #[test]
    fn test_int_float_hash_agree() {
        for v in [0_i64, 1, -1, 42, 1 << 52, -(1 << 40)] {
            let i = Value::int(v);
            let f = Value::Float(v as f64);
            assert_eq!(
                i.hash_value().unwrap(),
                f.hash_value().unwrap(),
                "value {}",
                v
            );
        }
    }

    #[test]
    fn test_equal_values_hash_equal() {
        let pairs = [
            (Value::str("lark"), Value::str("lark")),
            (Value::int(7), Value::Float(7.0)),
            (
                Value::tuple(vec![Value::int(1), Value::str("a")]),
                Value::tuple(vec![Value::int(1), Value::str("a")]),
            ),
        ];
        for (a, b) in pairs {
            assert!(a.equals(&b));
            assert_eq!(a.hash_value().unwrap(), b.hash_value().unwrap());
        }
    }

    #[test]
    fn test_mutable_containers_unhashable() {
        assert!(Value::list(vec![]).hash_value().is_err());
        let err = Value::list(vec![]).hash_value().unwrap_err();
        assert!(err.message().contains("unhashable"));
    }

    #[test]
    fn test_freeze_is_transitive() {
        let inner = Value::list(vec![Value::int(1)]);
        let outer = Value::list(vec![inner.clone()]);
        outer.freeze();
        match (&outer, &inner) {
            (Value::List(o), Value::List(i)) => {
                assert!(o.state().is_frozen());
                assert!(i.state().is_frozen());
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_freeze_terminates_on_cycles() {
        let list = match Value::list(vec![]) {
            Value::List(l) => l,
            _ => unreachable!(),
        };
        list.items_mut().unwrap().push(Value::List(Rc::clone(&list)));
        Value::List(Rc::clone(&list)).freeze();
        assert!(list.state().is_frozen());
    }

    #[test]
    fn test_equality_across_types_is_false() {
        assert!(!Value::int(1).equals(&Value::str("1")));
        assert!(!Value::Bool(true).equals(&Value::int(1)));
        assert!(!Value::None.equals(&Value::Bool(false)));
    }

    #[test]
    fn test_nan_is_not_equal_to_itself() {
        let nan = Value::Float(f64::NAN);
        assert!(!nan.equals(&nan));
    }

    #[test]
    fn test_hash_stable_across_freeze() {
        let t = Value::tuple(vec![Value::int(3), Value::str("x")]);
        let before = t.hash_value().unwrap();
        t.freeze();
        assert_eq!(t.hash_value().unwrap(), before);
    }
}
