//! Metered binary and unary operators.
//!
//! Dispatch order, for every operator:
//!
//! 1. refuse foreign operands whose declared safety does not cover
//!    the thread's requirement, before any work;
//! 2. per-type-pair built-in dispatch;
//! 3. charge steps from the operand-size cost model;
//! 4. reserve the output through the estimator and charge it;
//! 5. produce the result.
//!
//! Only if built-in dispatch finds no rule do the foreign operands'
//! own `binary`/`unary` hooks get one chance each; after both decline
//! the `TypeMismatch` surfaces.

use std::cmp::Ordering;
use std::rc::Rc;

use lark_safety::Thread;
use lark_util::{EvalError, Result};

use crate::estimate::{estimate_make_size, MakeSizeKind};
use crate::float::cmp_int_float;
use crate::int::LarkInt;
use crate::iter::safe_iterate;
use crate::list::List;
use crate::range::RangeValue;
use crate::set::Set;
use crate::value::Value;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Percent,
    Pipe,
    Amp,
    Caret,
    Shl,
    Shr,
    In,
    NotIn,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnOp {
    Plus,
    Minus,
    Tilde,
    Not,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Percent => "%",
            BinOp::Pipe => "|",
            BinOp::Amp => "&",
            BinOp::Caret => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::In => "in",
            BinOp::NotIn => "not in",
        }
    }
}

fn mismatch(op: BinOp, l: &Value, r: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "unsupported binary operation: {} {} {}",
        l.type_name(),
        op.symbol(),
        r.type_name()
    ))
}

/// Guard 1: a foreign operand must provide what the thread requires.
fn guard_foreign(thread: &Thread, l: &Value, r: &Value) -> Result<()> {
    if let Value::Foreign(f) = l {
        thread.permits(f.safety())?;
    }
    if let Value::Foreign(f) = r {
        thread.permits(f.safety())?;
    }
    Ok(())
}

/// Charges for a freshly produced heap int, if it went big.
fn charge_int_result(thread: &Thread, result: &LarkInt) -> Result<()> {
    if matches!(result, LarkInt::Big(_)) {
        thread.add_allocs((result.words() * 8 + 16) as i64)?;
    }
    Ok(())
}

fn int_value(thread: &Thread, result: LarkInt) -> Result<Value> {
    charge_int_result(thread, &result)?;
    Ok(Value::Int(result))
}

/// Lossy int-to-float for real division, where the quotient is
/// approximate anyway.
fn lossy_f64(i: &LarkInt) -> f64 {
    use num_traits::ToPrimitive;
    match i {
        LarkInt::Small(v) => *v as f64,
        LarkInt::Big(b) => b.to_f64().unwrap_or(f64::INFINITY),
    }
}

fn concat_bytes_like(
    thread: &Thread,
    kind: MakeSizeKind,
    l: &[u8],
    r: &[u8],
) -> Result<Vec<u8>> {
    thread.add_steps(2 * l.len().min(r.len()) as u64 + 1)?;
    thread.add_allocs(estimate_make_size(kind, l.len() + r.len()) as i64)?;
    let mut out = Vec::with_capacity(l.len() + r.len());
    out.extend_from_slice(l);
    out.extend_from_slice(r);
    Ok(out)
}

fn repeat_count(n: &LarkInt) -> Result<usize> {
    match n.to_i64() {
        Some(v) if v <= 0 => Ok(0),
        Some(v) => usize::try_from(v)
            .map_err(|_| EvalError::value_out_of_range("repeat count too large")),
        None => Err(EvalError::value_out_of_range("repeat count too large")),
    }
}

fn repeat_bytes_like(
    thread: &Thread,
    kind: MakeSizeKind,
    data: &[u8],
    n: &LarkInt,
) -> Result<Vec<u8>> {
    let k = repeat_count(n)?;
    let total = data
        .len()
        .checked_mul(k)
        .ok_or_else(|| EvalError::value_out_of_range("repeat result too large"))?;
    thread.add_steps(k as u64 + 1)?;
    thread.add_allocs(estimate_make_size(kind, total) as i64)?;
    let mut out = Vec::with_capacity(total);
    for _ in 0..k {
        out.extend_from_slice(data);
    }
    Ok(out)
}

fn repeat_values(thread: &Thread, items: &[Value], n: &LarkInt) -> Result<Vec<Value>> {
    let k = repeat_count(n)?;
    let total = items
        .len()
        .checked_mul(k)
        .ok_or_else(|| EvalError::value_out_of_range("repeat result too large"))?;
    thread.add_steps(k as u64 + 1)?;
    thread.add_allocs(estimate_make_size(MakeSizeKind::List, total) as i64)?;
    let mut out = Vec::with_capacity(total);
    for _ in 0..k {
        out.extend_from_slice(items);
    }
    Ok(out)
}

/// Builds a set from `base`'s members filtered/extended per the set
/// operators; the table's own probe charging supplies most of the
/// 3N-flavoured cost, one step per member covers the iteration.
fn set_members(set: &Set) -> Vec<Value> {
    set.members_vec()
}

pub fn safe_binary(thread: &Thread, op: BinOp, l: &Value, r: &Value) -> Result<Value> {
    guard_foreign(thread, l, r)?;

    match builtin_binary(thread, op, l, r)? {
        Some(v) => Ok(v),
        None => {
            // One fallback chance for each foreign operand, in order.
            if let Value::Foreign(f) = l {
                if let Some(v) = f.binary(thread, op, r, true)? {
                    return Ok(v);
                }
            }
            if let Value::Foreign(f) = r {
                if let Some(v) = f.binary(thread, op, l, false)? {
                    return Ok(v);
                }
            }
            Err(mismatch(op, l, r))
        }
    }
}

/// Built-in per-type-pair dispatch. `Ok(None)` means "no rule".
fn builtin_binary(thread: &Thread, op: BinOp, l: &Value, r: &Value) -> Result<Option<Value>> {
    let any_foreign = matches!(l, Value::Foreign(_)) || matches!(r, Value::Foreign(_));
    match op {
        BinOp::In if !any_foreign => return membership(thread, l, r).map(Some),
        BinOp::NotIn if !any_foreign => {
            return membership(thread, l, r).map(|v| {
                Some(Value::Bool(!matches!(v, Value::Bool(true))))
            })
        }
        _ => {}
    }

    let out = match (op, l, r) {
        // ---- addition ----
        (BinOp::Add, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.add(b))?
        }
        (BinOp::Add, Value::Float(a), Value::Float(b)) => {
            thread.add_steps(1)?;
            Value::Float(a + b)
        }
        (BinOp::Add, Value::Int(a), Value::Float(b)) => {
            thread.add_steps(1)?;
            Value::Float(lossy_f64(a) + b)
        }
        (BinOp::Add, Value::Float(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            Value::Float(a + lossy_f64(b))
        }
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            let bytes = concat_bytes_like(thread, MakeSizeKind::Str, a.as_bytes(), b.as_bytes())?;
            let s = String::from_utf8(bytes).expect("concat of UTF-8 is UTF-8");
            Value::from_string(s)
        }
        (BinOp::Add, Value::Bytes(a), Value::Bytes(b)) => {
            let bytes = concat_bytes_like(thread, MakeSizeKind::Bytes, a, b)?;
            Value::bytes(&bytes)
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let (av, bv) = (a.items(), b.items());
            thread.add_steps(2 * av.len().min(bv.len()) as u64 + 1)?;
            thread.add_allocs(estimate_make_size(MakeSizeKind::List, av.len() + bv.len()) as i64)?;
            let mut out = Vec::with_capacity(av.len() + bv.len());
            out.extend_from_slice(&av);
            out.extend_from_slice(&bv);
            Value::list(out)
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            thread.add_steps(2 * a.len().min(b.len()) as u64 + 1)?;
            thread.add_allocs(estimate_make_size(MakeSizeKind::Tuple, a.len() + b.len()) as i64)?;
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend_from_slice(a);
            out.extend_from_slice(b);
            Value::tuple(out)
        }

        // ---- subtraction ----
        (BinOp::Sub, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.sub(b))?
        }
        (BinOp::Sub, Value::Float(a), Value::Float(b)) => {
            thread.add_steps(1)?;
            Value::Float(a - b)
        }
        (BinOp::Sub, Value::Int(a), Value::Float(b)) => {
            thread.add_steps(1)?;
            Value::Float(lossy_f64(a) - b)
        }
        (BinOp::Sub, Value::Float(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            Value::Float(a - lossy_f64(b))
        }
        (BinOp::Sub, Value::Set(a), Value::Set(b)) => {
            let out = Set::new();
            thread.add_allocs(estimate_make_size(MakeSizeKind::Set, a.len()) as i64)?;
            for member in set_members(a) {
                thread.add_steps(1)?;
                if !b.contains(thread, &member)? {
                    out.insert(thread, member)?;
                }
            }
            Value::Set(Rc::new(out))
        }

        // ---- multiplication ----
        (BinOp::Mul, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.mul(b))?
        }
        (BinOp::Mul, Value::Float(a), Value::Float(b)) => {
            thread.add_steps(1)?;
            Value::Float(a * b)
        }
        (BinOp::Mul, Value::Int(a), Value::Float(b)) => {
            thread.add_steps(1)?;
            Value::Float(lossy_f64(a) * b)
        }
        (BinOp::Mul, Value::Float(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            Value::Float(a * lossy_f64(b))
        }
        (BinOp::Mul, Value::Str(s), Value::Int(n))
        | (BinOp::Mul, Value::Int(n), Value::Str(s)) => {
            let bytes = repeat_bytes_like(thread, MakeSizeKind::Str, s.as_bytes(), n)?;
            Value::from_string(String::from_utf8(bytes).expect("repeat of UTF-8 is UTF-8"))
        }
        (BinOp::Mul, Value::Bytes(b), Value::Int(n))
        | (BinOp::Mul, Value::Int(n), Value::Bytes(b)) => {
            let bytes = repeat_bytes_like(thread, MakeSizeKind::Bytes, b, n)?;
            Value::bytes(&bytes)
        }
        (BinOp::Mul, Value::List(l), Value::Int(n))
        | (BinOp::Mul, Value::Int(n), Value::List(l)) => {
            let items = l.items();
            Value::list(repeat_values(thread, &items, n)?)
        }
        (BinOp::Mul, Value::Tuple(t), Value::Int(n))
        | (BinOp::Mul, Value::Int(n), Value::Tuple(t)) => {
            Value::tuple(repeat_values(thread, t, n)?)
        }

        // ---- real division ----
        (BinOp::Div, _, _) => {
            let (a, b) = match (l, r) {
                (Value::Int(a), Value::Int(b)) => (lossy_f64(a), lossy_f64(b)),
                (Value::Float(a), Value::Float(b)) => (*a, *b),
                (Value::Int(a), Value::Float(b)) => (lossy_f64(a), *b),
                (Value::Float(a), Value::Int(b)) => (*a, lossy_f64(b)),
                _ => return Ok(None),
            };
            thread.add_steps(1)?;
            if b == 0.0 {
                return Err(EvalError::value_out_of_range("real division by zero"));
            }
            Value::Float(a / b)
        }

        // ---- floor division ----
        (BinOp::FloorDiv, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.floor_div(b)?)?
        }
        (BinOp::FloorDiv, _, _) => {
            let (a, b) = match (l, r) {
                (Value::Float(a), Value::Float(b)) => (*a, *b),
                (Value::Int(a), Value::Float(b)) => (lossy_f64(a), *b),
                (Value::Float(a), Value::Int(b)) => (*a, lossy_f64(b)),
                _ => return Ok(None),
            };
            thread.add_steps(1)?;
            if b == 0.0 {
                return Err(EvalError::value_out_of_range("floored division by zero"));
            }
            Value::Float((a / b).floor())
        }

        // ---- modulo / formatting ----
        (BinOp::Percent, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.floor_mod(b)?)?
        }
        (BinOp::Percent, Value::Str(fmt), _) => {
            let s = crate::fmt::percent_format(thread, fmt, r)?;
            Value::from_string(s)
        }
        (BinOp::Percent, _, _) => {
            let (a, b) = match (l, r) {
                (Value::Float(a), Value::Float(b)) => (*a, *b),
                (Value::Int(a), Value::Float(b)) => (lossy_f64(a), *b),
                (Value::Float(a), Value::Int(b)) => (*a, lossy_f64(b)),
                _ => return Ok(None),
            };
            thread.add_steps(1)?;
            if b == 0.0 {
                return Err(EvalError::value_out_of_range("float modulo by zero"));
            }
            // Floor-convention remainder, sign of the divisor.
            let rem = a - b * (a / b).floor();
            Value::Float(rem)
        }

        // ---- bitwise / set algebra ----
        (BinOp::Pipe, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.bitor(b))?
        }
        (BinOp::Pipe, Value::Set(a), Value::Set(b)) => {
            let out = Set::new();
            thread.add_allocs(estimate_make_size(MakeSizeKind::Set, a.len() + b.len()) as i64)?;
            for member in set_members(a).into_iter().chain(set_members(b)) {
                thread.add_steps(1)?;
                out.insert(thread, member)?;
            }
            Value::Set(Rc::new(out))
        }
        (BinOp::Amp, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.bitand(b))?
        }
        (BinOp::Amp, Value::Set(a), Value::Set(b)) => {
            let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
            let out = Set::new();
            thread.add_allocs(estimate_make_size(MakeSizeKind::Set, small.len()) as i64)?;
            for member in set_members(small) {
                thread.add_steps(1)?;
                if large.contains(thread, &member)? {
                    out.insert(thread, member)?;
                }
            }
            Value::Set(Rc::new(out))
        }
        (BinOp::Caret, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.bitxor(b))?
        }
        (BinOp::Caret, Value::Set(a), Value::Set(b)) => {
            let out = Set::new();
            thread.add_allocs(estimate_make_size(MakeSizeKind::Set, a.len() + b.len()) as i64)?;
            for member in set_members(a) {
                thread.add_steps(1)?;
                if !b.contains(thread, &member)? {
                    out.insert(thread, member)?;
                }
            }
            for member in set_members(b) {
                thread.add_steps(1)?;
                if !a.contains(thread, &member)? {
                    out.insert(thread, member)?;
                }
            }
            Value::Set(Rc::new(out))
        }

        // ---- shifts ----
        (BinOp::Shl, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.shl(b)?)?
        }
        (BinOp::Shr, Value::Int(a), Value::Int(b)) => {
            thread.add_steps(1)?;
            int_value(thread, a.shr(b)?)?
        }

        _ => return Ok(None),
    };
    Ok(Some(out))
}

/// `l in r`, charged per the container's lookup discipline.
fn membership(thread: &Thread, needle: &Value, haystack: &Value) -> Result<Value> {
    let found = match haystack {
        Value::List(list) => {
            let items = list.items();
            let mut found = false;
            for item in items.iter() {
                thread.add_steps(1)?;
                if item.equals(needle) {
                    found = true;
                    break;
                }
            }
            found
        }
        Value::Tuple(items) => {
            let mut found = false;
            for item in items.iter() {
                thread.add_steps(1)?;
                if item.equals(needle) {
                    found = true;
                    break;
                }
            }
            found
        }
        Value::Dict(dict) => dict.contains(thread, needle)?,
        Value::Set(set) => set.contains(thread, needle)?,
        Value::Str(s) => match needle {
            Value::Str(sub) => {
                thread.add_steps(s.len() as u64 + 1)?;
                s.contains(&**sub)
            }
            _ => {
                return Err(EvalError::type_mismatch(format!(
                    "'in <string>' requires string as left operand, not {}",
                    needle.type_name()
                )))
            }
        },
        Value::Bytes(b) => match needle {
            Value::Bytes(sub) => {
                thread.add_steps(b.len() as u64 + 1)?;
                find_subslice(b, sub).is_some()
            }
            Value::Int(i) => {
                thread.add_steps(b.len() as u64 + 1)?;
                match i.to_i64() {
                    Some(v @ 0..=255) => b.contains(&(v as u8)),
                    _ => {
                        return Err(EvalError::value_out_of_range(
                            "byte must be in range(0, 256)",
                        ))
                    }
                }
            }
            _ => {
                return Err(EvalError::type_mismatch(format!(
                    "'in bytes' requires bytes or int as left operand, not {}",
                    needle.type_name()
                )))
            }
        },
        Value::Range(range) => {
            thread.add_steps(1)?;
            match needle {
                Value::Int(i) => range.contains_int(i),
                _ => false,
            }
        }
        _ => {
            return Err(EvalError::type_mismatch(format!(
                "unsupported binary operation: {} in {}",
                needle.type_name(),
                haystack.type_name()
            )))
        }
    };
    Ok(Value::Bool(found))
}

pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn safe_unary(thread: &Thread, op: UnOp, v: &Value) -> Result<Value> {
    if let Value::Foreign(f) = v {
        thread.permits(f.safety())?;
    }
    thread.add_steps(1)?;
    let out = match (op, v) {
        (UnOp::Plus, Value::Int(_)) | (UnOp::Plus, Value::Float(_)) => Some(v.clone()),
        (UnOp::Minus, Value::Int(i)) => Some(int_value(thread, i.neg())?),
        (UnOp::Minus, Value::Float(f)) => Some(Value::Float(-f)),
        (UnOp::Tilde, Value::Int(i)) => Some(int_value(thread, i.bitnot())?),
        (UnOp::Not, _) => Some(Value::Bool(!v.truth())),
        _ => None,
    };
    match out {
        Some(v) => Ok(v),
        None => {
            if let Value::Foreign(f) = v {
                if let Some(result) = f.unary(thread, op)? {
                    return Ok(result);
                }
            }
            Err(EvalError::type_mismatch(format!(
                "unsupported unary operation: {}{}",
                match op {
                    UnOp::Plus => "+",
                    UnOp::Minus => "-",
                    UnOp::Tilde => "~",
                    UnOp::Not => "not ",
                },
                v.type_name()
            )))
        }
    }
}

/// Comparison. Equality is defined for every pair of types (and is
/// `false` across types); ordering is defined only where a natural
/// order exists.
pub fn safe_compare(thread: &Thread, op: CmpOp, l: &Value, r: &Value) -> Result<bool> {
    guard_foreign(thread, l, r)?;
    // Prefix comparison of sequences pays per element; everything
    // else is constant.
    let cost = match (l.length(), r.length()) {
        (Some(a), Some(b)) => a.min(b) as u64 + 1,
        _ => 1,
    };
    thread.add_steps(cost)?;

    match op {
        CmpOp::Eq => return Ok(l.equals(r)),
        CmpOp::Ne => return Ok(!l.equals(r)),
        _ => {}
    }

    match ordering(l, r)? {
        Some(ord) => Ok(match op {
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Eq | CmpOp::Ne => unreachable!(),
        }),
        // NaN: every ordering comparison is false.
        None => Ok(false),
    }
}

/// Natural order between two values, or `TypeMismatch` if the pair
/// has none. `Ok(None)` means unordered-but-comparable (NaN).
fn ordering(l: &Value, r: &Value) -> Result<Option<Ordering>> {
    let out = match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp_int(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => cmp_int_float(a, *b),
        (Value::Float(a), Value::Int(b)) => cmp_int_float(b, *a).map(Ordering::reverse),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.as_ref().cmp(b.as_ref())),
        (Value::List(a), Value::List(b)) => {
            return sequence_ordering(&a.items(), &b.items());
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            return sequence_ordering(a, b);
        }
        _ => {
            return Err(EvalError::type_mismatch(format!(
                "{} and {} are not comparable",
                l.type_name(),
                r.type_name()
            )))
        }
    };
    Ok(out)
}

fn sequence_ordering(a: &[Value], b: &[Value]) -> Result<Option<Ordering>> {
    for (x, y) in a.iter().zip(b.iter()) {
        if x.equals(y) {
            continue;
        }
        return ordering(x, y);
    }
    Ok(Some(a.len().cmp(&b.len())))
}

/// Indexing, `container[index]`. One step, plus the output charge
/// for types that materialise something.
pub fn safe_index(thread: &Thread, container: &Value, index: &Value) -> Result<Value> {
    thread.add_steps(1)?;
    match container {
        Value::List(list) => {
            let items = list.items();
            let i = resolve_index(index, items.len(), "list")?;
            Ok(items[i].clone())
        }
        Value::Tuple(items) => {
            let i = resolve_index(index, items.len(), "tuple")?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let i = resolve_index(index, s.len(), "string")?;
            let b = s.as_bytes()[i];
            if !b.is_ascii() && !s.is_char_boundary(i) {
                return Err(EvalError::value_out_of_range(
                    "string index not on a character boundary",
                ));
            }
            let end = (i + 1..=s.len()).find(|&j| s.is_char_boundary(j)).unwrap();
            thread.add_allocs(24)?;
            Ok(Value::str(&s[i..end]))
        }
        Value::Bytes(b) => {
            let i = resolve_index(index, b.len(), "bytes")?;
            Ok(Value::int(b[i] as i64))
        }
        Value::Range(range) => {
            let i = resolve_index(index, range.len(), "range")?;
            Ok(Value::int(range.at(i)))
        }
        Value::Dict(dict) => match dict.get(thread, index)? {
            Some(v) => Ok(v),
            None => Err(EvalError::name_lookup("key not found in dict")),
        },
        Value::View(view) => match view.constant_len() {
            Some(len) => {
                let i = resolve_index(index, len, view.type_name())?;
                let b = view.bytes()[i];
                match view.mode() {
                    crate::string::ViewMode::Elems => {
                        thread.add_allocs(24)?;
                        Ok(Value::bytes(&[b]))
                    }
                    _ => Ok(Value::int(b as i64)),
                }
            }
            None => Err(EvalError::type_mismatch(format!(
                "{} is not indexable",
                view.type_name()
            ))),
        },
        Value::Foreign(f) => {
            thread.permits(f.safety())?;
            let len = f.length().ok_or_else(|| {
                EvalError::type_mismatch(format!("{} is not indexable", f.type_name()))
            })?;
            let i = resolve_index(index, len, f.type_name())?;
            f.index(thread, i)
        }
        _ => Err(EvalError::type_mismatch(format!(
            "{} is not indexable",
            container.type_name()
        ))),
    }
}

/// Python-style index resolution: negatives count from the end,
/// anything out of range is refused.
fn resolve_index(index: &Value, len: usize, what: &str) -> Result<usize> {
    let raw = match index {
        Value::Int(i) => i.to_i64().ok_or_else(|| {
            EvalError::value_out_of_range(format!("{} index out of range", what))
        })?,
        _ => {
            return Err(EvalError::type_mismatch(format!(
                "{} index must be int, not {}",
                what,
                index.type_name()
            )))
        }
    };
    let adjusted = if raw < 0 { raw + len as i64 } else { raw };
    if adjusted < 0 || adjusted as usize >= len {
        return Err(EvalError::value_out_of_range(format!(
            "{} index {} out of range [0, {})",
            what, raw, len
        )));
    }
    Ok(adjusted as usize)
}

/// Slice-bound resolution: clamps instead of refusing.
fn resolve_bound(v: Option<&Value>, len: usize, default: i64) -> Result<i64> {
    match v {
        None | Some(Value::None) => Ok(default),
        Some(Value::Int(i)) => {
            let raw = i.to_i64().unwrap_or_else(|| {
                if i.is_negative() {
                    i64::MIN
                } else {
                    i64::MAX
                }
            });
            Ok(raw.clamp(-(len as i64) - 1, len as i64 + 1))
        }
        Some(other) => Err(EvalError::type_mismatch(format!(
            "slice bound must be int or None, not {}",
            other.type_name()
        ))),
    }
}

/// The index sequence selected by `[start:stop:step]`.
fn slice_indices(
    start: Option<&Value>,
    stop: Option<&Value>,
    step: Option<&Value>,
    len: usize,
) -> Result<Vec<usize>> {
    let step = match step {
        None | Some(Value::None) => 1,
        Some(Value::Int(i)) => i
            .to_i64()
            .ok_or_else(|| EvalError::value_out_of_range("slice step out of range"))?,
        Some(other) => {
            return Err(EvalError::type_mismatch(format!(
                "slice step must be int or None, not {}",
                other.type_name()
            )))
        }
    };
    if step == 0 {
        return Err(EvalError::value_out_of_range("slice step cannot be zero"));
    }
    let n = len as i64;
    let (default_start, default_stop) = if step > 0 { (0, n) } else { (n - 1, -n - 1) };
    let clamp_pos = |v: i64| -> i64 {
        let v = if v < 0 { v + n } else { v };
        if step > 0 {
            v.clamp(0, n)
        } else {
            v.clamp(-1, n - 1)
        }
    };
    let start = clamp_pos(resolve_bound(start, len, default_start)?);
    let stop = clamp_pos(resolve_bound(stop, len, default_stop)?);

    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i as usize);
        i += step;
    }
    Ok(out)
}

/// Slicing, `container[start:stop:step]`. Charges one step per
/// element produced plus the output storage.
pub fn safe_slice(
    thread: &Thread,
    container: &Value,
    start: Option<&Value>,
    stop: Option<&Value>,
    step: Option<&Value>,
) -> Result<Value> {
    match container {
        Value::List(list) => {
            let items = list.items();
            let idx = slice_indices(start, stop, step, items.len())?;
            thread.add_steps(idx.len() as u64 + 1)?;
            thread.add_allocs(estimate_make_size(MakeSizeKind::List, idx.len()) as i64)?;
            Ok(Value::list(idx.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Tuple(items) => {
            let idx = slice_indices(start, stop, step, items.len())?;
            thread.add_steps(idx.len() as u64 + 1)?;
            thread.add_allocs(estimate_make_size(MakeSizeKind::Tuple, idx.len()) as i64)?;
            Ok(Value::tuple(idx.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Str(s) => {
            let idx = slice_indices(start, stop, step, s.len())?;
            thread.add_steps(idx.len() as u64 + 1)?;
            thread.add_allocs(estimate_make_size(MakeSizeKind::Str, idx.len()) as i64)?;
            let bytes: Vec<u8> = idx.into_iter().map(|i| s.as_bytes()[i]).collect();
            match String::from_utf8(bytes) {
                Ok(out) => Ok(Value::from_string(out)),
                Err(_) => Err(EvalError::value_out_of_range(
                    "string slice does not fall on character boundaries",
                )),
            }
        }
        Value::Bytes(b) => {
            let idx = slice_indices(start, stop, step, b.len())?;
            thread.add_steps(idx.len() as u64 + 1)?;
            thread.add_allocs(estimate_make_size(MakeSizeKind::Bytes, idx.len()) as i64)?;
            let bytes: Vec<u8> = idx.into_iter().map(|i| b[i]).collect();
            Ok(Value::bytes(&bytes))
        }
        Value::Range(range) => {
            thread.add_steps(1)?;
            let idx = slice_indices(start, stop, step, range.len())?;
            let (start_v, step_v) = match idx.as_slice() {
                [] => (0, 1),
                [only] => (range.at(*only), 1),
                [first, second, ..] => (
                    range.at(*first),
                    range.at(*second) - range.at(*first),
                ),
            };
            let len = idx.len() as i64;
            let stop_v = start_v + step_v * len;
            thread.add_allocs(40)?;
            Ok(Value::Range(Rc::new(RangeValue::new(start_v, stop_v, step_v)?)))
        }
        _ => Err(EvalError::type_mismatch(format!(
            "{} is not sliceable",
            container.type_name()
        ))),
    }
}

/// In-place list extension, the specialisation behind `x += y` on
/// lists. Appends each element of `source` to `list`; on a mid-way
/// budget failure the already-appended prefix stays.
pub fn list_extend(thread: &Thread, list: &Rc<List>, source: &Value) -> Result<()> {
    let slot = crate::estimate::value_slot_bytes() as i64;
    let mut iter = safe_iterate(thread, source)?;
    while let Some(item) = iter.next(thread)? {
        thread.add_steps(1)?;
        let mut items = list.items_mut()?;
        if items.len() == items.capacity() {
            let new_cap = (items.capacity() * 2).max(4);
            thread.add_allocs((new_cap - items.capacity()) as i64 * slot)?;
            let additional = new_cap - items.len();
            items.reserve_exact(additional);
        }
        items.push(item);
    }
    Ok(())
}
