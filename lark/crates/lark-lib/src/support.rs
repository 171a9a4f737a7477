//! Shared helpers for builtins and methods: argument unpacking,
//! receiver downcasts, and metered collection of iterables.

use std::rc::Rc;

use lark_util::{EvalError, Result};
use lark_value::{
    estimate_make_size, safe_iterate, Dict, LarkInt, List, MakeSizeKind, Set, Thread, Value,
};

/// Drains an iterable into a vector, charging one step per element
/// and the growing storage as it goes.
pub fn collect_iter(thread: &Thread, fname: &str, value: &Value) -> Result<Vec<Value>> {
    let mut out = lark_value::SafeVec::with_capacity(thread, value.length().unwrap_or(0))?;
    let mut iter = safe_iterate(thread, value)
        .map_err(|e| rename_iterable_error(e, fname, value))?;
    while let Some(item) = iter.next(thread)? {
        thread.add_steps(1)?;
        out.push(item)?;
    }
    Ok(out.into_inner())
}

fn rename_iterable_error(err: EvalError, fname: &str, value: &Value) -> EvalError {
    if err.kind() == lark_util::ErrorKind::TypeMismatch {
        EvalError::type_mismatch(format!(
            "{}: got {}, want iterable",
            fname,
            value.type_name()
        ))
    } else {
        err
    }
}

/// Builds a list value from already-collected items, charging its
/// storage.
pub fn build_list(thread: &Thread, items: Vec<Value>) -> Result<Value> {
    thread.add_allocs(estimate_make_size(MakeSizeKind::List, items.len()) as i64)?;
    Ok(Value::list(items))
}

/// Builds a tuple value from already-collected items, charging its
/// storage.
pub fn build_tuple(thread: &Thread, items: Vec<Value>) -> Result<Value> {
    thread.add_allocs(estimate_make_size(MakeSizeKind::Tuple, items.len()) as i64)?;
    Ok(Value::tuple(items))
}

/// Builds a string value, charging its storage.
pub fn build_str(thread: &Thread, s: &str) -> Result<Value> {
    thread.add_allocs(estimate_make_size(MakeSizeKind::Str, s.len()) as i64)?;
    Ok(Value::str(s))
}

/// Builds a bytes value, charging its storage.
pub fn build_bytes(thread: &Thread, b: &[u8]) -> Result<Value> {
    thread.add_allocs(estimate_make_size(MakeSizeKind::Bytes, b.len()) as i64)?;
    Ok(Value::bytes(b))
}

/// Wraps a string whose content bytes were already charged by a
/// [`lark_value::SafeStringBuilder`]; only the shared cell's header
/// is still owed.
pub fn promote_built_string(thread: &Thread, s: String) -> Result<Value> {
    thread.add_allocs(16)?;
    Ok(Value::from_string(s))
}

/// Appends one element to a list with metered growth.
pub fn list_push(thread: &Thread, list: &Rc<List>, item: Value) -> Result<()> {
    let slot = lark_value::estimate::value_slot_bytes() as i64;
    let mut items = list.items_mut()?;
    if items.len() == items.capacity() {
        let new_cap = (items.capacity() * 2).max(4);
        thread.add_allocs((new_cap - items.capacity()) as i64 * slot)?;
        let additional = new_cap - items.len();
        items.reserve_exact(additional);
    }
    items.push(item);
    Ok(())
}

// ---------------------------------------------------------------------------
// Receiver downcasts
// ---------------------------------------------------------------------------

pub fn recv_list<'a>(fname: &str, recv: Option<&'a Value>) -> Result<&'a Rc<List>> {
    match recv {
        Some(Value::List(l)) => Ok(l),
        _ => Err(EvalError::internal(format!("{}: receiver is not a list", fname))),
    }
}

pub fn recv_dict<'a>(fname: &str, recv: Option<&'a Value>) -> Result<&'a Rc<Dict>> {
    match recv {
        Some(Value::Dict(d)) => Ok(d),
        _ => Err(EvalError::internal(format!("{}: receiver is not a dict", fname))),
    }
}

pub fn recv_set<'a>(fname: &str, recv: Option<&'a Value>) -> Result<&'a Rc<Set>> {
    match recv {
        Some(Value::Set(s)) => Ok(s),
        _ => Err(EvalError::internal(format!("{}: receiver is not a set", fname))),
    }
}

pub fn recv_str<'a>(fname: &str, recv: Option<&'a Value>) -> Result<&'a Rc<str>> {
    match recv {
        Some(Value::Str(s)) => Ok(s),
        _ => Err(EvalError::internal(format!(
            "{}: receiver is not a string",
            fname
        ))),
    }
}

pub fn recv_bytes<'a>(fname: &str, recv: Option<&'a Value>) -> Result<&'a Rc<[u8]>> {
    match recv {
        Some(Value::Bytes(b)) => Ok(b),
        _ => Err(EvalError::internal(format!(
            "{}: receiver is not bytes",
            fname
        ))),
    }
}

// ---------------------------------------------------------------------------
// Argument unpacking
// ---------------------------------------------------------------------------

pub fn want_str<'a>(fname: &str, what: &str, v: &'a Value) -> Result<&'a str> {
    match v {
        Value::Str(s) => Ok(s),
        _ => Err(EvalError::type_mismatch(format!(
            "{}: {} must be string, not {}",
            fname,
            what,
            v.type_name()
        ))),
    }
}

pub fn want_int<'a>(fname: &str, what: &str, v: &'a Value) -> Result<&'a LarkInt> {
    match v {
        Value::Int(i) => Ok(i),
        _ => Err(EvalError::type_mismatch(format!(
            "{}: {} must be int, not {}",
            fname,
            what,
            v.type_name()
        ))),
    }
}

pub fn want_i64(fname: &str, what: &str, v: &Value) -> Result<i64> {
    want_int(fname, what, v)?.to_i64().ok_or_else(|| {
        EvalError::value_out_of_range(format!("{}: {} out of range", fname, what))
    })
}

pub fn want_bool(fname: &str, what: &str, v: &Value) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        _ => Err(EvalError::type_mismatch(format!(
            "{}: {} must be bool, not {}",
            fname,
            what,
            v.type_name()
        ))),
    }
}

/// Resolves optional `start`/`end` arguments against a length, the
/// clamping shared by `string.find`-style scanners and `list.index`.
pub fn clamp_span(
    fname: &str,
    len: usize,
    start: Option<&Value>,
    end: Option<&Value>,
) -> Result<(usize, usize)> {
    let resolve = |v: Option<&Value>, default: i64| -> Result<i64> {
        match v {
            None | Some(Value::None) => Ok(default),
            Some(v) => want_i64(fname, "start/end", v),
        }
    };
    let n = len as i64;
    let adjust = |v: i64| -> usize {
        let v = if v < 0 { v + n } else { v };
        v.clamp(0, n) as usize
    };
    let start = adjust(resolve(start, 0)?);
    let end = adjust(resolve(end, n)?);
    Ok((start, end.max(start)))
}
