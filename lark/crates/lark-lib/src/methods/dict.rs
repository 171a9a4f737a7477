//! Dict methods.
//!
//! Lookup costs come from the table itself (one step per bucket
//! probed); the enumeration methods charge one step per entry plus
//! the output list's storage.

use lark_util::{EvalError, Result};
use lark_value::{Arguments, SafetyFlags, Thread, Value};

use crate::support::{build_list, build_tuple, recv_dict};

use super::MethodSpec;

pub static SPECS: &[MethodSpec] = &[
    MethodSpec::new("clear", SafetyFlags::SAFE, clear),
    MethodSpec::new("get", SafetyFlags::SAFE, get),
    MethodSpec::new("items", SafetyFlags::SAFE, items),
    MethodSpec::new("keys", SafetyFlags::SAFE, keys),
    MethodSpec::new("pop", SafetyFlags::SAFE, pop),
    MethodSpec::new("popitem", SafetyFlags::SAFE, popitem),
    MethodSpec::new("setdefault", SafetyFlags::SAFE, setdefault),
    MethodSpec::new("update", SafetyFlags::SAFE, update),
    MethodSpec::new("values", SafetyFlags::SAFE, values),
];

fn clear(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("clear")?;
    args.check_arity("clear", 0, Some(0))?;
    recv_dict("clear", recv)?.clear(thread)?;
    Ok(Value::None)
}

fn get(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("get")?;
    args.check_arity("get", 1, Some(2))?;
    let dict = recv_dict("get", recv)?;
    match dict.get(thread, args.arg(0).expect("arity checked"))? {
        Some(v) => Ok(v),
        None => Ok(args.arg(1).cloned().unwrap_or(Value::None)),
    }
}

fn items(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("items")?;
    args.check_arity("items", 0, Some(0))?;
    let dict = recv_dict("items", recv)?;
    thread.add_steps(dict.len() as u64 + 1)?;
    let mut pairs = Vec::with_capacity(dict.len());
    for (key, value) in dict.items_vec() {
        pairs.push(build_tuple(thread, vec![key, value])?);
    }
    build_list(thread, pairs)
}

fn keys(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("keys")?;
    args.check_arity("keys", 0, Some(0))?;
    let dict = recv_dict("keys", recv)?;
    thread.add_steps(dict.len() as u64 + 1)?;
    build_list(thread, dict.keys_vec())
}

fn pop(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("pop")?;
    args.check_arity("pop", 1, Some(2))?;
    let dict = recv_dict("pop", recv)?;
    match dict.remove(thread, args.arg(0).expect("arity checked"))? {
        Some(v) => Ok(v),
        None => match args.arg(1) {
            Some(default) => Ok(default.clone()),
            None => Err(EvalError::name_lookup("pop: missing key")),
        },
    }
}

fn popitem(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("popitem")?;
    args.check_arity("popitem", 0, Some(0))?;
    let dict = recv_dict("popitem", recv)?;
    match dict.pop_oldest(thread)? {
        Some((key, value)) => build_tuple(thread, vec![key, value]),
        None => Err(EvalError::name_lookup("popitem: empty dict")),
    }
}

fn setdefault(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("setdefault")?;
    args.check_arity("setdefault", 1, Some(2))?;
    let dict = recv_dict("setdefault", recv)?;
    let key = args.arg(0).expect("arity checked");
    if let Some(existing) = dict.get(thread, key)? {
        return Ok(existing);
    }
    let default = args.arg(1).cloned().unwrap_or(Value::None);
    dict.insert(thread, key.clone(), default.clone())?;
    Ok(default)
}

/// `update(pairs_or_mapping, **named)`: atomicity is per-entry, so a
/// mid-way budget failure keeps everything already written.
fn update(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_arity("update", 0, Some(1))?;
    args.check_no_duplicates("update")?;
    let dict = recv_dict("update", recv)?;
    if let Some(source) = args.arg(0) {
        match source {
            Value::Dict(other) => {
                for (key, value) in other.items_vec() {
                    thread.add_steps(1)?;
                    dict.insert(thread, key, value)?;
                }
            }
            _ => {
                // Entry-at-a-time, so an aborted update keeps the
                // prefix already written.
                let mut iter = lark_value::safe_iterate(thread, source)?;
                while let Some(pair) = iter.next(thread)? {
                    thread.add_steps(1)?;
                    let fields = match &pair {
                        Value::Tuple(t) if t.len() == 2 => (t[0].clone(), t[1].clone()),
                        Value::List(l) if l.len() == 2 => {
                            (l.get(0).expect("len 2"), l.get(1).expect("len 2"))
                        }
                        _ => {
                            return Err(EvalError::type_mismatch(
                                "update: entries must be pairs of length 2",
                            ))
                        }
                    };
                    dict.insert(thread, fields.0, fields.1)?;
                }
            }
        }
    }
    for (name, value) in args.named() {
        thread.add_steps(1)?;
        dict.insert(thread, Value::str(name), value.clone())?;
    }
    Ok(Value::None)
}

fn values(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("values")?;
    args.check_arity("values", 0, Some(0))?;
    let dict = recv_dict("values", recv)?;
    thread.add_steps(dict.len() as u64 + 1)?;
    let values = dict.items_vec().into_iter().map(|(_, v)| v).collect();
    build_list(thread, values)
}
