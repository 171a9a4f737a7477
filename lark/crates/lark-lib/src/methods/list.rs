//! List methods.
//!
//! Cost model: append is one step plus growth; insert, pop, and
//! remove charge one step per element shifted plus one; the scanning
//! methods charge one step per element examined.

use lark_util::{EvalError, Result};
use lark_value::ops::list_extend;
use lark_value::{Arguments, SafetyFlags, Thread, Value};

use crate::support::{list_push, recv_list, want_i64};

use super::MethodSpec;

pub static SPECS: &[MethodSpec] = &[
    MethodSpec::new("append", SafetyFlags::SAFE, append),
    MethodSpec::new("clear", SafetyFlags::SAFE, clear),
    MethodSpec::new("extend", SafetyFlags::SAFE, extend),
    MethodSpec::new("index", SafetyFlags::SAFE, index),
    MethodSpec::new("insert", SafetyFlags::SAFE, insert),
    MethodSpec::new("pop", SafetyFlags::SAFE, pop),
    MethodSpec::new("remove", SafetyFlags::SAFE, remove),
];

fn append(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("append")?;
    args.check_arity("append", 1, Some(1))?;
    let list = recv_list("append", recv)?;
    thread.add_steps(1)?;
    list_push(thread, list, args.arg(0).expect("arity checked").clone())?;
    Ok(Value::None)
}

fn clear(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("clear")?;
    args.check_arity("clear", 0, Some(0))?;
    let list = recv_list("clear", recv)?;
    thread.add_steps(list.len() as u64 + 1)?;
    list.items_mut()?.clear();
    Ok(Value::None)
}

fn extend(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("extend")?;
    args.check_arity("extend", 1, Some(1))?;
    let list = recv_list("extend", recv)?;
    list_extend(thread, list, args.arg(0).expect("arity checked"))?;
    Ok(Value::None)
}

fn index(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("index")?;
    args.check_arity("index", 1, Some(3))?;
    let list = recv_list("index", recv)?;
    let needle = args.arg(0).expect("arity checked");
    let items = list.items();
    let (start, end) =
        crate::support::clamp_span("index", items.len(), args.arg(1), args.arg(2))?;
    for (i, item) in items[start..end].iter().enumerate() {
        thread.add_steps(1)?;
        if item.equals(needle) {
            return Ok(Value::int((start + i) as i64));
        }
    }
    Err(EvalError::value_out_of_range("index: value not in list"))
}

fn insert(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("insert")?;
    args.check_arity("insert", 2, Some(2))?;
    let list = recv_list("insert", recv)?;
    let raw = want_i64("insert", "index", args.arg(0).expect("arity checked"))?;
    let item = args.arg(1).expect("arity checked").clone();

    let len = list.len() as i64;
    let at = if raw < 0 { raw + len } else { raw }.clamp(0, len) as usize;
    let shifted = list.len() - at;
    thread.add_steps(shifted as u64 + 1)?;
    // Reuse the metered growth path, then rotate into position.
    list_push(thread, list, item)?;
    list.items_mut()?[at..].rotate_right(1);
    Ok(Value::None)
}

fn pop(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("pop")?;
    args.check_arity("pop", 0, Some(1))?;
    let list = recv_list("pop", recv)?;
    let len = list.len() as i64;
    let raw = match args.arg(0) {
        None => -1,
        Some(v) => want_i64("pop", "index", v)?,
    };
    let at = if raw < 0 { raw + len } else { raw };
    if at < 0 || at >= len {
        return Err(EvalError::value_out_of_range(format!(
            "pop: index {} out of range [0, {})",
            raw, len
        )));
    }
    let shifted = (len - 1 - at) as u64;
    thread.add_steps(shifted + 1)?;
    Ok(list.items_mut()?.remove(at as usize))
}

fn remove(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("remove")?;
    args.check_arity("remove", 1, Some(1))?;
    let list = recv_list("remove", recv)?;
    let needle = args.arg(0).expect("arity checked");
    let at = {
        let items = list.items();
        let mut found = None;
        for (i, item) in items.iter().enumerate() {
            thread.add_steps(1)?;
            if item.equals(needle) {
                found = Some(i);
                break;
            }
        }
        found
    };
    match at {
        Some(i) => {
            thread.add_steps((list.len() - 1 - i) as u64 + 1)?;
            list.items_mut()?.remove(i);
            Ok(Value::None)
        }
        None => Err(EvalError::value_out_of_range("remove: value not in list")),
    }
}
