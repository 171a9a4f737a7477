//! Set methods.
//!
//! The relational methods accept any iterable, like their operator
//! cousins accept sets; costs mirror the binary operators (the table
//! charges probes, one step per member covers iteration).

use std::rc::Rc;

use lark_util::{EvalError, Result};
use lark_value::{estimate_make_size, MakeSizeKind, Arguments, SafetyFlags, Set, Thread, Value};

use crate::support::{collect_iter, recv_set};

use super::MethodSpec;

pub static SPECS: &[MethodSpec] = &[
    MethodSpec::new("add", SafetyFlags::SAFE, add),
    MethodSpec::new("clear", SafetyFlags::SAFE, clear),
    MethodSpec::new("difference", SafetyFlags::SAFE, difference),
    MethodSpec::new("discard", SafetyFlags::SAFE, discard),
    MethodSpec::new("intersection", SafetyFlags::SAFE, intersection),
    MethodSpec::new("isdisjoint", SafetyFlags::SAFE, isdisjoint),
    MethodSpec::new("issubset", SafetyFlags::SAFE, issubset),
    MethodSpec::new("issuperset", SafetyFlags::SAFE, issuperset),
    MethodSpec::new("pop", SafetyFlags::SAFE, pop),
    MethodSpec::new("remove", SafetyFlags::SAFE, remove),
    MethodSpec::new("symmetric_difference", SafetyFlags::SAFE, symmetric_difference),
    MethodSpec::new("union", SafetyFlags::SAFE, union),
];

fn one_iterable<'a>(fname: &str, args: &'a Arguments) -> Result<&'a Value> {
    args.check_no_named(fname)?;
    args.check_arity(fname, 1, Some(1))?;
    Ok(args.arg(0).expect("arity checked"))
}

fn add(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("add")?;
    args.check_arity("add", 1, Some(1))?;
    let set = recv_set("add", recv)?;
    thread.add_steps(1)?;
    set.insert(thread, args.arg(0).expect("arity checked").clone())?;
    Ok(Value::None)
}

fn clear(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("clear")?;
    args.check_arity("clear", 0, Some(0))?;
    recv_set("clear", recv)?.clear(thread)?;
    Ok(Value::None)
}

fn difference(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let set = recv_set("difference", recv)?;
    let other = as_set(thread, "difference", one_iterable("difference", args)?)?;
    let out = Set::new();
    thread.add_allocs(estimate_make_size(MakeSizeKind::Set, set.len()) as i64)?;
    for member in set.members_vec() {
        thread.add_steps(1)?;
        if !other.contains(thread, &member)? {
            out.insert(thread, member)?;
        }
    }
    Ok(Value::Set(Rc::new(out)))
}

fn discard(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("discard")?;
    args.check_arity("discard", 1, Some(1))?;
    let set = recv_set("discard", recv)?;
    set.remove(thread, args.arg(0).expect("arity checked"))?;
    Ok(Value::None)
}

fn intersection(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let set = recv_set("intersection", recv)?;
    let other = as_set(thread, "intersection", one_iterable("intersection", args)?)?;
    let out = Set::new();
    thread.add_allocs(estimate_make_size(MakeSizeKind::Set, set.len().min(other.len())) as i64)?;
    for member in set.members_vec() {
        thread.add_steps(1)?;
        if other.contains(thread, &member)? {
            out.insert(thread, member)?;
        }
    }
    Ok(Value::Set(Rc::new(out)))
}

fn isdisjoint(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let set = recv_set("isdisjoint", recv)?;
    let other = as_set(thread, "isdisjoint", one_iterable("isdisjoint", args)?)?;
    for member in other.members_vec() {
        thread.add_steps(1)?;
        if set.contains(thread, &member)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn issubset(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let set = recv_set("issubset", recv)?;
    let other = as_set(thread, "issubset", one_iterable("issubset", args)?)?;
    for member in set.members_vec() {
        thread.add_steps(1)?;
        if !other.contains(thread, &member)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn issuperset(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let set = recv_set("issuperset", recv)?;
    let other = as_set(thread, "issuperset", one_iterable("issuperset", args)?)?;
    for member in other.members_vec() {
        thread.add_steps(1)?;
        if !set.contains(thread, &member)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn pop(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("pop")?;
    args.check_arity("pop", 0, Some(0))?;
    let set = recv_set("pop", recv)?;
    match set.pop_oldest(thread)? {
        Some(member) => Ok(member),
        None => Err(EvalError::name_lookup("pop: empty set")),
    }
}

fn remove(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("remove")?;
    args.check_arity("remove", 1, Some(1))?;
    let set = recv_set("remove", recv)?;
    if set.remove(thread, args.arg(0).expect("arity checked"))? {
        Ok(Value::None)
    } else {
        Err(EvalError::name_lookup("remove: missing element"))
    }
}

fn symmetric_difference(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let set = recv_set("symmetric_difference", recv)?;
    let other = as_set(
        thread,
        "symmetric_difference",
        one_iterable("symmetric_difference", args)?,
    )?;
    let out = Set::new();
    thread.add_allocs(estimate_make_size(MakeSizeKind::Set, set.len() + other.len()) as i64)?;
    for member in set.members_vec() {
        thread.add_steps(1)?;
        if !other.contains(thread, &member)? {
            out.insert(thread, member)?;
        }
    }
    for member in other.members_vec() {
        thread.add_steps(1)?;
        if !set.contains(thread, &member)? {
            out.insert(thread, member)?;
        }
    }
    Ok(Value::Set(Rc::new(out)))
}

fn union(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let set = recv_set("union", recv)?;
    let other = as_set(thread, "union", one_iterable("union", args)?)?;
    let out = Set::new();
    thread.add_allocs(estimate_make_size(MakeSizeKind::Set, set.len() + other.len()) as i64)?;
    for member in set.members_vec().into_iter().chain(other.members_vec()) {
        thread.add_steps(1)?;
        out.insert(thread, member)?;
    }
    Ok(Value::Set(Rc::new(out)))
}

/// Converts any iterable argument into a scratch set so the
/// relational methods can probe it.
fn as_set(thread: &Thread, fname: &str, value: &Value) -> Result<Rc<Set>> {
    if let Value::Set(s) = value {
        return Ok(Rc::clone(s));
    }
    let items = collect_iter(thread, fname, value)?;
    thread.add_allocs(estimate_make_size(MakeSizeKind::Set, items.len()) as i64)?;
    let set = Set::new();
    for item in items {
        set.insert(thread, item)?;
    }
    Ok(Rc::new(set))
}
