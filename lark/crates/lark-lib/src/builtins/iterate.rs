//! Iteration-driven builtins.

use std::cmp::Ordering;

use lark_util::{EvalError, Result};
use lark_value::{
    safe_compare, safe_iterate, Arguments, CmpOp, SafeIter, Thread, Value,
};

use crate::support::{build_list, build_tuple, collect_iter};

fn one_iterable<'a>(fname: &str, args: &'a Arguments) -> Result<&'a Value> {
    args.check_no_named(fname)?;
    args.check_arity(fname, 1, Some(1))?;
    Ok(args.arg(0).expect("arity checked"))
}

/// `all`: true unless a falsy element appears. One step per element
/// consumed; stops at the first decisive element.
pub fn all(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let mut iter = safe_iterate(thread, one_iterable("all", args)?)?;
    while let Some(item) = iter.next(thread)? {
        thread.add_steps(1)?;
        if !item.truth() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// `any`: true once a truthy element appears.
pub fn any(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let mut iter = safe_iterate(thread, one_iterable("any", args)?)?;
    while let Some(item) = iter.next(thread)? {
        thread.add_steps(1)?;
        if item.truth() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

/// `enumerate`: index-paired elements. A budget failure mid-way pulls
/// nothing further from the source.
pub fn enumerate(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("enumerate")?;
    args.check_arity("enumerate", 1, Some(2))?;
    let start = match args.arg(1) {
        None => 0,
        Some(v) => crate::support::want_i64("enumerate", "start", v)?,
    };
    let mut iter = safe_iterate(thread, args.arg(0).expect("arity checked"))?;
    let mut out = Vec::new();
    let mut index = start;
    while let Some(item) = iter.next(thread)? {
        thread.add_steps(1)?;
        out.push(build_tuple(thread, vec![Value::int(index), item])?);
        index += 1;
    }
    build_list(thread, out)
}

/// `len`: constant time, no allocation.
pub fn len(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let value = one_iterable("len", args)?;
    thread.add_steps(1)?;
    match value.length() {
        Some(n) => Ok(Value::int(n as i64)),
        None => Err(EvalError::type_mismatch(format!(
            "len: {} has no length",
            value.type_name()
        ))),
    }
}

fn extreme(
    thread: &Thread,
    fname: &str,
    args: &Arguments,
    want: Ordering,
) -> Result<Value> {
    args.check_named_among(fname, &["key"])?;
    args.check_arity(fname, 1, None)?;
    let key = args.named_lookup("key");

    // One iterable, or the arguments themselves.
    let items = if args.pos().len() == 1 {
        collect_iter(thread, fname, args.arg(0).expect("arity checked"))?
    } else {
        args.pos().to_vec()
    };
    if items.is_empty() {
        return Err(EvalError::value_out_of_range(format!(
            "{}: empty iterable",
            fname
        )));
    }

    let keyed = |thread: &Thread, v: &Value| -> Result<Value> {
        match key {
            None => Ok(v.clone()),
            Some(f) => f.call(thread, &Arguments::positional(vec![v.clone()])),
        }
    };

    let mut best = items[0].clone();
    let mut best_key = keyed(thread, &best)?;
    for item in &items[1..] {
        thread.add_steps(1)?;
        let item_key = keyed(thread, item)?;
        let beats = match want {
            Ordering::Greater => safe_compare(thread, CmpOp::Gt, &item_key, &best_key)?,
            _ => safe_compare(thread, CmpOp::Lt, &item_key, &best_key)?,
        };
        if beats {
            best = item.clone();
            best_key = item_key;
        }
    }
    Ok(best)
}

pub fn max(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    extreme(thread, "max", args, Ordering::Greater)
}

pub fn min(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    extreme(thread, "min", args, Ordering::Less)
}

/// `reversed`: materialises the elements in reverse order.
pub fn reversed(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    let mut items = collect_iter(thread, "reversed", one_iterable("reversed", args)?)?;
    items.reverse();
    build_list(thread, items)
}

/// `sorted`: stable sort. The collection pass is metered per element;
/// the comparison pass is bounded by O(N log N) and not metered per
/// comparison.
pub fn sorted(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_named_among("sorted", &["key", "reverse"])?;
    args.check_arity("sorted", 1, Some(1))?;
    let reverse = match args.named_lookup("reverse") {
        None => false,
        Some(v) => crate::support::want_bool("sorted", "reverse", v)?,
    };
    let key = args.named_lookup("key");

    let items = collect_iter(thread, "sorted", args.arg(0).expect("arity checked"))?;
    thread.add_steps(items.len() as u64)?;

    // Decorate with sort keys so the key callable runs once per
    // element, not once per comparison.
    let mut decorated = Vec::with_capacity(items.len());
    for item in items {
        let k = match key {
            None => item.clone(),
            Some(f) => f.call(thread, &Arguments::positional(vec![item.clone()]))?,
        };
        decorated.push((k, item));
    }

    let mut sorted = merge_sort(thread, decorated)?;
    if reverse {
        sorted.reverse();
    }
    build_list(thread, sorted.into_iter().map(|(_, v)| v).collect())
}

/// Stable fallible merge sort: comparison errors (unorderable
/// element pairs) abort the whole sort instead of poisoning it.
fn merge_sort(thread: &Thread, mut items: Vec<(Value, Value)>) -> Result<Vec<(Value, Value)>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let mut left = merge_sort(thread, items)?.into_iter().peekable();
    let mut right = merge_sort(thread, right)?.into_iter().peekable();
    let mut out = Vec::with_capacity(left.size_hint().0 + right.size_hint().0);
    loop {
        match (left.peek(), right.peek()) {
            (Some((lk, _)), Some((rk, _))) => {
                // Take from the right only when strictly smaller, so
                // equal keys keep their original order.
                if safe_compare(thread, CmpOp::Lt, rk, lk)? {
                    out.push(right.next().expect("peeked"));
                } else {
                    out.push(left.next().expect("peeked"));
                }
            }
            (Some(_), None) => out.push(left.next().expect("peeked")),
            (None, Some(_)) => out.push(right.next().expect("peeked")),
            (None, None) => return Ok(out),
        }
    }
}

/// `zip`: tuples of parallel elements, length of the shortest input.
pub fn zip(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("zip")?;
    let mut iters: Vec<SafeIter> = Vec::with_capacity(args.pos().len());
    for source in args.pos() {
        iters.push(safe_iterate(thread, source)?);
    }
    let mut out = Vec::new();
    if !iters.is_empty() {
        'rows: loop {
            let mut row = Vec::with_capacity(iters.len());
            for iter in iters.iter_mut() {
                match iter.next(thread)? {
                    Some(item) => row.push(item),
                    None => break 'rows,
                }
            }
            thread.add_steps(1)?;
            out.push(build_tuple(thread, row)?);
        }
    }
    build_list(thread, out)
}
