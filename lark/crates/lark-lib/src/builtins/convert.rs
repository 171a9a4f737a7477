//! Type constructors and conversions.

use std::rc::Rc;

use lark_util::{EvalError, Result};
use lark_value::{
    estimate_make_size, float::parse_float, safe_str, Arguments, Dict, LarkInt, MakeSizeKind,
    RangeValue, Set, Thread, Value,
};

use crate::support::{
    build_bytes, build_list, build_tuple, collect_iter, promote_built_string, want_i64,
};

pub fn bool_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("bool")?;
    args.check_arity("bool", 0, Some(1))?;
    let value = match args.arg(0) {
        None => return Ok(Value::Bool(false)),
        Some(v) => v,
    };
    // Truth of a big int scans its digit array.
    let cost = match value {
        Value::Int(i) => i.words(),
        Value::Str(s) => 1 + s.len() as u64 / 64,
        _ => 1,
    };
    thread.add_steps(cost)?;
    Ok(Value::Bool(value.truth()))
}

pub fn bytes_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("bytes")?;
    args.check_arity("bytes", 1, Some(1))?;
    match args.arg(0).expect("arity checked") {
        identity @ Value::Bytes(_) => {
            thread.add_steps(1)?;
            Ok(identity.clone())
        }
        Value::Str(s) => {
            thread.add_steps(s.len() as u64)?;
            build_bytes(thread, s.as_bytes())
        }
        iterable => {
            let items = collect_iter(thread, "bytes", iterable)?;
            thread.add_steps(items.len() as u64)?;
            thread.add_allocs(estimate_make_size(MakeSizeKind::Bytes, items.len()) as i64)?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let b = match &item {
                    Value::Int(i) => i.to_i64(),
                    _ => {
                        return Err(EvalError::type_mismatch(format!(
                            "bytes: got {} element, want int",
                            item.type_name()
                        )))
                    }
                };
                match b {
                    Some(v @ 0..=255) => out.push(v as u8),
                    _ => {
                        return Err(EvalError::value_out_of_range(
                            "bytes: element must be in range(0, 256)",
                        ))
                    }
                }
            }
            Ok(Value::bytes(&out))
        }
    }
}

pub fn chr_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("chr")?;
    args.check_arity("chr", 1, Some(1))?;
    thread.add_steps(1)?;
    let code = want_i64("chr", "code point", args.arg(0).expect("arity checked"))?;
    let c = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| {
            EvalError::value_out_of_range(format!("chr: {} is not a valid code point", code))
        })?;
    thread.add_allocs(24)?;
    let mut buf = [0u8; 4];
    Ok(Value::str(c.encode_utf8(&mut buf)))
}

pub fn ord_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("ord")?;
    args.check_arity("ord", 1, Some(1))?;
    thread.add_steps(1)?;
    match args.arg(0).expect("arity checked") {
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::int(c as i64)),
                _ => Err(EvalError::value_out_of_range(
                    "ord: string must hold exactly one code point",
                )),
            }
        }
        Value::Bytes(b) if b.len() == 1 => Ok(Value::int(b[0] as i64)),
        Value::Bytes(_) => Err(EvalError::value_out_of_range(
            "ord: bytes must have length 1",
        )),
        other => Err(EvalError::type_mismatch(format!(
            "ord: got {}, want string or bytes",
            other.type_name()
        ))),
    }
}

pub fn dict_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_arity("dict", 0, Some(1))?;
    args.check_no_duplicates("dict")?;
    let dict = Dict::new();
    if let Some(source) = args.arg(0) {
        match source {
            Value::Dict(other) => {
                for (key, value) in other.items_vec() {
                    thread.add_steps(1)?;
                    dict.insert(thread, key, value)?;
                }
            }
            _ => {
                let mut iter = lark_value::safe_iterate(thread, source)?;
                while let Some(pair) = iter.next(thread)? {
                    thread.add_steps(1)?;
                    let (k, v) = match &pair {
                        Value::Tuple(t) if t.len() == 2 => (t[0].clone(), t[1].clone()),
                        Value::List(l) if l.len() == 2 => {
                            (l.get(0).expect("len 2"), l.get(1).expect("len 2"))
                        }
                        _ => {
                            return Err(EvalError::type_mismatch(
                                "dict: entries must be pairs of length 2",
                            ))
                        }
                    };
                    dict.insert(thread, k, v)?;
                }
            }
        }
    }
    for (name, value) in args.named() {
        thread.add_steps(1)?;
        dict.insert(thread, Value::str(name), value.clone())?;
    }
    Ok(Value::Dict(Rc::new(dict)))
}

pub fn float_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("float")?;
    args.check_arity("float", 0, Some(1))?;
    let value = match args.arg(0) {
        None => return Ok(Value::Float(0.0)),
        Some(v) => v,
    };
    match value {
        Value::Bool(b) => {
            thread.add_steps(1)?;
            Ok(Value::Float(if *b { 1.0 } else { 0.0 }))
        }
        Value::Int(i) => {
            thread.add_steps(1)?;
            Ok(Value::Float(i.to_finite_float()?))
        }
        Value::Float(f) => {
            thread.add_steps(1)?;
            Ok(Value::Float(*f))
        }
        Value::Str(s) => {
            thread.add_steps(s.len() as u64 + 1)?;
            Ok(Value::Float(parse_float(s)?))
        }
        other => Err(EvalError::type_mismatch(format!(
            "float: got {}, want bool, int, float, or string",
            other.type_name()
        ))),
    }
}

pub fn int_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_named_among("int", &["base"])?;
    args.check_arity("int", 0, Some(2))?;
    let base_arg = args.arg(1).or_else(|| args.named_lookup("base"));
    let value = match args.arg(0) {
        None => return Ok(Value::int(0)),
        Some(v) => v,
    };
    match value {
        Value::Str(s) => {
            let base = match base_arg {
                None => 10,
                Some(v) => {
                    let b = want_i64("int", "base", v)?;
                    u32::try_from(b).map_err(|_| {
                        EvalError::value_out_of_range("int: base out of range")
                    })?
                }
            };
            thread.add_steps(s.len() as u64 + 1)?;
            let parsed = LarkInt::parse(s, base)?;
            Ok(Value::Int(parsed))
        }
        _ if base_arg.is_some() => Err(EvalError::type_mismatch(
            "int: base is only allowed when converting a string",
        )),
        Value::Bool(b) => {
            thread.add_steps(1)?;
            Ok(Value::int(if *b { 1 } else { 0 }))
        }
        Value::Int(_) => {
            thread.add_steps(1)?;
            Ok(value.clone())
        }
        Value::Float(f) => {
            thread.add_steps(1)?;
            Ok(Value::Int(LarkInt::from_finite_float(*f)?))
        }
        other => Err(EvalError::type_mismatch(format!(
            "int: got {}, want bool, int, float, or string",
            other.type_name()
        ))),
    }
}

pub fn list_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("list")?;
    args.check_arity("list", 0, Some(1))?;
    let items = match args.arg(0) {
        None => Vec::new(),
        Some(source) => collect_iter(thread, "list", source)?,
    };
    build_list(thread, items)
}

pub fn set_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("set")?;
    args.check_arity("set", 0, Some(1))?;
    let set = Set::new();
    if let Some(source) = args.arg(0) {
        for item in collect_iter(thread, "set", source)? {
            thread.add_steps(1)?;
            set.insert(thread, item)?;
        }
    }
    Ok(Value::Set(Rc::new(set)))
}

pub fn str_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("str")?;
    args.check_arity("str", 0, Some(1))?;
    match args.arg(0) {
        None => Ok(Value::str("")),
        // str of a string is the string itself, no copy.
        Some(identity @ Value::Str(_)) => {
            thread.add_steps(1)?;
            Ok(identity.clone())
        }
        Some(value) => {
            let out = safe_str(thread, value)?;
            promote_built_string(thread, out)
        }
    }
}

pub fn tuple_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("tuple")?;
    args.check_arity("tuple", 0, Some(1))?;
    let items = match args.arg(0) {
        None => Vec::new(),
        Some(source) => collect_iter(thread, "tuple", source)?,
    };
    build_tuple(thread, items)
}

pub fn range_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("range")?;
    args.check_arity("range", 1, Some(3))?;
    thread.add_steps(1)?;
    let first = want_i64("range", "start", args.arg(0).expect("arity checked"))?;
    let (start, stop, step) = match (args.arg(1), args.arg(2)) {
        (None, None) => (0, first, 1),
        (Some(stop), None) => (first, want_i64("range", "stop", stop)?, 1),
        (Some(stop), Some(step)) => (
            first,
            want_i64("range", "stop", stop)?,
            want_i64("range", "step", step)?,
        ),
        (None, Some(_)) => unreachable!("positional arguments are ordered"),
    };
    thread.add_allocs(40)?;
    Ok(Value::Range(Rc::new(RangeValue::new(start, stop, step)?)))
}
