//! Reflective and diagnostic builtins.

use lark_util::{ErrorKind, EvalError, Result};
use lark_value::{
    safe_repr, write_str_into, Arguments, SafeStringBuilder, Thread, Value,
};

use crate::attr;
use crate::support::{build_list, build_str, promote_built_string, want_str};

pub fn dir_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("dir")?;
    args.check_arity("dir", 1, Some(1))?;
    let value = args.arg(0).expect("arity checked");
    let names = attr::attr_names(value);
    thread.add_steps(names.len() as u64 + 1)?;
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        out.push(build_str(thread, &name)?);
    }
    build_list(thread, out)
}

/// `fail`: stringifies its arguments (str form, single-space
/// separator) and raises the result as a user error.
pub fn fail(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("fail")?;
    let message = joined_str_form(thread, args.pos())?;
    Err(EvalError::user(message))
}

pub fn getattr(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("getattr")?;
    args.check_arity("getattr", 2, Some(3))?;
    let value = args.arg(0).expect("arity checked");
    let name = want_str("getattr", "name", args.arg(1).expect("arity checked"))?;
    match attr::safe_attr(thread, value, name) {
        Ok(v) => Ok(v),
        Err(err) if err.kind() == ErrorKind::NoSuchAttr => match args.arg(2) {
            Some(default) => Ok(default.clone()),
            None => Err(err),
        },
        Err(err) => Err(err),
    }
}

pub fn hasattr(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("hasattr")?;
    args.check_arity("hasattr", 2, Some(2))?;
    let value = args.arg(0).expect("arity checked");
    let name = want_str("hasattr", "name", args.arg(1).expect("arity checked"))?;
    Ok(Value::Bool(attr::has_attr(thread, value, name)?))
}

/// `hash`: one step per byte for strings and bytes, constant for
/// scalars; unhashable types refuse.
pub fn hash(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("hash")?;
    args.check_arity("hash", 1, Some(1))?;
    let value = args.arg(0).expect("arity checked");
    let cost = match value {
        Value::Str(s) => s.len() as u64 + 1,
        Value::Bytes(b) => b.len() as u64 + 1,
        _ => 1,
    };
    thread.add_steps(cost)?;
    let h = value.hash_value()?;
    Ok(Value::int(h as i32 as i64))
}

/// `print`: the hook runs only after every argument has been
/// stringified and charged, so a refusing hook leaves consistent
/// accounting.
pub fn print(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("print")?;
    let message = joined_str_form(thread, args.pos())?;
    thread.print(&message)?;
    Ok(Value::None)
}

pub fn repr(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("repr")?;
    args.check_arity("repr", 1, Some(1))?;
    let out = safe_repr(thread, args.arg(0).expect("arity checked"))?;
    promote_built_string(thread, out)
}

pub fn type_(thread: &Thread, _recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("type")?;
    args.check_arity("type", 1, Some(1))?;
    thread.add_steps(1)?;
    build_str(thread, args.arg(0).expect("arity checked").type_name())
}

fn joined_str_form(thread: &Thread, values: &[Value]) -> Result<String> {
    let mut out = SafeStringBuilder::new(thread);
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            thread.add_steps(1)?;
            out.write_char(' ')?;
        }
        write_str_into(thread, &mut out, value)?;
    }
    Ok(out.finish())
}
