//! Attribute dispatch.
//!
//! Built-in receivers resolve through the per-type method tables;
//! foreign receivers go through their own protocol. A foreign value
//! that implements only the unmetered `attr` variant is refused
//! outright from a thread with any safety requirement, before its
//! code runs.

use std::rc::Rc;

use lark_util::{EvalError, Result, SafetyFlags};
use lark_value::{Thread, Value};

use crate::methods;

/// Cost of the callable cell a bound method occupies.
const BOUND_METHOD_BYTES: i64 = 96;

/// Resource-bounded attribute lookup.
pub fn safe_attr(thread: &Thread, value: &Value, name: &str) -> Result<Value> {
    thread.add_steps(1)?;
    if let Some(table) = methods::table_for(value) {
        return match table.bind(name, value) {
            Some(bound) => {
                thread.add_allocs(BOUND_METHOD_BYTES)?;
                Ok(Value::Builtin(Rc::new(bound)))
            }
            None => Err(no_such_attr(value, name)),
        };
    }
    if let Value::Foreign(f) = value {
        return if f.has_safe_attr() {
            thread.permits(f.safety())?;
            f.safe_attr(thread, name)
        } else {
            // Unsafe-only attribute access provides no guarantees.
            thread.permits(SafetyFlags::NOT_SAFE)?;
            f.attr(name)
        };
    }
    Err(no_such_attr(value, name))
}

fn no_such_attr(value: &Value, name: &str) -> EvalError {
    EvalError::no_such_attr(format!(
        "{} has no .{} field or method",
        value.type_name(),
        name
    ))
}

/// Ordered attribute names, for `dir`.
pub fn attr_names(value: &Value) -> Vec<String> {
    let mut names: Vec<String> = match value {
        Value::Foreign(f) => f.attr_names(),
        _ => methods::table_for(value)
            .map(|table| table.names().iter().map(|n| n.to_string()).collect())
            .unwrap_or_default(),
    };
    names.sort_unstable();
    names
}

/// `hasattr` semantics: a missing attribute is `false`, every other
/// failure (including safety refusals) propagates.
pub fn has_attr(thread: &Thread, value: &Value, name: &str) -> Result<bool> {
    match safe_attr(thread, value, name) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == lark_util::ErrorKind::NoSuchAttr => Ok(false),
        Err(err) => Err(err),
    }
}
