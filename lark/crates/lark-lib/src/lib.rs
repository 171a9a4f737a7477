//! lark-lib - The Universal Builtin Library
//!
//! The built-in surface of the engine: the 29 universal builtins, the
//! per-type method tables (list, dict, set, string, bytes), the
//! registry that maps names to callables with declared safety sets,
//! and attribute dispatch. Every entry is an independently metered
//! builtin: it charges steps and allocations through the thread
//! before committing work, and its declared safety is checked against
//! the thread's requirement on every call.

pub mod attr;
pub mod builtins;
pub mod methods;
pub mod support;
pub mod universe;

pub use attr::{attr_names, has_attr, safe_attr};
pub use universe::Universe;

pub use lark_value::{Arguments, Thread, Value};
pub use lark_util::{ErrorKind, EvalError, Result, SafetyFlags};
