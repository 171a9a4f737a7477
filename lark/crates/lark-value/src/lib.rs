//! lark-value - The Lark Value Universe
//!
//! Every value the engine evaluates lives here: the closed set of
//! built-in types (none, bool, int, float, string, bytes, list,
//! tuple, dict, set, range, builtin callables, lazy sequence views)
//! plus the [`ForeignValue`] trait object for host-supplied
//! extensions. Alongside the types sit the cooperative-metering
//! primitives the whole engine is built from: safe iteration with
//! guaranteed release, the conservative size estimator, the metered
//! binary/unary operators, and the cycle-aware stringifier.
//!
//! Ownership is `Rc`-based: frozen values may be shared freely within
//! a logical thread, and `Rc` being `!Send` structurally forbids
//! handing an unfrozen container to another OS thread.

pub mod call;
pub mod dict;
pub mod estimate;
pub mod float;
pub mod fmt;
pub mod int;
pub mod iter;
pub mod list;
pub mod ops;
pub mod range;
pub mod set;
pub mod state;
pub mod string;
pub mod table;
pub mod value;

pub use call::{Arguments, NativeBuiltin, NativeFn};
pub use dict::Dict;
pub use estimate::{estimate, estimate_deep, estimate_make_size, MakeSizeKind};
pub use fmt::{brace_format, percent_format, safe_repr, safe_str, write_repr_into, write_str_into};
pub use int::LarkInt;
pub use iter::{safe_iterate, SafeIter};
pub use list::List;
pub use ops::{safe_binary, safe_compare, safe_index, safe_slice, safe_unary, BinOp, CmpOp, UnOp};
pub use range::RangeValue;
pub use set::Set;
pub use string::{SeqView, ViewMode};
pub use value::{ForeignIter, ForeignValue, Value};

pub use lark_safety::{SafeStringBuilder, SafeVec, Thread};
pub use lark_util::{ErrorKind, EvalError, Result, SafetyFlags};
