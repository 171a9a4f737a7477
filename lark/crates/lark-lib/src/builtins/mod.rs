//! The universal builtins.
//!
//! Split by concern: `convert` holds the type constructors and
//! conversions, `iterate` the iteration-driven functions, `inspect`
//! the reflective and diagnostic ones. Every builtin declares full
//! safety because every one charges its work before committing it.

use lark_value::{NativeBuiltin, SafetyFlags};

pub mod convert;
pub mod inspect;
pub mod iterate;

/// Every universal builtin, in registry order.
pub fn all() -> Vec<NativeBuiltin> {
    let safe = SafetyFlags::SAFE;
    vec![
        NativeBuiltin::new("all", safe, iterate::all),
        NativeBuiltin::new("any", safe, iterate::any),
        NativeBuiltin::new("bool", safe, convert::bool_),
        NativeBuiltin::new("bytes", safe, convert::bytes_),
        NativeBuiltin::new("chr", safe, convert::chr_),
        NativeBuiltin::new("dict", safe, convert::dict_),
        NativeBuiltin::new("dir", safe, inspect::dir_),
        NativeBuiltin::new("enumerate", safe, iterate::enumerate),
        NativeBuiltin::new("fail", safe, inspect::fail),
        NativeBuiltin::new("float", safe, convert::float_),
        NativeBuiltin::new("getattr", safe, inspect::getattr),
        NativeBuiltin::new("hasattr", safe, inspect::hasattr),
        NativeBuiltin::new("hash", safe, inspect::hash),
        NativeBuiltin::new("int", safe, convert::int_),
        NativeBuiltin::new("len", safe, iterate::len),
        NativeBuiltin::new("list", safe, convert::list_),
        NativeBuiltin::new("max", safe, iterate::max),
        NativeBuiltin::new("min", safe, iterate::min),
        NativeBuiltin::new("ord", safe, convert::ord_),
        NativeBuiltin::new("print", safe, inspect::print),
        NativeBuiltin::new("range", safe, convert::range_),
        NativeBuiltin::new("repr", safe, inspect::repr),
        NativeBuiltin::new("reversed", safe, iterate::reversed),
        NativeBuiltin::new("set", safe, convert::set_),
        NativeBuiltin::new("sorted", safe, iterate::sorted),
        NativeBuiltin::new("str", safe, convert::str_),
        NativeBuiltin::new("tuple", safe, convert::tuple_),
        NativeBuiltin::new("type", safe, inspect::type_),
        NativeBuiltin::new("zip", safe, iterate::zip),
    ]
}
