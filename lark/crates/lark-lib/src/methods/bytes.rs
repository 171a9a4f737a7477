//! Bytes methods: the two per-element views.

use std::rc::Rc;

use lark_util::Result;
use lark_value::string::{SeqView, ViewMode};
use lark_value::{Arguments, SafetyFlags, Thread, Value};

use crate::support::recv_bytes;

use super::MethodSpec;

pub static SPECS: &[MethodSpec] = &[
    MethodSpec::new("elem_ords", SafetyFlags::SAFE, elem_ords),
    MethodSpec::new("elems", SafetyFlags::SAFE, elems),
];

fn make_view(thread: &Thread, recv: Option<&Value>, fname: &str, mode: ViewMode) -> Result<Value> {
    let b = recv_bytes(fname, recv)?;
    thread.add_allocs(64)?;
    Ok(Value::View(Rc::new(SeqView::over_bytes(Rc::clone(b), mode))))
}

fn elems(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("elems")?;
    args.check_arity("elems", 0, Some(0))?;
    make_view(thread, recv, "elems", ViewMode::Elems)
}

fn elem_ords(thread: &Thread, recv: Option<&Value>, args: &Arguments) -> Result<Value> {
    args.check_no_named("elem_ords")?;
    args.check_arity("elem_ords", 0, Some(0))?;
    make_view(thread, recv, "elem_ords", ViewMode::ElemOrds)
}
