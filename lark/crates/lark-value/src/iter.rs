//! Safe iteration.
//!
//! [`safe_iterate`] is the only way the engine walks a container. It
//! checks the iterable's declared safety against the thread's
//! requirement before the first element, registers a live iterator on
//! mutable containers (blocking mutation), and releases that
//! registration on *every* exit path by doing it in `Drop`. Errors
//! observed mid-iteration are sticky: once `next` has failed, it
//! fails the same way forever.
//!
//! Iterators are single-pass; a restart requires a fresh
//! [`safe_iterate`] call. Per-element step costs are charged by
//! consumers (builtins, operators), not here, so an element is never
//! double-charged; `next` still consults the accountant on every call
//! so cancellation and exhaustion propagate through nested iteration.

use std::rc::Rc;

use lark_safety::Thread;
use lark_util::{EvalError, Result};

use crate::dict::Dict;
use crate::list::List;
use crate::range::RangeValue;
use crate::set::Set;
use crate::string::{SeqView, ViewMode};
use crate::value::{ForeignIter, Value};

/// Bytes charged for the small heap cell of a yielded one-element
/// string or bytes value.
const ELEM_CELL_BYTES: i64 = 24;

enum Cursor {
    Start,
    At(u32),
    Done,
}

enum IterKind {
    List { list: Rc<List>, index: usize },
    Tuple { items: Rc<[Value]>, index: usize },
    Dict { dict: Rc<Dict>, cursor: Cursor },
    Set { set: Rc<Set>, cursor: Cursor },
    Range { range: Rc<RangeValue>, index: usize },
    View { view: Rc<SeqView>, pos: usize },
    Foreign(Box<dyn ForeignIter>),
}

/// A live iterator handle. Dropping it releases the container's
/// iterator-in-progress registration.
pub struct SafeIter {
    kind: IterKind,
    err: Option<EvalError>,
}

impl std::fmt::Debug for SafeIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeIter").finish_non_exhaustive()
    }
}

/// Produces an iterator over `value`.
///
/// Fails with a `Safety` error before any element is produced when
/// the value's iteration surface provides less than the thread
/// requires, and with `TypeMismatch` for non-iterable types.
pub fn safe_iterate(thread: &Thread, value: &Value) -> Result<SafeIter> {
    thread.permits(value.provided_safety())?;
    let kind = match value {
        Value::List(list) => {
            list.state().begin_iter();
            IterKind::List {
                list: Rc::clone(list),
                index: 0,
            }
        }
        Value::Tuple(items) => IterKind::Tuple {
            items: Rc::clone(items),
            index: 0,
        },
        Value::Dict(dict) => {
            dict.state().begin_iter();
            IterKind::Dict {
                dict: Rc::clone(dict),
                cursor: Cursor::Start,
            }
        }
        Value::Set(set) => {
            set.state().begin_iter();
            IterKind::Set {
                set: Rc::clone(set),
                cursor: Cursor::Start,
            }
        }
        Value::Range(range) => IterKind::Range {
            range: Rc::clone(range),
            index: 0,
        },
        Value::View(view) => IterKind::View {
            view: Rc::clone(view),
            pos: 0,
        },
        Value::Foreign(f) => match Rc::clone(f).iterate() {
            Some(iter) => IterKind::Foreign(iter),
            None => {
                return Err(EvalError::type_mismatch(format!(
                    "{} is not iterable",
                    value.type_name()
                )))
            }
        },
        Value::Str(_) => {
            return Err(EvalError::type_mismatch(
                "string is not iterable; use .elems() or .codepoints()",
            ))
        }
        Value::Bytes(_) => {
            return Err(EvalError::type_mismatch(
                "bytes is not iterable; use .elems()",
            ))
        }
        other => {
            return Err(EvalError::type_mismatch(format!(
                "{} is not iterable",
                other.type_name()
            )))
        }
    };
    Ok(SafeIter { kind, err: None })
}

impl SafeIter {
    /// Yields the next element, or `None` on exhaustion.
    ///
    /// The accountant is consulted on every call so that budget
    /// exhaustion and cancellation cut iteration short; the first
    /// error is sticky.
    pub fn next(&mut self, thread: &Thread) -> Result<Option<Value>> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        match self.advance(thread) {
            Ok(item) => Ok(item),
            Err(err) => {
                self.err = Some(err.clone());
                Err(err)
            }
        }
    }

    /// The sticky first error, if any.
    pub fn err(&self) -> Option<&EvalError> {
        self.err.as_ref()
    }

    fn advance(&mut self, thread: &Thread) -> Result<Option<Value>> {
        // Suspension point: observe cancellation and exhaustion
        // without charging anything.
        thread.check_steps(0)?;
        match &mut self.kind {
            IterKind::List { list, index } => {
                let item = list.get(*index);
                if item.is_some() {
                    *index += 1;
                }
                Ok(item)
            }
            IterKind::Tuple { items, index } => {
                let item = items.get(*index).cloned();
                if item.is_some() {
                    *index += 1;
                }
                Ok(item)
            }
            IterKind::Dict { dict, cursor } => {
                let table = dict.table();
                let next = match cursor {
                    Cursor::Start => table.head_index(),
                    Cursor::At(idx) => table.next_index(*idx),
                    Cursor::Done => None,
                };
                match next {
                    Some(idx) => {
                        *cursor = Cursor::At(idx);
                        Ok(Some(table.entry(idx).0.clone()))
                    }
                    None => {
                        *cursor = Cursor::Done;
                        Ok(None)
                    }
                }
            }
            IterKind::Set { set, cursor } => {
                let table = set.table();
                let next = match cursor {
                    Cursor::Start => table.head_index(),
                    Cursor::At(idx) => table.next_index(*idx),
                    Cursor::Done => None,
                };
                match next {
                    Some(idx) => {
                        *cursor = Cursor::At(idx);
                        Ok(Some(table.entry(idx).0.clone()))
                    }
                    None => {
                        *cursor = Cursor::Done;
                        Ok(None)
                    }
                }
            }
            IterKind::Range { range, index } => {
                if *index >= range.len() {
                    return Ok(None);
                }
                let v = range.at(*index);
                *index += 1;
                Ok(Some(Value::int(v)))
            }
            IterKind::View { view, pos } => Self::advance_view(thread, view, pos),
            IterKind::Foreign(iter) => iter.next(thread),
        }
    }

    fn advance_view(
        thread: &Thread,
        view: &Rc<SeqView>,
        pos: &mut usize,
    ) -> Result<Option<Value>> {
        let bytes = view.bytes();
        if *pos >= bytes.len() {
            return Ok(None);
        }
        match view.mode() {
            ViewMode::Elems => {
                let b = bytes[*pos];
                *pos += 1;
                thread.add_allocs(ELEM_CELL_BYTES)?;
                Ok(Some(Value::bytes(&[b])))
            }
            ViewMode::ElemOrds => {
                let b = bytes[*pos];
                *pos += 1;
                Ok(Some(Value::int(b as i64)))
            }
            ViewMode::Codepoints => {
                let s = view.as_str().expect("codepoints view over string");
                let c = s[*pos..].chars().next().expect("pos on char boundary");
                *pos += c.len_utf8();
                thread.add_allocs(ELEM_CELL_BYTES)?;
                let mut buf = [0u8; 4];
                Ok(Some(Value::str(c.encode_utf8(&mut buf))))
            }
            ViewMode::CodepointOrds => {
                let s = view.as_str().expect("codepoint_ords view over string");
                let c = s[*pos..].chars().next().expect("pos on char boundary");
                *pos += c.len_utf8();
                Ok(Some(Value::int(c as i64)))
            }
        }
    }
}

impl Drop for SafeIter {
    fn drop(&mut self) {
        match &self.kind {
            IterKind::List { list, .. } => list.state().end_iter(),
            IterKind::Dict { dict, .. } => dict.state().end_iter(),
            IterKind::Set { set, .. } => set.state().end_iter(),
            _ => {}
        }
    }
}
