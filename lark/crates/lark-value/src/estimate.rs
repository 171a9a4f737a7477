//! The size estimator.
//!
//! Pure functions returning conservative upper-bound byte counts.
//! Structurally identical inputs produce identical numbers, and
//! over-estimation is always safe; operators call these *before*
//! producing output and charge the result, so a refused charge means
//! nothing was built.
//!
//! [`estimate`] prices a value plus its directly-owned storage: a
//! container's slot array is included, the values in the slots are
//! not (they were priced at their own creation). Shared immutable
//! backing is booked to the parent: a lazy view over a string adds
//! nothing for the string itself. [`estimate_deep`] walks the whole
//! reachable graph, visiting each heap cell once.

use std::mem;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::call::NativeBuiltin;
use crate::dict::Dict;
use crate::int::LarkInt;
use crate::list::List;
use crate::range::RangeValue;
use crate::set::Set;
use crate::string::SeqView;
use crate::value::Value;

/// Bytes of an inline value slot.
pub fn value_slot_bytes() -> u64 {
    mem::size_of::<Value>() as u64
}

/// Heap-cell bookkeeping (reference counts) per shared allocation.
const RC_HEADER: u64 = 16;

/// Per-entry storage in the dict/set table, used when estimating a
/// table that is about to be built.
const TABLE_ENTRY_BYTES: u64 = 80;

/// What [`estimate_make_size`] is pricing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MakeSizeKind {
    List,
    Tuple,
    Dict,
    Set,
    Str,
    Bytes,
}

/// Upper bound for a growable value about to be allocated with room
/// for `capacity` elements (or bytes, for the text kinds).
pub fn estimate_make_size(kind: MakeSizeKind, capacity: usize) -> u64 {
    let capacity = capacity as u64;
    match kind {
        MakeSizeKind::List => {
            RC_HEADER + mem::size_of::<List>() as u64 + capacity * value_slot_bytes()
        }
        MakeSizeKind::Tuple => RC_HEADER + capacity * value_slot_bytes(),
        MakeSizeKind::Dict => RC_HEADER + mem::size_of::<Dict>() as u64 + capacity * TABLE_ENTRY_BYTES,
        MakeSizeKind::Set => RC_HEADER + mem::size_of::<Set>() as u64 + capacity * TABLE_ENTRY_BYTES,
        MakeSizeKind::Str | MakeSizeKind::Bytes => RC_HEADER + capacity,
    }
}

/// Upper bound for `value` plus its directly-owned storage.
pub fn estimate(value: &Value) -> u64 {
    let slot = value_slot_bytes();
    match value {
        Value::None | Value::Bool(_) | Value::Float(_) => slot,
        Value::Int(LarkInt::Small(_)) => slot,
        Value::Int(i @ LarkInt::Big(_)) => slot + RC_HEADER + i.words() * 8,
        Value::Str(s) => slot + RC_HEADER + s.len() as u64,
        Value::Bytes(b) => slot + RC_HEADER + b.len() as u64,
        Value::Tuple(t) => slot + RC_HEADER + t.len() as u64 * slot,
        Value::List(l) => {
            slot + RC_HEADER
                + mem::size_of::<List>() as u64
                + l.items().capacity() as u64 * slot
        }
        Value::Dict(d) => {
            slot + RC_HEADER + mem::size_of::<Dict>() as u64 + d.table().charged_bytes() as u64
        }
        Value::Set(s) => {
            slot + RC_HEADER + mem::size_of::<Set>() as u64 + s.table().charged_bytes() as u64
        }
        Value::Range(_) => slot + RC_HEADER + mem::size_of::<RangeValue>() as u64,
        // The backing string/bytes is booked to its parent.
        Value::View(_) => slot + RC_HEADER + mem::size_of::<SeqView>() as u64,
        Value::Builtin(_) => slot + RC_HEADER + mem::size_of::<NativeBuiltin>() as u64,
        Value::Foreign(f) => slot + RC_HEADER + f.size_estimate(),
    }
}

/// Identity of the heap cell a value points at, if any.
fn heap_ptr(value: &Value) -> Option<usize> {
    match value {
        Value::Int(LarkInt::Big(b)) => Some(Rc::as_ptr(b) as usize),
        Value::Str(s) => Some(Rc::as_ptr(s) as *const u8 as usize),
        Value::Bytes(b) => Some(Rc::as_ptr(b) as *const u8 as usize),
        Value::Tuple(t) => Some(t.as_ptr() as usize),
        Value::List(l) => Some(Rc::as_ptr(l) as usize),
        Value::Dict(d) => Some(Rc::as_ptr(d) as usize),
        Value::Set(s) => Some(Rc::as_ptr(s) as usize),
        Value::Range(r) => Some(Rc::as_ptr(r) as usize),
        Value::View(v) => Some(Rc::as_ptr(v) as usize),
        Value::Builtin(b) => Some(Rc::as_ptr(b) as usize),
        Value::Foreign(f) => Some(Rc::as_ptr(f) as *const u8 as usize),
        _ => None,
    }
}

/// Upper bound for the whole graph reachable from `value`. Each heap
/// cell is counted once, however many paths reach it.
pub fn estimate_deep(value: &Value) -> u64 {
    let mut seen = FxHashSet::default();
    deep(value, &mut seen)
}

fn deep(value: &Value, seen: &mut FxHashSet<usize>) -> u64 {
    if let Some(ptr) = heap_ptr(value) {
        if !seen.insert(ptr) {
            // Already counted through another path; this slot's
            // inline bytes are all that is new.
            return value_slot_bytes();
        }
    }
    let mut total = estimate(value);
    match value {
        Value::Tuple(t) => {
            for item in t.iter() {
                total += deep(item, seen);
            }
        }
        Value::List(l) => {
            for item in l.items().iter() {
                total += deep(item, seen);
            }
        }
        Value::Dict(d) => {
            for (key, val) in d.items_vec() {
                total += deep(&key, seen);
                total += deep(&val, seen);
            }
        }
        Value::Set(s) => {
            for member in s.members_vec() {
                total += deep(&member, seen);
            }
        }
        Value::View(v) => {
            // A view keeps its backing alive; book it here once.
            let base = v.bytes();
            if seen.insert(base.as_ptr() as usize) {
                total += RC_HEADER + base.len() as u64;
            }
        }
        _ => {}
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::ViewMode;
    use lark_safety::Thread;

    #[test]
    fn test_identical_inputs_identical_numbers() {
        let a = Value::list(vec![Value::int(1), Value::str("xy")]);
        let b = Value::list(vec![Value::int(1), Value::str("xy")]);
        assert_eq!(estimate(&a), estimate(&b));
        assert_eq!(estimate_deep(&a), estimate_deep(&b));
    }

    #[test]
    fn test_string_estimate_covers_content() {
        let s = Value::str("0123456789");
        assert!(estimate(&s) >= 10);
        assert!(estimate(&s) >= estimate(&Value::str("")));
    }

    #[test]
    fn test_big_int_estimate_grows_with_width() {
        let small = Value::int(1);
        let big = Value::Int(crate::int::LarkInt::parse(&"9".repeat(100), 10).unwrap());
        assert!(estimate(&big) > estimate(&small));
    }

    #[test]
    fn test_growth_is_monotone() {
        let thread = Thread::new();
        let list = match Value::list(vec![]) {
            Value::List(l) => l,
            _ => unreachable!(),
        };
        let value = Value::List(list.clone());
        let mut last = estimate(&value);
        for n in 0..100 {
            list.items_mut().unwrap().push(Value::int(n));
            let now = estimate(&value);
            assert!(now >= last, "estimate shrank on growth");
            last = now;
        }
        drop(thread);
    }

    #[test]
    fn test_dict_estimate_tracks_charged_storage() {
        let thread = Thread::new();
        let dict = Dict::new();
        let empty = {
            let v = Value::Dict(Rc::new(Dict::new()));
            estimate(&v)
        };
        for n in 0..50 {
            dict.insert(&thread, Value::int(n), Value::None).unwrap();
        }
        let v = Value::Dict(Rc::new(dict));
        assert!(estimate(&v) > empty);
        // The estimate at least covers what the accountant was charged.
        assert!(estimate(&v) >= thread.accountant().allocs() as u64);
    }

    #[test]
    fn test_deep_counts_shared_cell_once() {
        let shared = Value::str("a shared backing string");
        let single = Value::list(vec![shared.clone()]);
        let double = Value::list(vec![shared.clone(), shared.clone()]);
        let delta = estimate_deep(&double) - estimate_deep(&single);
        // The second reference adds only a slot, not the string again.
        assert_eq!(delta, value_slot_bytes());
    }

    #[test]
    fn test_deep_terminates_on_cycles() {
        let list = match Value::list(vec![]) {
            Value::List(l) => l,
            _ => unreachable!(),
        };
        list.items_mut()
            .unwrap()
            .push(Value::List(Rc::clone(&list)));
        let v = Value::List(list);
        // Must not loop; the cycle is visited once.
        assert!(estimate_deep(&v) > 0);
    }

    #[test]
    fn test_view_books_backing_to_parent_in_shallow() {
        let s: Rc<str> = Rc::from("x".repeat(1000));
        let view = Value::View(Rc::new(SeqView::over_str(Rc::clone(&s), ViewMode::Elems)));
        // Shallow estimate of the view ignores the kilobyte of backing.
        assert!(estimate(&view) < 200);
        // Deep estimate includes it.
        assert!(estimate_deep(&view) >= 1000);
    }

    #[test]
    fn test_make_size_monotone_in_capacity() {
        for kind in [
            MakeSizeKind::List,
            MakeSizeKind::Tuple,
            MakeSizeKind::Dict,
            MakeSizeKind::Set,
            MakeSizeKind::Str,
            MakeSizeKind::Bytes,
        ] {
            let mut last = estimate_make_size(kind, 0);
            for cap in [1, 2, 10, 100] {
                let now = estimate_make_size(kind, cap);
                assert!(now >= last, "{:?} shrank", kind);
                last = now;
            }
        }
    }
}
