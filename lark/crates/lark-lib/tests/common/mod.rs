//! Shared fixtures for the library test suites.
#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use lark_lib::Universe;
use lark_util::{Result, SafetyFlags};
use lark_value::{Arguments, ForeignIter, ForeignValue, SafeStringBuilder, Thread, Value};

/// A thread with no limits and no requirement.
pub fn thread() -> Thread {
    Thread::new()
}

/// A thread metering steps, with CPU required.
pub fn cpu_thread(max_steps: u64) -> Thread {
    let t = Thread::with_limits(max_steps, u64::MAX);
    t.require_safety(SafetyFlags::CPU);
    t
}

/// A thread metering allocations, with Memory required.
pub fn mem_thread(max_allocs: u64) -> Thread {
    let t = Thread::with_limits(u64::MAX, max_allocs);
    t.require_safety(SafetyFlags::MEMORY);
    t
}

/// Calls a universal builtin with positional arguments.
pub fn call(thread: &Thread, name: &str, args: Vec<Value>) -> Result<Value> {
    let universe = Universe::standard();
    let builtin = universe.lookup_checked(thread, name)?;
    builtin.call(thread, &Arguments::positional(args))
}

/// Calls a universal builtin with positionals and named arguments.
pub fn call_named(
    thread: &Thread,
    name: &str,
    pos: Vec<Value>,
    named: Vec<(&str, Value)>,
) -> Result<Value> {
    let universe = Universe::standard();
    let builtin = universe.lookup_checked(thread, name)?;
    let named = named
        .into_iter()
        .map(|(n, v)| (n.to_owned(), v))
        .collect();
    builtin.call(thread, &Arguments::new(pos, named))
}

/// Calls a method on a receiver.
pub fn call_method(thread: &Thread, recv: &Value, name: &str, args: Vec<Value>) -> Result<Value> {
    let method = lark_lib::safe_attr(thread, recv, name)?;
    method.call(thread, &Arguments::positional(args))
}

pub fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().map(|&v| Value::int(v)).collect())
}

pub fn as_i64(value: &Value) -> i64 {
    match value {
        Value::Int(i) => i.to_i64().expect("small int"),
        other => panic!("expected int, got {}", other.type_name()),
    }
}

pub fn as_string(value: &Value) -> String {
    match value {
        Value::Str(s) => s.to_string(),
        other => panic!("expected string, got {}", other.type_name()),
    }
}

// ---------------------------------------------------------------------------
// Instrumented foreign values
// ---------------------------------------------------------------------------

/// An iterable that declares no safety at all and counts how often an
/// iterator was requested.
pub struct UnsafeIterable {
    pub pulls: Cell<u32>,
}

impl UnsafeIterable {
    pub fn value() -> (Rc<UnsafeIterable>, Value) {
        let source = Rc::new(UnsafeIterable {
            pulls: Cell::new(0),
        });
        (Rc::clone(&source), Value::Foreign(source))
    }
}

impl ForeignValue for UnsafeIterable {
    fn type_name(&self) -> &'static str {
        "unsafe_iterable"
    }
    fn safety(&self) -> SafetyFlags {
        SafetyFlags::NOT_SAFE
    }
    fn iterate(self: Rc<Self>) -> Option<Box<dyn ForeignIter>> {
        self.pulls.set(self.pulls.get() + 1);
        Some(Box::new(EndlessNones))
    }
}

struct EndlessNones;

impl ForeignIter for EndlessNones {
    fn next(&mut self, _thread: &Thread) -> Result<Option<Value>> {
        Ok(Some(Value::None))
    }
}

/// An endless safe iterable whose every element costs a fixed number
/// of allocation bytes; counts elements actually produced.
pub struct AllocatingIterable {
    pub per_element: i64,
    pub produced: Rc<Cell<u32>>,
}

impl AllocatingIterable {
    pub fn value(per_element: i64) -> (Rc<Cell<u32>>, Value) {
        let produced = Rc::new(Cell::new(0));
        let source = Rc::new(AllocatingIterable {
            per_element,
            produced: Rc::clone(&produced),
        });
        (produced, Value::Foreign(source))
    }
}

impl ForeignValue for AllocatingIterable {
    fn type_name(&self) -> &'static str {
        "allocating_iterable"
    }
    fn safety(&self) -> SafetyFlags {
        SafetyFlags::SAFE
    }
    fn iterate(self: Rc<Self>) -> Option<Box<dyn ForeignIter>> {
        Some(Box::new(AllocatingIter {
            per_element: self.per_element,
            produced: Rc::clone(&self.produced),
        }))
    }
}

struct AllocatingIter {
    per_element: i64,
    produced: Rc<Cell<u32>>,
}

impl ForeignIter for AllocatingIter {
    fn next(&mut self, thread: &Thread) -> Result<Option<Value>> {
        thread.add_allocs(self.per_element)?;
        self.produced.set(self.produced.get() + 1);
        Ok(Some(Value::int(1)))
    }
}

/// A value whose safe-string hook writes nothing but charges a fixed
/// number of steps.
pub struct ChargingWriter {
    pub steps: u64,
}

impl ForeignValue for ChargingWriter {
    fn type_name(&self) -> &'static str {
        "charging_writer"
    }
    fn safety(&self) -> SafetyFlags {
        SafetyFlags::SAFE
    }
    fn safe_string(&self, thread: &Thread, _out: &mut SafeStringBuilder<'_>) -> Result<()> {
        thread.add_steps(self.steps)
    }
}
