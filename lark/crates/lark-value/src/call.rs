//! The callable protocol.
//!
//! A [`NativeBuiltin`] is a named function pointer with a declared
//! safety set and an optional bound receiver (methods are builtins
//! bound to their value). The declared set is checked against the
//! thread's requirement on every call, before any argument is
//! touched.

use lark_safety::Thread;
use lark_util::{EvalError, Result, SafetyFlags};

use crate::value::Value;

/// Implementation signature shared by every builtin and method. The
/// second parameter is the bound receiver, `None` for free functions.
pub type NativeFn = fn(&Thread, Option<&Value>, &Arguments) -> Result<Value>;

#[derive(Clone)]
pub struct NativeBuiltin {
    name: &'static str,
    safety: SafetyFlags,
    f: NativeFn,
    recv: Option<Value>,
}

impl NativeBuiltin {
    pub fn new(name: &'static str, safety: SafetyFlags, f: NativeFn) -> NativeBuiltin {
        NativeBuiltin {
            name,
            safety,
            f,
            recv: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The safety this builtin provides.
    pub fn safety(&self) -> SafetyFlags {
        self.safety
    }

    pub fn receiver(&self) -> Option<&Value> {
        self.recv.as_ref()
    }

    /// A copy of this builtin bound to a method receiver.
    pub fn bind(&self, recv: Value) -> NativeBuiltin {
        NativeBuiltin {
            name: self.name,
            safety: self.safety,
            f: self.f,
            recv: Some(recv),
        }
    }

    /// Invokes the builtin. The safety check runs first, regardless
    /// of arguments; failures pick up a frame naming the builtin.
    pub fn call(&self, thread: &Thread, args: &Arguments) -> Result<Value> {
        thread
            .permits(self.safety)
            .map_err(|e| e.with_frame(self.name, None))?;
        (self.f)(thread, self.recv.as_ref(), args).map_err(|e| e.with_frame(self.name, None))
    }
}

/// Call arguments: positionals plus an ordered list of (name, value)
/// pairs. Order is preserved so duplicate names can be reported
/// deterministically.
pub struct Arguments {
    pos: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new(pos: Vec<Value>, named: Vec<(String, Value)>) -> Arguments {
        Arguments { pos, named }
    }

    pub fn positional(pos: Vec<Value>) -> Arguments {
        Arguments::new(pos, Vec::new())
    }

    pub fn empty() -> Arguments {
        Arguments::new(Vec::new(), Vec::new())
    }

    pub fn pos(&self) -> &[Value] {
        &self.pos
    }

    pub fn named(&self) -> &[(String, Value)] {
        &self.named
    }

    pub fn arg(&self, i: usize) -> Option<&Value> {
        self.pos.get(i)
    }

    /// The last binding wins lookup-wise, but duplicates should have
    /// been rejected by [`Arguments::check_no_duplicates`] first.
    pub fn named_lookup(&self, name: &str) -> Option<&Value> {
        self.named
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn check_no_duplicates(&self, fname: &str) -> Result<()> {
        for (i, (name, _)) in self.named.iter().enumerate() {
            if self.named[..i].iter().any(|(n, _)| n == name) {
                return Err(EvalError::arity(format!(
                    "{}: duplicate keyword argument {:?}",
                    fname, name
                )));
            }
        }
        Ok(())
    }

    pub fn check_no_named(&self, fname: &str) -> Result<()> {
        match self.named.first() {
            None => Ok(()),
            Some((name, _)) => Err(EvalError::arity(format!(
                "{}: unexpected keyword argument {:?}",
                fname, name
            ))),
        }
    }

    /// Only the names in `allowed` may appear, each at most once.
    pub fn check_named_among(&self, fname: &str, allowed: &[&str]) -> Result<()> {
        self.check_no_duplicates(fname)?;
        for (name, _) in &self.named {
            if !allowed.contains(&name.as_str()) {
                return Err(EvalError::arity(format!(
                    "{}: unexpected keyword argument {:?}",
                    fname, name
                )));
            }
        }
        Ok(())
    }

    /// Positional count must be within `min..=max`; `None` means
    /// unbounded.
    pub fn check_arity(&self, fname: &str, min: usize, max: Option<usize>) -> Result<()> {
        let n = self.pos.len();
        let ok = n >= min && max.map_or(true, |max| n <= max);
        if ok {
            return Ok(());
        }
        let want = match (min, max) {
            (min, Some(max)) if min == max => format!("exactly {}", min),
            (min, Some(max)) => format!("{} to {}", min, max),
            (min, None) => format!("at least {}", min),
        };
        Err(EvalError::arity(format!(
            "{}: got {} positional arguments, want {}",
            fname, n, want
        )))
    }
}
