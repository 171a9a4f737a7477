//! Engine-wide error taxonomy.
//!
//! Every failure the engine can surface is classified into one of the
//! closed [`ErrorKind`]s. Callers dispatch on the kind, never on the
//! message text. Errors carry a stack of small call-site frames for
//! backtrace rendering; they never retain evaluated values, so
//! aborting a deep computation cannot pin a large object graph.

use std::fmt;

use thiserror::Error;

use crate::flags::SafetyFlags;

/// Classification of an evaluation failure.
///
/// The set of kinds is closed; adding a kind is a breaking change for
/// embedders that match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A capability shortfall or an exhausted step/allocation budget.
    Safety,
    /// Explicit cancellation through the thread or its parent context.
    Cancelled,
    /// Operands or arguments of an unsupported type.
    TypeMismatch,
    /// Wrong number, duplication, or naming of call arguments.
    Arity,
    /// A name that resolves to nothing (builtin, parameter, format field).
    NameLookup,
    /// A value outside the representable or permitted range.
    ValueOutOfRange,
    /// Mutation of a frozen container.
    Frozen,
    /// Mutation of a container with a live iterator.
    ConcurrentMutation,
    /// Attribute or method lookup that found nothing.
    NoSuchAttr,
    /// Malformed textual input (number literals, safety-flag strings).
    Parse,
    /// An engine bug surfaced instead of panicking.
    Internal,
    /// A failure raised by evaluated code via the `fail` builtin.
    User,
}

impl ErrorKind {
    /// Kinds that must never be swallowed by intermediate engine code;
    /// they propagate to the outermost caller.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Safety | ErrorKind::Cancelled)
    }
}

/// A single call-site record in an error backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Function or builtin name the failure passed through.
    pub name: String,
    /// Source position of the call site, when known.
    pub pos: Option<Pos>,
}

/// A source position. Line and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The error type surfaced by every fallible engine operation.
///
/// # Examples
///
/// ```
/// use lark_util::{ErrorKind, EvalError, SafetyFlags};
///
/// let err = EvalError::safety(SafetyFlags::MEMORY);
/// assert_eq!(err.kind(), ErrorKind::Safety);
/// assert_eq!(err.missing_flags(), SafetyFlags::MEMORY);
/// assert_eq!(err.to_string(), "missing safety flags: M");
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EvalError {
    kind: ErrorKind,
    message: String,
    /// Flags the failed check found missing. Empty unless `kind` is
    /// `Safety` and the failure was a capability shortfall (budget
    /// exhaustion reports the single exceeded resource instead).
    missing: SafetyFlags,
    frames: Vec<Frame>,
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EvalError>;

impl EvalError {
    fn new(kind: ErrorKind, message: String) -> EvalError {
        EvalError {
            kind,
            message,
            missing: SafetyFlags::NOT_SAFE,
            frames: Vec::new(),
        }
    }

    /// Capability shortfall: `missing` is `required − provided`.
    pub fn safety(missing: SafetyFlags) -> EvalError {
        let mut err = EvalError::new(
            ErrorKind::Safety,
            format!("missing safety flags: {}", missing),
        );
        err.missing = missing;
        err
    }

    /// Budget exhaustion for the named resource.
    ///
    /// Shares [`ErrorKind::Safety`] with capability shortfalls so a
    /// single match arm catches both, but the message names the
    /// exhausted counter.
    pub fn exhausted(resource: SafetyFlags, used: u64, limit: u64) -> EvalError {
        let mut err = EvalError::new(
            ErrorKind::Safety,
            format!(
                "{} budget exceeded: {} > {}",
                match resource {
                    SafetyFlags::CPU => "step",
                    SafetyFlags::MEMORY => "allocation",
                    _ => "resource",
                },
                used,
                limit
            ),
        );
        err.missing = resource;
        err
    }

    pub fn cancelled(reason: &str) -> EvalError {
        EvalError::new(ErrorKind::Cancelled, format!("cancelled: {}", reason))
    }

    pub fn type_mismatch(message: impl Into<String>) -> EvalError {
        EvalError::new(ErrorKind::TypeMismatch, message.into())
    }

    pub fn arity(message: impl Into<String>) -> EvalError {
        EvalError::new(ErrorKind::Arity, message.into())
    }

    pub fn name_lookup(message: impl Into<String>) -> EvalError {
        EvalError::new(ErrorKind::NameLookup, message.into())
    }

    pub fn value_out_of_range(message: impl Into<String>) -> EvalError {
        EvalError::new(ErrorKind::ValueOutOfRange, message.into())
    }

    pub fn frozen(container: &str) -> EvalError {
        EvalError::new(
            ErrorKind::Frozen,
            format!("cannot modify frozen {}", container),
        )
    }

    pub fn concurrent_mutation(container: &str) -> EvalError {
        EvalError::new(
            ErrorKind::ConcurrentMutation,
            format!("{} changed during iteration", container),
        )
    }

    pub fn no_such_attr(message: impl Into<String>) -> EvalError {
        EvalError::new(ErrorKind::NoSuchAttr, message.into())
    }

    pub fn parse(message: impl Into<String>) -> EvalError {
        EvalError::new(ErrorKind::Parse, message.into())
    }

    pub fn internal(message: impl Into<String>) -> EvalError {
        EvalError::new(ErrorKind::Internal, message.into())
    }

    pub fn user(message: impl Into<String>) -> EvalError {
        EvalError::new(ErrorKind::User, message.into())
    }

    /// The failure classification. Match on this, not on the message.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// For `Safety` errors, the flags the check found missing (or the
    /// exhausted resource). Empty for every other kind.
    pub fn missing_flags(&self) -> SafetyFlags {
        self.missing
    }

    /// Frames pushed while the error propagated, innermost first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Records a call site the error passed through.
    pub fn with_frame(mut self, name: impl Into<String>, pos: Option<Pos>) -> EvalError {
        self.frames.push(Frame {
            name: name.into(),
            pos,
        });
        self
    }

    /// Renders the frame stack plus the message, outermost frame first.
    pub fn render_backtrace(&self) -> String {
        let mut out = String::from("Traceback (most recent call last):\n");
        for frame in self.frames.iter().rev() {
            match frame.pos {
                Some(pos) => out.push_str(&format!("  {} (at {})\n", frame.name, pos)),
                None => out.push_str(&format!("  {}\n", frame.name)),
            }
        }
        out.push_str(&format!("error: {}", self.message));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_fatal() {
        assert!(ErrorKind::Safety.is_fatal());
        assert!(ErrorKind::Cancelled.is_fatal());
        assert!(!ErrorKind::TypeMismatch.is_fatal());
        assert!(!ErrorKind::Frozen.is_fatal());
    }

    #[test]
    fn test_safety_display() {
        let err = EvalError::safety(SafetyFlags::CPU | SafetyFlags::IO);
        assert_eq!(err.to_string(), "missing safety flags: CI");
    }

    #[test]
    fn test_exhausted_names_resource() {
        let err = EvalError::exhausted(SafetyFlags::CPU, 11, 10);
        assert_eq!(err.kind(), ErrorKind::Safety);
        assert_eq!(err.to_string(), "step budget exceeded: 11 > 10");
        assert_eq!(err.missing_flags(), SafetyFlags::CPU);
    }

    #[test]
    fn test_frozen_display() {
        let err = EvalError::frozen("list");
        assert_eq!(err.to_string(), "cannot modify frozen list");
        assert_eq!(err.kind(), ErrorKind::Frozen);
    }

    #[test]
    fn test_concurrent_mutation_display() {
        let err = EvalError::concurrent_mutation("dict");
        assert_eq!(err.to_string(), "dict changed during iteration");
    }

    #[test]
    fn test_frames_accumulate() {
        let err = EvalError::type_mismatch("unsupported operands")
            .with_frame("sorted", Some(Pos { line: 3, col: 7 }))
            .with_frame("<module>", None);
        assert_eq!(err.frames().len(), 2);
        assert_eq!(err.frames()[0].name, "sorted");
    }

    #[test]
    fn test_render_backtrace() {
        let err = EvalError::arity("got 3 arguments, want 2")
            .with_frame("zip", Some(Pos { line: 1, col: 5 }))
            .with_frame("<module>", None);
        let text = err.render_backtrace();
        assert!(text.starts_with("Traceback"));
        // Outermost frame renders first.
        let module_at = text.find("<module>").unwrap();
        let zip_at = text.find("zip").unwrap();
        assert!(module_at < zip_at);
        assert!(text.ends_with("error: got 3 arguments, want 2"));
    }

    #[test]
    fn test_errors_are_small_and_cloneable() {
        let err = EvalError::value_out_of_range("chr() arg out of range");
        let clone = err.clone();
        assert_eq!(clone.kind(), ErrorKind::ValueOutOfRange);
    }
}
