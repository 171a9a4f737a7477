//! lark-safety - Resource Accounting and Sandboxing State
//!
//! This crate holds the per-thread side of the safety model: the
//! accountant that meters execution steps and allocations against
//! caller-supplied budgets, the thread object that carries the
//! accountant together with a monotonic capability requirement, the
//! cancellation plumbing, and the reserve-before-grow buffer wrappers
//! every output-producing operation routes through.
//!
//! Nothing here knows what a value is; the value and library layers
//! charge their work through [`Thread`] and fail fast when the budget
//! or the capability check refuses.

pub mod accountant;
pub mod buffers;
pub mod config;
pub mod context;
pub mod thread;

pub use accountant::Accountant;
pub use buffers::{SafeStringBuilder, SafeVec};
pub use config::BudgetConfig;
pub use context::CancelContext;
pub use thread::{PrintHook, Thread};

// Re-exported so downstream crates take their foundation types from
// one place.
pub use lark_util::{ErrorKind, EvalError, Result, SafetyFlags};
