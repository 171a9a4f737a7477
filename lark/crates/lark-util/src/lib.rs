//! lark-util - Foundation Types for the Lark Engine
//!
//! This crate holds the types every other engine crate builds on: the
//! safety-flag capability bitset and the engine-wide error taxonomy.
//! It deliberately knows nothing about values, threads, or budgets so
//! that the higher layers can depend on it without cycles.

pub mod error;
pub mod flags;

pub use error::{ErrorKind, EvalError, Frame, Pos, Result};
pub use flags::SafetyFlags;
