//! Mutable-container state machine.
//!
//! Every mutable container (list, dict, set) carries one of these.
//! The states are Unfrozen-idle, Unfrozen-iterating(k) for k live
//! iterators, and Frozen (terminal). Mutation is refused while frozen
//! or while any iterator is live; iteration is permitted in every
//! state.

use std::cell::Cell;

use lark_util::{EvalError, Result};

/// Freeze bit plus live-iterator counter.
pub struct ContainerState {
    frozen: Cell<bool>,
    iterators: Cell<u32>,
}

impl ContainerState {
    pub fn new() -> ContainerState {
        ContainerState {
            frozen: Cell::new(false),
            iterators: Cell::new(0),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    /// Marks the container frozen. Idempotent; Frozen is terminal.
    ///
    /// Returns `true` if this call did the freezing, `false` if the
    /// container was already frozen. Callers use the return value to
    /// stop transitive freezes from re-walking cycles.
    pub fn freeze(&self) -> bool {
        if self.frozen.get() {
            false
        } else {
            self.frozen.set(true);
            true
        }
    }

    pub fn live_iterators(&self) -> u32 {
        self.iterators.get()
    }

    /// Registers a live iterator. Nested iteration stacks.
    pub fn begin_iter(&self) {
        self.iterators.set(self.iterators.get() + 1);
    }

    /// Releases one live iterator. Runs on every iterator exit path.
    pub fn end_iter(&self) {
        let n = self.iterators.get();
        debug_assert!(n > 0, "end_iter without begin_iter");
        self.iterators.set(n.saturating_sub(1));
    }

    /// Refuses mutation in Frozen or Unfrozen-iterating states.
    /// `container` names the receiver type for the error message.
    pub fn check_mutable(&self, container: &str) -> Result<()> {
        if self.frozen.get() {
            return Err(EvalError::frozen(container));
        }
        if self.iterators.get() > 0 {
            return Err(EvalError::concurrent_mutation(container));
        }
        Ok(())
    }
}

impl Default for ContainerState {
    fn default() -> Self {
        ContainerState::new()
    }
}
