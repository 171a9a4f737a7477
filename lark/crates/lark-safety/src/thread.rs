//! The evaluation thread.
//!
//! A `Thread` is the handle the interpreter loop passes to every
//! builtin and value operation: it owns the accountant, the monotonic
//! safety requirement, the optional parent cancellation context, and
//! the print hook. A thread belongs to one logical evaluation; it is
//! deliberately `!Sync`. Supervisors that want to poll or cancel from
//! another OS thread take the [`Arc<Accountant>`] handle or a shared
//! [`CancelContext`] instead.

use std::cell::RefCell;
use std::sync::Arc;

use lark_util::{Result, SafetyFlags};

use crate::accountant::Accountant;
use crate::context::CancelContext;

/// Callback invoked by the `print` builtin (and the `fail` diagnostic
/// path) with the fully stringified, fully charged message. The hook
/// may itself charge the thread and refuse.
pub type PrintHook = Box<dyn Fn(&Thread, &str) -> Result<()>>;

/// Per-evaluation state: accountant, requirement, parent context,
/// print hook.
///
/// # Examples
///
/// ```
/// use lark_safety::{SafetyFlags, Thread};
///
/// let thread = Thread::with_limits(1_000, 4_096);
/// thread.require_safety(SafetyFlags::CPU | SafetyFlags::MEMORY);
/// thread.add_steps(3).unwrap();
/// assert_eq!(thread.accountant().steps(), 3);
/// ```
pub struct Thread {
    accountant: Arc<Accountant>,
    context: RefCell<Option<Arc<CancelContext>>>,
    print_hook: RefCell<Option<PrintHook>>,
}

impl Thread {
    /// A thread with no limits and no requirement.
    pub fn new() -> Thread {
        Thread::from_accountant(Accountant::unlimited())
    }

    /// A thread metering steps and allocation bytes against the given
    /// limits. Flags still have to be required before the limits are
    /// enforced.
    pub fn with_limits(max_steps: u64, max_allocs: u64) -> Thread {
        Thread::from_accountant(Accountant::new(max_steps, max_allocs, SafetyFlags::NOT_SAFE))
    }

    pub fn from_accountant(accountant: Accountant) -> Thread {
        Thread {
            accountant: Arc::new(accountant),
            context: RefCell::new(None),
            print_hook: RefCell::new(None),
        }
    }

    /// The accountant, for in-thread inspection.
    pub fn accountant(&self) -> &Accountant {
        &self.accountant
    }

    /// A shareable handle to the accountant, for supervisors polling
    /// from other OS threads.
    pub fn accountant_handle(&self) -> Arc<Accountant> {
        Arc::clone(&self.accountant)
    }

    /// Unions `flags` into this thread's requirement. Monotonic; bits
    /// are never cleared.
    pub fn require_safety(&self, flags: SafetyFlags) {
        self.accountant.require(flags);
    }

    /// The current requirement.
    pub fn required_safety(&self) -> SafetyFlags {
        self.accountant.required()
    }

    /// Checks a collaborator's declared safety against this thread's
    /// requirement.
    pub fn permits(&self, provided: SafetyFlags) -> Result<()> {
        self.required_safety().check_provided(provided)
    }

    /// Attaches (or replaces) the parent context. Cancellation of the
    /// parent cancels this thread at its next charging point; a
    /// replacement does not un-cancel.
    pub fn attach_context(&self, context: Arc<CancelContext>) {
        *self.context.borrow_mut() = Some(context);
    }

    /// The currently attached parent context, if any.
    pub fn context(&self) -> Option<Arc<CancelContext>> {
        self.context.borrow().clone()
    }

    /// Cancels this thread directly.
    pub fn cancel(&self, reason: &str) {
        self.accountant.cancel(reason);
    }

    fn poll_context(&self) {
        let cancelled = self
            .context
            .borrow()
            .as_ref()
            .and_then(|ctx| ctx.cancelled_reason());
        if let Some(reason) = cancelled {
            self.accountant.cancel(&reason);
        }
    }

    /// Charges `n` steps, honouring parent-context cancellation first.
    pub fn add_steps(&self, n: u64) -> Result<()> {
        self.poll_context();
        self.accountant.add_steps(n)
    }

    /// The decision `add_steps(n)` would make, without mutating.
    pub fn check_steps(&self, n: u64) -> Result<()> {
        self.poll_context();
        self.accountant.check_steps(n)
    }

    /// Charges `n` allocation bytes (negative releases).
    pub fn add_allocs(&self, n: i64) -> Result<()> {
        self.poll_context();
        self.accountant.add_allocs(n)
    }

    /// The decision `add_allocs(n)` would make, without mutating.
    pub fn check_allocs(&self, n: i64) -> Result<()> {
        self.poll_context();
        self.accountant.check_allocs(n)
    }

    /// Installs the print hook, replacing any previous one.
    pub fn set_print_hook(&self, hook: PrintHook) {
        *self.print_hook.borrow_mut() = Some(hook);
    }

    /// Delivers a diagnostic message through the hook. Without a hook
    /// the message goes to the `log` facade.
    ///
    /// Callers must finish (and charge) all stringification before
    /// invoking this, so a refusing hook still leaves the accounting
    /// consistent.
    pub fn print(&self, message: &str) -> Result<()> {
        let hook = self.print_hook.borrow();
        match hook.as_ref() {
            Some(hook) => hook(self, message),
            None => {
                log::info!("print: {}", message);
                Ok(())
            }
        }
    }
}

impl Default for Thread {
    fn default() -> Self {
        Thread::new()
    }
}
