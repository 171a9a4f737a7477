//! Parent cancellation contexts.
//!
//! A thread may be attached to an external context; cancelling the
//! context cancels the thread at its next charging point. Attachment
//! is replace-only: a new attach supersedes the old parent, and there
//! is no detach. Detaching (by attaching elsewhere) does not
//! un-cancel a thread that already observed the old parent's
//! cancellation.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// A cancellation source shared between a supervisor and any number
/// of threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lark_safety::CancelContext;
///
/// let ctx = Arc::new(CancelContext::new());
/// assert!(ctx.cancelled_reason().is_none());
/// ctx.cancel("deadline passed");
/// assert_eq!(ctx.cancelled_reason().as_deref(), Some("deadline passed"));
/// ```
pub struct CancelContext {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl CancelContext {
    pub fn new() -> CancelContext {
        CancelContext {
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
        }
    }

    /// Cancels every attached thread at its next charging point. The
    /// first reason wins.
    pub fn cancel(&self, reason: &str) {
        let mut slot = self.reason.lock();
        if slot.is_none() {
            *slot = Some(reason.to_owned());
        }
        drop(slot);
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The reason this context was cancelled with, if it has been.
    pub fn cancelled_reason(&self) -> Option<String> {
        if self.is_cancelled() {
            Some(
                self.reason
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "cancelled".to_owned()),
            )
        } else {
            None
        }
    }
}

impl Default for CancelContext {
    fn default() -> Self {
        CancelContext::new()
    }
}
