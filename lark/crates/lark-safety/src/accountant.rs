//! The resource accountant.
//!
//! Per-thread counters for execution steps and live allocations, with
//! caller-supplied limits. All counters are atomics: there is exactly
//! one logical mutator (the evaluating thread), but an external
//! supervisor may poll the counters concurrently, so every access
//! must be race-free. Step counts are monotonic; allocation counts
//! move both ways and carry a monotonic high-water mark.
//!
//! Exhaustion is sticky. Once a charge has been refused, every later
//! safety-checked operation on the same accountant fails with the
//! same error, including `add_steps(0)`. Explicit cancellation
//! overrides accounting entirely and fails every operation with
//! [`lark_util::ErrorKind::Cancelled`].

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicU8, Ordering};

use parking_lot::Mutex;

use lark_util::{EvalError, Result, SafetyFlags};

/// Step and allocation meters for one logical evaluation thread.
///
/// # Examples
///
/// ```
/// use lark_safety::{Accountant, SafetyFlags};
///
/// let acct = Accountant::new(10, u64::MAX, SafetyFlags::CPU);
/// assert!(acct.add_steps(10).is_ok());
/// assert!(acct.add_steps(1).is_err());
/// // Sticky: even a zero-step charge now fails.
/// assert!(acct.add_steps(0).is_err());
/// assert_eq!(acct.steps(), 11);
/// ```
pub struct Accountant {
    /// Steps consumed so far. Monotonic; never rolled back, even by
    /// the charge that overflows the budget.
    steps: AtomicU64,
    /// Net live allocation bytes. Releases may not drive this below
    /// zero.
    allocs: AtomicI64,
    /// High-water mark of `allocs`.
    peak_allocs: AtomicI64,
    max_steps: u64,
    max_allocs: u64,
    /// The thread's current requirement, as raw flag bits. Grows
    /// monotonically through [`Accountant::require`].
    required: AtomicU8,
    /// Raw flag bits of the first exhausted resource, 0 while healthy.
    exhausted: AtomicU8,
    cancelled: AtomicBool,
    /// First cancellation reason wins; later calls are ignored.
    cancel_reason: Mutex<Option<String>>,
}

impl Accountant {
    /// Creates an accountant with the given limits and initial
    /// requirement. `u64::MAX` for either limit means unmetered.
    pub fn new(max_steps: u64, max_allocs: u64, required: SafetyFlags) -> Accountant {
        Accountant {
            steps: AtomicU64::new(0),
            allocs: AtomicI64::new(0),
            peak_allocs: AtomicI64::new(0),
            max_steps,
            max_allocs,
            required: AtomicU8::new(required.bits()),
            exhausted: AtomicU8::new(0),
            cancelled: AtomicBool::new(false),
            cancel_reason: Mutex::new(None),
        }
    }

    /// An accountant with no limits and no requirement; charges always
    /// succeed until cancelled.
    pub fn unlimited() -> Accountant {
        Accountant::new(u64::MAX, u64::MAX, SafetyFlags::NOT_SAFE)
    }

    /// Steps consumed so far. Non-decreasing.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// Net live allocation bytes.
    pub fn allocs(&self) -> i64 {
        self.allocs.load(Ordering::Relaxed)
    }

    /// Highest value `allocs` has reached.
    pub fn peak_allocs(&self) -> i64 {
        self.peak_allocs.load(Ordering::Relaxed)
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps
    }

    pub fn max_allocs(&self) -> u64 {
        self.max_allocs
    }

    /// The thread requirement this accountant enforces.
    pub fn required(&self) -> SafetyFlags {
        SafetyFlags::from_bits_truncate(self.required.load(Ordering::Relaxed))
    }

    /// Unions `flags` into the requirement. Monotonic: bits are never
    /// cleared, so an outer frame cannot weaken what an inner frame
    /// was promised.
    pub fn require(&self, flags: SafetyFlags) {
        self.required.fetch_or(flags.bits(), Ordering::Relaxed);
    }

    /// Marks the accountant cancelled. The first reason is kept;
    /// subsequent calls do not replace it. Cancellation out-ranks
    /// exhaustion in every later charge.
    pub fn cancel(&self, reason: &str) {
        let mut slot = self.cancel_reason.lock();
        if slot.is_none() {
            log::debug!("evaluation cancelled: {}", reason);
            *slot = Some(reason.to_owned());
        }
        drop(slot);
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The sticky failure, if any: cancellation first, then the first
    /// exhausted resource.
    pub fn sticky_error(&self) -> Option<EvalError> {
        if self.is_cancelled() {
            let reason = self.cancel_reason.lock();
            return Some(EvalError::cancelled(
                reason.as_deref().unwrap_or("cancelled"),
            ));
        }
        let bits = self.exhausted.load(Ordering::Relaxed);
        if bits != 0 {
            let resource = SafetyFlags::from_bits_truncate(bits);
            let (used, limit) = if resource == SafetyFlags::CPU {
                (self.steps(), self.max_steps)
            } else {
                (self.allocs().max(0) as u64, self.max_allocs)
            };
            return Some(EvalError::exhausted(resource, used, limit));
        }
        None
    }

    fn mark_exhausted(&self, resource: SafetyFlags) {
        // First failure wins; a concurrent reader must never see the
        // recorded resource change.
        let _ = self.exhausted.compare_exchange(
            0,
            resource.bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
        log::debug!(
            "budget exhausted ({}): steps={} allocs={}",
            resource,
            self.steps(),
            self.allocs()
        );
    }

    /// Charges `n` steps. The increment is never rolled back: the
    /// caller that observes the overflow is the one that fails, and
    /// the recorded count keeps the overshoot.
    pub fn add_steps(&self, n: u64) -> Result<()> {
        if let Some(err) = self.sticky_error() {
            return Err(err);
        }
        let now = self.steps.fetch_add(n, Ordering::Relaxed).saturating_add(n);
        if now > self.max_steps && self.required().contains(SafetyFlags::CPU) {
            self.mark_exhausted(SafetyFlags::CPU);
            return Err(EvalError::exhausted(SafetyFlags::CPU, now, self.max_steps));
        }
        Ok(())
    }

    /// Returns the decision `add_steps(n)` would make, without
    /// mutating any counter.
    pub fn check_steps(&self, n: u64) -> Result<()> {
        if let Some(err) = self.sticky_error() {
            return Err(err);
        }
        let would = self.steps().saturating_add(n);
        if would > self.max_steps && self.required().contains(SafetyFlags::CPU) {
            return Err(EvalError::exhausted(
                SafetyFlags::CPU,
                would,
                self.max_steps,
            ));
        }
        Ok(())
    }

    /// Charges `n` allocation bytes. Negative deltas are releases:
    /// they always succeed and may not drive the counter below zero.
    pub fn add_allocs(&self, n: i64) -> Result<()> {
        if n <= 0 {
            // Releases are accepted even after exhaustion so that
            // unwinding code can hand memory back.
            let _ = self
                .allocs
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                    Some((cur + n).max(0))
                });
            return Ok(());
        }
        if let Some(err) = self.sticky_error() {
            return Err(err);
        }
        let now = self.allocs.fetch_add(n, Ordering::Relaxed) + n;
        self.peak_allocs.fetch_max(now, Ordering::Relaxed);
        if now as u64 > self.max_allocs && self.required().contains(SafetyFlags::MEMORY) {
            self.mark_exhausted(SafetyFlags::MEMORY);
            return Err(EvalError::exhausted(
                SafetyFlags::MEMORY,
                now as u64,
                self.max_allocs,
            ));
        }
        Ok(())
    }

    /// Returns the decision `add_allocs(n)` would make, without
    /// mutating any counter.
    pub fn check_allocs(&self, n: i64) -> Result<()> {
        if n <= 0 {
            return Ok(());
        }
        if let Some(err) = self.sticky_error() {
            return Err(err);
        }
        let would = self.allocs().max(0) + n;
        if would as u64 > self.max_allocs && self.required().contains(SafetyFlags::MEMORY) {
            return Err(EvalError::exhausted(
                SafetyFlags::MEMORY,
                would as u64,
                self.max_allocs,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lark_util::ErrorKind;

    #[test]
    fn test_add_steps_within_budget() {
        let acct = Accountant::new(100, u64::MAX, SafetyFlags::CPU);
        for _ in 0..100 {
            acct.add_steps(1).unwrap();
        }
        assert_eq!(acct.steps(), 100);
    }

    #[test]
    fn test_add_steps_overflow_is_not_rolled_back() {
        let acct = Accountant::new(10, u64::MAX, SafetyFlags::CPU);
        assert!(acct.add_steps(7).is_ok());
        let err = acct.add_steps(7).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Safety);
        assert_eq!(err.missing_flags(), SafetyFlags::CPU);
        assert_eq!(acct.steps(), 14);
    }

    #[test]
    fn test_exhaustion_is_sticky() {
        let acct = Accountant::new(10, u64::MAX, SafetyFlags::CPU);
        assert!(acct.add_steps(11).is_err());
        assert!(acct.add_steps(0).is_err());
        assert!(acct.check_steps(0).is_err());
        assert!(acct.add_allocs(1).is_err());
    }

    #[test]
    fn test_steps_unmetered_without_cpu_flag() {
        let acct = Accountant::new(10, u64::MAX, SafetyFlags::MEMORY);
        assert!(acct.add_steps(1000).is_ok());
        assert_eq!(acct.steps(), 1000);
    }

    #[test]
    fn test_requirement_applies_retroactively() {
        let acct = Accountant::new(10, u64::MAX, SafetyFlags::NOT_SAFE);
        assert!(acct.add_steps(50).is_ok());
        acct.require(SafetyFlags::CPU);
        assert!(acct.add_steps(1).is_err());
    }

    #[test]
    fn test_require_is_monotonic_union() {
        let acct = Accountant::unlimited();
        acct.require(SafetyFlags::CPU);
        acct.require(SafetyFlags::MEMORY);
        assert_eq!(acct.required(), SafetyFlags::CPU | SafetyFlags::MEMORY);
        // A second require never clears bits.
        acct.require(SafetyFlags::NOT_SAFE);
        assert_eq!(acct.required(), SafetyFlags::CPU | SafetyFlags::MEMORY);
    }

    #[test]
    fn test_check_steps_does_not_mutate() {
        let acct = Accountant::new(10, u64::MAX, SafetyFlags::CPU);
        assert!(acct.check_steps(11).is_err());
        assert_eq!(acct.steps(), 0);
        assert!(acct.add_steps(10).is_ok());
    }

    #[test]
    fn test_allocs_release_never_fails() {
        let acct = Accountant::new(u64::MAX, 100, SafetyFlags::MEMORY);
        assert!(acct.add_allocs(100).is_ok());
        assert!(acct.add_allocs(-40).is_ok());
        assert_eq!(acct.allocs(), 60);
        assert_eq!(acct.peak_allocs(), 100);
    }

    #[test]
    fn test_allocs_never_underflow() {
        let acct = Accountant::unlimited();
        acct.add_allocs(5).unwrap();
        acct.add_allocs(-50).unwrap();
        assert_eq!(acct.allocs(), 0);
    }

    #[test]
    fn test_alloc_overflow() {
        let acct = Accountant::new(u64::MAX, 64, SafetyFlags::MEMORY);
        assert!(acct.add_allocs(64).is_ok());
        let err = acct.add_allocs(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Safety);
        assert_eq!(err.missing_flags(), SafetyFlags::MEMORY);
    }

    #[test]
    fn test_release_accepted_after_exhaustion() {
        let acct = Accountant::new(u64::MAX, 64, SafetyFlags::MEMORY);
        assert!(acct.add_allocs(100).is_err());
        assert!(acct.add_allocs(-100).is_ok());
        // Still sticky for positive charges.
        assert!(acct.add_allocs(1).is_err());
    }

    #[test]
    fn test_cancel_overrides_accounting() {
        let acct = Accountant::unlimited();
        acct.cancel("supervisor said stop");
        let err = acct.add_steps(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.message().contains("supervisor said stop"));
    }

    #[test]
    fn test_first_cancel_reason_wins() {
        let acct = Accountant::unlimited();
        acct.cancel("first");
        acct.cancel("second");
        let err = acct.add_steps(1).unwrap_err();
        assert!(err.message().contains("first"));
    }

    #[test]
    fn test_cancel_outranks_exhaustion() {
        let acct = Accountant::new(10, u64::MAX, SafetyFlags::CPU);
        assert!(acct.add_steps(11).is_err());
        acct.cancel("stop");
        assert_eq!(
            acct.add_steps(0).unwrap_err().kind(),
            ErrorKind::Cancelled
        );
    }
}
