//! Safety flags - the capability bitset.
//!
//! A thread declares a *required* set of sandbox guarantees; every
//! collaborator (builtin, method, iterator, foreign value) declares a
//! *provided* set. The engine refuses to invoke a collaborator whose
//! provided set does not cover the requirement. The check is always
//! `required ⊆ provided`.

use std::fmt;
use std::str::FromStr;

use crate::error::EvalError;

bitflags::bitflags! {
    /// Sandbox guarantees a collaborator provides (or a thread requires).
    ///
    /// The bit names describe what the collaborator keeps bounded:
    ///
    /// - `CPU`: execution steps are charged in proportion to work done
    /// - `MEMORY`: allocations are charged before they are committed
    /// - `TIME`: wall-clock access is mediated
    /// - `IO`: no unmediated input/output
    ///
    /// # Examples
    ///
    /// ```
    /// use lark_util::SafetyFlags;
    ///
    /// let required = SafetyFlags::CPU | SafetyFlags::MEMORY;
    /// assert!(required.is_subset_of(SafetyFlags::SAFE));
    /// assert!(!required.is_subset_of(SafetyFlags::CPU));
    /// assert_eq!(required.to_string(), "CM");
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SafetyFlags: u8 {
        const CPU    = 1 << 0;
        const MEMORY = 1 << 1;
        const TIME   = 1 << 2;
        const IO     = 1 << 3;
    }
}

impl SafetyFlags {
    /// No guarantees at all. The conventional name for `empty()`.
    pub const NOT_SAFE: SafetyFlags = SafetyFlags::empty();

    /// Every guarantee. The conventional name for `all()`.
    pub const SAFE: SafetyFlags = SafetyFlags::all();

    /// Letter used for each flag in the compact text form.
    const LETTERS: [(SafetyFlags, char); 4] = [
        (SafetyFlags::CPU, 'C'),
        (SafetyFlags::MEMORY, 'M'),
        (SafetyFlags::TIME, 'T'),
        (SafetyFlags::IO, 'I'),
    ];

    /// True if every flag in `self` is also set in `other`.
    #[inline]
    pub fn is_subset_of(self, other: SafetyFlags) -> bool {
        other.contains(self)
    }

    /// Checks that `provided` covers `self` (the required set).
    ///
    /// On shortfall returns an error of kind [`crate::ErrorKind::Safety`]
    /// carrying exactly the missing flags, so callers can distinguish
    /// capability refusals from resource exhaustion.
    pub fn check_provided(self, provided: SafetyFlags) -> crate::Result<()> {
        if self.is_subset_of(provided) {
            Ok(())
        } else {
            Err(EvalError::safety(self.difference(provided)))
        }
    }
}

impl fmt::Display for SafetyFlags {
    /// Compact letter form: a subset of `CMTI`, or `-` for the empty set.
    /// Letters are emitted in canonical C, M, T, I order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for (flag, letter) in SafetyFlags::LETTERS {
            if self.contains(flag) {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

impl FromStr for SafetyFlags {
    type Err = EvalError;

    /// Parses the compact letter form. Order is irrelevant and
    /// duplicate letters are idempotent. `-` alone denotes the empty
    /// set. Unknown characters fail with [`crate::ErrorKind::Parse`].
    fn from_str(s: &str) -> crate::Result<SafetyFlags> {
        if s == "-" {
            return Ok(SafetyFlags::NOT_SAFE);
        }
        let mut flags = SafetyFlags::empty();
        for c in s.chars() {
            let flag = SafetyFlags::LETTERS
                .iter()
                .find(|(_, letter)| *letter == c)
                .map(|(flag, _)| *flag)
                .ok_or_else(|| {
                    EvalError::parse(format!("invalid safety flag character {:?} in {:?}", c, s))
                })?;
            flags |= flag;
        }
        Ok(flags)
    }
}
