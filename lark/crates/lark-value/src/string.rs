//! Lazy per-element views over strings and bytes.
//!
//! Strings are immutable UTF-8 with byte-indexed operations by
//! default. Four views expose their elements: `elems` walks bytes and
//! `codepoints` walks runes, each in a value flavour and an ordinal
//! flavour. Bytes get the symmetric two. A view holds the backing
//! storage alive; the size estimator books that storage to the
//! parent, not to the view.
//!
//! Because engine strings are guaranteed UTF-8, the value flavour of
//! a byte-level element is a one-byte `bytes`, not a string: a lone
//! continuation byte is not a valid string here.

use std::rc::Rc;

/// Which elements a view yields.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ViewMode {
    /// One-byte `bytes` values.
    Elems,
    /// Byte values as ints.
    ElemOrds,
    /// One-character strings. Strings only.
    Codepoints,
    /// Code points as ints. Strings only.
    CodepointOrds,
}

pub(crate) enum ViewBase {
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
}

/// A lazy iterable view (`"ab".elems()`, `b"ab".elem_ords()`, ...).
pub struct SeqView {
    base: ViewBase,
    mode: ViewMode,
}

impl SeqView {
    pub fn over_str(s: Rc<str>, mode: ViewMode) -> SeqView {
        SeqView {
            base: ViewBase::Str(s),
            mode,
        }
    }

    /// Bytes support only the byte-level modes.
    pub fn over_bytes(b: Rc<[u8]>, mode: ViewMode) -> SeqView {
        debug_assert!(matches!(mode, ViewMode::Elems | ViewMode::ElemOrds));
        SeqView {
            base: ViewBase::Bytes(b),
            mode,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn type_name(&self) -> &'static str {
        match (&self.base, self.mode) {
            (ViewBase::Str(_), ViewMode::Elems) => "string.elems",
            (ViewBase::Str(_), ViewMode::ElemOrds) => "string.elem_ords",
            (ViewBase::Str(_), ViewMode::Codepoints) => "string.codepoints",
            (ViewBase::Str(_), ViewMode::CodepointOrds) => "string.codepoint_ords",
            (ViewBase::Bytes(_), ViewMode::Elems) => "bytes.elems",
            (ViewBase::Bytes(_), _) => "bytes.elem_ords",
        }
    }

    /// The raw bytes of the backing storage.
    pub(crate) fn bytes(&self) -> &[u8] {
        match &self.base {
            ViewBase::Str(s) => s.as_bytes(),
            ViewBase::Bytes(b) => b,
        }
    }

    /// The backing string, for codepoint modes.
    pub(crate) fn as_str(&self) -> Option<&str> {
        match &self.base {
            ViewBase::Str(s) => Some(s),
            ViewBase::Bytes(_) => None,
        }
    }

    pub fn base_is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Length when computable in constant time. Codepoint views need
    /// a decode pass, so they have none.
    pub fn constant_len(&self) -> Option<usize> {
        match self.mode {
            ViewMode::Elems | ViewMode::ElemOrds => Some(self.bytes().len()),
            ViewMode::Codepoints | ViewMode::CodepointOrds => None,
        }
    }

    pub fn equals(&self, other: &SeqView) -> bool {
        self.mode == other.mode
            && match (&self.base, &other.base) {
                (ViewBase::Str(a), ViewBase::Str(b)) => a == b,
                (ViewBase::Bytes(a), ViewBase::Bytes(b)) => a == b,
                _ => false,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        let s: Rc<str> = Rc::from("ab");
        assert_eq!(
            SeqView::over_str(Rc::clone(&s), ViewMode::Elems).type_name(),
            "string.elems"
        );
        assert_eq!(
            SeqView::over_str(Rc::clone(&s), ViewMode::CodepointOrds).type_name(),
            "string.codepoint_ords"
        );
        let b: Rc<[u8]> = Rc::from(&b"ab"[..]);
        assert_eq!(
            SeqView::over_bytes(b, ViewMode::ElemOrds).type_name(),
            "bytes.elem_ords"
        );
    }

    #[test]
    fn test_constant_len() {
        let s: Rc<str> = Rc::from("héllo"); // 6 bytes, 5 chars
        assert_eq!(
            SeqView::over_str(Rc::clone(&s), ViewMode::Elems).constant_len(),
            Some(6)
        );
        assert_eq!(
            SeqView::over_str(s, ViewMode::Codepoints).constant_len(),
            None
        );
    }

    #[test]
    fn test_equality() {
        let a = SeqView::over_str(Rc::from("x"), ViewMode::Elems);
        let b = SeqView::over_str(Rc::from("x"), ViewMode::Elems);
        let c = SeqView::over_str(Rc::from("x"), ViewMode::ElemOrds);
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }
}
