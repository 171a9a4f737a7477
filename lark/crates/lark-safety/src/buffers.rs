//! Reserve-before-grow buffer wrappers.
//!
//! These are the only two places in the engine allowed to grow a
//! buffer. Every write first charges `new_capacity - old_capacity`
//! bytes to the thread; if the charge is refused the buffer is left
//! exactly as it was. Abandoning a buffer (drop without finishing)
//! releases everything it charged, so an aborted operation leaks no
//! accounting. Finishing releases the slack between capacity and
//! length and transfers a charge equal to the content length to the
//! caller.

use std::mem;

use lark_util::{EvalError, Result};

use crate::thread::Thread;

const MIN_STR_CAPACITY: usize = 16;
const MIN_VEC_CAPACITY: usize = 4;

/// Append-only string buffer with metered growth.
///
/// # Examples
///
/// ```
/// use lark_safety::{SafeStringBuilder, Thread};
///
/// let thread = Thread::new();
/// let mut b = SafeStringBuilder::new(&thread);
/// b.write_str("lark").unwrap();
/// b.write_char('!').unwrap();
/// assert_eq!(b.finish(), "lark!");
/// ```
pub struct SafeStringBuilder<'a> {
    thread: &'a Thread,
    buf: String,
    /// Capacity bytes currently charged to the accountant.
    charged: usize,
}

impl<'a> SafeStringBuilder<'a> {
    pub fn new(thread: &'a Thread) -> SafeStringBuilder<'a> {
        SafeStringBuilder {
            thread,
            buf: String::new(),
            charged: 0,
        }
    }

    /// Pre-reserves `capacity` bytes, charging them up front.
    pub fn with_capacity(thread: &'a Thread, capacity: usize) -> Result<SafeStringBuilder<'a>> {
        let mut builder = SafeStringBuilder::new(thread);
        builder.ensure(capacity)?;
        Ok(builder)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Makes room for `additional` more bytes, charging the capacity
    /// delta first. On refusal the buffer is unchanged.
    fn ensure(&mut self, additional: usize) -> Result<()> {
        let needed = self.buf.len() + additional;
        if needed <= self.charged {
            return Ok(());
        }
        let new_cap = needed.max(self.charged * 2).max(MIN_STR_CAPACITY);
        self.thread.add_allocs((new_cap - self.charged) as i64)?;
        self.buf.reserve_exact(new_cap - self.buf.len());
        self.charged = new_cap;
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.ensure(s.len())?;
        self.buf.push_str(s);
        Ok(())
    }

    pub fn write_char(&mut self, c: char) -> Result<()> {
        self.ensure(c.len_utf8())?;
        self.buf.push(c);
        Ok(())
    }

    /// Writes a single ASCII byte (delimiters, separators, digits).
    pub fn write_byte(&mut self, b: u8) -> Result<()> {
        if !b.is_ascii() {
            return Err(EvalError::internal(format!(
                "write_byte: non-ASCII byte {:#x}",
                b
            )));
        }
        self.write_char(b as char)
    }

    /// Finishes the buffer. The slack between capacity and content is
    /// released; the content's bytes stay charged and travel with the
    /// returned `String`.
    pub fn finish(mut self) -> String {
        let mut s = mem::take(&mut self.buf);
        s.shrink_to_fit();
        let slack = self.charged.saturating_sub(s.len());
        let _ = self.thread.add_allocs(-(slack as i64));
        self.charged = 0;
        s
    }
}

impl Drop for SafeStringBuilder<'_> {
    fn drop(&mut self) {
        if self.charged > 0 {
            let _ = self.thread.add_allocs(-(self.charged as i64));
        }
    }
}

/// Growable vector with metered growth; the element analogue of
/// [`SafeStringBuilder`].
pub struct SafeVec<'a, T> {
    thread: &'a Thread,
    vec: Vec<T>,
    /// Element capacity currently charged to the accountant.
    charged: usize,
}

impl<'a, T> SafeVec<'a, T> {
    pub fn new(thread: &'a Thread) -> SafeVec<'a, T> {
        SafeVec {
            thread,
            vec: Vec::new(),
            charged: 0,
        }
    }

    /// Pre-reserves room for `capacity` elements, charging up front.
    pub fn with_capacity(thread: &'a Thread, capacity: usize) -> Result<SafeVec<'a, T>> {
        let mut vec = SafeVec::new(thread);
        vec.reserve(capacity)?;
        Ok(vec)
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }

    fn elem_size() -> usize {
        mem::size_of::<T>()
    }

    /// Makes room for `additional` more elements, charging the
    /// capacity delta in bytes first. On refusal the vector is
    /// unchanged.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = self.vec.len() + additional;
        if needed <= self.charged {
            return Ok(());
        }
        let new_cap = needed.max(self.charged * 2).max(MIN_VEC_CAPACITY);
        let delta_bytes = (new_cap - self.charged) * Self::elem_size();
        self.thread.add_allocs(delta_bytes as i64)?;
        self.vec.reserve_exact(new_cap - self.vec.len());
        self.charged = new_cap;
        Ok(())
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        self.reserve(1)?;
        self.vec.push(value);
        Ok(())
    }

    /// Finishes the vector, releasing the capacity slack. The
    /// elements' bytes stay charged and travel with the returned
    /// `Vec`.
    pub fn into_inner(mut self) -> Vec<T> {
        let mut v = mem::take(&mut self.vec);
        v.shrink_to_fit();
        let slack = self.charged.saturating_sub(v.len()) * Self::elem_size();
        let _ = self.thread.add_allocs(-(slack as i64));
        self.charged = 0;
        v
    }
}

impl<T> Drop for SafeVec<'_, T> {
    fn drop(&mut self) {
        if self.charged > 0 {
            let bytes = self.charged * Self::elem_size();
            let _ = self.thread.add_allocs(-(bytes as i64));
        }
    }
}
