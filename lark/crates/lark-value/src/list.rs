//! Lists.
//!
//! A list is a growable sequence behind a `RefCell`, gated by the
//! container state machine: mutation is refused while frozen or while
//! an iterator is live. Tuples need no wrapper (an `Rc<[Value]>` is
//! born frozen), so this module only houses the mutable flavour.

use std::cell::{Ref, RefCell, RefMut};

use lark_util::Result;

use crate::state::ContainerState;
use crate::value::Value;

pub struct List {
    state: ContainerState,
    items: RefCell<Vec<Value>>,
}

impl List {
    pub fn new() -> List {
        List::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> List {
        List {
            state: ContainerState::new(),
            items: RefCell::new(items),
        }
    }

    pub fn state(&self) -> &ContainerState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// Read access to the backing vector.
    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    /// Write access, refused while frozen or iterated.
    pub fn items_mut(&self) -> Result<RefMut<'_, Vec<Value>>> {
        self.state.check_mutable("list")?;
        Ok(self.items.borrow_mut())
    }

    /// A shallow copy of the current contents.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

impl Default for List {
    fn default() -> Self {
        List::new()
    }
}
