//! Dicts.
//!
//! A thin shell over the shared ordered table (`crate::table`): the
//! shell owns the container state machine and the freeze discipline,
//! the table does the probing, ordering, and step/alloc charging.

use std::cell::{Ref, RefCell};

use lark_safety::Thread;
use lark_util::Result;

use crate::state::ContainerState;
use crate::table::Table;
use crate::value::Value;

pub struct Dict {
    state: ContainerState,
    table: RefCell<Table>,
}

impl Dict {
    pub fn new() -> Dict {
        Dict {
            state: ContainerState::new(),
            table: RefCell::new(Table::new()),
        }
    }

    pub fn state(&self) -> &ContainerState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn table(&self) -> Ref<'_, Table> {
        self.table.borrow()
    }

    /// Transitive freeze of the dict, its keys, and its values.
    pub fn freeze(&self) {
        if self.state.freeze() {
            for (key, value) in self.table.borrow().items_vec() {
                key.freeze();
                value.freeze();
            }
        }
    }

    pub fn get(&self, thread: &Thread, key: &Value) -> Result<Option<Value>> {
        let hash = key.hash_value()?;
        self.table.borrow().get(thread, hash, key)
    }

    pub fn contains(&self, thread: &Thread, key: &Value) -> Result<bool> {
        let hash = key.hash_value()?;
        self.table.borrow().contains(thread, hash, key)
    }

    /// Inserts or replaces, returning the old value if any.
    pub fn insert(&self, thread: &Thread, key: Value, value: Value) -> Result<Option<Value>> {
        self.state.check_mutable("dict")?;
        let hash = key.hash_value()?;
        self.table.borrow_mut().insert(thread, hash, key, value)
    }

    pub fn remove(&self, thread: &Thread, key: &Value) -> Result<Option<Value>> {
        self.state.check_mutable("dict")?;
        let hash = key.hash_value()?;
        self.table.borrow_mut().remove(thread, hash, key)
    }

    /// Removes and returns the oldest entry.
    pub fn pop_oldest(&self, thread: &Thread) -> Result<Option<(Value, Value)>> {
        self.state.check_mutable("dict")?;
        self.table.borrow_mut().pop_oldest(thread)
    }

    pub fn clear(&self, thread: &Thread) -> Result<()> {
        self.state.check_mutable("dict")?;
        self.table.borrow_mut().clear(thread)
    }

    pub fn keys_vec(&self) -> Vec<Value> {
        self.table.borrow().keys_vec()
    }

    pub fn items_vec(&self) -> Vec<(Value, Value)> {
        self.table.borrow().items_vec()
    }

    /// Structural equality: same length, same value under every key.
    /// Uncharged; the `==` operator meters before calling in.
    pub fn equals(&self, other: &Dict) -> bool {
        let (a, b) = (self.table.borrow(), other.table.borrow());
        if a.len() != b.len() {
            return false;
        }
        let mut cursor = a.head_index();
        while let Some(idx) = cursor {
            let (key, value) = a.entry(idx);
            let hash = match key.hash_value() {
                Ok(h) => h,
                Err(_) => return false,
            };
            match b.get_uncharged(hash, key) {
                Some(theirs) if value.equals(theirs) => {}
                _ => return false,
            }
            cursor = a.next_index(idx);
        }
        true
    }
}

impl Default for Dict {
    fn default() -> Self {
        Dict::new()
    }
}
