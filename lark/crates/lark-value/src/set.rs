//! Sets.
//!
//! The same ordered table as dict, with every value slot pinned to
//! `None`. Iteration order is insertion order, and the relational
//! operations (union, intersection, difference) are built by the
//! operator and method layers on top of `insert`/`contains`.

use std::cell::{Ref, RefCell};

use lark_safety::Thread;
use lark_util::Result;

use crate::state::ContainerState;
use crate::table::Table;
use crate::value::Value;

pub struct Set {
    state: ContainerState,
    table: RefCell<Table>,
}

impl Set {
    pub fn new() -> Set {
        Set {
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

    /// Transitive freeze of the set and its members.
    pub fn freeze(&self) {
        if self.state.freeze() {
            for member in self.table.borrow().keys_vec() {
                member.freeze();
            }
        }
    }

    pub fn contains(&self, thread: &Thread, member: &Value) -> Result<bool> {
        let hash = member.hash_value()?;
        self.table.borrow().contains(thread, hash, member)
    }

    /// Adds a member. Returns true if it was new.
    pub fn insert(&self, thread: &Thread, member: Value) -> Result<bool> {
        self.state.check_mutable("set")?;
        let hash = member.hash_value()?;
        Ok(self
            .table
            .borrow_mut()
            .insert(thread, hash, member, Value::None)?
            .is_none())
    }

    /// Removes a member. Returns true if it was present.
    pub fn remove(&self, thread: &Thread, member: &Value) -> Result<bool> {
        self.state.check_mutable("set")?;
        let hash = member.hash_value()?;
        Ok(self
            .table
            .borrow_mut()
            .remove(thread, hash, member)?
            .is_some())
    }

    /// Removes and returns the oldest member.
    pub fn pop_oldest(&self, thread: &Thread) -> Result<Option<Value>> {
        self.state.check_mutable("set")?;
        Ok(self
            .table
            .borrow_mut()
            .pop_oldest(thread)?
            .map(|(member, _)| member))
    }

    pub fn clear(&self, thread: &Thread) -> Result<()> {
        self.state.check_mutable("set")?;
        self.table.borrow_mut().clear(thread)
    }

    pub fn members_vec(&self) -> Vec<Value> {
        self.table.borrow().keys_vec()
    }

    /// Structural equality: same members, order irrelevant.
    pub fn equals(&self, other: &Set) -> bool {
        let (a, b) = (self.table.borrow(), other.table.borrow());
        if a.len() != b.len() {
            return false;
        }
        let mut cursor = a.head_index();
        while let Some(idx) = cursor {
            let (member, _) = a.entry(idx);
            let hash = match member.hash_value() {
                Ok(h) => h,
                Err(_) => return false,
            };
            if b.get_uncharged(hash, member).is_none() {
                return false;
            }
            cursor = a.next_index(idx);
        }
        true
    }
}

impl Default for Set {
    fn default() -> Self {
        Set::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lark_util::ErrorKind;

    fn set_of(thread: &Thread, members: &[i64]) -> Set {
        let set = Set::new();
        for m in members {
            set.insert(thread, Value::int(*m)).unwrap();
        }
        set
    }

    #[test]
    fn test_insert_dedupes() {
        let thread = Thread::new();
        let set = Set::new();
        assert!(set.insert(&thread, Value::int(1)).unwrap());
        assert!(!set.insert(&thread, Value::int(1)).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_membership() {
        let thread = Thread::new();
        let set = set_of(&thread, &[1, 2, 3]);
        assert!(set.contains(&thread, &Value::int(2)).unwrap());
        assert!(!set.contains(&thread, &Value::int(9)).unwrap());
        // 2.0 == 2, so floats find their int twins.
        assert!(set.contains(&thread, &Value::Float(2.0)).unwrap());
    }

    #[test]
    fn test_members_keep_insertion_order() {
        let thread = Thread::new();
        let set = set_of(&thread, &[9, 1, 5]);
        let members: Vec<i64> = set
            .members_vec()
            .iter()
            .map(|v| match v {
                Value::Int(i) => i.to_i64().unwrap(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(members, vec![9, 1, 5]);
    }

    #[test]
    fn test_unhashable_member_refused() {
        let thread = Thread::new();
        let set = Set::new();
        assert_eq!(
            set.insert(&thread, Value::list(vec![]))
                .unwrap_err()
                .kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_frozen_set_refuses_mutation() {
        let thread = Thread::new();
        let set = set_of(&thread, &[1]);
        set.freeze();
        assert_eq!(
            set.insert(&thread, Value::int(2)).unwrap_err().kind(),
            ErrorKind::Frozen
        );
    }

    #[test]
    fn test_equality_is_order_independent() {
        let thread = Thread::new();
        let a = set_of(&thread, &[1, 2, 3]);
        let b = set_of(&thread, &[3, 2, 1]);
        assert!(a.equals(&b));
        assert!(!a.equals(&set_of(&thread, &[1, 2])));
    }
}
