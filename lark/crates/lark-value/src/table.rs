//! The insertion-ordered hash table behind dict and set.
//!
//! Open addressing over buckets of eight slots. Every slot holds an
//! index into a stable entry slab; insertion order is maintained as a
//! doubly-linked list threaded through the entries, so iteration
//! order equals insertion order and deletion keeps iteration over the
//! survivors well-defined. Deleted slots become tombstones that keep
//! probe chains intact until the next rehash.
//!
//! Step charging happens here and only here: one step per bucket
//! probed, one step per bucket swept on `clear`. Growth charges the
//! new storage to the thread before committing it, so an insert into
//! a full table fails cleanly under a tight allocation budget.

use std::mem;

use lark_safety::Thread;
use lark_util::Result;

use crate::value::Value;

/// Slots per bucket.
pub const BUCKET_SIZE: usize = 8;
/// Grow when the live count reaches this many entries per bucket.
const GROW_AT: usize = 6;

const EMPTY: u32 = u32::MAX;
const TOMBSTONE: u32 = u32::MAX - 1;
const NO_ENTRY: u32 = u32::MAX;

#[derive(Clone)]
struct Bucket {
    slots: [u32; BUCKET_SIZE],
}

impl Bucket {
    fn empty() -> Bucket {
        Bucket {
            slots: [EMPTY; BUCKET_SIZE],
        }
    }
}

pub struct Entry {
    pub hash: u32,
    pub key: Value,
    pub value: Value,
    prev: u32,
    next: u32,
    live: bool,
}

/// The shared dict/set table.
pub struct Table {
    buckets: Vec<Bucket>,
    entries: Vec<Entry>,
    /// Insertion-order list endpoints.
    head: u32,
    tail: u32,
    /// Freelist of dead entry slots, linked through `next`.
    free: u32,
    len: usize,
    /// Bytes charged to the accountant for current storage.
    charged: usize,
}

impl Table {
    pub fn new() -> Table {
        Table {
            buckets: Vec::new(),
            entries: Vec::new(),
            head: NO_ENTRY,
            tail: NO_ENTRY,
            free: NO_ENTRY,
            len: 0,
            charged: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bucket count; the unit of `clear`'s cost model.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bytes of storage this table has charged for.
    pub fn charged_bytes(&self) -> usize {
        self.charged
    }

    fn bucket_index(&self, hash: u32) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    /// Looks up `key`, charging one step per bucket probed. Returns
    /// the entry index.
    fn find(&self, thread: &Thread, hash: u32, key: &Value) -> Result<Option<u32>> {
        if self.buckets.is_empty() {
            return Ok(None);
        }
        let mut bucket = self.bucket_index(hash);
        for _ in 0..self.buckets.len() {
            thread.add_steps(1)?;
            for &slot in &self.buckets[bucket].slots {
                match slot {
                    EMPTY => return Ok(None),
                    TOMBSTONE => continue,
                    idx => {
                        let entry = &self.entries[idx as usize];
                        if entry.hash == hash && entry.key.equals(key) {
                            return Ok(Some(idx));
                        }
                    }
                }
            }
            bucket = (bucket + 1) & (self.buckets.len() - 1);
        }
        Ok(None)
    }

    pub fn get(&self, thread: &Thread, hash: u32, key: &Value) -> Result<Option<Value>> {
        Ok(self
            .find(thread, hash, key)?
            .map(|idx| self.entries[idx as usize].value.clone()))
    }

    /// Uncharged lookup for structural equality, where no thread is
    /// in scope. Never used on user-driven paths.
    pub(crate) fn get_uncharged(&self, hash: u32, key: &Value) -> Option<&Value> {
        if self.buckets.is_empty() {
            return None;
        }
        let mut bucket = self.bucket_index(hash);
        for _ in 0..self.buckets.len() {
            for &slot in &self.buckets[bucket].slots {
                match slot {
                    EMPTY => return None,
                    TOMBSTONE => continue,
                    idx => {
                        let entry = &self.entries[idx as usize];
                        if entry.hash == hash && entry.key.equals(key) {
                            return Some(&entry.value);
                        }
                    }
                }
            }
            bucket = (bucket + 1) & (self.buckets.len() - 1);
        }
        None
    }

    pub fn contains(&self, thread: &Thread, hash: u32, key: &Value) -> Result<bool> {
        Ok(self.find(thread, hash, key)?.is_some())
    }

    /// Inserts or replaces. Returns the previous value for an existing
    /// key. Charges probe steps, one commit step, and any storage
    /// growth.
    pub fn insert(
        &mut self,
        thread: &Thread,
        hash: u32,
        key: Value,
        value: Value,
    ) -> Result<Option<Value>> {
        if let Some(idx) = self.find(thread, hash, &key)? {
            let old = mem::replace(&mut self.entries[idx as usize].value, value);
            return Ok(Some(old));
        }
        thread.add_steps(1)?;
        self.ensure_room(thread)?;

        let idx = self.allocate_entry(thread, hash, key, value)?;
        self.link_tail(idx);
        self.place_in_bucket(hash, idx);
        self.len += 1;
        Ok(None)
    }

    /// Removes `key`, returning its value. Charges probe steps plus
    /// one unlink step.
    pub fn remove(&mut self, thread: &Thread, hash: u32, key: &Value) -> Result<Option<Value>> {
        let idx = match self.find(thread, hash, key)? {
            Some(idx) => idx,
            None => return Ok(None),
        };
        thread.add_steps(1)?;
        self.remove_slot(hash, idx);
        Ok(Some(self.kill_entry(idx)))
    }

    /// Removes the oldest (first-inserted) live entry.
    pub fn pop_oldest(&mut self, thread: &Thread) -> Result<Option<(Value, Value)>> {
        if self.head == NO_ENTRY {
            return Ok(None);
        }
        let idx = self.head;
        let hash = self.entries[idx as usize].hash;
        thread.add_steps(1)?;
        // The slot still has to be found by probing.
        let key = self.entries[idx as usize].key.clone();
        self.find(thread, hash, &key)?;
        self.remove_slot(hash, idx);
        let value = self.kill_entry(idx);
        Ok(Some((key, value)))
    }

    /// Drops every entry and releases the table's storage back to the
    /// accountant. Charges one step per bucket swept.
    pub fn clear(&mut self, thread: &Thread) -> Result<()> {
        thread.add_steps(self.buckets.len() as u64)?;
        self.buckets = Vec::new();
        self.entries = Vec::new();
        self.head = NO_ENTRY;
        self.tail = NO_ENTRY;
        self.free = NO_ENTRY;
        self.len = 0;
        let _ = thread.add_allocs(-(self.charged as i64));
        self.charged = 0;
        Ok(())
    }

    /// First entry in insertion order.
    pub fn head_index(&self) -> Option<u32> {
        (self.head != NO_ENTRY).then_some(self.head)
    }

    /// Successor in insertion order.
    pub fn next_index(&self, idx: u32) -> Option<u32> {
        let next = self.entries[idx as usize].next;
        (next != NO_ENTRY).then_some(next)
    }

    pub fn entry(&self, idx: u32) -> (&Value, &Value) {
        let entry = &self.entries[idx as usize];
        debug_assert!(entry.live);
        (&entry.key, &entry.value)
    }

    /// Keys in insertion order, uncharged; callers meter iteration.
    pub fn keys_vec(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head_index();
        while let Some(idx) = cursor {
            out.push(self.entries[idx as usize].key.clone());
            cursor = self.next_index(idx);
        }
        out
    }

    /// (key, value) pairs in insertion order, uncharged.
    pub fn items_vec(&self) -> Vec<(Value, Value)> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head_index();
        while let Some(idx) = cursor {
            let entry = &self.entries[idx as usize];
            out.push((entry.key.clone(), entry.value.clone()));
            cursor = self.next_index(idx);
        }
        out
    }

    fn ensure_room(&mut self, thread: &Thread) -> Result<()> {
        if self.buckets.is_empty() {
            let bytes = mem::size_of::<Bucket>();
            thread.add_allocs(bytes as i64)?;
            self.charged += bytes;
            self.buckets.push(Bucket::empty());
            return Ok(());
        }
        if self.len + 1 <= self.buckets.len() * GROW_AT {
            return Ok(());
        }
        // Rehash into twice the buckets; tombstones evaporate.
        let new_count = self.buckets.len() * 2;
        let bytes = (new_count - self.buckets.len()) * mem::size_of::<Bucket>();
        thread.add_allocs(bytes as i64)?;
        self.charged += bytes;

        let mut buckets = vec![Bucket::empty(); new_count];
        mem::swap(&mut self.buckets, &mut buckets);
        let mut cursor = self.head_index();
        while let Some(idx) = cursor {
            let hash = self.entries[idx as usize].hash;
            Self::place(&mut self.buckets, hash, idx);
            cursor = self.next_index(idx);
        }
        Ok(())
    }

    fn allocate_entry(
        &mut self,
        thread: &Thread,
        hash: u32,
        key: Value,
        value: Value,
    ) -> Result<u32> {
        if self.free != NO_ENTRY {
            let idx = self.free;
            self.free = self.entries[idx as usize].next;
            let entry = &mut self.entries[idx as usize];
            entry.hash = hash;
            entry.key = key;
            entry.value = value;
            entry.prev = NO_ENTRY;
            entry.next = NO_ENTRY;
            entry.live = true;
            return Ok(idx);
        }
        if self.entries.len() == self.entries.capacity() {
            let new_cap = (self.entries.capacity() * 2).max(BUCKET_SIZE);
            let bytes = (new_cap - self.entries.capacity()) * mem::size_of::<Entry>();
            thread.add_allocs(bytes as i64)?;
            self.charged += bytes;
            self.entries.reserve_exact(new_cap - self.entries.len());
        }
        let idx = self.entries.len() as u32;
        self.entries.push(Entry {
            hash,
            key,
            value,
            prev: NO_ENTRY,
            next: NO_ENTRY,
            live: true,
        });
        Ok(idx)
    }

    fn link_tail(&mut self, idx: u32) {
        if self.tail == NO_ENTRY {
            self.head = idx;
            self.tail = idx;
        } else {
            self.entries[self.tail as usize].next = idx;
            self.entries[idx as usize].prev = self.tail;
            self.tail = idx;
        }
    }

    fn unlink(&mut self, idx: u32) {
        let (prev, next) = {
            let entry = &self.entries[idx as usize];
            (entry.prev, entry.next)
        };
        if prev != NO_ENTRY {
            self.entries[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NO_ENTRY {
            self.entries[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn kill_entry(&mut self, idx: u32) -> Value {
        self.unlink(idx);
        let entry = &mut self.entries[idx as usize];
        entry.live = false;
        entry.key = Value::None;
        let value = mem::replace(&mut entry.value, Value::None);
        entry.prev = NO_ENTRY;
        entry.next = self.free;
        self.free = idx;
        self.len -= 1;
        value
    }

    fn place_in_bucket(&mut self, hash: u32, idx: u32) {
        Self::place(&mut self.buckets, hash, idx);
    }

    fn place(buckets: &mut [Bucket], hash: u32, idx: u32) {
        let mask = buckets.len() - 1;
        let mut bucket = (hash as usize) & mask;
        loop {
            for slot in buckets[bucket].slots.iter_mut() {
                if *slot == EMPTY || *slot == TOMBSTONE {
                    *slot = idx;
                    return;
                }
            }
            bucket = (bucket + 1) & mask;
        }
    }

    fn remove_slot(&mut self, hash: u32, idx: u32) {
        let mask = self.buckets.len() - 1;
        let mut bucket = (hash as usize) & mask;
        loop {
            for slot in self.buckets[bucket].slots.iter_mut() {
                if *slot == idx {
                    *slot = TOMBSTONE;
                    return;
                }
            }
            bucket = (bucket + 1) & mask;
        }
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: i64) -> (u32, Value) {
        let v = Value::int(n);
        (v.hash_value().unwrap(), v)
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let thread = Thread::new();
        let mut table = Table::new();
        for n in 0..100 {
            let (h, k) = key(n);
            assert!(table.insert(&thread, h, k, Value::int(n * 10)).unwrap().is_none());
        }
        assert_eq!(table.len(), 100);
        for n in 0..100 {
            let (h, k) = key(n);
            let got = table.get(&thread, h, &k).unwrap().unwrap();
            assert!(got.equals(&Value::int(n * 10)));
        }
    }

    #[test]
    fn test_replace_returns_old_value() {
        let thread = Thread::new();
        let mut table = Table::new();
        let (h, k) = key(1);
        table.insert(&thread, h, k.clone(), Value::str("a")).unwrap();
        let old = table.insert(&thread, h, k, Value::str("b")).unwrap();
        assert!(old.unwrap().equals(&Value::str("a")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_iteration_order_is_insertion_order() {
        let thread = Thread::new();
        let mut table = Table::new();
        for n in [5, 3, 9, 1] {
            let (h, k) = key(n);
            table.insert(&thread, h, k, Value::None).unwrap();
        }
        let keys: Vec<i64> = table
            .keys_vec()
            .iter()
            .map(|k| match k {
                Value::Int(i) => i.to_i64().unwrap(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, vec![5, 3, 9, 1]);
    }

    #[test]
    fn test_remove_keeps_order_of_survivors() {
        let thread = Thread::new();
        let mut table = Table::new();
        for n in 0..6 {
            let (h, k) = key(n);
            table.insert(&thread, h, k, Value::None).unwrap();
        }
        let (h, k) = key(2);
        assert!(table.remove(&thread, h, &k).unwrap().is_some());
        let keys: Vec<i64> = table
            .keys_vec()
            .iter()
            .map(|k| match k {
                Value::Int(i) => i.to_i64().unwrap(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn test_remove_missing_is_none() {
        let thread = Thread::new();
        let mut table = Table::new();
        let (h, k) = key(1);
        table.insert(&thread, h, k, Value::None).unwrap();
        let (h2, k2) = key(99);
        assert!(table.remove(&thread, h2, &k2).unwrap().is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_tombstones_keep_probe_chains() {
        let thread = Thread::new();
        let mut table = Table::new();
        // Same hash for every key: a single long probe chain.
        let keys: Vec<Value> = (0..40).map(Value::int).collect();
        for k in &keys {
            table.insert(&thread, 7, k.clone(), Value::None).unwrap();
        }
        // Remove from the middle of the chain, then look past the hole.
        for k in keys.iter().take(20) {
            assert!(table.remove(&thread, 7, k).unwrap().is_some());
        }
        for k in keys.iter().skip(20) {
            assert!(table.contains(&thread, 7, k).unwrap(), "lost {:?} behind tombstones", k.type_name());
        }
    }

    #[test]
    fn test_slot_reuse_after_removal() {
        let thread = Thread::new();
        let mut table = Table::new();
        for n in 0..10 {
            let (h, k) = key(n);
            table.insert(&thread, h, k, Value::None).unwrap();
        }
        for n in 0..10 {
            let (h, k) = key(n);
            table.remove(&thread, h, &k).unwrap();
        }
        assert_eq!(table.len(), 0);
        assert!(table.head_index().is_none());
        for n in 10..20 {
            let (h, k) = key(n);
            table.insert(&thread, h, k, Value::None).unwrap();
        }
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn test_pop_oldest_is_fifo() {
        let thread = Thread::new();
        let mut table = Table::new();
        for n in [7, 8, 9] {
            let (h, k) = key(n);
            table.insert(&thread, h, k, Value::int(n)).unwrap();
        }
        let (k, v) = table.pop_oldest(&thread).unwrap().unwrap();
        assert!(k.equals(&Value::int(7)));
        assert!(v.equals(&Value::int(7)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_clear_refunds_storage() {
        let thread = Thread::new();
        let mut table = Table::new();
        for n in 0..100 {
            let (h, k) = key(n);
            table.insert(&thread, h, k, Value::None).unwrap();
        }
        let live_before = thread.accountant().allocs();
        assert!(live_before > 0);
        table.clear(&thread).unwrap();
        assert_eq!(thread.accountant().allocs(), 0);
        assert_eq!(table.len(), 0);
        assert_eq!(table.charged_bytes(), 0);
    }

    #[test]
    fn test_growth_is_charged_and_refused_under_budget() {
        use lark_util::{ErrorKind, SafetyFlags};
        let thread = Thread::with_limits(u64::MAX, 256);
        thread.require_safety(SafetyFlags::MEMORY);
        let mut table = Table::new();
        let mut failed = false;
        for n in 0..1000 {
            let (h, k) = key(n);
            match table.insert(&thread, h, k, Value::None) {
                Ok(_) => {}
                Err(err) => {
                    assert_eq!(err.kind(), ErrorKind::Safety);
                    failed = true;
                    break;
                }
            }
        }
        assert!(failed, "256-byte budget cannot hold 1000 entries");
    }

    #[test]
    fn test_probe_cost_scales_with_collision_chain() {
        let thread = Thread::new();
        let mut table = Table::new();
        for n in 0..500 {
            table.insert(&thread, 42, Value::int(n), Value::None).unwrap();
        }
        let before = thread.accountant().steps();
        // Missing key with the colliding hash walks the whole chain.
        table.get(&thread, 42, &Value::int(9999)).unwrap();
        let probes = thread.accountant().steps() - before;
        assert!(probes >= 500 / BUCKET_SIZE as u64);
    }
}
