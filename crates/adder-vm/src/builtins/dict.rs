// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Dict and set storage.
//!
//! Keys are placed by interpreter-dispatched `__hash__` and `__eq__`, so
//! a lookup can run arbitrary interpreted code. The storage is therefore
//! built to survive reentrancy: entries live in a stable-index vector
//! with tombstones, and the hash buckets only hold indices that callers
//! re-validate after every callback. Iterators snapshot the entries.
//!
//! Sets share this storage with the none singleton as every value.

use crate::heap::Tracer;
use crate::value::Value;
use std::collections::HashMap;

/// One key-value pair with its cached key hash.
#[derive(Debug, Clone, Copy)]
pub struct DictEntry {
    /// The key's hash, as computed at insertion.
    pub hash: i64,
    /// The key.
    pub key: Value,
    /// The value.
    pub value: Value,
}

/// Dict storage: stable entries plus hash buckets.
#[derive(Debug, Default)]
pub struct DictData {
    entries: Vec<Option<DictEntry>>,
    buckets: HashMap<i64, Vec<u32>>,
    len: usize,
}

impl DictData {
    /// An empty dict.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the dict has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The entry indices that might hold a key with this hash.
    ///
    /// The returned indices must be re-validated with [`DictData::entry`]
    /// after any interpreter callback; entries can be deleted while an
    /// `__eq__` runs.
    #[must_use]
    pub fn bucket(&self, hash: i64) -> Vec<u32> {
        self.buckets.get(&hash).cloned().unwrap_or_default()
    }

    /// The entry at `index`, if still live.
    #[must_use]
    pub fn entry(&self, index: u32) -> Option<DictEntry> {
        self.entries.get(index as usize).copied().flatten()
    }

    /// Overwrite the value of a live entry.
    pub fn set_value(&mut self, index: u32, value: Value) {
        if let Some(Some(entry)) = self.entries.get_mut(index as usize) {
            entry.value = value;
        }
    }

    /// Append a new entry. The caller has established the key is absent.
    pub fn insert(&mut self, hash: i64, key: Value, value: Value) {
        let index = u32::try_from(self.entries.len()).expect("dict too large");
        self.entries.push(Some(DictEntry { hash, key, value }));
        self.buckets.entry(hash).or_default().push(index);
        self.len += 1;
    }

    /// Remove the entry at `index`, leaving a tombstone.
    pub fn remove(&mut self, index: u32) -> Option<DictEntry> {
        let slot = self.entries.get_mut(index as usize)?;
        let entry = slot.take()?;
        if let Some(bucket) = self.buckets.get_mut(&entry.hash) {
            bucket.retain(|&i| i != index);
            if bucket.is_empty() {
                self.buckets.remove(&entry.hash);
            }
        }
        self.len -= 1;
        Some(entry)
    }

    /// Snapshot the live entries in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DictEntry> {
        self.entries.iter().copied().flatten().collect()
    }

    /// Visit every key and value.
    pub fn trace(&self, tracer: &mut Tracer<'_>) {
        for entry in self.entries.iter().flatten() {
            tracer.visit_value(entry.key);
            tracer.visit_value(entry.value);
        }
    }
}

// --- Native methods ---

use crate::heap::CellId;
use crate::vm::{Raise, Vm};

fn dict_id(vm: &mut Vm, value: Value) -> Result<CellId, Raise> {
    if let Some(id) = value.as_cell() {
        if matches!(
            vm.heap.get(id),
            crate::value::CellKind::Dict(_) | crate::value::CellKind::Set(_)
        ) {
            return Ok(id);
        }
    }
    let type_name = vm.type_name(value);
    let class = vm.builtins.type_error;
    Err(vm.raise(class, format!("expected a dict or set, not '{type_name}'")))
}

fn storage<'a>(vm: &'a Vm, id: CellId) -> &'a DictData {
    match vm.heap.get(id) {
        crate::value::CellKind::Dict(dict) | crate::value::CellKind::Set(dict) => dict,
        other => panic!("expected dict storage, found {}", other.kind_name()),
    }
}

pub fn dict_len(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    let len = storage(vm, id).len();
    Ok(vm.int_from_i64(len as i64))
}

pub fn dict_getitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    match vm.dict_get(id, args[1])? {
        Some(value) => Ok(value),
        None => {
            let key = vm.repr_value(args[1])?;
            let class = vm.builtins.key_error;
            Err(vm.raise(class, key))
        }
    }
}

pub fn dict_setitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    vm.dict_insert(id, args[1], args[2])?;
    Ok(vm.builtins.none)
}

pub fn dict_delitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    if vm.dict_remove(id, args[1])? {
        return Ok(vm.builtins.none);
    }
    let key = vm.repr_value(args[1])?;
    let class = vm.builtins.key_error;
    Err(vm.raise(class, key))
}

pub fn dict_contains(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    let found = vm.dict_find(id, args[1])?.is_some();
    Ok(vm.bool_value(found))
}

pub fn dict_get_method(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    let default = args.get(2).copied().unwrap_or(vm.builtins.none);
    Ok(vm.dict_get(id, args[1])?.unwrap_or(default))
}

/// Keys in insertion order, snapshotted.
pub fn dict_keys(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    let keys: Vec<Value> = storage(vm, id)
        .snapshot()
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    let list = vm.alloc(crate::value::CellKind::List(keys));
    Ok(Value::cell(list))
}

pub fn dict_iter(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    let keys: Vec<Value> = storage(vm, id)
        .snapshot()
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    let iter = vm.alloc(crate::value::CellKind::Iter(
        super::iterator::IterData::new(keys),
    ));
    Ok(Value::cell(iter))
}

pub fn set_add(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    let none = vm.builtins.none;
    vm.dict_insert(id, args[1], none)?;
    Ok(none)
}

pub fn set_remove(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = dict_id(vm, args[0])?;
    if vm.dict_remove(id, args[1])? {
        return Ok(vm.builtins.none);
    }
    let key = vm.repr_value(args[1])?;
    let class = vm.builtins.key_error;
    Err(vm.raise(class, key))
}
