// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Dict-like views over an object's attributes.
//!
//! A view reads and writes the target's slots directly and caches
//! name-to-slot lookups. The cache is keyed by the target's layout
//! pointer: any layout change invalidates it wholesale.

use crate::heap::{CellId, Tracer};
use crate::value::Name;
use std::collections::HashMap;

/// A view over the attributes of one object.
#[derive(Debug)]
pub struct AttrViewData {
    /// The object whose slots the view exposes.
    pub target: CellId,
    /// The target layout the cache was built against.
    pub cache_layout: CellId,
    /// Cached name-to-slot lookups, valid while the layout is unchanged.
    pub cache: HashMap<Name, u32>,
}

impl AttrViewData {
    /// Visit the target and the cached layout key.
    pub fn trace(&self, tracer: &mut Tracer<'_>) {
        tracer.visit(self.target);
        tracer.visit(self.cache_layout);
    }
}

// --- Native methods ---

use crate::value::{CellKind, Value, attrs_of};
use crate::vm::{Raise, Vm};

fn view_id(vm: &mut Vm, value: Value) -> Result<CellId, Raise> {
    if let Some(id) = value.as_cell() {
        if matches!(vm.heap.get(id), CellKind::AttrView(_)) {
            return Ok(id);
        }
    }
    let type_name = vm.type_name(value);
    let class = vm.builtins.type_error;
    Err(vm.raise(class, format!("expected an attribute view, not '{type_name}'")))
}

fn key_name(vm: &mut Vm, key: Value) -> Result<Name, Raise> {
    let Some(id) = key.as_cell() else {
        let class = vm.builtins.type_error;
        return Err(vm.raise(class, "attribute name must be a string"));
    };
    let CellKind::Str(text) = vm.heap.get(id) else {
        let class = vm.builtins.type_error;
        return Err(vm.raise(class, "attribute name must be a string"));
    };
    let text = text.clone();
    Ok(vm.names.intern(&text))
}

/// Resolve a name to a slot through the view's cache.
///
/// The cache is keyed by the target's layout pointer; any layout change
/// invalidates it wholesale.
fn cached_slot(vm: &mut Vm, view: CellId, name: Name) -> Option<u32> {
    let CellKind::AttrView(data) = vm.heap.get(view) else {
        panic!("receiver is an attribute view");
    };
    let target = data.target;
    let target_layout = attrs_of(vm.heap.get(target))?.layout;
    let CellKind::AttrView(data) = vm.heap.get_mut(view) else {
        unreachable!("checked above");
    };
    if data.cache_layout != target_layout {
        data.cache.clear();
        data.cache_layout = target_layout;
    } else if let Some(&slot) = data.cache.get(&name) {
        return Some(slot);
    }
    let slot = crate::value::layout::lookup_name(&vm.heap, target_layout, name)?;
    let CellKind::AttrView(data) = vm.heap.get_mut(view) else {
        unreachable!("checked above");
    };
    data.cache.insert(name, slot);
    Some(slot)
}

pub fn view_getitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let view = view_id(vm, args[0])?;
    let name = key_name(vm, args[1])?;
    let uninit = vm.builtins.uninitialized;
    if let Some(slot) = cached_slot(vm, view, name) {
        let CellKind::AttrView(data) = vm.heap.get(view) else {
            unreachable!("checked by view_id");
        };
        let target = data.target;
        let value = attrs_of(vm.heap.get(target)).expect("view target has attributes").slots
            [slot as usize];
        if value != uninit {
            return Ok(value);
        }
    }
    let key = vm.repr_value(args[1])?;
    let class = vm.builtins.key_error;
    Err(vm.raise(class, key))
}

pub fn view_setitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let view = view_id(vm, args[0])?;
    let name = key_name(vm, args[1])?;
    let CellKind::AttrView(data) = vm.heap.get(view) else {
        unreachable!("checked by view_id");
    };
    let target = data.target;
    crate::value::set_own_attr(&mut vm.heap, target, name, args[2]);
    Ok(vm.builtins.none)
}

/// Deleting through a view clears the slot; the layout keeps the name.
pub fn view_delitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let view = view_id(vm, args[0])?;
    let name = key_name(vm, args[1])?;
    let CellKind::AttrView(data) = vm.heap.get(view) else {
        unreachable!("checked by view_id");
    };
    let target = data.target;
    let uninit = vm.builtins.uninitialized;
    if crate::value::clear_own_attr(&mut vm.heap, target, name, uninit) {
        return Ok(vm.builtins.none);
    }
    let key = vm.repr_value(args[1])?;
    let class = vm.builtins.key_error;
    Err(vm.raise(class, key))
}

pub fn view_contains(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let view = view_id(vm, args[0])?;
    let name = key_name(vm, args[1])?;
    let uninit = vm.builtins.uninitialized;
    let found = cached_slot(vm, view, name).is_some_and(|slot| {
        let CellKind::AttrView(data) = vm.heap.get(view) else {
            unreachable!("checked by view_id");
        };
        attrs_of(vm.heap.get(data.target)).expect("view target has attributes").slots
            [slot as usize]
            != uninit
    });
    Ok(vm.bool_value(found))
}

pub fn view_len(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let view = view_id(vm, args[0])?;
    let CellKind::AttrView(data) = vm.heap.get(view) else {
        unreachable!("checked by view_id");
    };
    let target = data.target;
    let uninit = vm.builtins.uninitialized;
    let count = attrs_of(vm.heap.get(target))
        .expect("view target has attributes")
        .slots
        .iter()
        .filter(|&&slot| slot != uninit)
        .count();
    Ok(vm.int_from_i64(count as i64))
}

/// The assigned attribute names, in slot order.
pub fn view_keys(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let view = view_id(vm, args[0])?;
    let CellKind::AttrView(data) = vm.heap.get(view) else {
        unreachable!("checked by view_id");
    };
    let target = data.target;
    let uninit = vm.builtins.uninitialized;
    let attrs = attrs_of(vm.heap.get(target)).expect("view target has attributes");
    let layout = attrs.layout;
    let slots = attrs.slots.clone();
    let names = crate::value::layout::names(&vm.heap, layout);
    let mut keys = Vec::new();
    for (slot, name) in names.into_iter().enumerate() {
        if slots.get(slot).copied().is_some_and(|v| v != uninit) {
            let text = vm.names.text(name).to_owned();
            keys.push(Value::cell(vm.heap.alloc(CellKind::Str(text))));
        }
    }
    let list = vm.heap.alloc(CellKind::List(keys));
    Ok(Value::cell(list))
}
