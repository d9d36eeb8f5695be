// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Native methods of `tuple` and `list`.

use super::iterator::IterData;
use super::{seq_index, slice_positions};
use crate::heap::CellId;
use crate::value::{CellKind, Value};
use crate::vm::{Raise, Vm};

fn items_of(vm: &Vm, value: Value) -> Option<Vec<Value>> {
    let id = value.as_cell()?;
    match vm.heap.get(id) {
        CellKind::Tuple(items) | CellKind::List(items) => Some(items.clone()),
        _ => None,
    }
}

/// The receiver's items; raises `TypeError` for foreign receivers, which
/// can arrive through unbound method values.
fn seq_items(vm: &mut Vm, value: Value) -> Result<Vec<Value>, Raise> {
    match items_of(vm, value) {
        Some(items) => Ok(items),
        None => {
            let type_name = vm.type_name(value);
            let class = vm.builtins.type_error;
            Err(vm.raise(class, format!("expected a sequence, not '{type_name}'")))
        }
    }
}

fn list_id(vm: &mut Vm, value: Value) -> Result<CellId, Raise> {
    if let Some(id) = value.as_cell() {
        if matches!(vm.heap.get(id), CellKind::List(_)) {
            return Ok(id);
        }
    }
    let type_name = vm.type_name(value);
    let class = vm.builtins.type_error;
    Err(vm.raise(class, format!("expected a list, not '{type_name}'")))
}

fn as_slice(vm: &Vm, value: Value) -> Option<CellId> {
    let id = value.as_cell()?;
    matches!(vm.heap.get(id), CellKind::Slice(_)).then_some(id)
}

fn is_list(vm: &Vm, value: Value) -> bool {
    value
        .as_cell()
        .is_some_and(|id| matches!(vm.heap.get(id), CellKind::List(_)))
}

pub fn seq_len(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let items = seq_items(vm, args[0])?;
    Ok(vm.int_from_i64(items.len() as i64))
}

pub fn seq_getitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let items = seq_items(vm, args[0])?;
    if let Some(slice_id) = as_slice(vm, args[1]) {
        let positions = slice_positions(vm, slice_id, items.len())?;
        let selected: Vec<Value> = positions.into_iter().map(|i| items[i]).collect();
        let same_kind = if is_list(vm, args[0]) {
            CellKind::List(selected)
        } else {
            CellKind::Tuple(selected)
        };
        return Ok(Value::cell(vm.alloc(same_kind)));
    }
    let index = seq_index(vm, items.len(), args[1], "sequence index")?;
    Ok(items[index])
}

pub fn seq_contains(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let items = seq_items(vm, args[0])?;
    for item in items {
        if vm.values_equal(item, args[1])? {
            return Ok(vm.bool_value(true));
        }
    }
    Ok(vm.bool_value(false))
}

pub fn seq_eq(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(right) = items_of(vm, args[1]) else {
        return Ok(vm.builtins.not_implemented);
    };
    // A tuple never equals a list.
    let kinds_match = is_list(vm, args[0]) == is_list(vm, args[1]);
    let left = seq_items(vm, args[0])?;
    if !kinds_match || left.len() != right.len() {
        return Ok(vm.bool_value(false));
    }
    for (a, b) in left.into_iter().zip(right) {
        if !vm.values_equal(a, b)? {
            return Ok(vm.bool_value(false));
        }
    }
    Ok(vm.bool_value(true))
}

pub fn seq_ne(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let equal = seq_eq(vm, args)?;
    if equal == vm.builtins.not_implemented {
        return Ok(equal);
    }
    let truth = !vm.is_true(equal);
    Ok(vm.bool_value(truth))
}

pub fn seq_add(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(right) = items_of(vm, args[1]) else {
        return Ok(vm.builtins.not_implemented);
    };
    if is_list(vm, args[0]) != is_list(vm, args[1]) {
        return Ok(vm.builtins.not_implemented);
    }
    let mut combined = seq_items(vm, args[0])?;
    combined.extend(right);
    let kind = if is_list(vm, args[0]) {
        CellKind::List(combined)
    } else {
        CellKind::Tuple(combined)
    };
    Ok(Value::cell(vm.alloc(kind)))
}

pub fn seq_mul(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(count) = args[1].as_small_int() else {
        return Ok(vm.builtins.not_implemented);
    };
    let items = seq_items(vm, args[0])?;
    let count = usize::try_from(count).unwrap_or(0);
    let mut repeated = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        repeated.extend_from_slice(&items);
    }
    let kind = if is_list(vm, args[0]) {
        CellKind::List(repeated)
    } else {
        CellKind::Tuple(repeated)
    };
    Ok(Value::cell(vm.alloc(kind)))
}

pub fn seq_iter(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let items = seq_items(vm, args[0])?;
    let iter = vm.alloc(CellKind::Iter(IterData::new(items)));
    Ok(Value::cell(iter))
}

pub fn tuple_hash(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let hash = vm.hash_value(args[0])?;
    Ok(vm.int_from_i64(hash))
}

pub fn list_append(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = list_id(vm, args[0])?;
    let CellKind::List(items) = vm.heap.get_mut(id) else {
        unreachable!("checked by list_id");
    };
    items.push(args[1]);
    Ok(vm.builtins.none)
}

pub fn list_setitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = list_id(vm, args[0])?;
    let len = match vm.heap.get(id) {
        CellKind::List(items) => items.len(),
        _ => unreachable!("checked by list_id"),
    };
    let index = seq_index(vm, len, args[1], "list index")?;
    let CellKind::List(items) = vm.heap.get_mut(id) else {
        unreachable!("checked by list_id");
    };
    items[index] = args[2];
    Ok(vm.builtins.none)
}

pub fn list_delitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = list_id(vm, args[0])?;
    let len = match vm.heap.get(id) {
        CellKind::List(items) => items.len(),
        _ => unreachable!("checked by list_id"),
    };
    if let Some(slice_id) = as_slice(vm, args[1]) {
        let mut positions = slice_positions(vm, slice_id, len)?;
        positions.sort_unstable();
        let CellKind::List(items) = vm.heap.get_mut(id) else {
            unreachable!("checked by list_id");
        };
        for position in positions.into_iter().rev() {
            items.remove(position);
        }
        return Ok(vm.builtins.none);
    }
    let index = seq_index(vm, len, args[1], "list index")?;
    let CellKind::List(items) = vm.heap.get_mut(id) else {
        unreachable!("checked by list_id");
    };
    items.remove(index);
    Ok(vm.builtins.none)
}

/// In-place extend: `a += b` keeps the same list cell.
pub fn list_iadd(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(right) = items_of(vm, args[1]) else {
        return Ok(vm.builtins.not_implemented);
    };
    let id = list_id(vm, args[0])?;
    let CellKind::List(items) = vm.heap.get_mut(id) else {
        unreachable!("checked by list_id");
    };
    items.extend(right);
    Ok(args[0])
}
