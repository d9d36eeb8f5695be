// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Native methods of `str`.
//!
//! Strings are immutable; indexing and iteration deliver one-character
//! strings.

use super::iterator::IterData;
use super::{seq_index, slice_positions};
use crate::heap::CellId;
use crate::value::{CellKind, Value};
use crate::vm::{Raise, Vm};

fn as_str(vm: &Vm, value: Value) -> Option<&str> {
    let id = value.as_cell()?;
    match vm.heap.get(id) {
        CellKind::Str(text) => Some(text),
        _ => None,
    }
}

/// The receiver's text; raises `TypeError` for foreign receivers, which
/// can arrive through unbound method values.
fn self_str(vm: &mut Vm, value: Value) -> Result<String, Raise> {
    match as_str(vm, value) {
        Some(text) => Ok(text.to_owned()),
        None => {
            let type_name = vm.type_name(value);
            let class = vm.builtins.type_error;
            Err(vm.raise(class, format!("expected a string, not '{type_name}'")))
        }
    }
}

pub fn str_add(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(right) = as_str(vm, args[1]) else {
        return Ok(vm.builtins.not_implemented);
    };
    let right = right.to_owned();
    let left = self_str(vm, args[0])?;
    let mut result = String::with_capacity(left.len() + right.len());
    result.push_str(&left);
    result.push_str(&right);
    Ok(vm.str_value(result))
}

pub fn str_mul(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(count) = args[1].as_small_int() else {
        return Ok(vm.builtins.not_implemented);
    };
    let text = self_str(vm, args[0])?;
    let result = text.repeat(usize::try_from(count).unwrap_or(0));
    Ok(vm.str_value(result))
}

pub fn str_len(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let length = self_str(vm, args[0])?.chars().count();
    Ok(vm.int_from_i64(length as i64))
}

pub fn str_getitem(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let chars: Vec<char> = self_str(vm, args[0])?.chars().collect();
    if let Some(slice_id) = as_slice(vm, args[1]) {
        let positions = slice_positions(vm, slice_id, chars.len())?;
        let result: String = positions.into_iter().map(|i| chars[i]).collect();
        return Ok(vm.str_value(result));
    }
    let index = seq_index(vm, chars.len(), args[1], "string index")?;
    Ok(vm.str_value(chars[index].to_string()))
}

fn as_slice(vm: &Vm, value: Value) -> Option<CellId> {
    let id = value.as_cell()?;
    matches!(vm.heap.get(id), CellKind::Slice(_)).then_some(id)
}

pub fn str_contains(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(needle) = as_str(vm, args[1]) else {
        let class = vm.builtins.type_error;
        return Err(vm.raise(class, "'in <string>' requires string as left operand"));
    };
    let needle = needle.to_owned();
    let haystack = self_str(vm, args[0])?;
    let contains = haystack.contains(&needle);
    Ok(vm.bool_value(contains))
}

pub fn str_hash(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let hash = vm.hash_value(args[0])?;
    Ok(vm.int_from_i64(hash))
}

macro_rules! str_compare {
    ($(($name:ident, $method:ident)),* $(,)?) => {
        $(
            pub fn $name(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
                let Some(right) = as_str(vm, args[1]) else {
                    return Ok(vm.builtins.not_implemented);
                };
                let right = right.to_owned();
                let left = self_str(vm, args[0])?;
                let truth = left.as_str().$method(right.as_str());
                Ok(vm.bool_value(truth))
            }
        )*
    };
}

str_compare!(
    (str_eq, eq),
    (str_lt, lt),
    (str_le, le),
    (str_gt, gt),
    (str_ge, ge),
);

pub fn str_ne(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(right) = as_str(vm, args[1]) else {
        return Ok(vm.builtins.not_implemented);
    };
    let right = right.to_owned();
    let left = self_str(vm, args[0])?;
    let truth = left != right;
    Ok(vm.bool_value(truth))
}

pub fn str_str(_vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    Ok(args[0])
}

pub fn str_repr(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let text = vm.repr_value(args[0])?;
    Ok(vm.str_value(text))
}

pub fn str_iter(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let chars: Vec<char> = self_str(vm, args[0])?.chars().collect();
    // Non-collecting allocations: the freshly made items are unrooted
    // until the iterator cell holds them.
    let items: Vec<Value> = chars
        .into_iter()
        .map(|c| Value::cell(vm.heap.alloc(CellKind::Str(c.to_string()))))
        .collect();
    let iter = vm.heap.alloc(CellKind::Iter(IterData::new(items)));
    Ok(Value::cell(iter))
}
