// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Free built-in functions: `print`, `len`, `repr`, `str` helpers,
//! `hasattr`, `isinstance`, `type` and the generic object methods.

use crate::value::{CellKind, Value};
use crate::vm::{Raise, Vm};

/// `print(*args)`: space-separated `str` forms plus a newline.
pub fn print_native(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let mut parts = Vec::with_capacity(args.len());
    for &arg in args {
        parts.push(vm.str_of(arg)?);
    }
    println!("{}", parts.join(" "));
    Ok(vm.builtins.none)
}

/// `len(x)` through `__len__`.
pub fn len_native(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let len_name = vm.names.well_known().len;
    let Some(method) = vm.maybe_get_attr(args[0], len_name) else {
        let type_name = vm.type_name(args[0]);
        let class = vm.builtins.type_error;
        return Err(vm.raise(class, format!("object of type '{type_name}' has no len()")));
    };
    vm.call_sub(method, &[args[0]])
}

/// `repr(x)`.
pub fn repr_native(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let text = vm.repr_value(args[0])?;
    Ok(vm.str_value(text))
}

/// `hasattr(x, name)`.
pub fn hasattr_native(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(id) = args[1].as_cell() else {
        let class = vm.builtins.type_error;
        return Err(vm.raise(class, "hasattr(): attribute name must be string"));
    };
    let CellKind::Str(text) = vm.heap.get(id) else {
        let class = vm.builtins.type_error;
        return Err(vm.raise(class, "hasattr(): attribute name must be string"));
    };
    let text = text.clone();
    let name = vm.names.intern(&text);
    let found = vm.maybe_get_attr(args[0], name).is_some();
    Ok(vm.bool_value(found))
}

/// `isinstance(x, cls)`.
pub fn isinstance_native(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let Some(class) = args[1].as_cell() else {
        let class = vm.builtins.type_error;
        return Err(vm.raise(class, "isinstance() arg 2 must be a class"));
    };
    if !matches!(vm.heap.get(class), CellKind::Class(_)) {
        let class = vm.builtins.type_error;
        return Err(vm.raise(class, "isinstance() arg 2 must be a class"));
    }
    let value_class = vm.type_of(args[0]);
    let truth = vm.is_subclass(value_class, class);
    Ok(vm.bool_value(truth))
}

/// `type(x)`: the value's class.
pub fn type_native(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    Ok(Value::cell(vm.type_of(args[0])))
}

/// Default `__repr__` for plain instances.
pub fn object_repr(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let type_name = vm.type_name(args[0]);
    Ok(vm.str_value(format!("<{type_name} object>")))
}

/// Default `__str__` for plain instances: same as `repr`.
pub fn object_str(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let text = vm.repr_value(args[0])?;
    Ok(vm.str_value(text))
}

/// `__str__` of an exception: its message.
pub fn exception_str(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let text = vm.str_of(args[0])?;
    Ok(vm.str_value(text))
}

/// `__repr__` of an exception: class plus message.
pub fn exception_repr(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let text = vm.repr_value(args[0])?;
    Ok(vm.str_value(text))
}

/// `__iter__` of a generator: the generator itself.
pub fn generator_iter(_vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    Ok(args[0])
}

/// `__str__` of the none singleton.
pub fn none_str(vm: &mut Vm, _args: &[Value]) -> Result<Value, Raise> {
    Ok(vm.str_value(String::from("None")))
}
