// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Non-reentrant value printing.
//!
//! This is the cheap path used by logging and disassembly. It never calls
//! back into the interpreter, so user-defined `__repr__` methods are not
//! consulted; the VM's `repr_value` is the full implementation.

use crate::heap::Heap;
use crate::value::CellKind;
use crate::value::Value;

/// A short, best-effort rendering of a value.
#[must_use]
pub fn short_repr(heap: &Heap, value: Value) -> String {
    if let Some(int) = value.as_small_int() {
        return int.to_string();
    }
    let Some(id) = value.as_cell() else {
        return String::from("<value>");
    };
    match heap.get(id) {
        CellKind::Str(text) => format!("{text:?}"),
        CellKind::Int(int) => int.to_string(),
        CellKind::Float(float) => format!("{float}"),
        CellKind::Class(class) => format!("<class {}>", class.name),
        CellKind::Module(module) => format!("<module {}>", module.name),
        CellKind::Function(_) => String::from("<function>"),
        CellKind::Native(native) => format!("<builtin {}>", native.name),
        CellKind::Tuple(values) => format!("<tuple of {}>", values.len()),
        CellKind::List(values) => format!("<list of {}>", values.len()),
        CellKind::Exception(exception) => format!("<exception {}>", exception.message),
        other => format!("<{} {}>", other.kind_name(), id),
    }
}
