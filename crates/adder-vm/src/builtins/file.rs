// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! File objects.

use std::fs;

/// An open (or already closed) file.
#[derive(Debug)]
pub struct FileData {
    /// Path the file was opened with.
    pub name: String,
    /// The handle; `None` once closed.
    pub handle: Option<fs::File>,
}

// --- Native methods ---

use crate::heap::CellId;
use crate::value::{CellKind, Value};
use crate::vm::{Raise, Vm};
use std::io::{Read, Write};

/// The `open` builtin: modes `r` (default) and `w`.
pub fn open_native(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let path = string_arg(vm, args[0], "open() path")?;
    let mode = match args.get(1) {
        Some(&mode) => string_arg(vm, mode, "open() mode")?,
        None => String::from("r"),
    };
    let result = match mode.as_str() {
        "r" => fs::File::open(&path),
        "w" => fs::File::create(&path),
        _ => {
            let class = vm.builtins.value_error;
            return Err(vm.raise(class, format!("invalid mode: '{mode}'")));
        }
    };
    match result {
        Ok(handle) => {
            let file = vm.alloc(CellKind::File(FileData {
                name: path,
                handle: Some(handle),
            }));
            Ok(Value::cell(file))
        }
        Err(error) => {
            let class = vm.builtins.os_error;
            Err(vm.raise(class, format!("cannot open '{path}': {error}")))
        }
    }
}

fn string_arg(vm: &mut Vm, value: Value, what: &str) -> Result<String, Raise> {
    if let Some(id) = value.as_cell() {
        if let CellKind::Str(text) = vm.heap.get(id) {
            return Ok(text.clone());
        }
    }
    let class = vm.builtins.type_error;
    Err(vm.raise(class, format!("{what} must be a string")))
}

fn file_id(vm: &mut Vm, value: Value) -> Result<CellId, Raise> {
    if let Some(id) = value.as_cell() {
        if matches!(vm.heap.get(id), CellKind::File(_)) {
            return Ok(id);
        }
    }
    let type_name = vm.type_name(value);
    let class = vm.builtins.type_error;
    Err(vm.raise(class, format!("expected a file, not '{type_name}'")))
}

fn file_handle(vm: &mut Vm, value: Value) -> Result<CellId, Raise> {
    let id = file_id(vm, value)?;
    let CellKind::File(file) = vm.heap.get(id) else {
        unreachable!("checked by file_id");
    };
    if file.handle.is_none() {
        let class = vm.builtins.value_error;
        return Err(vm.raise(class, "I/O operation on closed file"));
    }
    Ok(id)
}

pub fn file_read(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = file_handle(vm, args[0])?;
    let CellKind::File(file) = vm.heap.get_mut(id) else {
        unreachable!("checked by file_handle");
    };
    let mut contents = String::new();
    let read = file
        .handle
        .as_mut()
        .expect("checked by file_handle")
        .read_to_string(&mut contents);
    match read {
        Ok(_) => Ok(vm.str_value(contents)),
        Err(error) => {
            let class = vm.builtins.os_error;
            Err(vm.raise(class, format!("read failed: {error}")))
        }
    }
}

pub fn file_write(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let text = string_arg(vm, args[1], "write() argument")?;
    let id = file_handle(vm, args[0])?;
    let CellKind::File(file) = vm.heap.get_mut(id) else {
        unreachable!("checked by file_handle");
    };
    let written = file
        .handle
        .as_mut()
        .expect("checked by file_handle")
        .write_all(text.as_bytes());
    match written {
        Ok(()) => Ok(vm.builtins.none),
        Err(error) => {
            let class = vm.builtins.os_error;
            Err(vm.raise(class, format!("write failed: {error}")))
        }
    }
}

pub fn file_close(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let id = file_id(vm, args[0])?;
    let CellKind::File(file) = vm.heap.get_mut(id) else {
        unreachable!("checked by file_id");
    };
    file.handle = None;
    Ok(vm.builtins.none)
}
