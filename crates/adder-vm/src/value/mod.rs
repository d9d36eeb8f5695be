// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Value representation for the Adder language.
//!
//! A value is a uniform 64-bit tagged word: the low bit distinguishes a
//! signed 31-bit immediate integer from a heap cell reference. Everything
//! else lives in the heap as one of the [`CellKind`] variants.

#[cfg(test)]
mod layout_test;
#[cfg(test)]
mod mod_test;

mod function;
pub mod layout;
mod name;
mod object;
mod printer;

pub use function::{FunctionData, NativeData, NativeFn};
pub use layout::LayoutData;
pub use name::{Name, NameTable, WellKnown};
pub use object::{
    Attrs, ClassData, EnvData, ExceptionData, ModuleData, ObjectData, attrs_of, attrs_of_mut,
    clear_own_attr, get_own_attr, has_own_attr, lookup_on_class, set_own_attr,
};
pub use printer::short_repr;

use crate::builtins::attrview::AttrViewData;
use crate::builtins::dict::DictData;
use crate::builtins::file::FileData;
use crate::builtins::iterator::IterData;
use crate::builtins::slice::SliceData;
use crate::bytecode::BlockData;
use crate::heap::{CellId, Tracer};
use crate::vm::GeneratorData;
use adder_core::fits_immediate;
use num_bigint::BigInt;

/// A tagged 64-bit value.
///
/// `PartialEq` compares identity: immediate integers by value, heap
/// references by cell. Language-level equality goes through `__eq__`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value(u64);

impl Value {
    /// Tag an immediate integer.
    ///
    /// The value must fit the signed 31-bit immediate range; integers
    /// outside it are heap-allocated.
    #[must_use]
    pub fn small_int(value: i32) -> Self {
        debug_assert!(fits_immediate(i64::from(value)));
        Self((((i64::from(value)) << 1) | 1) as u64)
    }

    /// Tag a heap cell reference.
    #[must_use]
    pub const fn cell(id: CellId) -> Self {
        Self((id.index() as u64) << 1)
    }

    /// Whether this is an immediate integer.
    #[must_use]
    pub const fn is_small_int(self) -> bool {
        self.0 & 1 == 1
    }

    /// The immediate integer, if this is one.
    #[must_use]
    pub const fn as_small_int(self) -> Option<i32> {
        if self.is_small_int() {
            Some(((self.0 as i64) >> 1) as i32)
        } else {
            None
        }
    }

    /// The heap cell, if this is a reference.
    #[must_use]
    pub const fn as_cell(self) -> Option<CellId> {
        if self.is_small_int() {
            None
        } else {
            Some(CellId::from_index((self.0 >> 1) as u32))
        }
    }

    /// The raw tagged word.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// The payload of a heap cell.
#[derive(Debug)]
pub enum CellKind {
    /// A plain instance of some class.
    Object(ObjectData),
    /// A frame's heap environment.
    Env(EnvData),
    /// A class.
    Class(ClassData),
    /// A module and its globals.
    Module(ModuleData),
    /// A node in the layout tree.
    Layout(LayoutData),
    /// An immutable string.
    Str(String),
    /// A heap integer of unbounded magnitude.
    Int(BigInt),
    /// A float.
    Float(f64),
    /// An immutable tuple.
    Tuple(Vec<Value>),
    /// A mutable list.
    List(Vec<Value>),
    /// A dict keyed through `__hash__`/`__eq__` dispatch.
    Dict(DictData),
    /// A set; shares the dict storage with unit values.
    Set(DictData),
    /// A slice: start, stop, step.
    Slice(SliceData),
    /// An interpreted function.
    Function(FunctionData),
    /// A native callable.
    Native(NativeData),
    /// A compiled block.
    Block(BlockData),
    /// A generator iterator with its detached frame.
    Generator(GeneratorData),
    /// An exception.
    Exception(ExceptionData),
    /// An open (or closed) file.
    File(FileData),
    /// A dict-like view over an object's attributes.
    AttrView(AttrViewData),
    /// A snapshot iterator over a sequence of values.
    Iter(IterData),
}

impl CellKind {
    /// The kind's name, for error messages and logging.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Env(_) => "environment",
            Self::Class(_) => "class",
            Self::Module(_) => "module",
            Self::Layout(_) => "layout",
            Self::Str(_) => "str",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::Slice(_) => "slice",
            Self::Function(_) => "function",
            Self::Native(_) => "builtin function",
            Self::Block(_) => "code block",
            Self::Generator(_) => "generator",
            Self::Exception(_) => "exception",
            Self::File(_) => "file",
            Self::AttrView(_) => "attribute view",
            Self::Iter(_) => "iterator",
        }
    }

    /// Approximate payload size in bytes, for the collector's logging.
    #[must_use]
    pub fn size(&self) -> usize {
        let payload = match self {
            Self::Str(text) => text.len(),
            Self::Int(big) => big.bits() as usize / 8,
            Self::Tuple(values) | Self::List(values) => values.len() * size_of::<Value>(),
            Self::Dict(dict) | Self::Set(dict) => dict.len() * 3 * size_of::<Value>(),
            Self::Object(object) => object.attrs.slots.len() * size_of::<Value>(),
            Self::Env(env) => env.attrs.slots.len() * size_of::<Value>(),
            Self::Class(class) => class.attrs.slots.len() * size_of::<Value>(),
            Self::Module(module) => module.attrs.slots.len() * size_of::<Value>(),
            Self::Block(block) => block.instrs.len() * size_of::<crate::bytecode::Instr>(),
            Self::Generator(generator) => generator.saved_stack.len() * size_of::<Value>(),
            Self::Iter(iter) => iter.items.len() * size_of::<Value>(),
            _ => 0,
        };
        size_of::<Self>() + payload
    }

    /// Visit every outgoing heap reference.
    pub fn trace_children(&self, tracer: &mut Tracer<'_>) {
        match self {
            Self::Object(object) => {
                tracer.visit(object.class);
                trace_attrs(&object.attrs, tracer);
            }
            Self::Env(env) => {
                trace_attrs(&env.attrs, tracer);
                tracer.visit_opt(env.parent);
            }
            Self::Class(class) => {
                trace_attrs(&class.attrs, tracer);
                tracer.visit(class.instance_layout);
            }
            Self::Module(module) => trace_attrs(&module.attrs, tracer),
            Self::Layout(data) => layout::trace(data, tracer),
            Self::Str(_) | Self::Int(_) | Self::Float(_) | Self::Native(_) | Self::File(_) => {}
            Self::Tuple(values) | Self::List(values) => tracer.visit_values(values),
            Self::Dict(dict) | Self::Set(dict) => dict.trace(tracer),
            Self::Slice(slice) => slice.trace(tracer),
            Self::Function(function) => {
                tracer.visit(function.block);
                tracer.visit_values(&function.defaults);
                tracer.visit_opt(function.env);
                tracer.visit(function.module);
            }
            Self::Block(block) => block.trace(tracer),
            Self::Generator(generator) => generator.trace(tracer),
            Self::Exception(exception) => tracer.visit(exception.class),
            Self::AttrView(view) => view.trace(tracer),
            Self::Iter(iter) => iter.trace(tracer),
        }
    }
}

fn trace_attrs(attrs: &Attrs, tracer: &mut Tracer<'_>) {
    tracer.visit(attrs.layout);
    tracer.visit_values(&attrs.slots);
}
