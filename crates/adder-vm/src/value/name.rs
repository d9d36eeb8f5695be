// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Interned identifiers.
//!
//! Every attribute and variable name is interned once per VM; a `Name` is
//! an index into the table, so name comparison and hashing never touch
//! string data. The hot protocol names are interned up front.

use crate::ast::{BinaryOp, CompareOp, UnaryOp};
use std::collections::HashMap;

/// An interned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

impl Name {
    /// The raw table index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// The per-VM intern table.
pub struct NameTable {
    names: Vec<String>,
    map: HashMap<String, Name>,
    well_known: WellKnown,
}

impl NameTable {
    /// Create a table with the well-known names pre-interned.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            names: Vec::new(),
            map: HashMap::new(),
            well_known: WellKnown::placeholder(),
        };
        table.well_known = WellKnown::intern_into(&mut table);
        table
    }

    /// Intern a string, returning its stable name.
    pub fn intern(&mut self, text: &str) -> Name {
        if let Some(&name) = self.map.get(text) {
            return name;
        }
        let name = Name(u32::try_from(self.names.len()).expect("name table overflow"));
        self.names.push(text.to_owned());
        self.map.insert(text.to_owned(), name);
        name
    }

    /// The text of an interned name.
    #[must_use]
    pub fn text(&self, name: Name) -> &str {
        &self.names[name.0 as usize]
    }

    /// The pre-interned protocol names.
    #[must_use]
    pub const fn well_known(&self) -> &WellKnown {
        &self.well_known
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-interned protocol names.
#[derive(Debug, Clone)]
pub struct WellKnown {
    binary: [Name; BinaryOp::COUNT],
    inplace: [Name; BinaryOp::COUNT],
    compare: [Name; CompareOp::COUNT],
    /// `__pos__`, `__neg__`, `__invert__`.
    unary: [Name; 3],
    pub getitem: Name,
    pub setitem: Name,
    pub delitem: Name,
    pub len: Name,
    pub iter: Name,
    pub next: Name,
    pub contains: Name,
    pub hash: Name,
    pub str_: Name,
    pub repr: Name,
    pub init: Name,
    pub bases: Name,
    pub self_: Name,
    pub dict: Name,
}

/// Method names for the binary operators, in operator order.
const BINARY_METHOD_NAMES: [&str; BinaryOp::COUNT] = [
    "__add__",
    "__sub__",
    "__mul__",
    "__div__",
    "__floordiv__",
    "__mod__",
    "__pow__",
    "__or__",
    "__xor__",
    "__and__",
    "__lshift__",
    "__rshift__",
];

/// Method names for in-place updates, in operator order.
const INPLACE_METHOD_NAMES: [&str; BinaryOp::COUNT] = [
    "__iadd__",
    "__isub__",
    "__imul__",
    "__idiv__",
    "__ifloordiv__",
    "__imod__",
    "__ipow__",
    "__ior__",
    "__ixor__",
    "__iand__",
    "__ilshift__",
    "__irshift__",
];

/// Method names for the comparison operators, in operator order.
const COMPARE_METHOD_NAMES: [&str; CompareOp::COUNT] =
    ["__lt__", "__le__", "__gt__", "__ge__", "__eq__", "__ne__"];

impl WellKnown {
    fn placeholder() -> Self {
        let zero = Name(0);
        Self {
            binary: [zero; BinaryOp::COUNT],
            inplace: [zero; BinaryOp::COUNT],
            compare: [zero; CompareOp::COUNT],
            unary: [zero; 3],
            getitem: zero,
            setitem: zero,
            delitem: zero,
            len: zero,
            iter: zero,
            next: zero,
            contains: zero,
            hash: zero,
            str_: zero,
            repr: zero,
            init: zero,
            bases: zero,
            self_: zero,
            dict: zero,
        }
    }

    fn intern_into(table: &mut NameTable) -> Self {
        let mut binary = [Name(0); BinaryOp::COUNT];
        for (slot, text) in binary.iter_mut().zip(BINARY_METHOD_NAMES) {
            *slot = table.intern(text);
        }
        let mut inplace = [Name(0); BinaryOp::COUNT];
        for (slot, text) in inplace.iter_mut().zip(INPLACE_METHOD_NAMES) {
            *slot = table.intern(text);
        }
        let mut compare = [Name(0); CompareOp::COUNT];
        for (slot, text) in compare.iter_mut().zip(COMPARE_METHOD_NAMES) {
            *slot = table.intern(text);
        }
        let unary = [
            table.intern("__pos__"),
            table.intern("__neg__"),
            table.intern("__invert__"),
        ];
        Self {
            binary,
            inplace,
            compare,
            unary,
            getitem: table.intern("__getitem__"),
            setitem: table.intern("__setitem__"),
            delitem: table.intern("__delitem__"),
            len: table.intern("__len__"),
            iter: table.intern("__iter__"),
            next: table.intern("next"),
            contains: table.intern("__contains__"),
            hash: table.intern("__hash__"),
            str_: table.intern("__str__"),
            repr: table.intern("__repr__"),
            init: table.intern("__init__"),
            bases: table.intern("__bases__"),
            self_: table.intern("self"),
            dict: table.intern("__dict__"),
        }
    }

    /// The `__op__` method name for a binary operator.
    #[must_use]
    pub const fn binary_method(&self, op: BinaryOp) -> Name {
        self.binary[op.index()]
    }

    /// The `__iop__` method name for an augmented assignment.
    #[must_use]
    pub const fn inplace_method(&self, op: BinaryOp) -> Name {
        self.inplace[op.index()]
    }

    /// The method name for a comparison operator.
    #[must_use]
    pub const fn compare_method(&self, op: CompareOp) -> Name {
        self.compare[op.index()]
    }

    /// The method name for a unary operator.
    #[must_use]
    pub const fn unary_method(&self, op: UnaryOp) -> Name {
        self.unary[op as usize]
    }
}
