// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The object protocol: attribute access, truthiness, equality, hashing,
//! printing, operator dispatch and dict placement.
//!
//! Everything here can call back into interpreted code through
//! `call_sub`, which is what makes dicts mutable during their own
//! lookups and user `__repr__`/`__hash__` methods work.

use super::{Raise, Vm};
use crate::ast::{BinaryOp, CompareOp};
use crate::builtins::attrview::AttrViewData;
use crate::builtins::dict::DictData;
use crate::heap::CellId;
use crate::value::{
    CellKind, Name, Value, get_own_attr, lookup_on_class, set_own_attr,
};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A numeric operand, unified across the three representations.
#[derive(Debug, Clone)]
pub(crate) enum Num {
    Int(i64),
    Big(BigInt),
    Float(f64),
}

impl Vm {
    // --- Types ---

    /// The type class of a value.
    #[must_use]
    pub fn type_of(&self, value: Value) -> CellId {
        if value.is_small_int() {
            return self.builtins.int;
        }
        let id = value.as_cell().expect("value is int or cell");
        match self.heap.get(id) {
            CellKind::Object(object) => object.class,
            CellKind::Exception(exception) => exception.class,
            CellKind::Class(_) => self.builtins.type_class,
            CellKind::Module(_) => self.builtins.module,
            CellKind::Str(_) => self.builtins.str_class,
            CellKind::Int(_) => self.builtins.int,
            CellKind::Float(_) => self.builtins.float,
            CellKind::Tuple(_) => self.builtins.tuple,
            CellKind::List(_) => self.builtins.list,
            CellKind::Dict(_) => self.builtins.dict,
            CellKind::Set(_) => self.builtins.set,
            CellKind::Slice(_) => self.builtins.slice,
            CellKind::Function(_) | CellKind::Native(_) => self.builtins.function,
            CellKind::Generator(_) => self.builtins.generator,
            CellKind::File(_) => self.builtins.file,
            CellKind::AttrView(_) => self.builtins.attrview,
            CellKind::Iter(_) => self.builtins.iterator,
            CellKind::Env(_) | CellKind::Layout(_) | CellKind::Block(_) => self.builtins.object,
        }
    }

    /// The name of a value's type, for error messages.
    #[must_use]
    pub fn type_name(&self, value: Value) -> String {
        let class = self.type_of(value);
        match self.heap.get(class) {
            CellKind::Class(data) => data.name.clone(),
            _ => String::from("object"),
        }
    }

    // --- Attributes ---

    /// Look an attribute up without raising: own slots first, then the
    /// class, then the class's bases.
    #[must_use]
    pub fn maybe_get_attr(&self, value: Value, name: Name) -> Option<Value> {
        let bases = self.names.well_known().bases;
        let uninit = self.builtins.uninitialized;
        if let Some(id) = value.as_cell() {
            match self.heap.get(id) {
                CellKind::Object(_) | CellKind::Env(_) | CellKind::Module(_) => {
                    if let Some(own) = get_own_attr(&self.heap, id, name) {
                        if own != uninit {
                            return Some(own);
                        }
                    }
                }
                CellKind::Class(_) => {
                    // Class attribute lookup covers the base chain.
                    if let Some(found) = lookup_on_class(&self.heap, id, name, bases) {
                        if found != uninit {
                            return Some(found);
                        }
                    }
                    return None;
                }
                _ => {}
            }
        }
        let class = self.type_of(value);
        lookup_on_class(&self.heap, class, name, bases).filter(|&v| v != uninit)
    }

    /// Attribute read; raises `AttributeError` when absent.
    pub fn get_attr(&mut self, value: Value, name: Name) -> Result<Value, Raise> {
        if name == self.names.well_known().dict {
            if let Some(id) = value.as_cell() {
                if matches!(self.heap.get(id), CellKind::Object(_) | CellKind::Module(_)) {
                    return Ok(self.attr_view(id));
                }
            }
        }
        if let Some(found) = self.maybe_get_attr(value, name) {
            return Ok(found);
        }
        let type_name = self.type_name(value);
        let text = self.names.text(name).to_owned();
        let class = self.builtins.attribute_error;
        Err(self.raise(
            class,
            format!("'{type_name}' object has no attribute '{text}'"),
        ))
    }

    fn attr_view(&mut self, target: CellId) -> Value {
        let layout = crate::value::attrs_of(self.heap.get(target))
            .expect("attribute view target has attributes")
            .layout;
        let view = self.alloc(CellKind::AttrView(AttrViewData {
            target,
            cache_layout: layout,
            cache: std::collections::HashMap::new(),
        }));
        Value::cell(view)
    }

    /// Attribute write; only attribute-bearing kinds accept one.
    pub fn set_attr(&mut self, value: Value, name: Name, new_value: Value) -> Result<(), Raise> {
        let Some(id) = value.as_cell() else {
            let type_name = self.type_name(value);
            let class = self.builtins.type_error;
            return Err(self.raise(
                class,
                format!("'{type_name}' object attributes are read-only"),
            ));
        };
        match self.heap.get(id) {
            CellKind::Object(_) | CellKind::Env(_) | CellKind::Class(_) | CellKind::Module(_) => {
                set_own_attr(&mut self.heap, id, name, new_value);
                Ok(())
            }
            other => {
                let type_name = other.kind_name().to_owned();
                let class = self.builtins.type_error;
                Err(self.raise(
                    class,
                    format!("'{type_name}' object attributes are read-only"),
                ))
            }
        }
    }

    /// Attribute deletion clears the slot; the layout keeps the name.
    pub fn del_attr(&mut self, value: Value, name: Name) -> Result<(), Raise> {
        let uninit = self.builtins.uninitialized;
        let cleared = value
            .as_cell()
            .is_some_and(|id| crate::value::clear_own_attr(&mut self.heap, id, name, uninit));
        if cleared {
            return Ok(());
        }
        let type_name = self.type_name(value);
        let text = self.names.text(name).to_owned();
        let class = self.builtins.attribute_error;
        Err(self.raise(
            class,
            format!("'{type_name}' object has no attribute '{text}'"),
        ))
    }

    // --- Truthiness and booleans ---

    /// Language-level truth of a value.
    #[must_use]
    pub fn is_true(&self, value: Value) -> bool {
        if let Some(int) = value.as_small_int() {
            return int != 0;
        }
        if value == self.builtins.none || value == self.builtins.false_ {
            return false;
        }
        if value == self.builtins.true_ {
            return true;
        }
        let id = value.as_cell().expect("value is int or cell");
        match self.heap.get(id) {
            CellKind::Int(big) => !big.is_zero(),
            CellKind::Float(float) => *float != 0.0,
            CellKind::Str(text) => !text.is_empty(),
            CellKind::Tuple(items) | CellKind::List(items) => !items.is_empty(),
            CellKind::Dict(dict) | CellKind::Set(dict) => !dict.is_empty(),
            _ => true,
        }
    }

    /// The shared boolean singletons.
    #[must_use]
    pub fn bool_value(&self, truth: bool) -> Value {
        if truth {
            self.builtins.true_
        } else {
            self.builtins.false_
        }
    }

    // --- Equality and hashing ---

    /// Language-level equality: identity, then `__eq__` dispatch.
    pub fn values_equal(&mut self, left: Value, right: Value) -> Result<bool, Raise> {
        if left == right {
            return Ok(true);
        }
        let eq = self.names.well_known().compare_method(CompareOp::Eq);
        let Some(method) = self.maybe_get_attr(left, eq) else {
            return Ok(false);
        };
        let result = self.call_sub(method, &[left, right])?;
        if result == self.builtins.not_implemented {
            return Ok(false);
        }
        Ok(self.is_true(result))
    }

    /// Language-level hash.
    ///
    /// Booleans hash like the integers they convert to; big integers
    /// truncate by wrapping. Mutable containers are unhashable.
    pub fn hash_value(&mut self, value: Value) -> Result<i64, Raise> {
        if let Some(int) = value.as_small_int() {
            return Ok(i64::from(int));
        }
        if value == self.builtins.true_ {
            return Ok(1);
        }
        if value == self.builtins.false_ || value == self.builtins.none {
            return Ok(0);
        }
        let id = value.as_cell().expect("value is int or cell");
        match self.heap.get(id) {
            CellKind::Int(big) => Ok(wrap_bigint(big)),
            CellKind::Float(float) => {
                let float = *float;
                if float.fract() == 0.0 && float.abs() < 9e18 {
                    Ok(float as i64)
                } else {
                    Ok(float.to_bits() as i64)
                }
            }
            CellKind::Str(text) => {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                Ok(hasher.finish() as i64)
            }
            CellKind::Tuple(items) => {
                let items: Vec<Value> = items.clone();
                let mut combined: i64 = 0x345678;
                for item in items {
                    let item_hash = self.hash_value(item)?;
                    combined = combined
                        .wrapping_mul(1_000_003)
                        .wrapping_add(item_hash);
                }
                Ok(combined)
            }
            CellKind::List(_) | CellKind::Dict(_) | CellKind::Set(_) => {
                let type_name = self.type_name(value);
                let class = self.builtins.type_error;
                Err(self.raise(class, format!("unhashable type: '{type_name}'")))
            }
            CellKind::Object(_) => {
                let hash_name = self.names.well_known().hash;
                if let Some(method) = self.maybe_get_attr(value, hash_name) {
                    let result = self.call_sub(method, &[value])?;
                    return self.hash_result(result);
                }
                Ok(i64::from(id.index()))
            }
            _ => Ok(i64::from(id.index())),
        }
    }

    fn hash_result(&mut self, result: Value) -> Result<i64, Raise> {
        if let Some(int) = result.as_small_int() {
            return Ok(i64::from(int));
        }
        if let Some(id) = result.as_cell() {
            if let CellKind::Int(big) = self.heap.get(id) {
                return Ok(wrap_bigint(big));
            }
        }
        let class = self.builtins.type_error;
        Err(self.raise(class, "__hash__ method should return an integer"))
    }

    // --- Printing ---

    /// The `repr` of a value; consults user `__repr__` methods.
    pub fn repr_value(&mut self, value: Value) -> Result<String, Raise> {
        // Root the value for the traversal: a nested __repr__ can
        // allocate and collect while we hold copies of the children.
        let mark = self.heap.temp_mark();
        self.heap.push_temp_root(value);
        let result = self.repr_depth(value, 0);
        self.heap.release_temp_roots(mark);
        result
    }

    fn repr_depth(&mut self, value: Value, depth: usize) -> Result<String, Raise> {
        if depth > 16 {
            return Ok(String::from("..."));
        }
        if let Some(int) = value.as_small_int() {
            return Ok(int.to_string());
        }
        if value == self.builtins.none {
            return Ok(String::from("None"));
        }
        if value == self.builtins.true_ {
            return Ok(String::from("True"));
        }
        if value == self.builtins.false_ {
            return Ok(String::from("False"));
        }
        if value == self.builtins.not_implemented {
            return Ok(String::from("NotImplemented"));
        }
        let id = value.as_cell().expect("value is int or cell");
        match self.heap.get(id) {
            CellKind::Int(big) => Ok(big.to_string()),
            CellKind::Float(float) => Ok(format_float(*float)),
            CellKind::Str(text) => Ok(format!("'{}'", escape_str(text))),
            CellKind::Tuple(items) => {
                let items: Vec<Value> = items.clone();
                let mut parts = Vec::with_capacity(items.len());
                for item in &items {
                    parts.push(self.repr_depth(*item, depth + 1)?);
                }
                if parts.len() == 1 {
                    Ok(format!("({},)", parts[0]))
                } else {
                    Ok(format!("({})", parts.join(", ")))
                }
            }
            CellKind::List(items) => {
                let items: Vec<Value> = items.clone();
                let mut parts = Vec::with_capacity(items.len());
                for item in &items {
                    parts.push(self.repr_depth(*item, depth + 1)?);
                }
                Ok(format!("[{}]", parts.join(", ")))
            }
            CellKind::Dict(dict) => {
                let entries = dict.snapshot();
                let mut parts = Vec::with_capacity(entries.len());
                for entry in entries {
                    let key = self.repr_depth(entry.key, depth + 1)?;
                    let value = self.repr_depth(entry.value, depth + 1)?;
                    parts.push(format!("{key}: {value}"));
                }
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            CellKind::Set(dict) => {
                let entries = dict.snapshot();
                if entries.is_empty() {
                    return Ok(String::from("set()"));
                }
                let mut parts = Vec::with_capacity(entries.len());
                for entry in entries {
                    parts.push(self.repr_depth(entry.key, depth + 1)?);
                }
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            CellKind::Class(class) => Ok(format!("<class '{}'>", class.name)),
            CellKind::Module(module) => Ok(format!("<module '{}'>", module.name)),
            CellKind::Function(function) => {
                let name = self.names.text(function.name).to_owned();
                Ok(format!("<function {name}>"))
            }
            CellKind::Native(native) => Ok(format!("<built-in function {}>", native.name)),
            CellKind::Generator(_) => Ok(String::from("<generator>")),
            CellKind::Slice(slice) => {
                let slice = *slice;
                let start = self.repr_depth(slice.start, depth + 1)?;
                let stop = self.repr_depth(slice.stop, depth + 1)?;
                let step = self.repr_depth(slice.step, depth + 1)?;
                Ok(format!("slice({start}, {stop}, {step})"))
            }
            CellKind::Exception(exception) => {
                let class_name = match self.heap.get(exception.class) {
                    CellKind::Class(class) => class.name.clone(),
                    _ => String::from("Exception"),
                };
                Ok(format!("{class_name}({:?})", exception.message))
            }
            CellKind::File(file) => Ok(format!("<file '{}'>", file.name)),
            CellKind::Object(_) => {
                let repr_name = self.names.well_known().repr;
                let class = self.type_of(value);
                let bases = self.names.well_known().bases;
                if let Some(method) = lookup_on_class(&self.heap, class, repr_name, bases) {
                    if !matches!(
                        method.as_cell().map(|m| self.heap.get(m)),
                        Some(CellKind::Native(_))
                    ) {
                        let result = self.call_sub(method, &[value])?;
                        return self.str_of(result);
                    }
                }
                let type_name = self.type_name(value);
                Ok(format!("<{type_name} object>"))
            }
            other => Ok(format!("<{}>", other.kind_name())),
        }
    }

    /// The `str` of a value: strings verbatim, exceptions by message,
    /// everything else through `__str__` or `repr`.
    pub fn str_of(&mut self, value: Value) -> Result<String, Raise> {
        if let Some(id) = value.as_cell() {
            match self.heap.get(id) {
                CellKind::Str(text) => return Ok(text.clone()),
                CellKind::Exception(exception) => return Ok(exception.message.clone()),
                CellKind::Object(_) => {
                    let str_name = self.names.well_known().str_;
                    let class = self.type_of(value);
                    let bases = self.names.well_known().bases;
                    if let Some(method) = lookup_on_class(&self.heap, class, str_name, bases) {
                        if !matches!(
                            method.as_cell().map(|m| self.heap.get(m)),
                            Some(CellKind::Native(_))
                        ) {
                            let result = self.call_sub(method, &[value])?;
                            if let Some(result_id) = result.as_cell() {
                                if let CellKind::Str(text) = self.heap.get(result_id) {
                                    return Ok(text.clone());
                                }
                            }
                            let class = self.builtins.type_error;
                            return Err(self.raise(class, "__str__ returned a non-string"));
                        }
                    }
                }
                _ => {}
            }
        }
        self.repr_value(value)
    }

    // --- Numeric operator dispatch ---

    /// A numeric view of a value, if it has one.
    pub(crate) fn as_num(&self, value: Value) -> Option<Num> {
        if let Some(int) = value.as_small_int() {
            return Some(Num::Int(i64::from(int)));
        }
        if value == self.builtins.true_ {
            return Some(Num::Int(1));
        }
        if value == self.builtins.false_ {
            return Some(Num::Int(0));
        }
        let id = value.as_cell()?;
        match self.heap.get(id) {
            CellKind::Int(big) => Some(
                big.to_i64()
                    .map_or_else(|| Num::Big(big.clone()), Num::Int),
            ),
            CellKind::Float(float) => Some(Num::Float(*float)),
            _ => None,
        }
    }

    /// An integer value in its canonical representation.
    #[must_use]
    pub fn int_from_i64(&mut self, value: i64) -> Value {
        if adder_core::fits_immediate(value) {
            Value::small_int(value as i32)
        } else {
            Value::cell(self.alloc(CellKind::Int(BigInt::from(value))))
        }
    }

    /// A big integer, demoted to an immediate when it fits.
    #[must_use]
    pub fn int_from_big(&mut self, value: BigInt) -> Value {
        match value.to_i64() {
            Some(small) if adder_core::fits_immediate(small) => Value::small_int(small as i32),
            _ => Value::cell(self.alloc(CellKind::Int(value))),
        }
    }

    /// A float value.
    #[must_use]
    pub fn float_value(&mut self, value: f64) -> Value {
        Value::cell(self.alloc(CellKind::Float(value)))
    }

    /// A string value.
    #[must_use]
    pub fn str_value(&mut self, text: String) -> Value {
        Value::cell(self.alloc(CellKind::Str(text)))
    }

    /// Fast path: both operands are immediate integers.
    pub(super) fn binary_int(&mut self, op: BinaryOp) -> Result<(), Raise> {
        let right = i64::from(self.peek(0).as_small_int().expect("fast path checked"));
        let left = i64::from(self.peek(1).as_small_int().expect("fast path checked"));
        let result = crate::builtins::numeric::int_op(self, op, left, right)?;
        self.stack.truncate(self.stack.len() - 2);
        self.push(result);
        Ok(())
    }

    /// Fast path: compare two immediate integers.
    pub(super) fn compare_int(&mut self, op: CompareOp) {
        let right = self.peek(0).as_small_int().expect("fast path checked");
        let left = self.peek(1).as_small_int().expect("fast path checked");
        let truth = match op {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
        };
        let value = self.bool_value(truth);
        self.stack.truncate(self.stack.len() - 2);
        self.push(value);
    }

    /// Generic binary operator: `left.__op__(right)`.
    pub(super) fn binary_slow(&mut self, op: BinaryOp) -> Result<(), Raise> {
        let right = self.peek(0);
        let left = self.peek(1);
        let method_name = self.names.well_known().binary_method(op);
        if let Some(method) = self.maybe_get_attr(left, method_name) {
            let result = self.call_sub(method, &[left, right])?;
            if result != self.builtins.not_implemented {
                self.stack.truncate(self.stack.len() - 2);
                self.push(result);
                return Ok(());
            }
        }
        let left_name = self.type_name(left);
        let right_name = self.type_name(right);
        let class = self.builtins.type_error;
        Err(self.raise(
            class,
            format!(
                "unsupported operand type(s) for {}: '{left_name}' and '{right_name}'",
                op.token()
            ),
        ))
    }

    /// Generic comparison; `==`/`!=` fall back to identity.
    pub(super) fn compare_slow(&mut self, op: CompareOp) -> Result<(), Raise> {
        let right = self.peek(0);
        let left = self.peek(1);
        let method_name = self.names.well_known().compare_method(op);
        if let Some(method) = self.maybe_get_attr(left, method_name) {
            let result = self.call_sub(method, &[left, right])?;
            if result != self.builtins.not_implemented {
                self.stack.truncate(self.stack.len() - 2);
                self.push(result);
                return Ok(());
            }
        }
        match op {
            CompareOp::Eq | CompareOp::Ne => {
                let identical = left == right;
                let truth = self.bool_value(if op == CompareOp::Eq {
                    identical
                } else {
                    !identical
                });
                self.stack.truncate(self.stack.len() - 2);
                self.push(truth);
                Ok(())
            }
            _ => {
                let left_name = self.type_name(left);
                let right_name = self.type_name(right);
                let class = self.builtins.type_error;
                Err(self.raise(
                    class,
                    format!("unorderable types: {left_name}() {} {right_name}()", op.token()),
                ))
            }
        }
    }

    /// Augmented assignment: the in-place method, then the plain one.
    pub(super) fn aug_update(&mut self, op: BinaryOp) -> Result<(), Raise> {
        let right = self.peek(0);
        let left = self.peek(1);
        let inplace = self.names.well_known().inplace_method(op);
        if let Some(method) = self.maybe_get_attr(left, inplace) {
            let result = self.call_sub(method, &[left, right])?;
            if result != self.builtins.not_implemented {
                self.stack.truncate(self.stack.len() - 2);
                self.push(result);
                return Ok(());
            }
        }
        self.binary_slow(op)
    }

    // --- Dict placement ---

    fn dict_data(&self, id: CellId) -> &DictData {
        match self.heap.get(id) {
            CellKind::Dict(dict) | CellKind::Set(dict) => dict,
            other => panic!("expected dict storage, found {}", other.kind_name()),
        }
    }

    fn dict_data_mut(&mut self, id: CellId) -> &mut DictData {
        match self.heap.get_mut(id) {
            CellKind::Dict(dict) | CellKind::Set(dict) => dict,
            other => panic!("expected dict storage, found {}", other.kind_name()),
        }
    }

    /// Find the live entry matching `key`, dispatching `__hash__` and
    /// `__eq__` through the interpreter.
    pub fn dict_find(&mut self, id: CellId, key: Value) -> Result<Option<u32>, Raise> {
        let hash = self.hash_value(key)?;
        let candidates = self.dict_data(id).bucket(hash);
        for index in candidates {
            // Re-validate after every __eq__: it may have mutated us.
            let Some(entry) = self.dict_data(id).entry(index) else {
                continue;
            };
            if entry.hash != hash {
                continue;
            }
            if self.values_equal(entry.key, key)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Insert or overwrite a key.
    pub fn dict_insert(&mut self, id: CellId, key: Value, value: Value) -> Result<(), Raise> {
        if let Some(index) = self.dict_find(id, key)? {
            self.dict_data_mut(id).set_value(index, value);
            return Ok(());
        }
        let hash = self.hash_value(key)?;
        self.dict_data_mut(id).insert(hash, key, value);
        Ok(())
    }

    /// Read a key's value.
    pub fn dict_get(&mut self, id: CellId, key: Value) -> Result<Option<Value>, Raise> {
        let Some(index) = self.dict_find(id, key)? else {
            return Ok(None);
        };
        Ok(self.dict_data(id).entry(index).map(|entry| entry.value))
    }

    /// Remove a key; false when it was absent.
    pub fn dict_remove(&mut self, id: CellId, key: Value) -> Result<bool, Raise> {
        let Some(index) = self.dict_find(id, key)? else {
            return Ok(false);
        };
        Ok(self.dict_data_mut(id).remove(index).is_some())
    }

    // --- Iteration for natives ---

    /// Materialize any iterable into a vector via `__iter__`/`next`.
    pub fn iterate_values(&mut self, value: Value) -> Result<Vec<Value>, Raise> {
        let iter_name = self.names.well_known().iter;
        let next_name = self.names.well_known().next;
        let iter_method = self.get_attr(value, iter_name)?;
        let iterator = self.call_sub(iter_method, &[value])?;
        let mark = self.heap.temp_mark();
        self.heap.push_temp_root(iterator);
        let next_method = match self.get_attr(iterator, next_name) {
            Ok(method) => method,
            Err(raise) => {
                self.heap.release_temp_roots(mark);
                return Err(raise);
            }
        };
        self.heap.push_temp_root(next_method);
        let mut items = Vec::new();
        loop {
            match self.call_sub(next_method, &[iterator]) {
                Ok(item) => {
                    self.heap.push_temp_root(item);
                    items.push(item);
                }
                Err(Raise) => {
                    if self.current_exception_matches_stop_iteration() {
                        self.clear_current_exception();
                        break;
                    }
                    self.heap.release_temp_roots(mark);
                    return Err(Raise);
                }
            }
        }
        self.heap.release_temp_roots(mark);
        Ok(items)
    }

    pub(crate) fn current_exception_matches_stop_iteration(&self) -> bool {
        self.current_exception_matches(self.builtins.stop_iteration)
    }

    pub(crate) fn clear_current_exception(&mut self) {
        self.current_exception = None;
    }
}

/// Wrap a big integer into the 64-bit hash domain.
fn wrap_bigint(big: &BigInt) -> i64 {
    let bytes = big.abs().to_bytes_le().1;
    let mut value: u64 = 0;
    for (index, byte) in bytes.iter().enumerate().take(8) {
        value |= u64::from(*byte) << (8 * index);
    }
    let signed = value as i64;
    if big.is_negative() { -signed } else { signed }
}

/// Print a float the way the language does: always with a fraction.
#[must_use]
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn escape_str(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            _ => result.push(c),
        }
    }
    result
}
