// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Attribute-bearing heap kinds: objects, environments, classes, modules.
//!
//! Attribute storage is a layout pointer plus a dense slot vector whose
//! length always equals the layout's slot count. A slot that has been
//! declared but not yet assigned holds the uninitialized-slot sentinel.

use adder_core::Pos;

use crate::heap::{CellId, Heap};
use crate::value::{CellKind, Name, Value, layout};

/// Layout pointer plus slot vector, shared by every attribute-bearing
/// kind.
#[derive(Debug, Clone)]
pub struct Attrs {
    /// The layout describing the name-to-slot mapping.
    pub layout: CellId,
    /// Slot values; `slots.len()` equals the layout's slot count.
    pub slots: Vec<Value>,
}

impl Attrs {
    /// Attribute storage with the given (usually empty) layout.
    #[must_use]
    pub fn new(layout_id: CellId, heap: &Heap, fill: Value) -> Self {
        let count = layout::slot_count(heap, layout_id) as usize;
        Self {
            layout: layout_id,
            slots: vec![fill; count],
        }
    }
}

/// An instance: class pointer plus attribute storage.
#[derive(Debug)]
pub struct ObjectData {
    /// The instance's class.
    pub class: CellId,
    /// The instance's attributes.
    pub attrs: Attrs,
}

/// A heap environment: a frame's locals, reachable by inner closures.
#[derive(Debug)]
pub struct EnvData {
    /// Local bindings, laid out by the block's layout.
    pub attrs: Attrs,
    /// The lexically enclosing environment.
    pub parent: Option<CellId>,
}

/// A class object.
#[derive(Debug)]
pub struct ClassData {
    /// The class name.
    pub name: String,
    /// Class attributes: the method table, `__bases__`, class variables.
    pub attrs: Attrs,
    /// Initial-layout hint for new instances.
    pub instance_layout: CellId,
}

/// A module: a name plus its globals.
#[derive(Debug)]
pub struct ModuleData {
    /// The module name.
    pub name: String,
    /// The module's globals.
    pub attrs: Attrs,
}

/// An exception: class, message and source position.
#[derive(Debug)]
pub struct ExceptionData {
    /// The exception's class.
    pub class: CellId,
    /// Human-readable message.
    pub message: String,
    /// Where the exception was raised.
    pub pos: Pos,
    /// Source file the position refers to.
    pub file: String,
}

/// The attribute storage of a cell, if its kind carries one.
#[must_use]
pub fn attrs_of(kind: &CellKind) -> Option<&Attrs> {
    match kind {
        CellKind::Object(object) => Some(&object.attrs),
        CellKind::Env(env) => Some(&env.attrs),
        CellKind::Class(class) => Some(&class.attrs),
        CellKind::Module(module) => Some(&module.attrs),
        _ => None,
    }
}

/// Mutable access to a cell's attribute storage.
pub fn attrs_of_mut(kind: &mut CellKind) -> Option<&mut Attrs> {
    match kind {
        CellKind::Object(object) => Some(&mut object.attrs),
        CellKind::Env(env) => Some(&mut env.attrs),
        CellKind::Class(class) => Some(&mut class.attrs),
        CellKind::Module(module) => Some(&mut module.attrs),
        _ => None,
    }
}

/// Read an own attribute. Returns the uninitialized sentinel as stored.
#[must_use]
pub fn get_own_attr(heap: &Heap, id: CellId, name: Name) -> Option<Value> {
    let attrs = attrs_of(heap.get(id))?;
    let slot = layout::lookup_name(heap, attrs.layout, name)?;
    Some(attrs.slots[slot as usize])
}

/// Whether the cell has an own attribute of that name.
#[must_use]
pub fn has_own_attr(heap: &Heap, id: CellId, name: Name) -> bool {
    attrs_of(heap.get(id))
        .is_some_and(|attrs| layout::has_name(heap, attrs.layout, name))
}

/// Write an own attribute, extending the layout when the name is new.
///
/// # Panics
///
/// Panics if the cell's kind has no attribute storage.
pub fn set_own_attr(heap: &mut Heap, id: CellId, name: Name, value: Value) {
    let attrs = attrs_of(heap.get(id)).expect("cell has no attribute storage");
    if let Some(slot) = layout::lookup_name(heap, attrs.layout, name) {
        let attrs = attrs_of_mut(heap.get_mut(id)).expect("cell has no attribute storage");
        attrs.slots[slot as usize] = value;
        return;
    }
    let new_layout = layout::add_name(heap, attrs.layout, name);
    let slot = layout::slot_count(heap, new_layout) - 1;
    let attrs = attrs_of_mut(heap.get_mut(id)).expect("cell has no attribute storage");
    debug_assert_eq!(slot as usize, attrs.slots.len());
    attrs.layout = new_layout;
    attrs.slots.push(value);
}

/// Clear an own attribute to `sentinel`, keeping the layout slot.
///
/// Returns false if the attribute does not exist or is already cleared.
pub fn clear_own_attr(heap: &mut Heap, id: CellId, name: Name, sentinel: Value) -> bool {
    let Some(attrs) = attrs_of(heap.get(id)) else {
        return false;
    };
    let Some(slot) = layout::lookup_name(heap, attrs.layout, name) else {
        return false;
    };
    let attrs = attrs_of_mut(heap.get_mut(id)).expect("checked above");
    if attrs.slots[slot as usize] == sentinel {
        return false;
    }
    attrs.slots[slot as usize] = sentinel;
    true
}

/// Look an attribute up on a class and then linearly on its bases.
///
/// `bases_name` is the interned `__bases__`.
#[must_use]
pub fn lookup_on_class(heap: &Heap, class_id: CellId, name: Name, bases_name: Name) -> Option<Value> {
    if let Some(value) = get_own_attr(heap, class_id, name) {
        return Some(value);
    }
    let bases = get_own_attr(heap, class_id, bases_name)?;
    let bases_id = bases.as_cell()?;
    let CellKind::Tuple(bases) = heap.get(bases_id) else {
        return None;
    };
    let bases: Vec<Value> = bases.clone();
    for base in bases {
        if let Some(base_id) = base.as_cell() {
            if let Some(value) = lookup_on_class(heap, base_id, name, bases_name) {
                return Some(value);
            }
        }
    }
    None
}
