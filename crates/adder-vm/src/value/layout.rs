// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The layout tree.
//!
//! A layout is a node in a tree rooted at the empty layout and maps
//! attribute names to slot indices. Two objects that added the same names
//! in the same order share the same layout node, which is what makes
//! attribute storage compact and method caching possible.
//!
//! A layout is immutable after creation except for its child map. The
//! child map holds weak edges: children are not traced through it, and a
//! dying child detaches itself from a surviving parent in the sweep
//! phase.

use crate::heap::{CellId, Heap};
use crate::value::{CellKind, Name};
use std::collections::HashMap;

/// A node in the layout tree.
#[derive(Debug)]
pub struct LayoutData {
    parent: Option<CellId>,
    name: Name,
    slot: u32,
    children: HashMap<Name, CellId>,
}

impl LayoutData {
    /// The empty root layout.
    #[must_use]
    pub fn new_root(placeholder: Name) -> Self {
        Self {
            parent: None,
            name: placeholder,
            slot: 0,
            children: HashMap::new(),
        }
    }

    /// The parent layout; `None` only for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<CellId> {
        self.parent
    }

    /// The name added at this node.
    #[must_use]
    pub const fn name(&self) -> Name {
        self.name
    }

    /// The slot index of the name added at this node.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Number of slots an object with this layout has.
    #[must_use]
    pub const fn slot_count(&self) -> u32 {
        if self.parent.is_none() { 0 } else { self.slot + 1 }
    }
}

fn data(heap: &Heap, id: CellId) -> &LayoutData {
    match heap.get(id) {
        CellKind::Layout(layout) => layout,
        other => panic!("expected layout cell, found {}", other.kind_name()),
    }
}

fn data_mut(heap: &mut Heap, id: CellId) -> &mut LayoutData {
    match heap.get_mut(id) {
        CellKind::Layout(layout) => layout,
        other => panic!("expected layout cell, found {}", other.kind_name()),
    }
}

/// Number of slots an object with this layout has.
#[must_use]
pub fn slot_count(heap: &Heap, id: CellId) -> u32 {
    data(heap, id).slot_count()
}

/// Find the nearest ancestor (including `id` itself) that added `name`.
#[must_use]
pub fn find_ancestor(heap: &Heap, id: CellId, name: Name) -> Option<CellId> {
    let mut current = id;
    loop {
        let layout = data(heap, current);
        let Some(parent) = layout.parent else {
            return None;
        };
        if layout.name == name {
            return Some(current);
        }
        current = parent;
    }
}

/// Whether `name` is mapped by this layout.
#[must_use]
pub fn has_name(heap: &Heap, id: CellId, name: Name) -> bool {
    find_ancestor(heap, id, name).is_some()
}

/// The slot index of `name`, or `None` if the layout does not map it.
#[must_use]
pub fn lookup_name(heap: &Heap, id: CellId, name: Name) -> Option<u32> {
    find_ancestor(heap, id, name).map(|ancestor| data(heap, ancestor).slot)
}

/// Whether `other` appears on this layout's ancestor chain.
#[must_use]
pub fn subsumes(heap: &Heap, id: CellId, other: CellId) -> bool {
    let mut current = id;
    loop {
        if current == other {
            return true;
        }
        match data(heap, current).parent {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

/// The names mapped by this layout, in slot order.
#[must_use]
pub fn names(heap: &Heap, id: CellId) -> Vec<Name> {
    let mut result = Vec::with_capacity(slot_count(heap, id) as usize);
    let mut current = id;
    while let Some(parent) = data(heap, current).parent {
        result.push(data(heap, current).name);
        current = parent;
    }
    result.reverse();
    result
}

/// Extend the layout with `name`, reusing an existing child.
///
/// Two `add_name` call sequences that walk the same ordered path from the
/// root produce the same layout cell.
///
/// # Panics
///
/// Panics (in debug builds) if the layout already maps `name`; use
/// [`maybe_add_name`] when that is allowed.
pub fn add_name(heap: &mut Heap, id: CellId, name: Name) -> CellId {
    debug_assert!(!has_name(heap, id, name), "layout already maps name");
    let layout = data(heap, id);
    if let Some(&child) = layout.children.get(&name) {
        return child;
    }
    let slot = layout.slot_count();
    let child = heap.alloc(CellKind::Layout(LayoutData {
        parent: Some(id),
        name,
        slot,
        children: HashMap::new(),
    }));
    data_mut(heap, id).children.insert(name, child);
    child
}

/// Extend the layout with `name` unless it is already mapped.
pub fn maybe_add_name(heap: &mut Heap, id: CellId, name: Name) -> CellId {
    if has_name(heap, id, name) {
        return id;
    }
    add_name(heap, id, name)
}

/// Trace a layout's children: only the parent edge is strong.
pub(crate) fn trace(layout: &LayoutData, tracer: &mut crate::heap::Tracer<'_>) {
    tracer.visit_opt(layout.parent);
}

/// Sweep hook: detach every dying layout from its surviving parent.
///
/// Runs before any dying cell is destroyed so a dying parent can still be
/// identified by its epoch.
pub(crate) fn sweep_dying_layouts(
    cells: &mut [Option<CellKind>],
    epochs: &[u8],
    dying: &[u32],
    prev_epoch: u8,
) {
    for &index in dying {
        let Some(CellKind::Layout(layout)) = &cells[index as usize] else {
            continue;
        };
        let Some(parent) = layout.parent else {
            continue;
        };
        let name = layout.name;
        // A dying parent keeps its child map as-is; both go together.
        if epochs[parent.index() as usize] == prev_epoch {
            continue;
        }
        let Some(CellKind::Layout(parent_layout)) = &mut cells[parent.index() as usize] else {
            panic!("layout parent is not a layout");
        };
        let removed = parent_layout.children.remove(&name);
        debug_assert_eq!(removed, Some(CellId::from_index(index)));
    }
}
