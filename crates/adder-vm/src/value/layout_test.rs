// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the layout tree.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::layout::{self, LayoutData};
use super::{CellKind, Name, NameTable};
use crate::heap::{CellId, Heap};
use proptest::prelude::*;

fn setup() -> (Heap, NameTable, CellId) {
    let mut heap = Heap::new();
    let mut names = NameTable::new();
    let root_name = names.intern("");
    let root = heap.alloc(CellKind::Layout(LayoutData::new_root(root_name)));
    (heap, names, root)
}

#[test]
fn root_is_empty() {
    let (heap, _names, root) = setup();
    assert_eq!(layout::slot_count(&heap, root), 0);
}

#[test]
fn add_name_assigns_slots_in_order() {
    let (mut heap, mut names, root) = setup();
    let a = names.intern("a");
    let b = names.intern("b");
    let with_a = layout::add_name(&mut heap, root, a);
    let with_ab = layout::add_name(&mut heap, with_a, b);
    assert_eq!(layout::slot_count(&heap, with_a), 1);
    assert_eq!(layout::slot_count(&heap, with_ab), 2);
    assert_eq!(layout::lookup_name(&heap, with_ab, a), Some(0));
    assert_eq!(layout::lookup_name(&heap, with_ab, b), Some(1));
    assert_eq!(layout::lookup_name(&heap, with_a, b), None);
}

#[test]
fn same_path_shares_the_layout() {
    let (mut heap, mut names, root) = setup();
    let a = names.intern("a");
    let b = names.intern("b");
    let first = layout::add_name(&mut heap, root, a);
    let second = layout::add_name(&mut heap, root, a);
    assert_eq!(first, second);
    let first_ab = layout::add_name(&mut heap, first, b);
    let second_ab = layout::add_name(&mut heap, second, b);
    assert_eq!(first_ab, second_ab);
}

#[test]
fn different_orders_make_different_layouts() {
    let (mut heap, mut names, root) = setup();
    let a = names.intern("a");
    let b = names.intern("b");
    let ab = {
        let with_a = layout::add_name(&mut heap, root, a);
        layout::add_name(&mut heap, with_a, b)
    };
    let ba = {
        let with_b = layout::add_name(&mut heap, root, b);
        layout::add_name(&mut heap, with_b, a)
    };
    assert_ne!(ab, ba);
    assert_eq!(layout::lookup_name(&heap, ab, a), Some(0));
    assert_eq!(layout::lookup_name(&heap, ba, a), Some(1));
}

#[test]
fn maybe_add_name_returns_self_when_present() {
    let (mut heap, mut names, root) = setup();
    let a = names.intern("a");
    let with_a = layout::add_name(&mut heap, root, a);
    assert_eq!(layout::maybe_add_name(&mut heap, with_a, a), with_a);
    let b = names.intern("b");
    assert_ne!(layout::maybe_add_name(&mut heap, with_a, b), with_a);
}

#[test]
fn subsumes_follows_the_ancestor_chain() {
    let (mut heap, mut names, root) = setup();
    let a = names.intern("a");
    let b = names.intern("b");
    let with_a = layout::add_name(&mut heap, root, a);
    let with_ab = layout::add_name(&mut heap, with_a, b);
    assert!(layout::subsumes(&heap, with_ab, with_a));
    assert!(layout::subsumes(&heap, with_ab, root));
    assert!(layout::subsumes(&heap, with_ab, with_ab));
    assert!(!layout::subsumes(&heap, with_a, with_ab));
}

#[test]
fn names_lists_the_chain_in_slot_order() {
    let (mut heap, mut names, root) = setup();
    let a = names.intern("a");
    let b = names.intern("b");
    let with_a = layout::add_name(&mut heap, root, a);
    let with_ab = layout::add_name(&mut heap, with_a, b);
    assert_eq!(layout::names(&heap, with_ab), vec![a, b]);
}

#[test]
fn sweep_detaches_dead_children_from_live_parents() {
    let (mut heap, mut names, root) = setup();
    let a = names.intern("a");
    let first = layout::add_name(&mut heap, root, a);
    // Only the root survives this collection.
    heap.collect(|tracer| tracer.visit(root));
    assert!(!heap.is_live(first));
    assert!(heap.is_live(root));
    // The child map was pruned by the sweep hook, so re-adding the name
    // builds a fresh node instead of handing out the dead one.
    let second = layout::add_name(&mut heap, root, a);
    assert!(heap.is_live(second));
    assert_eq!(layout::lookup_name(&heap, second, a), Some(0));
}

#[test]
fn dying_parent_and_child_go_together() {
    let (mut heap, mut names, root) = setup();
    let a = names.intern("a");
    let b = names.intern("b");
    let with_a = layout::add_name(&mut heap, root, a);
    let with_ab = layout::add_name(&mut heap, with_a, b);
    assert!(heap.is_live(with_ab));
    heap.collect(|tracer| tracer.visit(root));
    assert!(!heap.is_live(with_a));
    assert!(!heap.is_live(with_ab));
}

proptest! {
    /// Any two walks of the same ordered name path share the layout.
    #[test]
    fn determinism(path in proptest::collection::vec(0u8..8, 1..6)) {
        let (mut heap, mut names, root) = setup();
        let interned: Vec<Name> = (0..8)
            .map(|i| names.intern(&format!("n{i}")))
            .collect();
        let mut first = root;
        let mut second = root;
        for &step in &path {
            first = layout::maybe_add_name(&mut heap, first, interned[step as usize]);
        }
        for &step in &path {
            second = layout::maybe_add_name(&mut heap, second, interned[step as usize]);
        }
        prop_assert_eq!(first, second);
    }
}
