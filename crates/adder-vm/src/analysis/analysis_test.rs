// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the definition finder.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::reader::parse_module;
use adder_core::Input;

fn defs(source: &str) -> Definitions {
    let syntax = parse_module(&Input::new("<test>", source)).expect("parse error");
    find_definitions(&syntax).expect("analysis error")
}

fn defs_err(source: &str) -> String {
    let syntax = parse_module(&Input::new("<test>", source)).expect("parse error");
    find_definitions(&syntax).expect_err("expected analysis error").message
}

#[test]
fn assignments_define_names_in_order() {
    let found = defs("b = 1\na = 2\nb = 3\n");
    assert_eq!(found.names, vec!["b", "a"]);
}

#[test]
fn target_lists_and_for_targets() {
    let found = defs("a, b = c\nfor i, j in pairs:\n    pass\n");
    assert_eq!(found.names, vec!["a", "b", "i", "j"]);
}

#[test]
fn defs_classes_and_imports_define() {
    let found = defs("def f():\n    pass\nclass C:\n    pass\nimport m\nfrom n import x\n");
    assert_eq!(found.names, vec!["f", "C", "m", "x"]);
    assert!(found.has_nested);
}

#[test]
fn nested_bodies_are_not_entered() {
    let found = defs("def f():\n    inner = 1\n");
    assert_eq!(found.names, vec!["f"]);
}

#[test]
fn reads_do_not_define() {
    let found = defs("a = b + c\n");
    assert_eq!(found.names, vec!["a"]);
}

#[test]
fn augmented_assignment_defines() {
    let found = defs("a += 1\n");
    assert_eq!(found.names, vec!["a"]);
}

#[test]
fn except_as_defines() {
    let found = defs("try:\n    pass\nexcept ValueError as e:\n    pass\n");
    assert_eq!(found.names, vec!["e"]);
}

#[test]
fn lambdas_and_comprehensions_force_environments() {
    assert!(defs("f = lambda: 1\n").has_nested);
    assert!(defs("ys = [x for x in xs]\n").has_nested);
    assert!(!defs("a = 1\n").has_nested);
}

#[test]
fn global_declarations_are_tracked() {
    let found = defs("global a, b\na = 1\n");
    assert_eq!(found.globals, vec!["a", "b"]);
    // Declared names are not locals.
    assert!(found.names.is_empty());
}

#[test]
fn declaration_after_assignment_is_an_error() {
    assert!(defs_err("a = 1\nglobal a\n").contains("assigned to before declaration"));
    assert!(defs_err("b = 1\nnonlocal b\n").contains("assigned to before declaration"));
}

#[test]
fn global_and_nonlocal_conflict_is_an_error() {
    assert!(defs_err("global a\nnonlocal a\n").contains("nonlocal and global"));
}

#[test]
fn target_names_collects_in_order() {
    let syntax = parse_module(&Input::new("<test>", "a, (b, c) = x\n")).expect("parse error");
    let Syn::Block(stmts) = &syntax.kind else {
        panic!("expected block");
    };
    let Syn::Assign { target, .. } = &stmts[0].kind else {
        panic!("expected assignment");
    };
    assert_eq!(target_names(target), vec!["a", "b", "c"]);
}
