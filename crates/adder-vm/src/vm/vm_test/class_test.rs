// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Classes, instances, inheritance and attribute dispatch.

use super::{run, run_err};

#[test]
fn instances_get_their_own_attributes() {
    let source = "class P:\n    pass\np = P()\np.x = 1\np.y = 2\n(p.x, p.y)";
    assert_eq!(run(source), "(1, 2)");
}

#[test]
fn instance_attributes_shadow_class_attributes() {
    let source = "class C:\n    a = 1\nc = C()\nc.a = 2\n(c.a, C.a)";
    assert_eq!(run(source), "(2, 1)");
}

#[test]
fn methods_dispatch_through_bases() {
    let source = "class A:\n    def who(self):\n        return \"a\"\nclass B(A):\n    pass\nB().who()";
    assert_eq!(run(source), "'a'");
}

#[test]
fn base_order_is_left_to_right() {
    let source = "class A:\n    def who(self):\n        return \"a\"\nclass B:\n    def who(self):\n        return \"b\"\nclass C(A, B):\n    pass\nC().who()";
    assert_eq!(run(source), "'a'");
}

#[test]
fn init_runs_on_construction() {
    let source = "class V:\n    def __init__(self, x):\n        self.x = x * 2\nV(21).x";
    assert_eq!(run(source), "42");
}

#[test]
fn isinstance_walks_the_base_chain() {
    let source = "class A:\n    pass\nclass B(A):\n    pass\n(isinstance(B(), A), isinstance(A(), B))";
    assert_eq!(run(source), "(True, False)");
}

#[test]
fn instances_share_layouts_when_built_alike() {
    // Same insertion order in __init__ means both instances settle on
    // the same hidden class; behaviour is observable through __dict__.
    let source = "class P:\n    def __init__(self):\n        self.a = 1\n        self.b = 2\np = P()\nq = P()\nq.a + q.b + p.a";
    assert_eq!(run(source), "4");
}

#[test]
fn attr_view_reads_and_writes_slots() {
    let source = "class P:\n    pass\np = P()\np.a = 1\nd = p.__dict__\nd[\"a\"]";
    assert_eq!(run(source), "1");
    let source = "class P:\n    pass\np = P()\np.__dict__[\"b\"] = 5\np.b";
    assert_eq!(run(source), "5");
}

#[test]
fn attr_view_delete_clears_the_slot() {
    let source = "class P:\n    pass\np = P()\np.a = 1\ndel p.__dict__[\"a\"]\nhasattr(p, \"a\")";
    assert_eq!(run(source), "False");
}

#[test]
fn deleted_attributes_raise() {
    let report = run_err("class P:\n    pass\np = P()\np.a = 1\ndel p.a\np.a");
    assert_eq!(report.class_name, "AttributeError");
}

#[test]
fn unknown_attribute_write_extends_the_layout() {
    let source = "class P:\n    pass\np = P()\np.a = 1\np.b = 2\np.a = 3\n(p.a, p.b)";
    assert_eq!(run(source), "(3, 2)");
}

#[test]
fn user_classes_can_subclass_exceptions() {
    let source = "class MyError(ValueError):\n    pass\ntry:\n    raise MyError(\"boom\")\nexcept ValueError as e:\n    result = str(e)\nresult";
    assert_eq!(run(source), "'boom'");
}

#[test]
fn type_builtin_returns_the_class() {
    assert_eq!(run("type(1) is int"), "True");
    assert_eq!(run("class C:\n    pass\ntype(C()) is C"), "True");
}
