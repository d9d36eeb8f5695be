// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Built-in container and string behaviour.

use super::{run, run_err};

#[test]
fn string_operations() {
    assert_eq!(run("\"ab\" + \"cd\""), "'abcd'");
    assert_eq!(run("\"ab\" * 3"), "'ababab'");
    assert_eq!(run("len(\"hello\")"), "5");
    assert_eq!(run("\"hello\"[1]"), "'e'");
    assert_eq!(run("\"hello\"[-1]"), "'o'");
    assert_eq!(run("\"ell\" in \"hello\""), "True");
    assert_eq!(run("\"a\" < \"b\""), "True");
    assert_eq!(run("\"a\" == \"a\""), "True");
}

#[test]
fn string_slicing() {
    assert_eq!(run("\"hello\"[1:4]"), "'ell'");
    assert_eq!(run("\"hello\"[:2]"), "'he'");
    assert_eq!(run("\"hello\"[::2]"), "'hlo'");
    assert_eq!(run("\"hello\"[::-1]"), "'olleh'");
}

#[test]
fn tuple_operations() {
    assert_eq!(run("(1, 2) + (3,)"), "(1, 2, 3)");
    assert_eq!(run("(1, 2) * 2"), "(1, 2, 1, 2)");
    assert_eq!(run("len((1, 2, 3))"), "3");
    assert_eq!(run("(1, 2, 3)[1]"), "2");
    assert_eq!(run("(1, 2, 3)[-1:]"), "(3,)");
    assert_eq!(run("(1, 2) == (1, 2)"), "True");
    assert_eq!(run("(1, 2) == (1, 3)"), "False");
}

#[test]
fn list_operations() {
    assert_eq!(run("a = [1]\na.append(2)\na"), "[1, 2]");
    assert_eq!(run("a = [1, 2, 3]\na[1] = 9\na"), "[1, 9, 3]");
    assert_eq!(run("a = [1, 2, 3]\ndel a[0]\na"), "[2, 3]");
    assert_eq!(run("[1, 2] + [3]"), "[1, 2, 3]");
    assert_eq!(run("[1, 2, 3][::-1]"), "[3, 2, 1]");
    assert_eq!(run("2 in [1, 2]"), "True");
}

#[test]
fn list_in_place_add_keeps_identity() {
    let source = "a = [1]\nb = a\na += [2]\n(a is b, a)";
    assert_eq!(run(source), "(True, [1, 2])");
}

#[test]
fn negative_indices_wrap_once() {
    assert_eq!(run("[1, 2, 3][-2]"), "2");
    assert_eq!(run_err("[1, 2, 3][-4]").class_name, "IndexError");
}

#[test]
fn dict_operations() {
    let source = "d = {1: \"a\"}\nd[2] = \"b\"\nd[1] = \"c\"\n(d[1], d[2], len(d))";
    assert_eq!(run(source), "('c', 'b', 2)");
    assert_eq!(run("d = {1: 2}\ndel d[1]\nlen(d)"), "0");
    assert_eq!(run("1 in {1: 2}"), "True");
    assert_eq!(run("{1: 2}.get(5, \"fallback\")"), "'fallback'");
}

#[test]
fn dict_keys_dispatch_user_hash_and_eq() {
    let source = "class K:\n    def __init__(self, n):\n        self.n = n\n    def __hash__(self):\n        return self.n % 2\n    def __eq__(self, other):\n        return self.n == other.n\nd = {}\nd[K(1)] = \"one\"\nd[K(3)] = \"three\"\n(d[K(1)], d[K(3)], len(d))";
    assert_eq!(run(source), "('one', 'three', 2)");
}

#[test]
fn dict_iteration_snapshots_key_order() {
    let source = "d = {1: \"a\", 2: \"b\"}\nseen = []\nfor k in d:\n    seen.append(k)\n    d[10 + k] = \"new\"\nseen";
    assert_eq!(run(source), "[1, 2]");
}

#[test]
fn tuples_hash_by_elements() {
    let source = "d = {}\nd[(1, 2)] = \"pair\"\nd[(1, 2)]";
    assert_eq!(run(source), "'pair'");
    assert_eq!(run_err("d = {}\nd[[1]] = 1").class_name, "TypeError");
}

#[test]
fn sets_deduplicate() {
    let source = "s = set((1, 2))\ns.add(2)\ns.add(3)\n(len(s), 2 in s, 5 in s)";
    assert_eq!(run(source), "(3, True, False)");
}

#[test]
fn builtin_constructors() {
    assert_eq!(run("int(\"42\")"), "42");
    assert_eq!(run("int(3.9)"), "3");
    assert_eq!(run("float(2)"), "2.0");
    assert_eq!(run("str(42)"), "'42'");
    assert_eq!(run("bool(\"\")"), "False");
    assert_eq!(run("bool(7)"), "True");
    assert_eq!(run("list((1, 2))"), "[1, 2]");
    assert_eq!(run("tuple([1, 2])"), "(1, 2)");
    assert_eq!(run_err("int(\"4x2\")").class_name, "ValueError");
}

#[test]
fn hasattr_and_repr() {
    assert_eq!(run("hasattr(\"x\", \"__len__\")"), "True");
    assert_eq!(run("hasattr(1, \"append\")"), "False");
    assert_eq!(run("repr(\"a\")"), "'\\'a\\''");
    assert_eq!(run("repr((1,))"), "'(1,)'");
}

#[test]
fn bool_hashes_like_int() {
    let source = "d = {}\nd[1] = \"int\"\nd[True] = \"bool\"\n(len(d), d[1])";
    assert_eq!(run(source), "(1, 'bool')");
}

#[test]
fn slices_clamp_out_of_range_bounds() {
    assert_eq!(run("[1, 2, 3][1:100]"), "[2, 3]");
    assert_eq!(run("[1, 2, 3][-100:2]"), "[1, 2]");
    assert_eq!(run_err("[1, 2, 3][::0]").class_name, "ValueError");
}
