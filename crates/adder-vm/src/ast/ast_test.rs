// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for AST printing: `parse(x.to_string())` prints identically.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::reader::parse_module;
use adder_core::Input;

/// Parse, print, re-parse, re-print; both prints must agree and the
/// re-parsed tree must equal the first.
fn round_trip(source: &str) {
    let first = parse_module(&Input::new("<test>", source)).expect("parse error");
    let printed = first.to_string();
    let second = parse_module(&Input::new("<round-trip>", &printed))
        .unwrap_or_else(|error| panic!("re-parse failed: {error}\n--- printed ---\n{printed}"));
    assert_eq!(first, second, "tree changed through printing:\n{printed}");
    assert_eq!(printed, second.to_string());
}

#[test]
fn literals_and_operators() {
    round_trip("x = 1 + 2 * 3\n");
    round_trip("y = 2 ** 4 - 1\n");
    round_trip("z = 0x1f | 1 << 4\n");
    round_trip("f = 1.5\n");
    round_trip("s = \"a\\tb\"\n");
    round_trip("b = not a and (c or d)\n");
    round_trip("t = a is not b\n");
    round_trip("u = a not in b\n");
}

#[test]
fn displays() {
    round_trip("t = (1, 2, 3)\n");
    round_trip("one = (1,)\n");
    round_trip("empty = ()\n");
    round_trip("l = [1, [2], []]\n");
    round_trip("d = {1: \"a\", 2: \"b\"}\n");
}

#[test]
fn trailers() {
    round_trip("v = a.b.c[1](2, 3)\n");
    round_trip("w = xs[1:2:3]\n");
    round_trip("x = xs[:2]\n");
}

#[test]
fn statements() {
    round_trip("pass\n");
    round_trip("a = 1\nb = a\ndel b\n");
    round_trip("a += 1\n");
    round_trip("assert x, \"message\"\n");
    round_trip("import a, b\nfrom c import d\n");
    round_trip("raise ValueError(\"x\")\n");
}

#[test]
fn control_flow() {
    round_trip("if a:\n    b\nelif c:\n    d\nelse:\n    e\n");
    round_trip("while a:\n    break\nelse:\n    pass\n");
    round_trip("for i in xs:\n    continue\n");
    round_trip("try:\n    a\nexcept ValueError as e:\n    b\nexcept:\n    c\nfinally:\n    d\n");
}

#[test]
fn definitions() {
    round_trip("def f(a, b=1, *rest):\n    return a\n");
    round_trip("def g():\n    yield 1\n");
    round_trip("class Foo(Base):\n    a = 1\n    def m(self):\n        return self.a\n");
    round_trip("f = lambda a, b: a + b\n");
    round_trip("def outer():\n    x = 1\n    def inner():\n        nonlocal x\n        x = 2\n    global g\n");
}

#[test]
fn comprehension() {
    round_trip("ys = [x * 2 for x in xs if x]\n");
}

#[test]
fn conditional_expression() {
    round_trip("v = a if b else c\n");
}
