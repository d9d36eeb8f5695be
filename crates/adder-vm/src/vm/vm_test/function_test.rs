// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Calls, parameter binding, closures and lambdas.

use super::{run, run_err};

#[test]
fn simple_call() {
    assert_eq!(run("def f(a, b):\n    return a + b\nf(1, 2)"), "3");
}

#[test]
fn functions_return_none_without_return() {
    assert_eq!(run("def f():\n    1\nf()"), "None");
}

#[test]
fn wrong_argument_count_raises_type_error() {
    let report = run_err("def f(a):\n    return a\nf()");
    assert_eq!(report.class_name, "TypeError");
    let report = run_err("def f(a):\n    return a\nf(1, 2)");
    assert_eq!(report.class_name, "TypeError");
}

#[test]
fn calling_a_non_callable_raises() {
    let report = run_err("x = 1\nx()");
    assert_eq!(report.class_name, "TypeError");
    assert!(report.message.contains("not callable"));
}

#[test]
fn recursion() {
    let source = "def fac(n):\n    if n <= 1:\n        return 1\n    return n * fac(n - 1)\nfac(10)";
    assert_eq!(run(source), "3628800");
}

#[test]
fn lambdas_are_first_class() {
    assert_eq!(run("f = lambda a, b=10: a + b\nf(1)"), "11");
    assert_eq!(run("(lambda: 42)()"), "42");
}

#[test]
fn closures_capture_the_defining_environment() {
    let source = "def adder(n):\n    return lambda x: x + n\nadd3 = adder(3)\nadd3(4)";
    assert_eq!(run(source), "7");
}

#[test]
fn nonlocal_rebinds_the_enclosing_scope() {
    let source = "def counter():\n    c = 0\n    def inc():\n        nonlocal c\n        c = c + 1\n        return c\n    return inc\nf = counter()\nf()\nf()";
    assert_eq!(run(source), "2");
}

#[test]
fn global_declaration_writes_the_module() {
    let source = "g = 1\ndef bump():\n    global g\n    g = g + 1\nbump()\nbump()\ng";
    assert_eq!(run(source), "3");
}

#[test]
fn two_closures_share_one_environment() {
    let source = "def pair():\n    c = 0\n    def inc():\n        nonlocal c\n        c = c + 1\n        return c\n    def get():\n        return c\n    return (inc, get)\ninc, get = pair()\ninc()\nget()";
    assert_eq!(run(source), "1");
}

#[test]
fn methods_bind_self_through_the_fast_path() {
    let source = "class Box:\n    def __init__(self, v):\n        self.v = v\n    def get(self):\n        return self.v\nBox(9).get()";
    assert_eq!(run(source), "9");
}
