// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Generators: suspension, resumption, exhaustion.

use super::{run, run_err};

#[test]
fn generators_yield_in_order() {
    let source = "def g():\n    yield 1\n    yield 2\n    yield 3\nr = []\nfor x in g():\n    r.append(x)\nr";
    assert_eq!(run(source), "[1, 2, 3]");
}

#[test]
fn calling_a_generator_function_runs_no_body_code() {
    let source = "hit = []\ndef g():\n    hit.append(1)\n    yield 1\nit = g()\nhit";
    assert_eq!(run(source), "[]");
}

#[test]
fn next_delivers_one_value_at_a_time() {
    let source = "def g():\n    yield \"a\"\n    yield \"b\"\nit = g()\n(it.next(), it.next())";
    assert_eq!(run(source), "('a', 'b')");
}

#[test]
fn locals_survive_suspension() {
    let source = "def squares(limit):\n    i = 0\n    while i < limit:\n        yield i * i\n        i = i + 1\nr = []\nfor v in squares(4):\n    r.append(v)\nr";
    assert_eq!(run(source), "[0, 1, 4, 9]");
}

#[test]
fn exhausted_generators_raise_stop_iteration() {
    let source = "def g():\n    yield 1\nit = g()\nit.next()\nit.next()";
    let report = run_err(source);
    assert_eq!(report.class_name, "StopIteration");
}

#[test]
fn finished_generators_stay_finished() {
    let source = "def g():\n    yield 1\nit = g()\nit.next()\ntry:\n    it.next()\nexcept StopIteration:\n    pass\ntry:\n    it.next()\nexcept StopIteration:\n    r = \"still stopped\"\nr";
    assert_eq!(run(source), "'still stopped'");
}

#[test]
fn generators_are_their_own_iterators() {
    let source = "def g():\n    yield 5\nit = g()\nit.__iter__() is it";
    assert_eq!(run(source), "True");
}

#[test]
fn independent_instances_do_not_share_state() {
    let source = "def g():\n    yield 1\n    yield 2\na = g()\nb = g()\n(a.next(), b.next(), a.next())";
    assert_eq!(run(source), "(1, 1, 2)");
}

#[test]
fn exceptions_inside_generators_finish_them() {
    let source = "def g():\n    yield 1\n    raise ValueError(\"inside\")\nit = g()\nit.next()\ntry:\n    it.next()\nexcept ValueError:\n    pass\ntry:\n    it.next()\nexcept StopIteration:\n    r = \"finished\"\nr";
    assert_eq!(run(source), "'finished'");
}

#[test]
fn yield_inside_loops_interleaves_with_the_caller() {
    let source = "def g(xs):\n    for x in xs:\n        yield x + 100\nout = []\nfor v in g((1, 2)):\n    out.append(v)\nout";
    assert_eq!(run(source), "[101, 102]");
}
