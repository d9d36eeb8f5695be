// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Loops, iteration and comprehensions.

use super::run;

#[test]
fn while_loops() {
    let source = "i = 0\ntotal = 0\nwhile i < 5:\n    total = total + i\n    i = i + 1\ntotal";
    assert_eq!(run(source), "10");
}

#[test]
fn while_else_runs_without_break() {
    let source = "r = 0\nwhile 0:\n    r = 1\nelse:\n    r = 2\nr";
    assert_eq!(run(source), "2");
}

#[test]
fn break_skips_the_else() {
    let source = "r = 0\ni = 0\nwhile i < 5:\n    i = i + 1\n    if i == 3:\n        break\nelse:\n    r = 99\n(i, r)";
    assert_eq!(run(source), "(3, 0)");
}

#[test]
fn continue_restarts_the_loop() {
    let source = "total = 0\nfor i in (1, 2, 3, 4):\n    if i % 2:\n        continue\n    total = total + i\ntotal";
    assert_eq!(run(source), "6");
}

#[test]
fn for_unpacks_target_lists() {
    let source = "ks = []\nvs = []\nfor k, v in ((1, 2), (3, 4)):\n    ks.append(k)\n    vs.append(v)\n(ks, vs)";
    assert_eq!(run(source), "([1, 3], [2, 4])");
}

#[test]
fn for_else_runs_on_exhaustion() {
    let source = "r = 0\nfor i in (1, 2):\n    pass\nelse:\n    r = 7\nr";
    assert_eq!(run(source), "7");
}

#[test]
fn iteration_over_strings_and_dicts() {
    let source = "cs = []\nfor c in \"abc\":\n    cs.append(c)\ncs";
    assert_eq!(run(source), "['a', 'b', 'c']");
    let source = "ks = []\nd = {1: \"a\", 2: \"b\"}\nfor k in d:\n    ks.append(k)\nks";
    assert_eq!(run(source), "[1, 2]");
}

#[test]
fn list_comprehension() {
    assert_eq!(run("[x * 2 for x in (1, 2, 3)]"), "[2, 4, 6]");
    assert_eq!(run("[x for x in (1, 2, 3, 4) if x % 2]"), "[1, 3]");
}

#[test]
fn comprehension_has_its_own_scope() {
    let source = "x = 99\nys = [x for x in (1, 2)]\n(x, ys)";
    assert_eq!(run(source), "(99, [1, 2])");
}

#[test]
fn nested_loops() {
    let source = "pairs = []\nfor i in (1, 2):\n    for j in (3, 4):\n        pairs.append((i, j))\npairs";
    assert_eq!(run(source), "[(1, 3), (1, 4), (2, 3), (2, 4)]");
}
