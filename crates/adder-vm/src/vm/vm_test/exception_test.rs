// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Exceptions: raising, matching, finally on every exit path.

use super::{run, run_err};

#[test]
fn raise_and_catch_by_class() {
    let source = "try:\n    raise ValueError(\"boom\")\nexcept ValueError as e:\n    r = str(e)\nr";
    assert_eq!(run(source), "'boom'");
}

#[test]
fn handlers_match_in_order() {
    let source = "try:\n    raise KeyError(\"k\")\nexcept ValueError:\n    r = 1\nexcept KeyError:\n    r = 2\nexcept:\n    r = 3\nr";
    assert_eq!(run(source), "2");
}

#[test]
fn bare_except_catches_everything() {
    let source = "try:\n    raise RuntimeError(\"x\")\nexcept:\n    r = \"caught\"\nr";
    assert_eq!(run(source), "'caught'");
}

#[test]
fn unmatched_exceptions_keep_unwinding() {
    let report = run_err("try:\n    raise KeyError(\"k\")\nexcept ValueError:\n    pass\n");
    assert_eq!(report.class_name, "KeyError");
}

#[test]
fn base_classes_match_derived_exceptions() {
    let source = "try:\n    raise KeyError(\"k\")\nexcept Exception:\n    r = \"base\"\nr";
    assert_eq!(run(source), "'base'");
}

#[test]
fn else_runs_only_without_exception() {
    let source = "r = []\ntry:\n    r.append(1)\nexcept ValueError:\n    r.append(2)\nelse:\n    r.append(3)\nr";
    assert_eq!(run(source), "[1, 3]");
}

#[test]
fn raising_a_class_instantiates_it() {
    let report = run_err("raise ValueError");
    assert_eq!(report.class_name, "ValueError");
}

#[test]
fn raising_a_non_exception_is_a_type_error() {
    let report = run_err("raise 1");
    assert_eq!(report.class_name, "TypeError");
    assert!(report.message.contains("derive from Exception"));
}

#[test]
fn exceptions_cross_frames() {
    let source = "def inner():\n    raise ValueError(\"deep\")\ndef outer():\n    inner()\ntry:\n    outer()\nexcept ValueError as e:\n    r = str(e)\nr";
    assert_eq!(run(source), "'deep'");
}

// --- finally runs exactly once on every exit path ---

#[test]
fn finally_on_fall_through() {
    let source = "r = []\ntry:\n    r.append(1)\nfinally:\n    r.append(2)\nr";
    assert_eq!(run(source), "[1, 2]");
}

#[test]
fn finally_on_raise_then_reraises() {
    let source = "r = []\ntry:\n    try:\n        raise ValueError(\"x\")\n    finally:\n        r.append(1)\nexcept ValueError:\n    r.append(2)\nr";
    assert_eq!(run(source), "[1, 2]");
}

#[test]
fn finally_on_return() {
    let source = "r = []\ndef f():\n    try:\n        return \"v\"\n    finally:\n        r.append(1)\n(f(), r)";
    assert_eq!(run(source), "('v', [1])");
}

#[test]
fn finally_on_break_and_continue() {
    let source = "out = []\nfor i in (1, 2, 3):\n    try:\n        if i == 2:\n            continue\n        if i == 3:\n            break\n        out.append(i)\n    finally:\n        out.append(10 * i)\nout";
    assert_eq!(run(source), "[1, 10, 20, 30]");
}

#[test]
fn nested_finallys_run_inner_first() {
    let source = "r = []\ndef f():\n    try:\n        try:\n            return 1\n        finally:\n            r.append(\"inner\")\n    finally:\n        r.append(\"outer\")\nf()\nr";
    assert_eq!(run(source), "['inner', 'outer']");
}

#[test]
fn except_and_finally_compose() {
    let source = "r = []\ntry:\n    raise ValueError(\"x\")\nexcept ValueError:\n    r.append(1)\nfinally:\n    r.append(2)\nr";
    assert_eq!(run(source), "[1, 2]");
}

#[test]
fn exception_inside_finally_wins() {
    let report = run_err(
        "try:\n    raise ValueError(\"first\")\nfinally:\n    raise KeyError(\"second\")\n",
    );
    assert_eq!(report.class_name, "KeyError");
}

#[test]
fn uncaught_exceptions_report_position() {
    let report = run_err("x = 1\nraise ValueError(\"pos\")\n");
    assert_eq!(report.pos.line, 2);
    assert_eq!(report.file, "<test>");
}

#[test]
fn assertions_raise_assertion_error() {
    let report = run_err("assert 1 == 2, \"math broke\"");
    assert_eq!(report.class_name, "AssertionError");
    assert_eq!(report.message, "math broke");
    assert_eq!(run("assert 1 == 1\n\"ok\""), "'ok'");
}

#[test]
fn name_errors_for_missing_globals() {
    let report = run_err("missing");
    assert_eq!(report.class_name, "NameError");
    assert!(report.message.contains("missing"));
}

#[test]
fn index_and_key_errors() {
    assert_eq!(run_err("[1, 2][5]").class_name, "IndexError");
    assert_eq!(run_err("{1: 2}[3]").class_name, "KeyError");
}
