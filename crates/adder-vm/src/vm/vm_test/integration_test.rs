// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The end-to-end scenarios every build must keep passing.

use super::{run, run_err};

#[test]
fn pass_evaluates_to_none() {
    assert_eq!(run("pass"), "None");
}

#[test]
fn power_binds_tighter_than_subtraction() {
    assert_eq!(run("2 ** 4 - 1"), "15");
}

#[test]
fn defaults_and_rest_parameters() {
    let prefix = "def f(x=1, *y):\n    return (x, y)\n";
    assert_eq!(run(&format!("{prefix}f()")), "(1, ())");
    assert_eq!(run(&format!("{prefix}f(3)")), "(3, ())");
    assert_eq!(run(&format!("{prefix}f(1, 2)")), "(1, (2,))");
}

#[test]
fn class_attributes_resolve_through_the_class() {
    assert_eq!(run("class Foo:\n    a = 1\nFoo().a"), "1");
}

#[test]
fn for_loops_build_lists() {
    assert_eq!(
        run("a = []\nfor i in (1, 2, 3): a.append(i + 1)\na"),
        "[2, 3, 4]"
    );
}

#[test]
fn integer_overflow_promotes_transparently() {
    assert_eq!(run("2147483647 + 1"), "2147483648");
}

#[test]
fn unpack_length_mismatch_raises_value_error() {
    let report = run_err("a, b = (1,)");
    assert_eq!(report.class_name, "ValueError");
    assert!(report.message.contains("wrong number of values to unpack"));
}

#[test]
fn missing_attribute_names_the_class() {
    let report = run_err("(1).xyz");
    assert_eq!(report.class_name, "AttributeError");
    assert!(report.message.contains("int"));
    assert!(report.message.contains("xyz"));
}
