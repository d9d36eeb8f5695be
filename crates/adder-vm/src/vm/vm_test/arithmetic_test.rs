// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Numeric semantics: the immediate fast path, promotion, floats.

use super::{run, run_err};

#[test]
fn integer_arithmetic() {
    assert_eq!(run("1 + 2"), "3");
    assert_eq!(run("10 - 3 * 2"), "4");
    assert_eq!(run("7 / 2"), "3");
    assert_eq!(run("7 // 2"), "3");
    assert_eq!(run("-7 // 2"), "-4");
    assert_eq!(run("7 % 3"), "1");
    assert_eq!(run("-7 % 3"), "2");
    assert_eq!(run("2 ** 10"), "1024");
}

#[test]
fn bitwise_operators() {
    assert_eq!(run("6 & 3"), "2");
    assert_eq!(run("6 | 3"), "7");
    assert_eq!(run("6 ^ 3"), "5");
    assert_eq!(run("1 << 10"), "1024");
    assert_eq!(run("1024 >> 3"), "128");
    assert_eq!(run("~5"), "-6");
}

#[test]
fn unary_operators() {
    assert_eq!(run("-5"), "-5");
    assert_eq!(run("+5"), "5");
    assert_eq!(run("--5"), "5");
}

#[test]
fn big_integer_round_trip() {
    // In and back out of the heap representation.
    assert_eq!(run("1073741823 + 1"), "1073741824");
    assert_eq!(run("1073741824 - 1"), "1073741823");
    assert_eq!(
        run("123456789012345678901234567890 + 1"),
        "123456789012345678901234567891"
    );
    assert_eq!(run("2 ** 100"), "1267650600228229401496703205376");
}

#[test]
fn shifts_promote() {
    assert_eq!(run("1 << 40"), "1099511627776");
}

#[test]
fn float_arithmetic() {
    assert_eq!(run("1.5 + 2.5"), "4.0");
    assert_eq!(run("1 + 0.5"), "1.5");
    assert_eq!(run("7.0 // 2"), "3.0");
    assert_eq!(run("2 ** -1"), "0.5");
}

#[test]
fn comparisons() {
    assert_eq!(run("1 < 2"), "True");
    assert_eq!(run("2 <= 1"), "False");
    assert_eq!(run("1 == 1.0"), "True");
    assert_eq!(run("1 != 2"), "True");
    assert_eq!(run("2 ** 40 > 2 ** 39"), "True");
}

#[test]
fn division_by_zero_raises() {
    let report = run_err("1 / 0");
    assert_eq!(report.class_name, "ValueError");
    assert!(report.message.contains("division by zero"));
}

#[test]
fn mixed_type_operands_raise_type_error() {
    let report = run_err("1 + \"x\"");
    assert_eq!(report.class_name, "TypeError");
}

#[test]
fn booleans_are_integers() {
    assert_eq!(run("True + 1"), "2");
    assert_eq!(run("False * 10"), "0");
    assert_eq!(run("True == 1"), "True");
}

#[test]
fn short_circuit_keeps_operand_values() {
    assert_eq!(run("0 or 5"), "5");
    assert_eq!(run("3 or 5"), "3");
    assert_eq!(run("0 and 5"), "0");
    assert_eq!(run("3 and 5"), "5");
    assert_eq!(run("not 0"), "True");
}

#[test]
fn identity_and_containment() {
    assert_eq!(run("a = []\nb = a\na is b"), "True");
    assert_eq!(run("[] is []"), "False");
    assert_eq!(run("2 in (1, 2, 3)"), "True");
    assert_eq!(run("5 not in (1, 2, 3)"), "True");
}

#[test]
fn conditional_expression() {
    assert_eq!(run("1 if 0 else 2"), "2");
    assert_eq!(run("1 if 5 else 2"), "1");
}
