// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the value tagging scheme.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use adder_core::{IMMEDIATE_MAX, IMMEDIATE_MIN};
use proptest::prelude::*;

#[test]
fn small_int_round_trip() {
    for value in [0, 1, -1, 42, -42, IMMEDIATE_MAX as i32, IMMEDIATE_MIN as i32] {
        let tagged = Value::small_int(value);
        assert!(tagged.is_small_int());
        assert_eq!(tagged.as_small_int(), Some(value));
        assert_eq!(tagged.as_cell(), None);
    }
}

#[test]
fn cell_round_trip() {
    for index in [0u32, 1, 7, u32::MAX / 2] {
        let id = CellId::from_index(index);
        let tagged = Value::cell(id);
        assert!(!tagged.is_small_int());
        assert_eq!(tagged.as_cell(), Some(id));
        assert_eq!(tagged.as_small_int(), None);
    }
}

#[test]
fn identity_compares_by_representation() {
    assert_eq!(Value::small_int(5), Value::small_int(5));
    assert_ne!(Value::small_int(5), Value::small_int(6));
    let id = CellId::from_index(3);
    assert_eq!(Value::cell(id), Value::cell(id));
    assert_ne!(Value::cell(id), Value::cell(CellId::from_index(4)));
    // An immediate never compares equal to a cell reference.
    assert_ne!(Value::small_int(3), Value::cell(CellId::from_index(3)));
}

proptest! {
    #[test]
    fn tagging_is_lossless(value in (IMMEDIATE_MIN as i32)..=(IMMEDIATE_MAX as i32)) {
        let tagged = Value::small_int(value);
        prop_assert_eq!(tagged.as_small_int(), Some(value));
    }
}
