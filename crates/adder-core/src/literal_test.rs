// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for integer-literal parsing.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use num_bigint::BigInt;
use num_traits::Num;
use proptest::prelude::*;

#[test]
fn small_decimal() {
    assert_eq!(parse_int_literal("0", 10), Some(IntLiteral::Small(0)));
    assert_eq!(parse_int_literal("42", 10), Some(IntLiteral::Small(42)));
    assert_eq!(
        parse_int_literal("1073741823", 10),
        Some(IntLiteral::Small(1_073_741_823))
    );
}

#[test]
fn boundary_promotes() {
    // One past IMMEDIATE_MAX must become a big integer.
    assert_eq!(
        parse_int_literal("1073741824", 10),
        Some(IntLiteral::Big(BigInt::from(1_073_741_824i64)))
    );
    // The classic 32-bit boundary is already heap-allocated.
    assert_eq!(
        parse_int_literal("2147483647", 10),
        Some(IntLiteral::Big(BigInt::from(2_147_483_647i64)))
    );
}

#[test]
fn hex() {
    assert_eq!(parse_int_literal("ff", 16), Some(IntLiteral::Small(255)));
    assert_eq!(
        parse_int_literal("ffffffffffffffff", 16),
        Some(IntLiteral::Big(
            BigInt::from_str_radix("ffffffffffffffff", 16).unwrap()
        ))
    );
}

#[test]
fn unbounded_magnitude() {
    let text = "123456789012345678901234567890";
    let parsed = parse_int_literal(text, 10).unwrap();
    match parsed {
        IntLiteral::Big(b) => assert_eq!(b.to_string(), text),
        IntLiteral::Small(_) => panic!("expected big integer"),
    }
}

#[test]
fn invalid_digits() {
    assert_eq!(parse_int_literal("12x", 10), None);
    assert_eq!(parse_int_literal("", 10), None);
}

proptest! {
    #[test]
    fn small_iff_in_range(n in proptest::num::i64::ANY) {
        let text = n.unsigned_abs().to_string();
        let Some(parsed) = parse_int_literal(&text, 10) else {
            return Err(TestCaseError::fail("decimal text must parse"));
        };
        let magnitude = i64::try_from(n.unsigned_abs()).ok();
        match parsed {
            IntLiteral::Small(v) => {
                prop_assert_eq!(Some(i64::from(v)), magnitude);
                prop_assert!(fits_immediate(i64::from(v)));
            }
            IntLiteral::Big(_) => {
                prop_assert!(magnitude.is_none_or(|m| !fits_immediate(m)));
            }
        }
    }
}
