// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Integer-literal parsing.
//!
//! Integers of unbounded magnitude are accepted; values that fit the
//! 31-bit immediate range stay as machine integers, everything else
//! becomes a big integer.

use num_bigint::BigInt;
use num_traits::Num;

/// Smallest integer representable as an immediate value.
pub const IMMEDIATE_MIN: i64 = -(1 << 30);

/// Largest integer representable as an immediate value.
pub const IMMEDIATE_MAX: i64 = (1 << 30) - 1;

/// Returns true if `value` fits the signed 31-bit immediate range.
#[must_use]
pub const fn fits_immediate(value: i64) -> bool {
    value >= IMMEDIATE_MIN && value <= IMMEDIATE_MAX
}

/// A parsed integer literal, split by representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntLiteral {
    /// Fits the immediate range.
    Small(i32),
    /// Needs heap allocation.
    Big(BigInt),
}

/// Parse an integer literal in the given radix (10 or 16).
///
/// The text must not include a sign or a radix prefix. Returns `None`
/// when the text contains a digit invalid for the radix.
#[must_use]
pub fn parse_int_literal(text: &str, radix: u32) -> Option<IntLiteral> {
    debug_assert!(radix == 10 || radix == 16);
    if text.is_empty() {
        return None;
    }
    if let Ok(small) = i64::from_str_radix(text, radix) {
        if fits_immediate(small) {
            // Immediate range is a subset of i32.
            return Some(IntLiteral::Small(small as i32));
        }
        return Some(IntLiteral::Big(BigInt::from(small)));
    }
    BigInt::from_str_radix(text, radix).ok().map(IntLiteral::Big)
}
