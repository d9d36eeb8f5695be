// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The numeric tower: immediate integers, big integers, floats, bools.
//!
//! One set of native methods serves `int`, `float` and (through
//! inheritance from `int`) `bool`. Integer results normalize back to the
//! immediate representation whenever they fit; overflow promotes to a
//! heap big integer transparently.

use crate::ast::{BinaryOp, CompareOp, UnaryOp};
use crate::value::Value;
use crate::vm::{Num, Raise, Vm};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

/// Integer fast path for two machine integers.
pub(crate) fn int_op(vm: &mut Vm, op: BinaryOp, left: i64, right: i64) -> Result<Value, Raise> {
    match op {
        BinaryOp::Add => match left.checked_add(right) {
            Some(sum) => Ok(vm.int_from_i64(sum)),
            None => Ok(vm.int_from_big(BigInt::from(left) + BigInt::from(right))),
        },
        BinaryOp::Sub => match left.checked_sub(right) {
            Some(difference) => Ok(vm.int_from_i64(difference)),
            None => Ok(vm.int_from_big(BigInt::from(left) - BigInt::from(right))),
        },
        BinaryOp::Mul => match left.checked_mul(right) {
            Some(product) => Ok(vm.int_from_i64(product)),
            None => {
                let product = BigInt::from(left) * BigInt::from(right);
                Ok(vm.int_from_big(product))
            }
        },
        BinaryOp::Div | BinaryOp::FloorDiv => {
            if right == 0 {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "integer division by zero"));
            }
            Ok(vm.int_from_i64(floor_div(left, right)))
        }
        BinaryOp::Mod => {
            if right == 0 {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "integer modulo by zero"));
            }
            Ok(vm.int_from_i64(floor_mod(left, right)))
        }
        BinaryOp::Pow => {
            if right < 0 {
                return Ok(vm.float_value((left as f64).powf(right as f64)));
            }
            let Ok(exponent) = u32::try_from(right) else {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "exponent too large"));
            };
            match left.checked_pow(exponent) {
                Some(power) => Ok(vm.int_from_i64(power)),
                None => {
                    let power = num_traits::pow(BigInt::from(left), exponent as usize);
                    Ok(vm.int_from_big(power))
                }
            }
        }
        BinaryOp::BitOr => Ok(vm.int_from_i64(left | right)),
        BinaryOp::BitXor => Ok(vm.int_from_i64(left ^ right)),
        BinaryOp::BitAnd => Ok(vm.int_from_i64(left & right)),
        BinaryOp::LShift => {
            if right < 0 {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "negative shift count"));
            }
            if right < 32 && left.unsigned_abs() < (1 << 30) {
                Ok(vm.int_from_i64(left << right))
            } else {
                let Ok(shift) = usize::try_from(right) else {
                    let class = vm.builtins.value_error;
                    return Err(vm.raise(class, "shift count too large"));
                };
                Ok(vm.int_from_big(BigInt::from(left) << shift))
            }
        }
        BinaryOp::RShift => {
            if right < 0 {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "negative shift count"));
            }
            let shift = u32::try_from(right).unwrap_or(63).min(63);
            Ok(vm.int_from_i64(left >> shift))
        }
    }
}

const fn floor_div(left: i64, right: i64) -> i64 {
    let quotient = left / right;
    let remainder = left % right;
    if remainder != 0 && (remainder < 0) != (right < 0) {
        quotient - 1
    } else {
        quotient
    }
}

const fn floor_mod(left: i64, right: i64) -> i64 {
    let remainder = left % right;
    if remainder != 0 && (remainder < 0) != (right < 0) {
        remainder + right
    } else {
        remainder
    }
}

fn big_floor_div(left: &BigInt, right: &BigInt) -> BigInt {
    let quotient = left / right;
    let remainder = left % right;
    if !remainder.is_zero() && (remainder.is_negative() != right.is_negative()) {
        quotient - 1
    } else {
        quotient
    }
}

fn big_floor_mod(left: &BigInt, right: &BigInt) -> BigInt {
    let remainder = left % right;
    if !remainder.is_zero() && (remainder.is_negative() != right.is_negative()) {
        remainder + right
    } else {
        remainder
    }
}

fn num_to_f64(num: &Num) -> f64 {
    match num {
        Num::Int(int) => *int as f64,
        Num::Big(big) => big.to_f64().unwrap_or(f64::INFINITY),
        Num::Float(float) => *float,
    }
}

fn num_to_big(num: &Num) -> BigInt {
    match num {
        Num::Int(int) => BigInt::from(*int),
        Num::Big(big) => big.clone(),
        Num::Float(float) => BigInt::from(*float as i64),
    }
}

fn float_binary(vm: &mut Vm, op: BinaryOp, left: f64, right: f64) -> Result<Option<Value>, Raise> {
    let result = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => {
            if right == 0.0 {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "float division by zero"));
            }
            left / right
        }
        BinaryOp::FloorDiv => {
            if right == 0.0 {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "float division by zero"));
            }
            (left / right).floor()
        }
        BinaryOp::Mod => {
            if right == 0.0 {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "float modulo by zero"));
            }
            left - right * (left / right).floor()
        }
        BinaryOp::Pow => left.powf(right),
        // Bitwise operators have no float meaning.
        _ => return Ok(None),
    };
    Ok(Some(vm.float_value(result)))
}

fn big_binary(vm: &mut Vm, op: BinaryOp, left: &BigInt, right: &BigInt) -> Result<Option<Value>, Raise> {
    let result = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div | BinaryOp::FloorDiv => {
            if right.is_zero() {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "integer division by zero"));
            }
            big_floor_div(left, right)
        }
        BinaryOp::Mod => {
            if right.is_zero() {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "integer modulo by zero"));
            }
            big_floor_mod(left, right)
        }
        BinaryOp::Pow => {
            if right.is_negative() {
                let value =
                    num_to_f64(&Num::Big(left.clone())).powf(num_to_f64(&Num::Big(right.clone())));
                return Ok(Some(vm.float_value(value)));
            }
            let Some(exponent) = right.to_usize() else {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "exponent too large"));
            };
            num_traits::pow(left.clone(), exponent)
        }
        BinaryOp::BitOr => left | right,
        BinaryOp::BitXor => left ^ right,
        BinaryOp::BitAnd => left & right,
        BinaryOp::LShift => {
            let Some(shift) = right.to_usize() else {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "invalid shift count"));
            };
            left << shift
        }
        BinaryOp::RShift => {
            let Some(shift) = right.to_usize() else {
                let class = vm.builtins.value_error;
                return Err(vm.raise(class, "invalid shift count"));
            };
            left >> shift
        }
    };
    Ok(Some(vm.int_from_big(result)))
}

/// The shared binary-method body: compute or answer `NotImplemented`.
fn binary_method(vm: &mut Vm, op: BinaryOp, args: &[Value]) -> Result<Value, Raise> {
    let (Some(left), Some(right)) = (vm.as_num(args[0]), vm.as_num(args[1])) else {
        return Ok(vm.builtins.not_implemented);
    };
    let result = match (&left, &right) {
        (Num::Float(_), _) | (_, Num::Float(_)) => {
            float_binary(vm, op, num_to_f64(&left), num_to_f64(&right))?
        }
        (Num::Int(a), Num::Int(b)) => Some(int_op(vm, op, *a, *b)?),
        _ => big_binary(vm, op, &num_to_big(&left), &num_to_big(&right))?,
    };
    Ok(result.unwrap_or(vm.builtins.not_implemented))
}

fn compare_method(vm: &mut Vm, op: CompareOp, args: &[Value]) -> Result<Value, Raise> {
    let (Some(left), Some(right)) = (vm.as_num(args[0]), vm.as_num(args[1])) else {
        return Ok(vm.builtins.not_implemented);
    };
    let ordering = match (&left, &right) {
        (Num::Int(a), Num::Int(b)) => a.partial_cmp(b),
        (Num::Float(_), _) | (_, Num::Float(_)) => {
            num_to_f64(&left).partial_cmp(&num_to_f64(&right))
        }
        _ => num_to_big(&left).partial_cmp(&num_to_big(&right)),
    };
    let truth = match (ordering, op) {
        (Some(ordering), CompareOp::Lt) => ordering.is_lt(),
        (Some(ordering), CompareOp::Le) => ordering.is_le(),
        (Some(ordering), CompareOp::Gt) => ordering.is_gt(),
        (Some(ordering), CompareOp::Ge) => ordering.is_ge(),
        (Some(ordering), CompareOp::Eq) => ordering.is_eq(),
        (Some(ordering), CompareOp::Ne) => !ordering.is_eq(),
        (None, CompareOp::Ne) => true,
        (None, _) => false,
    };
    Ok(vm.bool_value(truth))
}

fn unary_method(vm: &mut Vm, op: UnaryOp, args: &[Value]) -> Result<Value, Raise> {
    let Some(operand) = vm.as_num(args[0]) else {
        return Ok(vm.builtins.not_implemented);
    };
    match (op, operand) {
        (UnaryOp::Pos, _) => Ok(args[0]),
        (UnaryOp::Neg, Num::Int(int)) => Ok(vm.int_from_i64(-int)),
        (UnaryOp::Neg, Num::Big(big)) => Ok(vm.int_from_big(-big)),
        (UnaryOp::Neg, Num::Float(float)) => Ok(vm.float_value(-float)),
        (UnaryOp::Invert, Num::Int(int)) => Ok(vm.int_from_i64(!int)),
        (UnaryOp::Invert, Num::Big(big)) => Ok(vm.int_from_big(!big)),
        (UnaryOp::Invert, Num::Float(_)) => {
            let class = vm.builtins.type_error;
            Err(vm.raise(class, "bad operand type for unary ~: 'float'"))
        }
    }
}

macro_rules! binary_natives {
    ($(($name:ident, $op:expr)),* $(,)?) => {
        $(
            pub fn $name(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
                binary_method(vm, $op, args)
            }
        )*
    };
}

binary_natives!(
    (num_add, BinaryOp::Add),
    (num_sub, BinaryOp::Sub),
    (num_mul, BinaryOp::Mul),
    (num_div, BinaryOp::Div),
    (num_floordiv, BinaryOp::FloorDiv),
    (num_mod, BinaryOp::Mod),
    (num_pow, BinaryOp::Pow),
    (num_or, BinaryOp::BitOr),
    (num_xor, BinaryOp::BitXor),
    (num_and, BinaryOp::BitAnd),
    (num_lshift, BinaryOp::LShift),
    (num_rshift, BinaryOp::RShift),
);

macro_rules! compare_natives {
    ($(($name:ident, $op:expr)),* $(,)?) => {
        $(
            pub fn $name(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
                compare_method(vm, $op, args)
            }
        )*
    };
}

compare_natives!(
    (num_lt, CompareOp::Lt),
    (num_le, CompareOp::Le),
    (num_gt, CompareOp::Gt),
    (num_ge, CompareOp::Ge),
    (num_eq, CompareOp::Eq),
    (num_ne, CompareOp::Ne),
);

pub fn num_pos(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    unary_method(vm, UnaryOp::Pos, args)
}

pub fn num_neg(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    unary_method(vm, UnaryOp::Neg, args)
}

pub fn num_invert(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    unary_method(vm, UnaryOp::Invert, args)
}

pub fn num_hash(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let hash = vm.hash_value(args[0])?;
    Ok(vm.int_from_i64(hash))
}

pub fn num_str(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let text = vm.repr_value(args[0])?;
    Ok(vm.str_value(text))
}

pub fn num_repr(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    num_str(vm, args)
}

/// `__str__` for the boolean singletons.
pub fn bool_str(vm: &mut Vm, args: &[Value]) -> Result<Value, Raise> {
    let text = if vm.is_true(args[0]) { "True" } else { "False" };
    Ok(vm.str_value(text.to_owned()))
}
