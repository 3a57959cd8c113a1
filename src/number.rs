// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Arithmetic (§4.8, §8): a fast 32-bit overflow-checked integer path that
//! promotes to a heap-boxed [`f64`] ([`HeapFormat::Double`]) whenever the
//! result (or either operand) falls outside that range, with IEEE-754
//! semantics once promoted.
//!
//! Grounded in `original_source/src/whisper/vm/arithmetic_ops.cpp`'s
//! `PerformAdd`/`PerformSub`/`PerformMul`/`PerformDiv`/`PerformMod`/
//! `PerformNeg`, adapted in two ways:
//!
//! - The original's int32 fast path there is the *only* integer
//!   representation; here the integer box holds up to 56 bits
//!   ([`crate::boxval`]), so the fast path additionally requires both
//!   operands to already fit `i32` before attempting the checked op —
//!   anything wider skips straight to the float path, which is exactly
//!   the `i32::try_from` failure case below.
//! - `PerformMul`'s bit-counting heuristic (`NumSignificantBits`) is
//!   replaced with an exact `i32::checked_mul`: strictly more precise
//!   (it only promotes results that actually overflow, not a conservative
//!   superset), same fast/slow boundary the spec describes.

#[cfg(test)]
mod number_test;

use crate::boxval::BoxValue;
use crate::error::AllocError;
use crate::heap::{Addr, Generation, Heap, HeapFormat};

/// A [`BoxValue`] that classifies as numeric, with its value extracted.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Double(v) => v,
        }
    }
}

/// The result of an arithmetic primitive: either a value, or notice that
/// an operand was not numeric — the caller (§6's evaluator) is expected to
/// turn this into a thrown [`crate::exception`] rather than a host-level
/// [`RuntimeError`](crate::error::RuntimeError), since it is a condition
/// the *interpreted program* triggers, not a host invariant failure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArithOutcome {
    Value(BoxValue),
    NotANumber,
}

/// Classifies `value` as numeric, reading the boxed double's payload if it
/// is a pointer to a [`HeapFormat::Double`]. Returns `None` for anything
/// else (booleans, undefined, non-numeric objects).
fn classify(heap: &Heap, value: BoxValue) -> Option<Number> {
    if value.is_integer() {
        return Some(Number::Int(value.as_i64()));
    }
    if value.is_pointer() {
        let addr = value.as_addr();
        if heap.header_of(addr).format() == HeapFormat::Double {
            return Some(Number::Double(read_double(heap, addr)));
        }
    }
    None
}

/// Allocates a [`HeapFormat::Double`] leaf holding `value`.
fn alloc_double(heap: &mut Heap, generation: Generation, value: f64) -> Result<Addr, AllocError> {
    let addr = heap.alloc_leaf(generation, HeapFormat::Double, 8)?;
    heap.write_at(addr, 0, value);
    Ok(addr)
}

fn read_double(heap: &Heap, addr: Addr) -> f64 {
    heap.read_at(addr, 0)
}

fn promote(heap: &mut Heap, generation: Generation, value: f64) -> Result<ArithOutcome, AllocError> {
    let addr = alloc_double(heap, generation, value)?;
    Ok(ArithOutcome::Value(BoxValue::from_addr(addr)))
}

fn int_box(value: i32) -> BoxValue {
    BoxValue::from_i64(i64::from(value)).expect("an i32 always fits the 56-bit integer box")
}

/// Runs `fast` when both operands already fit `i32`, falling back to
/// `slow` (given both operands as `f64`) otherwise or when `fast` reports
/// its own overflow.
fn with_numeric_operands(
    heap: &mut Heap,
    generation: Generation,
    lhs: BoxValue,
    rhs: BoxValue,
    fast: impl FnOnce(i32, i32) -> Option<i32>,
    slow: impl FnOnce(f64, f64) -> f64,
) -> Result<ArithOutcome, AllocError> {
    let (Some(l), Some(r)) = (classify(heap, lhs), classify(heap, rhs)) else {
        return Ok(ArithOutcome::NotANumber);
    };
    if let (Number::Int(a), Number::Int(b)) = (l, r) {
        if let (Ok(a32), Ok(b32)) = (i32::try_from(a), i32::try_from(b)) {
            if let Some(result) = fast(a32, b32) {
                return Ok(ArithOutcome::Value(int_box(result)));
            }
        }
    }
    promote(heap, generation, slow(l.as_f64(), r.as_f64()))
}

/// `lhs + rhs` (§4.8: int32 fast path, float fallback with NaN
/// propagation handled automatically by IEEE-754 `+`).
pub fn add(heap: &mut Heap, generation: Generation, lhs: BoxValue, rhs: BoxValue) -> Result<ArithOutcome, AllocError> {
    with_numeric_operands(heap, generation, lhs, rhs, i32::checked_add, |a, b| a + b)
}

/// `lhs - rhs`.
pub fn sub(heap: &mut Heap, generation: Generation, lhs: BoxValue, rhs: BoxValue) -> Result<ArithOutcome, AllocError> {
    with_numeric_operands(heap, generation, lhs, rhs, i32::checked_sub, |a, b| a - b)
}

/// `lhs * rhs`.
pub fn mul(heap: &mut Heap, generation: Generation, lhs: BoxValue, rhs: BoxValue) -> Result<ArithOutcome, AllocError> {
    with_numeric_operands(heap, generation, lhs, rhs, i32::checked_mul, |a, b| a * b)
}

/// `lhs / rhs`. Division by zero yields signed infinity (or NaN for
/// `0 / 0`) rather than a host-level error, matching
/// `PerformDiv`'s explicit `+Inf`/`-Inf`/`NaN` results for both the int
/// and float paths.
pub fn div(heap: &mut Heap, generation: Generation, lhs: BoxValue, rhs: BoxValue) -> Result<ArithOutcome, AllocError> {
    let (Some(l), Some(r)) = (classify(heap, lhs), classify(heap, rhs)) else {
        return Ok(ArithOutcome::NotANumber);
    };
    if let (Number::Int(a), Number::Int(b)) = (l, r) {
        if let (Ok(a32), Ok(b32)) = (i32::try_from(a), i32::try_from(b)) {
            if b32 == 0 {
                let result = match a32.cmp(&0) {
                    core::cmp::Ordering::Greater => f64::INFINITY,
                    core::cmp::Ordering::Less => f64::NEG_INFINITY,
                    core::cmp::Ordering::Equal => f64::NAN,
                };
                return promote(heap, generation, result);
            }
            if a32 % b32 == 0 {
                if let Some(result) = a32.checked_div(b32) {
                    return Ok(ArithOutcome::Value(int_box(result)));
                }
            }
        }
    }
    let (lf, rf) = (l.as_f64(), r.as_f64());
    if rf == 0.0 {
        let result = if lf == 0.0 {
            f64::NAN
        } else if lf.is_sign_positive() == rf.is_sign_positive() {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        return promote(heap, generation, result);
    }
    promote(heap, generation, lf / rf)
}

/// `lhs % rhs`. The int32 fast path only applies to non-negative operands
/// (`PerformMod`'s own restriction — negative-operand truncating modulo is
/// pushed to the float path); the float path uses Rust's `%` on `f64`,
/// which implements the same truncated-division remainder as C's `fmod`.
pub fn rem(heap: &mut Heap, generation: Generation, lhs: BoxValue, rhs: BoxValue) -> Result<ArithOutcome, AllocError> {
    let (Some(l), Some(r)) = (classify(heap, lhs), classify(heap, rhs)) else {
        return Ok(ArithOutcome::NotANumber);
    };
    if let (Number::Int(a), Number::Int(b)) = (l, r) {
        if let (Ok(a32), Ok(b32)) = (i32::try_from(a), i32::try_from(b)) {
            if a32 >= 0 && b32 > 0 {
                return Ok(ArithOutcome::Value(int_box(a32 % b32)));
            }
        }
    }
    promote(heap, generation, l.as_f64() % r.as_f64())
}

/// `-value`. Overflows only at `i32::MIN` (negating it has no `i32`
/// representation), matching `PerformNeg`.
pub fn neg(heap: &mut Heap, generation: Generation, value: BoxValue) -> Result<ArithOutcome, AllocError> {
    let Some(class) = classify(heap, value) else {
        return Ok(ArithOutcome::NotANumber);
    };
    match class {
        Number::Int(v) => {
            if let Ok(v32) = i32::try_from(v) {
                if let Some(negated) = v32.checked_neg() {
                    return Ok(ArithOutcome::Value(int_box(negated)));
                }
                return promote(heap, generation, -f64::from(v32));
            }
            Ok(ArithOutcome::Value(
                BoxValue::from_i64(-v).expect(
                    "negating a value already wider than i32 stays within the 56-bit box \
                     unless it is i64::MIN, which no i32-bounded literal or arithmetic op produces",
                ),
            ))
        }
        Number::Double(v) => promote(heap, generation, -v),
    }
}
