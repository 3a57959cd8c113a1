// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The closed set of exceptions the evaluator itself can raise (§4.9
//! "thrown values"): name lookup failing, an operative invoked where an
//! applicative was required, a void value observed where a value was
//! required, and a catch-all internal error carrying a message plus
//! argument trailer.
//!
//! Grounded in `original_source/src/whisper/vm/exception.hpp`'s small,
//! closed exception hierarchy (`InternalException`, `NameLookupFailedException`
//! et al.), reduced to four heap formats rather than a class hierarchy
//! since this crate has no vtables to dispatch through — `frame.rs`
//! matches on [`crate::heap::HeapFormat`] the same way it matches on any
//! other closed tag.

#[cfg(test)]
mod exception_test;

use crate::boxval::BoxValue;
use crate::error::AllocError;
use crate::heap::{Addr, Generation, Heap, HeapFormat};

#[cfg(feature = "std")]
use std::vec::Vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const MESSAGE_OFFSET: u32 = 0;
const ARGS_TRAILER_OFFSET: u32 = 8;

const OBJECT_OFFSET: u32 = 0;
const NAME_OFFSET: u32 = 8;

const FUNCTION_OFFSET: u32 = 0;
const CONTEXT_OFFSET: u32 = 0;

/// Allocates an [`HeapFormat::ExceptionInternal`]: a string `message` plus
/// zero or more supplemental `args`, for conditions this crate detects
/// that do not fit one of the other three named shapes (an allocator
/// invariant violated, a malformed syntax tree node, and so on).
pub fn alloc_internal(
    heap: &mut Heap,
    generation: Generation,
    message: Addr,
    args: &[BoxValue],
) -> Result<Addr, AllocError> {
    let byte_size = ARGS_TRAILER_OFFSET + u32::try_from(args.len() * 8).expect("arg count fits in u32 bytes");
    let addr = heap.alloc_traced(generation, HeapFormat::ExceptionInternal, byte_size)?;
    heap.write_at(addr, MESSAGE_OFFSET, BoxValue::from_addr(message).raw_bits());
    for (i, &arg) in args.iter().enumerate() {
        heap.write_at(addr, ARGS_TRAILER_OFFSET + (i as u32) * 8, arg.raw_bits());
    }
    Ok(addr)
}

#[must_use]
pub fn internal_message(heap: &Heap, addr: Addr) -> Addr {
    BoxValue::from_raw_bits(heap.read_at(addr, MESSAGE_OFFSET)).as_addr()
}

#[must_use]
pub fn internal_arg_count(heap: &Heap, addr: Addr) -> u32 {
    (heap.header_of(addr).byte_size() - ARGS_TRAILER_OFFSET) / 8
}

#[must_use]
pub fn internal_arg_at(heap: &Heap, addr: Addr, index: u32) -> BoxValue {
    debug_assert!(index < internal_arg_count(heap, addr));
    BoxValue::from_raw_bits(heap.read_at(addr, ARGS_TRAILER_OFFSET + index * 8))
}

#[must_use]
pub fn internal_args(heap: &Heap, addr: Addr) -> Vec<BoxValue> {
    (0..internal_arg_count(heap, addr)).map(|i| internal_arg_at(heap, addr, i)).collect()
}

/// Allocates an [`HeapFormat::ExceptionNameLookupFailed`]: name resolution
/// (§4.6) walked `object`'s entire delegate chain without finding `name`.
pub fn alloc_name_lookup_failed(
    heap: &mut Heap,
    generation: Generation,
    object: Addr,
    name: Addr,
) -> Result<Addr, AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::ExceptionNameLookupFailed, 16)?;
    heap.write_at(addr, OBJECT_OFFSET, BoxValue::from_addr(object).raw_bits());
    heap.write_at(addr, NAME_OFFSET, BoxValue::from_addr(name).raw_bits());
    Ok(addr)
}

#[must_use]
pub fn name_lookup_failed_object(heap: &Heap, addr: Addr) -> Addr {
    BoxValue::from_raw_bits(heap.read_at(addr, OBJECT_OFFSET)).as_addr()
}

#[must_use]
pub fn name_lookup_failed_name(heap: &Heap, addr: Addr) -> Addr {
    BoxValue::from_raw_bits(heap.read_at(addr, NAME_OFFSET)).as_addr()
}

/// Allocates an [`HeapFormat::ExceptionFunctionNotOperative`]: a call
/// position's head evaluated to an applicative function where §4.10
/// required an operative (or vice versa, depending on the caller).
pub fn alloc_function_not_operative(
    heap: &mut Heap,
    generation: Generation,
    function: Addr,
) -> Result<Addr, AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::ExceptionFunctionNotOperative, 8)?;
    heap.write_at(addr, FUNCTION_OFFSET, BoxValue::from_addr(function).raw_bits());
    Ok(addr)
}

#[must_use]
pub fn function_not_operative_function(heap: &Heap, addr: Addr) -> Addr {
    BoxValue::from_raw_bits(heap.read_at(addr, FUNCTION_OFFSET)).as_addr()
}

/// Allocates an [`HeapFormat::ExceptionVoidValueUsed`]: an evaluation step
/// that must produce a value (an operand, a condition) instead produced
/// void (§4.8's "statements may be void; expressions may not").
/// `context` is a string naming where the void value was observed, for a
/// human-facing message.
pub fn alloc_void_value_used(
    heap: &mut Heap,
    generation: Generation,
    context: Addr,
) -> Result<Addr, AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::ExceptionVoidValueUsed, 8)?;
    heap.write_at(addr, CONTEXT_OFFSET, BoxValue::from_addr(context).raw_bits());
    Ok(addr)
}

#[must_use]
pub fn void_value_used_context(heap: &Heap, addr: Addr) -> Addr {
    BoxValue::from_raw_bits(heap.read_at(addr, CONTEXT_OFFSET)).as_addr()
}
