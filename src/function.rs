// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Function objects, operand lists, and the native-function registry
//! (§4.10 "Applicatives and operatives").
//!
//! A [`HeapFormat::Function`] is closed over exactly what its two kinds
//! need: a native arithmetic/syntax handler needs only its `native_id`
//! (an index into [`NATIVES`]); a function built from evaluated syntax
//! needs the lexical `scope` it closed over plus `tree`/`node_offset`
//! naming its body. Both kinds share one format and one field layout
//! rather than two, mirroring how `original_source/src/whisper/vm/function.hpp`
//! represents `NativeFunction` and `ScriptedFunction` as one `Function`
//! tagged by a `kind` byte plus a union of the fields each kind needs.
//!
//! [`OperandList`] is the evaluator's argument-passing structure: a cons
//! list of already-evaluated [`BoxValue`]s built by
//! [`crate::frame::FrameCallExpr`] one argument at a time, so the list
//! never needs to be sized up front.
//!
//! [`Continuation`] holds a suspended native's resumption state as an
//! ordinary traced heap object, so it survives a collection like any other
//! reference. `apply` is the one native that actually suspends: it cannot
//! invoke its target itself (invocation needs a [`crate::frame`] frame, not
//! a host call), so it returns [`NativeOutcome::Invoke`] and the trampoline
//! bridges the call through a nested [`crate::frame::HeapFormat::FrameInvokeApplicative`]
//! before resuming it via [`NativeEntry::resume`] (§9 Open Question,
//! recorded in DESIGN.md).

#[cfg(test)]
mod function_test;

use crate::boxval::BoxValue;
use crate::error::AllocError;
use crate::heap::{Addr, Generation, Heap, HeapFormat};

#[cfg(feature = "std")]
use std::vec::Vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const KIND_OFFSET: u32 = 0;
const NATIVE_ID_OFFSET: u32 = 4;
const SCOPE_OFFSET: u32 = 8;
const TREE_OFFSET: u32 = 16;
const NODE_OFFSET_OFFSET: u32 = 24;
const FUNCTION_SIZE: u32 = 28;

/// Sentinel `native_id` marking a function built from evaluated syntax
/// rather than a native.
pub const NOT_NATIVE: u32 = u32::MAX;

/// Whether a call site must supply pre-evaluated operands (an
/// applicative) or the raw, unevaluated call-expression tree (an
/// operative), per §4.10.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum FunctionKind {
    Applicative = 0,
    Operative = 1,
}

impl FunctionKind {
    const fn from_tag(tag: u32) -> Self {
        match tag {
            0 => Self::Applicative,
            _ => Self::Operative,
        }
    }
}

/// Allocates a native function: `native_id` indexes [`NATIVES`], which
/// `frame.rs` dispatches on directly rather than walking a scope/tree pair.
pub fn alloc_native(
    heap: &mut Heap,
    generation: Generation,
    kind: FunctionKind,
    native_id: u32,
) -> Result<Addr, AllocError> {
    debug_assert_ne!(native_id, NOT_NATIVE, "a native function must have a real native_id");
    let addr = heap.alloc_traced(generation, HeapFormat::Function, FUNCTION_SIZE)?;
    heap.write_at(addr, KIND_OFFSET, kind as u32);
    heap.write_at(addr, NATIVE_ID_OFFSET, native_id);
    heap.write_at(addr, SCOPE_OFFSET, BoxValue::undefined().raw_bits());
    heap.write_at(addr, TREE_OFFSET, BoxValue::undefined().raw_bits());
    heap.write_at(addr, NODE_OFFSET_OFFSET, 0u32);
    Ok(addr)
}

/// Allocates a function built from evaluated syntax: `scope` is the
/// lexical environment it closed over, `tree`/`node_offset` names the
/// body within a [`crate::syntax`] tree.
pub fn alloc_scripted(
    heap: &mut Heap,
    generation: Generation,
    kind: FunctionKind,
    scope: Addr,
    tree: Addr,
    node_offset: u32,
) -> Result<Addr, AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::Function, FUNCTION_SIZE)?;
    heap.write_at(addr, KIND_OFFSET, kind as u32);
    heap.write_at(addr, NATIVE_ID_OFFSET, NOT_NATIVE);
    heap.write_at(addr, SCOPE_OFFSET, BoxValue::from_addr(scope).raw_bits());
    heap.write_at(addr, TREE_OFFSET, BoxValue::from_addr(tree).raw_bits());
    heap.write_at(addr, NODE_OFFSET_OFFSET, node_offset);
    Ok(addr)
}

#[must_use]
pub fn kind(heap: &Heap, addr: Addr) -> FunctionKind {
    FunctionKind::from_tag(heap.read_at(addr, KIND_OFFSET))
}

#[must_use]
pub fn is_native(heap: &Heap, addr: Addr) -> bool {
    native_id(heap, addr) != NOT_NATIVE
}

#[must_use]
pub fn native_id(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, NATIVE_ID_OFFSET)
}

#[must_use]
pub fn scope(heap: &Heap, addr: Addr) -> Addr {
    debug_assert!(!is_native(heap, addr));
    BoxValue::from_raw_bits(heap.read_at(addr, SCOPE_OFFSET)).as_addr()
}

#[must_use]
pub fn tree(heap: &Heap, addr: Addr) -> Addr {
    debug_assert!(!is_native(heap, addr));
    BoxValue::from_raw_bits(heap.read_at(addr, TREE_OFFSET)).as_addr()
}

#[must_use]
pub fn node_offset(heap: &Heap, addr: Addr) -> u32 {
    debug_assert!(!is_native(heap, addr));
    heap.read_at(addr, NODE_OFFSET_OFFSET)
}

// ---- operand lists: evaluated-argument cons cells ----

const OPERAND_VALUE_OFFSET: u32 = 0;
const OPERAND_NEXT_OFFSET: u32 = 8;
const OPERAND_SIZE: u32 = 16;

/// Conses `value` onto the front of `next` (or onto nothing, for the
/// first argument of a call — see [`nil`]).
pub fn cons(heap: &mut Heap, generation: Generation, value: BoxValue, next: Addr) -> Result<Addr, AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::OperandList, OPERAND_SIZE)?;
    heap.write_at(addr, OPERAND_VALUE_OFFSET, value.raw_bits());
    heap.write_at(addr, OPERAND_NEXT_OFFSET, BoxValue::from_addr(next).raw_bits());
    Ok(addr)
}

/// The empty operand list: the null address, never dereferenced —
/// [`is_nil`] must be checked before [`operand_value`]/[`operand_next`].
#[must_use]
pub const fn nil() -> Addr {
    Addr::null()
}

#[must_use]
pub fn is_nil(addr: Addr) -> bool {
    addr.is_null()
}

#[must_use]
pub fn operand_value(heap: &Heap, addr: Addr) -> BoxValue {
    debug_assert!(!is_nil(addr));
    BoxValue::from_raw_bits(heap.read_at(addr, OPERAND_VALUE_OFFSET))
}

#[must_use]
pub fn operand_next(heap: &Heap, addr: Addr) -> Addr {
    debug_assert!(!is_nil(addr));
    BoxValue::from_raw_bits(heap.read_at(addr, OPERAND_NEXT_OFFSET)).as_addr()
}

/// Collects an operand list into a plain `Vec`, in call order (the list is
/// built head-first as arguments are evaluated left to right, so this
/// walk yields them in the same order without needing to reverse).
#[must_use]
pub fn operand_vec(heap: &Heap, mut addr: Addr) -> Vec<BoxValue> {
    let mut out = Vec::new();
    while !is_nil(addr) {
        out.push(operand_value(heap, addr));
        addr = operand_next(heap, addr);
    }
    out
}

// ---- continuations: native-call resumption state ----

const CONTINUATION_STEP_OFFSET: u32 = 0;
const CONTINUATION_TRAILER_OFFSET: u32 = 8;

/// Allocates a resumption record for a native that suspends mid-call:
/// `step` names which phase of the native to resume at, `saved` is
/// whatever [`BoxValue`]s that phase needs back.
pub fn alloc_continuation(
    heap: &mut Heap,
    generation: Generation,
    step: u32,
    saved: &[BoxValue],
) -> Result<Addr, AllocError> {
    let byte_size = CONTINUATION_TRAILER_OFFSET + u32::try_from(saved.len() * 8).expect("saved count fits in u32 bytes");
    let addr = heap.alloc_traced(generation, HeapFormat::Continuation, byte_size)?;
    heap.write_at(addr, CONTINUATION_STEP_OFFSET, step);
    for (i, &value) in saved.iter().enumerate() {
        heap.write_at(addr, CONTINUATION_TRAILER_OFFSET + (i as u32) * 8, value.raw_bits());
    }
    Ok(addr)
}

#[must_use]
pub fn continuation_step(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, CONTINUATION_STEP_OFFSET)
}

#[must_use]
pub fn continuation_saved_count(heap: &Heap, addr: Addr) -> u32 {
    (heap.header_of(addr).byte_size() - CONTINUATION_TRAILER_OFFSET) / 8
}

#[must_use]
pub fn continuation_saved_at(heap: &Heap, addr: Addr, index: u32) -> BoxValue {
    debug_assert!(index < continuation_saved_count(heap, addr));
    BoxValue::from_raw_bits(heap.read_at(addr, CONTINUATION_TRAILER_OFFSET + index * 8))
}

/// Collects a continuation's saved trailer into a plain `Vec`, same
/// convention as [`operand_vec`].
#[must_use]
pub fn continuation_saved_vec(heap: &Heap, addr: Addr) -> Vec<BoxValue> {
    (0..continuation_saved_count(heap, addr)).map(|i| continuation_saved_at(heap, addr, i)).collect()
}

// ---- native registry ----

/// The result of running a native to completion: either the value it
/// produced, notice that its operands didn't fit what it expects — turned
/// into a thrown [`crate::exception`] by the caller, same convention as
/// [`crate::number::ArithOutcome`] — or a request to invoke another
/// function first and resume once that call resolves.
pub enum NativeOutcome {
    Value(BoxValue),
    Void,
    WrongArguments,
    /// Suspends the call: invoke `function` with the already-evaluated
    /// `operands` list, then resume this native via
    /// [`NativeEntry::resume`] with the result.
    Invoke { function: Addr, operands: Addr },
}

/// What a suspended native's nested call resolved to, handed back to
/// [`NativeEntry::resume`]. Has no exception case: a thrown exception
/// unwinds past the resume point straight to the suspending call's parent,
/// the same way it would have if the native had never suspended.
#[derive(Clone, Copy)]
pub enum ResumeValue {
    Value(BoxValue),
    Void,
}

/// One entry in the closed native-function table §4.10 bootstraps the
/// global scope with. `arity` is `None` for a variadic native (currently
/// only `apply`, which takes the function to invoke plus any number of
/// arguments for it).
pub struct NativeEntry {
    pub name: &'static str,
    pub kind: FunctionKind,
    pub arity: Option<usize>,
    pub call: fn(heap: &mut Heap, generation: Generation, operands: &[BoxValue]) -> Result<NativeOutcome, AllocError>,
    /// Present only for a native whose `call` can return
    /// [`NativeOutcome::Invoke`]; absent for every native that always runs
    /// to completion in one step.
    pub resume: Option<fn(heap: &mut Heap, generation: Generation, saved: &[BoxValue], resumed: ResumeValue) -> Result<NativeOutcome, AllocError>>,
}

fn native_add(heap: &mut Heap, generation: Generation, operands: &[BoxValue]) -> Result<NativeOutcome, AllocError> {
    binary_arith(heap, generation, operands, crate::number::add)
}

fn native_sub(heap: &mut Heap, generation: Generation, operands: &[BoxValue]) -> Result<NativeOutcome, AllocError> {
    binary_arith(heap, generation, operands, crate::number::sub)
}

fn native_mul(heap: &mut Heap, generation: Generation, operands: &[BoxValue]) -> Result<NativeOutcome, AllocError> {
    binary_arith(heap, generation, operands, crate::number::mul)
}

fn native_div(heap: &mut Heap, generation: Generation, operands: &[BoxValue]) -> Result<NativeOutcome, AllocError> {
    binary_arith(heap, generation, operands, crate::number::div)
}

fn native_rem(heap: &mut Heap, generation: Generation, operands: &[BoxValue]) -> Result<NativeOutcome, AllocError> {
    binary_arith(heap, generation, operands, crate::number::rem)
}

fn native_neg(heap: &mut Heap, generation: Generation, operands: &[BoxValue]) -> Result<NativeOutcome, AllocError> {
    let [value] = operands else { return Ok(NativeOutcome::WrongArguments) };
    match crate::number::neg(heap, generation, *value)? {
        crate::number::ArithOutcome::Value(v) => Ok(NativeOutcome::Value(v)),
        crate::number::ArithOutcome::NotANumber => Ok(NativeOutcome::WrongArguments),
    }
}

fn binary_arith(
    heap: &mut Heap,
    generation: Generation,
    operands: &[BoxValue],
    op: fn(&mut Heap, Generation, BoxValue, BoxValue) -> Result<crate::number::ArithOutcome, AllocError>,
) -> Result<NativeOutcome, AllocError> {
    let [lhs, rhs] = operands else { return Ok(NativeOutcome::WrongArguments) };
    match op(heap, generation, *lhs, *rhs)? {
        crate::number::ArithOutcome::Value(v) => Ok(NativeOutcome::Value(v)),
        crate::number::ArithOutcome::NotANumber => Ok(NativeOutcome::WrongArguments),
    }
}

/// `apply(f, a, b, ...)`: invokes `f` with the remaining operands. Cannot
/// invoke `f` itself (only the trampoline can spawn the frame that does),
/// so it suspends and resumes once that invocation resolves — the only
/// native in [`NATIVES`] that needs [`Continuation`]/[`NativeOutcome::Invoke`].
fn native_apply(heap: &mut Heap, generation: Generation, operands: &[BoxValue]) -> Result<NativeOutcome, AllocError> {
    let [target, rest @ ..] = operands else { return Ok(NativeOutcome::WrongArguments) };
    if !target.is_pointer() || heap.header_of(target.as_addr()).format() != HeapFormat::Function {
        return Ok(NativeOutcome::WrongArguments);
    }
    let mut list = nil();
    for &value in rest.iter().rev() {
        list = cons(heap, generation, value, list)?;
    }
    Ok(NativeOutcome::Invoke { function: target.as_addr(), operands: list })
}

fn resume_apply(_heap: &mut Heap, _generation: Generation, _saved: &[BoxValue], resumed: ResumeValue) -> Result<NativeOutcome, AllocError> {
    Ok(match resumed {
        ResumeValue::Value(v) => NativeOutcome::Value(v),
        ResumeValue::Void => NativeOutcome::Void,
    })
}

/// Native index assigned to each [`NATIVES`] entry; `frame.rs` and
/// bootstrap binding use these rather than magic numbers.
pub const NATIVE_ADD: u32 = 0;
pub const NATIVE_SUB: u32 = 1;
pub const NATIVE_MUL: u32 = 2;
pub const NATIVE_DIV: u32 = 3;
pub const NATIVE_REM: u32 = 4;
pub const NATIVE_NEG: u32 = 5;
pub const NATIVE_APPLY: u32 = 6;

/// The closed set of native applicatives §4.10/§8 bootstraps the global
/// scope with. Index into this table is a native function's `native_id`.
pub const NATIVES: &[NativeEntry] = &[
    NativeEntry { name: "+", kind: FunctionKind::Applicative, arity: Some(2), call: native_add, resume: None },
    NativeEntry { name: "-", kind: FunctionKind::Applicative, arity: Some(2), call: native_sub, resume: None },
    NativeEntry { name: "*", kind: FunctionKind::Applicative, arity: Some(2), call: native_mul, resume: None },
    NativeEntry { name: "/", kind: FunctionKind::Applicative, arity: Some(2), call: native_div, resume: None },
    NativeEntry { name: "%", kind: FunctionKind::Applicative, arity: Some(2), call: native_rem, resume: None },
    NativeEntry { name: "neg", kind: FunctionKind::Applicative, arity: Some(1), call: native_neg, resume: None },
    NativeEntry { name: "apply", kind: FunctionKind::Applicative, arity: None, call: native_apply, resume: Some(resume_apply) },
];
