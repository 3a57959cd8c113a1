// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The frame-based, continuation-passing tree-walking evaluator (§4.7):
//! every in-progress evaluation is a chain of heap-allocated frames rather
//! than a native call stack, so a long-running evaluation never overflows
//! the host's stack and every intermediate state survives a collection.
//!
//! Grounded in the teacher's `vm::run` (`lona-vm/src/vm/mod.rs`), which
//! drives a similar trampoline over heap-resident continuations instead of
//! recursing natively, and in
//! `original_source/src/whisper/vm/frame.hpp`'s closed frame-kind
//! hierarchy (`EntryFrame`, `InvokeSyntaxFrame`, `FileFrame`, `BlockFrame`,
//! `VarFrame`, `CallExprFrame`, `InvokeApplicativeFrame`,
//! `InvokeOperativeFrame`, `NativeCallResumeFrame`, `TerminalFrame`) this
//! module reproduces one-for-one as [`crate::heap::HeapFormat`] variants.
//!
//! [`Trampoline::run`] alternates two operations until a
//! [`HeapFormat::FrameTerminal`] resolves:
//! - **Step**: a frame examines its own state (and the syntax node its
//!   originating [`FrameEntry`] names) and either does synchronous work and
//!   asks to be stepped again, or spawns a child frame to evaluate
//!   something first ([`StepOutcome::Descend`]).
//! - **Resolve**: a child frame finished (with a value, void, or a thrown
//!   exception) and hands that result back to the frame that spawned it
//!   ([`StepOutcome::Resolve`]), which folds it into its own state and
//!   either asks for another step or propagates further up.
//!
//! Every syntax node kind is evaluated the same way regardless of which
//! kind it is: [`FrameEntry`] looks up that kind's *handler* — a bound
//! name like `%call` or `%integer-literal` ([`crate::syntax::NodeKind::handler_name`])
//! — on the current lexical scope exactly like any other name lookup, and
//! [`FrameInvokeSyntax`] invokes whatever it resolved to. The built-in
//! handlers are native [`crate::function::FunctionKind::Operative`]
//! functions bound once into the global scope at bootstrap ([`SYNTAX_NATIVES`],
//! consumed by [`crate::context::ThreadContext::new`]) — this crate ships
//! no syntax for a program to define its own handler body, but the
//! indirection itself is real: a handler is resolved by name every time,
//! not hardcoded per node kind.

#[cfg(test)]
mod frame_test;

use crate::boxval::BoxValue;
use crate::context::FrameResources;
use crate::error::RuntimeError;
use crate::exception;
use crate::function::{self, FunctionKind, NativeOutcome, ResumeValue};
use crate::heap::{Addr, Generation, Heap, HeapFormat};
use crate::object;
use crate::property::Descriptor;
use crate::scope;
use crate::string;
use crate::syntax::{self, NodeKind};

fn read_addr(heap: &Heap, addr: Addr, offset: u32) -> Addr {
    BoxValue::from_raw_bits(heap.read_at(addr, offset)).as_addr()
}

fn write_addr(heap: &mut Heap, addr: Addr, offset: u32, value: Addr) {
    heap.write_at(addr, offset, BoxValue::from_addr(value).raw_bits());
}

fn read_box(heap: &Heap, addr: Addr, offset: u32) -> BoxValue {
    BoxValue::from_raw_bits(heap.read_at(addr, offset))
}

fn write_box(heap: &mut Heap, addr: Addr, offset: u32, value: BoxValue) {
    heap.write_at(addr, offset, value.raw_bits());
}

// ---- FrameEntry: evaluates one syntax node within one scope ----

const ENTRY_PARENT: u32 = 0;
const ENTRY_TREE: u32 = 8;
const ENTRY_SCOPE: u32 = 16;
const ENTRY_NODE_OFFSET: u32 = 24;
const ENTRY_SIZE: u32 = 28;

fn alloc_entry(
    heap: &mut Heap,
    generation: Generation,
    parent: Addr,
    tree: Addr,
    scope: Addr,
    node_offset: u32,
) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameEntry, ENTRY_SIZE)?;
    write_addr(heap, addr, ENTRY_PARENT, parent);
    write_addr(heap, addr, ENTRY_TREE, tree);
    write_addr(heap, addr, ENTRY_SCOPE, scope);
    heap.write_at(addr, ENTRY_NODE_OFFSET, node_offset);
    Ok(addr)
}

fn entry_parent(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, ENTRY_PARENT)
}

fn entry_tree(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, ENTRY_TREE)
}

fn entry_scope(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, ENTRY_SCOPE)
}

fn entry_node_offset(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, ENTRY_NODE_OFFSET)
}

// ---- FrameSyntaxNameLookup: resolves a node kind's handler name ----

const LOOKUP_PARENT: u32 = 0;
const LOOKUP_ENTRY: u32 = 8;
const LOOKUP_STATE: u32 = 16;
const LOOKUP_NAME: u32 = 24;
const LOOKUP_SIZE: u32 = 32;

fn alloc_syntax_name_lookup(
    heap: &mut Heap,
    generation: Generation,
    parent: Addr,
    entry: Addr,
    lookup_state: Addr,
    name: Addr,
) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameSyntaxNameLookup, LOOKUP_SIZE)?;
    write_addr(heap, addr, LOOKUP_PARENT, parent);
    write_addr(heap, addr, LOOKUP_ENTRY, entry);
    write_addr(heap, addr, LOOKUP_STATE, lookup_state);
    write_addr(heap, addr, LOOKUP_NAME, name);
    Ok(addr)
}

// ---- FrameInvokeSyntax: invokes a resolved handler ----

const INVOKE_SYNTAX_PARENT: u32 = 0;
const INVOKE_SYNTAX_ENTRY: u32 = 8;
const INVOKE_SYNTAX_HANDLER: u32 = 16;
const INVOKE_SYNTAX_SIZE: u32 = 24;

fn alloc_invoke_syntax(
    heap: &mut Heap,
    generation: Generation,
    parent: Addr,
    entry: Addr,
    handler: BoxValue,
) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameInvokeSyntax, INVOKE_SYNTAX_SIZE)?;
    write_addr(heap, addr, INVOKE_SYNTAX_PARENT, parent);
    write_addr(heap, addr, INVOKE_SYNTAX_ENTRY, entry);
    write_box(heap, addr, INVOKE_SYNTAX_HANDLER, handler);
    Ok(addr)
}

// ---- FrameFile / FrameBlock: statement sequences ----

const SEQ_PARENT: u32 = 0;
const SEQ_ENTRY: u32 = 8;
const SEQ_STATEMENT_INDEX: u32 = 16;
const SEQ_SIZE: u32 = 20;

fn alloc_sequence_frame(
    heap: &mut Heap,
    generation: Generation,
    format: HeapFormat,
    parent: Addr,
    entry: Addr,
    statement_index: u32,
) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, format, SEQ_SIZE)?;
    write_addr(heap, addr, SEQ_PARENT, parent);
    write_addr(heap, addr, SEQ_ENTRY, entry);
    heap.write_at(addr, SEQ_STATEMENT_INDEX, statement_index);
    Ok(addr)
}

fn alloc_file(heap: &mut Heap, generation: Generation, parent: Addr, entry: Addr, statement_index: u32) -> Result<Addr, crate::error::AllocError> {
    alloc_sequence_frame(heap, generation, HeapFormat::FrameFile, parent, entry, statement_index)
}

fn alloc_block_frame(heap: &mut Heap, generation: Generation, parent: Addr, entry: Addr, statement_index: u32) -> Result<Addr, crate::error::AllocError> {
    alloc_sequence_frame(heap, generation, HeapFormat::FrameBlock, parent, entry, statement_index)
}

fn seq_parent(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, SEQ_PARENT)
}

fn seq_entry(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, SEQ_ENTRY)
}

fn seq_statement_index(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, SEQ_STATEMENT_INDEX)
}

fn set_seq_statement_index(heap: &mut Heap, addr: Addr, index: u32) {
    heap.write_at(addr, SEQ_STATEMENT_INDEX, index);
}

// ---- FrameVar: a var/const declaration's binding list ----

const VAR_PARENT: u32 = 0;
const VAR_ENTRY: u32 = 8;
const VAR_BINDING_INDEX: u32 = 16;
const VAR_SIZE: u32 = 20;

fn alloc_var_frame(heap: &mut Heap, generation: Generation, parent: Addr, entry: Addr, binding_index: u32) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameVar, VAR_SIZE)?;
    write_addr(heap, addr, VAR_PARENT, parent);
    write_addr(heap, addr, VAR_ENTRY, entry);
    heap.write_at(addr, VAR_BINDING_INDEX, binding_index);
    Ok(addr)
}

fn var_parent(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, VAR_PARENT)
}

fn var_entry(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, VAR_ENTRY)
}

fn var_binding_index(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, VAR_BINDING_INDEX)
}

fn set_var_binding_index(heap: &mut Heap, addr: Addr, index: u32) {
    heap.write_at(addr, VAR_BINDING_INDEX, index);
}

// ---- FrameCallExpr: callee then each argument, in call order ----

const CALL_PARENT: u32 = 0;
const CALL_ENTRY: u32 = 8;
const CALL_STATE: u32 = 16;
const CALL_ARG_NO: u32 = 20;
const CALL_CALLEE: u32 = 24;
const CALL_OPERANDS: u32 = 32;
const CALL_SIZE: u32 = 40;

const CALL_STATE_CALLEE: u32 = 0;
const CALL_STATE_ARGS: u32 = 1;

#[allow(clippy::too_many_arguments)]
fn alloc_call_expr(
    heap: &mut Heap,
    generation: Generation,
    parent: Addr,
    entry: Addr,
    state: u32,
    arg_no: u32,
    callee: BoxValue,
    operands: Addr,
) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameCallExpr, CALL_SIZE)?;
    write_addr(heap, addr, CALL_PARENT, parent);
    write_addr(heap, addr, CALL_ENTRY, entry);
    heap.write_at(addr, CALL_STATE, state);
    heap.write_at(addr, CALL_ARG_NO, arg_no);
    write_box(heap, addr, CALL_CALLEE, callee);
    write_addr(heap, addr, CALL_OPERANDS, operands);
    Ok(addr)
}

fn call_parent(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, CALL_PARENT)
}

fn call_entry(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, CALL_ENTRY)
}

fn call_state(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, CALL_STATE)
}

fn set_call_state(heap: &mut Heap, addr: Addr, state: u32) {
    heap.write_at(addr, CALL_STATE, state);
}

fn call_arg_no(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, CALL_ARG_NO)
}

fn set_call_arg_no(heap: &mut Heap, addr: Addr, arg_no: u32) {
    heap.write_at(addr, CALL_ARG_NO, arg_no);
}

fn call_callee(heap: &Heap, addr: Addr) -> BoxValue {
    read_box(heap, addr, CALL_CALLEE)
}

fn set_call_callee(heap: &mut Heap, addr: Addr, callee: BoxValue) {
    write_box(heap, addr, CALL_CALLEE, callee);
}

fn call_operands(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, CALL_OPERANDS)
}

fn set_call_operands(heap: &mut Heap, addr: Addr, operands: Addr) {
    write_addr(heap, addr, CALL_OPERANDS, operands);
}

// ---- FrameInvokeApplicative / FrameInvokeOperative ----

const APP_PARENT: u32 = 0;
const APP_ENTRY: u32 = 8;
const APP_FUNCTION: u32 = 16;
const APP_OPERANDS: u32 = 24;
const APP_SIZE: u32 = 32;

fn alloc_invoke_applicative(
    heap: &mut Heap,
    generation: Generation,
    parent: Addr,
    entry: Addr,
    function_addr: Addr,
    operands: Addr,
) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameInvokeApplicative, APP_SIZE)?;
    write_addr(heap, addr, APP_PARENT, parent);
    write_addr(heap, addr, APP_ENTRY, entry);
    write_addr(heap, addr, APP_FUNCTION, function_addr);
    write_addr(heap, addr, APP_OPERANDS, operands);
    Ok(addr)
}

fn app_parent(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, APP_PARENT)
}

fn app_entry(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, APP_ENTRY)
}

fn app_function(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, APP_FUNCTION)
}

fn app_operands(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, APP_OPERANDS)
}

const OP_PARENT: u32 = 0;
const OP_ENTRY: u32 = 8;
const OP_FUNCTION: u32 = 16;
const OP_TREE: u32 = 24;
const OP_NODE_OFFSET: u32 = 32;
const OP_SIZE: u32 = 36;

fn alloc_invoke_operative(
    heap: &mut Heap,
    generation: Generation,
    parent: Addr,
    entry: Addr,
    function_addr: Addr,
    tree: Addr,
    node_offset: u32,
) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameInvokeOperative, OP_SIZE)?;
    write_addr(heap, addr, OP_PARENT, parent);
    write_addr(heap, addr, OP_ENTRY, entry);
    write_addr(heap, addr, OP_FUNCTION, function_addr);
    write_addr(heap, addr, OP_TREE, tree);
    heap.write_at(addr, OP_NODE_OFFSET, node_offset);
    Ok(addr)
}

fn op_parent(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, OP_PARENT)
}

fn op_function(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, OP_FUNCTION)
}

// ---- FrameNativeCallResume: bridges a suspended native's nested call back
// to the native's `resume` handler (see function::Continuation). Never
// independently stepped — it is allocated already sitting as the parent of
// the invocation frame it spawned, so its only role is to receive that
// invocation's `resolve`.

const RESUME_PARENT: u32 = 0;
const RESUME_ENTRY: u32 = 8;
const RESUME_FUNCTION: u32 = 16;
const RESUME_STATE: u32 = 24;
const RESUME_SIZE: u32 = 32;

fn resume_parent(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, RESUME_PARENT)
}

fn resume_function(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, RESUME_FUNCTION)
}

fn resume_state(heap: &Heap, addr: Addr) -> Addr {
    read_addr(heap, addr, RESUME_STATE)
}

fn alloc_native_call_resume(
    heap: &mut Heap,
    generation: Generation,
    parent: Addr,
    entry: Addr,
    function_addr: Addr,
    resume: Addr,
) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameNativeCallResume, RESUME_SIZE)?;
    write_addr(heap, addr, RESUME_PARENT, parent);
    write_addr(heap, addr, RESUME_ENTRY, entry);
    write_addr(heap, addr, RESUME_FUNCTION, function_addr);
    write_addr(heap, addr, RESUME_STATE, resume);
    Ok(addr)
}

// ---- FrameTerminal: the root of every trampoline run ----

const TERMINAL_KIND: u32 = 0;
const TERMINAL_VALUE_OR_OBJECT: u32 = 8;
const TERMINAL_THROWING_FRAME: u32 = 16;
const TERMINAL_SIZE: u32 = 24;

const TERMINAL_KIND_VALUE: u32 = 0;
const TERMINAL_KIND_VOID: u32 = 1;
const TERMINAL_KIND_EXCEPTION: u32 = 2;

fn alloc_terminal(heap: &mut Heap, generation: Generation) -> Result<Addr, crate::error::AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::FrameTerminal, TERMINAL_SIZE)?;
    heap.write_at(addr, TERMINAL_KIND, TERMINAL_KIND_VOID);
    write_box(heap, addr, TERMINAL_VALUE_OR_OBJECT, BoxValue::undefined());
    write_addr(heap, addr, TERMINAL_THROWING_FRAME, Addr::null());
    Ok(addr)
}

fn write_terminal(heap: &mut Heap, addr: Addr, kind: u32, value_or_object: BoxValue, throwing_frame: Addr) {
    heap.write_at(addr, TERMINAL_KIND, kind);
    write_box(heap, addr, TERMINAL_VALUE_OR_OBJECT, value_or_object);
    write_addr(heap, addr, TERMINAL_THROWING_FRAME, throwing_frame);
}

/// The evaluator's result, mirroring what [`HeapFormat::FrameTerminal`]
/// accumulates (§4.9): a value, a void statement result, or a thrown
/// exception tagged with the frame that raised it. A fourth case — an
/// unrecoverable host/runtime error — is not a variant here; it is the
/// `Err` side of the `Result` [`Trampoline::run`] returns, since this crate
/// already threads [`RuntimeError`] through every fallible operation and a
/// dedicated enum case would just duplicate that.
#[derive(Debug, Clone, Copy)]
pub enum EvalOutcome {
    Value(BoxValue),
    Void,
    Exception { frame: Addr, exception: Addr },
}

#[derive(Debug, Clone, Copy)]
enum ChildResult {
    Value(BoxValue),
    Void,
    Exception { frame: Addr, exception: Addr },
}

enum StepOutcome {
    /// Step into (or re-step, for a frame passing itself) `Addr` next.
    Descend(Addr),
    /// Hand `ChildResult` to the frame at `Addr`, which resolves it.
    Resolve(Addr, ChildResult),
    Done(EvalOutcome),
}

/// The closed set of native syntax handlers §4.6/§4.7 bootstraps the
/// global scope with, one per [`NodeKind`]. Consumed by
/// [`crate::context::ThreadContext::bootstrap_natives`] the same way it
/// consumes [`crate::function::NATIVES`]; kept as a distinct, disjoint ID
/// space from [`crate::function::NATIVES`] so a function's `native_id`
/// alone never has to disambiguate which table it indexes — the two only
/// ever get dispatched from their own dedicated frame kind
/// ([`FrameInvokeSyntax`] vs. [`FrameInvokeApplicative`]/[`FrameInvokeOperative`]).
pub struct SyntaxNativeEntry {
    pub name: &'static str,
    pub kind: FunctionKind,
    pub native_id: u32,
}

pub const SYNTAX_NATIVES: &[SyntaxNativeEntry] = &[
    SyntaxNativeEntry { name: NodeKind::File.handler_name(), kind: FunctionKind::Operative, native_id: NodeKind::File as u32 },
    SyntaxNativeEntry { name: NodeKind::Block.handler_name(), kind: FunctionKind::Operative, native_id: NodeKind::Block as u32 },
    SyntaxNativeEntry { name: NodeKind::Var.handler_name(), kind: FunctionKind::Operative, native_id: NodeKind::Var as u32 },
    SyntaxNativeEntry { name: NodeKind::Binding.handler_name(), kind: FunctionKind::Operative, native_id: NodeKind::Binding as u32 },
    SyntaxNativeEntry { name: NodeKind::CallExpr.handler_name(), kind: FunctionKind::Operative, native_id: NodeKind::CallExpr as u32 },
    SyntaxNativeEntry { name: NodeKind::Name.handler_name(), kind: FunctionKind::Operative, native_id: NodeKind::Name as u32 },
    SyntaxNativeEntry { name: NodeKind::IntegerLiteral.handler_name(), kind: FunctionKind::Operative, native_id: NodeKind::IntegerLiteral as u32 },
    SyntaxNativeEntry { name: NodeKind::StringLiteral.handler_name(), kind: FunctionKind::Operative, native_id: NodeKind::StringLiteral as u32 },
];

/// The stateless namespace of evaluation functions operating on a borrowed
/// [`FrameResources`] — the role the teacher's `Vm::run` plays over a
/// borrowed `Process` (see `crate::context`'s module doc).
pub struct Trampoline;

impl Trampoline {
    /// Evaluates the syntax node at `node_offset` in `tree` within `scope`
    /// to completion, driving the Step/Resolve frame machine rooted at a
    /// fresh [`HeapFormat::FrameTerminal`] until it resolves.
    pub fn run(res: &mut FrameResources, scope: Addr, tree: Addr, node_offset: u32) -> Result<EvalOutcome, RuntimeError> {
        let terminal = res.alloc_with_retry(|heap| alloc_terminal(heap, Generation::Hatchery))?;
        let root_entry = res.alloc_with_retry(|heap| alloc_entry(heap, Generation::Hatchery, terminal, tree, scope, node_offset))?;

        let mut action = StepOutcome::Descend(root_entry);
        loop {
            action = match action {
                StepOutcome::Descend(addr) => step(res, addr)?,
                StepOutcome::Resolve(addr, child) => resolve(res, addr, child)?,
                StepOutcome::Done(outcome) => return Ok(outcome),
            };
        }
    }
}

fn step(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    match res.heap.header_of(frame).format() {
        HeapFormat::FrameEntry => step_entry(res, frame),
        HeapFormat::FrameSyntaxNameLookup => step_syntax_name_lookup(res, frame),
        HeapFormat::FrameInvokeSyntax => step_invoke_syntax(res, frame),
        HeapFormat::FrameFile | HeapFormat::FrameBlock => step_sequence(res, frame),
        HeapFormat::FrameVar => step_var(res, frame),
        HeapFormat::FrameCallExpr => step_call_expr(res, frame),
        HeapFormat::FrameInvokeApplicative => step_invoke_applicative(res, frame),
        HeapFormat::FrameInvokeOperative => step_invoke_operative(res, frame),
        other => Err(RuntimeError::InvariantViolation(other.name())),
    }
}

fn resolve(res: &mut FrameResources, frame: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    match res.heap.header_of(frame).format() {
        HeapFormat::FrameTerminal => resolve_terminal(res, frame, child),
        HeapFormat::FrameEntry => resolve_entry(res, frame, child),
        HeapFormat::FrameFile | HeapFormat::FrameBlock => resolve_sequence(res, frame, child),
        HeapFormat::FrameVar => resolve_var(res, frame, child),
        HeapFormat::FrameCallExpr => resolve_call_expr(res, frame, child),
        HeapFormat::FrameNativeCallResume => resolve_native_call_resume(res, frame, child),
        other => Err(RuntimeError::InvariantViolation(other.name())),
    }
}

fn resolve_terminal(res: &mut FrameResources, frame: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    let outcome = match child {
        ChildResult::Value(v) => {
            write_terminal(res.heap, frame, TERMINAL_KIND_VALUE, v, Addr::null());
            EvalOutcome::Value(v)
        }
        ChildResult::Void => {
            write_terminal(res.heap, frame, TERMINAL_KIND_VOID, BoxValue::undefined(), Addr::null());
            EvalOutcome::Void
        }
        ChildResult::Exception { frame: throwing, exception } => {
            write_terminal(res.heap, frame, TERMINAL_KIND_EXCEPTION, BoxValue::from_addr(exception), throwing);
            EvalOutcome::Exception { frame: throwing, exception }
        }
    };
    Ok(StepOutcome::Done(outcome))
}

// ---- Entry: look up the current node kind's handler, then invoke it ----

fn step_entry(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    let tree = entry_tree(res.heap, frame);
    let node_offset = entry_node_offset(res.heap, frame);
    let scope = entry_scope(res.heap, frame);

    let kind = syntax::node_kind(res.heap, tree, node_offset)?;
    let handler_name = kind.handler_name();
    let name_addr = res.intern(Generation::Hatchery, handler_name)?;
    let state = res.alloc_with_retry(|heap| crate::lookup::start(heap, Generation::Hatchery, scope, name_addr))?;
    let lookup_frame =
        res.alloc_with_retry(|heap| alloc_syntax_name_lookup(heap, Generation::Hatchery, frame, frame, state, name_addr))?;
    Ok(StepOutcome::Descend(lookup_frame))
}

fn resolve_entry(res: &mut FrameResources, frame: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    let parent = entry_parent(res.heap, frame);
    match child {
        ChildResult::Exception { frame: throwing, exception } => Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame: throwing, exception })),
        ChildResult::Value(handler) => {
            let invoke = res.alloc_with_retry(|heap| alloc_invoke_syntax(heap, Generation::Hatchery, parent, frame, handler))?;
            Ok(StepOutcome::Descend(invoke))
        }
        ChildResult::Void => Err(RuntimeError::InvariantViolation("syntax handler lookup produced void")),
    }
}

// ---- SyntaxNameLookup: drives a LookupState one step at a time ----
//
// Per `crate::lookup::lookup`'s doc comment, this does not call that
// convenience function; it steps `LookupState` directly so a future
// descriptor kind that needs to suspend mid-search has somewhere to do so.

fn step_syntax_name_lookup(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    let state = read_addr(res.heap, frame, LOOKUP_STATE);
    let name_addr = read_addr(res.heap, frame, LOOKUP_NAME);
    let parent = read_addr(res.heap, frame, LOOKUP_PARENT);
    let name = string::to_string(res.heap, name_addr);
    let spoiler = res.spoiler;

    let Some(object) = crate::lookup::current_object(res.heap, state) else {
        let exc = res.alloc_with_retry(|heap| {
            exception::alloc_name_lookup_failed(heap, Generation::Hatchery, crate::lookup::receiver(heap, state), name_addr)
        })?;
        return Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }));
    };

    match object::get_own(res.heap, object, &name, spoiler) {
        Some(Descriptor::Slot { value, .. }) => Ok(StepOutcome::Resolve(parent, ChildResult::Value(value))),
        Some(Descriptor::Method { function: f }) => Ok(StepOutcome::Resolve(parent, ChildResult::Value(BoxValue::from_addr(f)))),
        None => {
            if res.alloc_with_retry(|heap| crate::lookup::advance(heap, Generation::Hatchery, state))? {
                Ok(StepOutcome::Descend(frame))
            } else {
                let exc = res.alloc_with_retry(|heap| {
                    exception::alloc_name_lookup_failed(heap, Generation::Hatchery, crate::lookup::receiver(heap, state), name_addr)
                })?;
                Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }))
            }
        }
    }
}

// ---- InvokeSyntax: runs the resolved handler's built-in behavior ----

fn step_invoke_syntax(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    let parent = read_addr(res.heap, frame, INVOKE_SYNTAX_PARENT);
    let entry_addr = read_addr(res.heap, frame, INVOKE_SYNTAX_ENTRY);
    let handler = read_box(res.heap, frame, INVOKE_SYNTAX_HANDLER);

    if !handler.is_pointer() || res.heap.header_of(handler.as_addr()).format() != HeapFormat::Function {
        let exc = build_internal_exception(res, "call target is not a function", &[handler])?;
        return Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }));
    }
    let function_addr = handler.as_addr();
    if !function::is_native(res.heap, function_addr) || function::kind(res.heap, function_addr) != FunctionKind::Operative {
        let exc = res.alloc_with_retry(|heap| exception::alloc_function_not_operative(heap, Generation::Hatchery, function_addr))?;
        return Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }));
    }

    let native_id = function::native_id(res.heap, function_addr);
    let tree = entry_tree(res.heap, entry_addr);
    let node_offset = entry_node_offset(res.heap, entry_addr);
    let scope = entry_scope(res.heap, entry_addr);

    if native_id == NodeKind::File as u32 {
        let file_frame = res.alloc_with_retry(|heap| alloc_file(heap, Generation::Hatchery, parent, entry_addr, 0))?;
        Ok(StepOutcome::Descend(file_frame))
    } else if native_id == NodeKind::Block as u32 {
        let cap = res.default_dict_capacity;
        let block_scope = res.alloc_with_retry(|heap| scope::alloc_block(heap, Generation::Hatchery, scope, cap))?;
        let sub_entry = res.alloc_with_retry(|heap| alloc_entry(heap, Generation::Hatchery, entry_addr, tree, block_scope, node_offset))?;
        let block_frame = res.alloc_with_retry(|heap| alloc_block_frame(heap, Generation::Hatchery, parent, sub_entry, 0))?;
        Ok(StepOutcome::Descend(block_frame))
    } else if native_id == NodeKind::Var as u32 {
        let var_frame = res.alloc_with_retry(|heap| alloc_var_frame(heap, Generation::Hatchery, parent, entry_addr, 0))?;
        Ok(StepOutcome::Descend(var_frame))
    } else if native_id == NodeKind::CallExpr as u32 {
        let call_frame = res.alloc_with_retry(|heap| {
            alloc_call_expr(heap, Generation::Hatchery, parent, entry_addr, CALL_STATE_CALLEE, 0, BoxValue::undefined(), function::nil())
        })?;
        Ok(StepOutcome::Descend(call_frame))
    } else if native_id == NodeKind::Name as u32 {
        let text = syntax::name_text(res.heap, tree, node_offset);
        let name_addr = res.intern(Generation::Hatchery, &text)?;
        let spoiler = res.spoiler;
        match res.alloc_with_retry(|heap| crate::lookup::lookup(heap, Generation::Hatchery, scope, &text, name_addr, spoiler))? {
            Some(Descriptor::Slot { value, .. }) => Ok(StepOutcome::Resolve(parent, ChildResult::Value(value))),
            Some(Descriptor::Method { function: f }) => Ok(StepOutcome::Resolve(parent, ChildResult::Value(BoxValue::from_addr(f)))),
            None => {
                let exc = res.alloc_with_retry(|heap| exception::alloc_name_lookup_failed(heap, Generation::Hatchery, scope, name_addr))?;
                Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }))
            }
        }
    } else if native_id == NodeKind::IntegerLiteral as u32 {
        let value = syntax::integer_literal_value(res.heap, tree, node_offset);
        let boxed = box_integer_literal(res, value)?;
        Ok(StepOutcome::Resolve(parent, ChildResult::Value(boxed)))
    } else if native_id == NodeKind::StringLiteral as u32 {
        let text = syntax::string_literal_text(res.heap, tree, node_offset);
        let addr = res.alloc_with_retry(|heap| string::alloc(heap, Generation::Hatchery, &text))?;
        Ok(StepOutcome::Resolve(parent, ChildResult::Value(BoxValue::from_addr(addr))))
    } else if native_id == NodeKind::Binding as u32 {
        // `%binding` is never independently evaluated: `FrameVar` reads a
        // binding's name/initializer directly off its parent `Var` node
        // rather than spawning an `Entry` for the `Binding` child. Included
        // in the dispatch only so the native table stays total over every
        // `NodeKind`.
        Ok(StepOutcome::Resolve(parent, ChildResult::Void))
    } else {
        Err(RuntimeError::InvariantViolation("syntax native id does not name a known node kind"))
    }
}

fn box_integer_literal(res: &mut FrameResources, value: i64) -> Result<BoxValue, RuntimeError> {
    if let Some(boxed) = BoxValue::from_i64(value) {
        return Ok(boxed);
    }
    let addr = res.alloc_with_retry(|heap| {
        let addr = heap.alloc_leaf(Generation::Hatchery, HeapFormat::Double, 8)?;
        heap.write_at(addr, 0, value as f64);
        Ok(addr)
    })?;
    Ok(BoxValue::from_addr(addr))
}

fn build_internal_exception(res: &mut FrameResources, message: &str, args: &[BoxValue]) -> Result<Addr, RuntimeError> {
    let message_addr = res.alloc_with_retry(|heap| string::alloc(heap, Generation::Hatchery, message))?;
    let exc = res.alloc_with_retry(|heap| exception::alloc_internal(heap, Generation::Hatchery, message_addr, args))?;
    Ok(exc)
}

// ---- File / Block: evaluate each statement, keep only the last result ----

fn step_sequence(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    let entry_addr = seq_entry(res.heap, frame);
    let parent = seq_parent(res.heap, frame);
    let tree = entry_tree(res.heap, entry_addr);
    let node_offset = entry_node_offset(res.heap, entry_addr);
    let scope = entry_scope(res.heap, entry_addr);
    let index = seq_statement_index(res.heap, frame);
    let count = syntax::statement_count(res.heap, tree, node_offset);

    if index >= count {
        return Ok(StepOutcome::Resolve(parent, ChildResult::Void));
    }
    let statement = syntax::statement_at(res.heap, tree, node_offset, index);
    let child_entry = res.alloc_with_retry(|heap| alloc_entry(heap, Generation::Hatchery, frame, tree, scope, statement))?;
    Ok(StepOutcome::Descend(child_entry))
}

fn resolve_sequence(res: &mut FrameResources, frame: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    let entry_addr = seq_entry(res.heap, frame);
    let parent = seq_parent(res.heap, frame);
    if let ChildResult::Exception { .. } = child {
        return Ok(StepOutcome::Resolve(parent, child));
    }
    let tree = entry_tree(res.heap, entry_addr);
    let node_offset = entry_node_offset(res.heap, entry_addr);
    let index = seq_statement_index(res.heap, frame);
    let count = syntax::statement_count(res.heap, tree, node_offset);
    if index + 1 == count {
        Ok(StepOutcome::Resolve(parent, child))
    } else {
        set_seq_statement_index(res.heap, frame, index + 1);
        Ok(StepOutcome::Descend(frame))
    }
}

// ---- Var: bind each declared name, evaluating an initializer if present ----

fn step_var(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    let entry_addr = var_entry(res.heap, frame);
    let parent = var_parent(res.heap, frame);
    let tree = entry_tree(res.heap, entry_addr);
    let var_node = entry_node_offset(res.heap, entry_addr);
    let scope = entry_scope(res.heap, entry_addr);
    let index = var_binding_index(res.heap, frame);
    let count = syntax::var_binding_count(res.heap, tree, var_node);

    if index >= count {
        return Ok(StepOutcome::Resolve(parent, ChildResult::Void));
    }
    let binding_offset = syntax::var_binding_at(res.heap, tree, var_node, index);
    match syntax::binding_init(res.heap, tree, binding_offset) {
        Some(init_offset) => {
            let child_entry = res.alloc_with_retry(|heap| alloc_entry(heap, Generation::Hatchery, frame, tree, scope, init_offset))?;
            Ok(StepOutcome::Descend(child_entry))
        }
        None => {
            bind_current(res, frame)?;
            set_var_binding_index(res.heap, frame, index + 1);
            Ok(StepOutcome::Descend(frame))
        }
    }
}

fn resolve_var(res: &mut FrameResources, frame: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    let parent = var_parent(res.heap, frame);
    match child {
        ChildResult::Exception { .. } => Ok(StepOutcome::Resolve(parent, child)),
        ChildResult::Void => {
            let ctx = build_void_context(res, "var initializer")?;
            let exc = res.alloc_with_retry(|heap| exception::alloc_void_value_used(heap, Generation::Hatchery, ctx))?;
            Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }))
        }
        ChildResult::Value(value) => {
            bind_value(res, frame, value)?;
            let index = var_binding_index(res.heap, frame);
            set_var_binding_index(res.heap, frame, index + 1);
            Ok(StepOutcome::Descend(frame))
        }
    }
}

fn bind_current(res: &mut FrameResources, frame: Addr) -> Result<(), RuntimeError> {
    bind_value(res, frame, BoxValue::undefined())
}

fn bind_value(res: &mut FrameResources, frame: Addr, value: BoxValue) -> Result<(), RuntimeError> {
    let entry_addr = var_entry(res.heap, frame);
    let tree = entry_tree(res.heap, entry_addr);
    let var_node = entry_node_offset(res.heap, entry_addr);
    let scope = entry_scope(res.heap, entry_addr);
    let index = var_binding_index(res.heap, frame);
    let binding_offset = syntax::var_binding_at(res.heap, tree, var_node, index);
    let is_const = syntax::var_is_const(res.heap, tree, var_node);
    let name = syntax::binding_name(res.heap, tree, binding_offset);
    let name_addr = res.intern(Generation::Hatchery, &name)?;
    let spoiler = res.spoiler;
    res.alloc_with_retry(|heap| scope::bind(heap, Generation::Hatchery, scope, &name, name_addr, spoiler, value, !is_const))?;
    Ok(())
}

fn build_void_context(res: &mut FrameResources, what: &str) -> Result<Addr, RuntimeError> {
    let addr = res.alloc_with_retry(|heap| string::alloc(heap, Generation::Hatchery, what))?;
    Ok(addr)
}

// ---- CallExpr: evaluate the callee, then each argument, then invoke ----
//
// Arguments are evaluated in call order (argNo 0, 1, 2, ...) but each
// freshly-evaluated value is *prepended* to `operands` (`crate::function::cons`
// only ever prepends), so the cons list accumulates in the reverse of
// evaluation order. `crate::function::operand_vec`'s doc comment promises a
// head-to-tail walk already yields call order "without needing to
// reverse" — which holds only if the *last* argument is consed first, the
// first argument consed last (so it ends up at the head). To honor both
// "evaluate left to right" and "no reversal needed", argument `argNo`
// evaluates syntax position `arg_count - 1 - argNo`: the reverse of
// insertion order but matching `crate::function`'s tested invariant
// exactly (see `function::function_test::operand_list_preserves_call_order`).

fn step_call_expr(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    let entry_addr = call_entry(res.heap, frame);
    let tree = entry_tree(res.heap, entry_addr);
    let call_node = entry_node_offset(res.heap, entry_addr);
    let scope = entry_scope(res.heap, entry_addr);
    let state = call_state(res.heap, frame);

    if state == CALL_STATE_CALLEE {
        let callee_node = syntax::call_callee(res.heap, tree, call_node);
        let child_entry = res.alloc_with_retry(|heap| alloc_entry(heap, Generation::Hatchery, frame, tree, scope, callee_node))?;
        Ok(StepOutcome::Descend(child_entry))
    } else {
        // CALL_STATE_ARGS: `step` only ever runs once per state, to spawn
        // the callee's Entry; every argument transition happens in
        // `resolve_call_expr`, which knows the value that just came back.
        Err(RuntimeError::InvariantViolation("FrameCallExpr stepped while awaiting an argument result"))
    }
}

fn resolve_call_expr(res: &mut FrameResources, frame: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    let parent = call_parent(res.heap, frame);
    if let ChildResult::Exception { .. } = child {
        return Ok(StepOutcome::Resolve(parent, child));
    }

    let state = call_state(res.heap, frame);
    if state == CALL_STATE_CALLEE {
        resolve_call_expr_callee(res, frame, parent, child)
    } else {
        resolve_call_expr_arg(res, frame, parent, child)
    }
}

fn resolve_call_expr_callee(res: &mut FrameResources, frame: Addr, parent: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    let ChildResult::Value(callee) = child else {
        let ctx = build_void_context(res, "call target")?;
        let exc = res.alloc_with_retry(|heap| exception::alloc_void_value_used(heap, Generation::Hatchery, ctx))?;
        return Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }));
    };
    if !callee.is_pointer() || res.heap.header_of(callee.as_addr()).format() != HeapFormat::Function {
        let exc = build_internal_exception(res, "call target is not a function", &[callee])?;
        return Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }));
    }
    set_call_callee(res.heap, frame, callee);
    let function_addr = callee.as_addr();

    let entry_addr = call_entry(res.heap, frame);
    let tree = entry_tree(res.heap, entry_addr);
    let call_node = entry_node_offset(res.heap, entry_addr);
    let scope = entry_scope(res.heap, entry_addr);
    let arg_count = syntax::call_arg_count(res.heap, tree, call_node);

    match function::kind(res.heap, function_addr) {
        FunctionKind::Operative => {
            let invoke = res.alloc_with_retry(|heap| alloc_invoke_operative(heap, Generation::Hatchery, parent, entry_addr, function_addr, tree, call_node))?;
            Ok(StepOutcome::Descend(invoke))
        }
        FunctionKind::Applicative if arg_count == 0 => {
            let invoke = res.alloc_with_retry(|heap| alloc_invoke_applicative(heap, Generation::Hatchery, parent, entry_addr, function_addr, function::nil()))?;
            Ok(StepOutcome::Descend(invoke))
        }
        FunctionKind::Applicative => {
            set_call_state(res.heap, frame, CALL_STATE_ARGS);
            set_call_arg_no(res.heap, frame, 0);
            let arg_node = syntax::call_arg_at(res.heap, tree, call_node, arg_count - 1);
            let arg_entry = res.alloc_with_retry(|heap| alloc_entry(heap, Generation::Hatchery, frame, tree, scope, arg_node))?;
            Ok(StepOutcome::Descend(arg_entry))
        }
    }
}

fn resolve_call_expr_arg(res: &mut FrameResources, frame: Addr, parent: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    let arg_no = call_arg_no(res.heap, frame);
    let ChildResult::Value(value) = child else {
        let ctx = build_void_context(res, "call argument")?;
        let exc = res.alloc_with_retry(|heap| exception::alloc_void_value_used(heap, Generation::Hatchery, ctx))?;
        return Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }));
    };

    let previous = call_operands(res.heap, frame);
    let operands = res.alloc_with_retry(|heap| function::cons(heap, Generation::Hatchery, value, previous))?;
    set_call_operands(res.heap, frame, operands);

    let entry_addr = call_entry(res.heap, frame);
    let tree = entry_tree(res.heap, entry_addr);
    let call_node = entry_node_offset(res.heap, entry_addr);
    let scope = entry_scope(res.heap, entry_addr);
    let arg_count = syntax::call_arg_count(res.heap, tree, call_node);
    let next_arg_no = arg_no + 1;

    if next_arg_no == arg_count {
        let function_addr = call_callee(res.heap, frame).as_addr();
        let invoke = res.alloc_with_retry(|heap| alloc_invoke_applicative(heap, Generation::Hatchery, parent, entry_addr, function_addr, operands))?;
        Ok(StepOutcome::Descend(invoke))
    } else {
        set_call_arg_no(res.heap, frame, next_arg_no);
        let arg_node = syntax::call_arg_at(res.heap, tree, call_node, arg_count - 1 - next_arg_no);
        let arg_entry = res.alloc_with_retry(|heap| alloc_entry(heap, Generation::Hatchery, frame, tree, scope, arg_node))?;
        Ok(StepOutcome::Descend(arg_entry))
    }
}

// ---- InvokeApplicative / InvokeOperative: run a resolved function ----

fn step_invoke_applicative(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    let parent = app_parent(res.heap, frame);
    let function_addr = app_function(res.heap, frame);
    let operands_addr = app_operands(res.heap, frame);

    if function::is_native(res.heap, function_addr) {
        let native_id = function::native_id(res.heap, function_addr) as usize;
        if native_id >= function::NATIVES.len() {
            return Err(RuntimeError::InvariantViolation("native applicative id out of range"));
        }
        let args = function::operand_vec(res.heap, operands_addr);
        let entry_addr = app_entry(res.heap, frame);
        dispatch_native(res, frame, parent, entry_addr, function_addr, native_id, &args)
    } else {
        invoke_scripted(res, parent, function_addr)
    }
}

fn step_invoke_operative(res: &mut FrameResources, frame: Addr) -> Result<StepOutcome, RuntimeError> {
    let parent = op_parent(res.heap, frame);
    let function_addr = op_function(res.heap, frame);

    if function::is_native(res.heap, function_addr) {
        // No entry in `crate::function::NATIVES` is ever `Operative` — the
        // only operatives this crate ships are the syntax handlers in
        // `SYNTAX_NATIVES`, which `FrameInvokeSyntax` dispatches directly
        // rather than routing through here. Reachable only if a future
        // native table adds an operative entry without updating this path.
        Err(RuntimeError::InvariantViolation("native operative invocation is unsupported"))
    } else {
        invoke_scripted(res, parent, function_addr)
    }
}

fn dispatch_native(
    res: &mut FrameResources,
    frame: Addr,
    parent: Addr,
    entry_addr: Addr,
    function_addr: Addr,
    native_id: usize,
    args: &[BoxValue],
) -> Result<StepOutcome, RuntimeError> {
    let entry = &function::NATIVES[native_id];
    let outcome = res.alloc_with_retry(|heap| (entry.call)(heap, Generation::Hatchery, args))?;
    match outcome {
        NativeOutcome::Value(v) => Ok(StepOutcome::Resolve(parent, ChildResult::Value(v))),
        NativeOutcome::Void => Ok(StepOutcome::Resolve(parent, ChildResult::Void)),
        NativeOutcome::WrongArguments => {
            let exc = build_internal_exception(res, "native function received the wrong arguments", args)?;
            Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }))
        }
        NativeOutcome::Invoke { function: target, operands } => {
            if res.heap.header_of(target).format() != HeapFormat::Function {
                return Err(RuntimeError::InvariantViolation("native requested invocation of a non-function"));
            }
            if function::kind(res.heap, target) == FunctionKind::Operative {
                let exc = res.alloc_with_retry(|heap| exception::alloc_function_not_operative(heap, Generation::Hatchery, target))?;
                return Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }));
            }
            let continuation = res.alloc_with_retry(|heap| function::alloc_continuation(heap, Generation::Hatchery, 0, &[]))?;
            let resume_frame =
                res.alloc_with_retry(|heap| alloc_native_call_resume(heap, Generation::Hatchery, parent, entry_addr, function_addr, continuation))?;
            let invoke = res.alloc_with_retry(|heap| alloc_invoke_applicative(heap, Generation::Hatchery, resume_frame, entry_addr, target, operands))?;
            Ok(StepOutcome::Descend(invoke))
        }
    }
}

/// Resumes a native suspended by [`NativeOutcome::Invoke`] once the
/// invocation it spawned resolves, per `function::NativeEntry::resume`.
/// An exception from the nested call is not handed to the native at all —
/// it unwinds straight past the resume point to `parent`, the same as any
/// other exception propagating out of a child frame.
fn resolve_native_call_resume(res: &mut FrameResources, frame: Addr, child: ChildResult) -> Result<StepOutcome, RuntimeError> {
    let parent = resume_parent(res.heap, frame);
    let resumed = match child {
        ChildResult::Exception { .. } => return Ok(StepOutcome::Resolve(parent, child)),
        ChildResult::Value(v) => ResumeValue::Value(v),
        ChildResult::Void => ResumeValue::Void,
    };

    let function_addr = resume_function(res.heap, frame);
    let native_id = function::native_id(res.heap, function_addr) as usize;
    if native_id >= function::NATIVES.len() {
        return Err(RuntimeError::InvariantViolation("native applicative id out of range"));
    }
    let entry = &function::NATIVES[native_id];
    let Some(resume_fn) = entry.resume else {
        return Err(RuntimeError::InvariantViolation("resumed native has no resume handler"));
    };
    let state = resume_state(res.heap, frame);
    let saved = function::continuation_saved_vec(res.heap, state);
    let outcome = res.alloc_with_retry(|heap| resume_fn(heap, Generation::Hatchery, &saved, resumed))?;
    match outcome {
        NativeOutcome::Value(v) => Ok(StepOutcome::Resolve(parent, ChildResult::Value(v))),
        NativeOutcome::Void => Ok(StepOutcome::Resolve(parent, ChildResult::Void)),
        NativeOutcome::WrongArguments => {
            let exc = build_internal_exception(res, "native function resumed with the wrong arguments", &saved)?;
            Ok(StepOutcome::Resolve(parent, ChildResult::Exception { frame, exception: exc }))
        }
        NativeOutcome::Invoke { .. } => Err(RuntimeError::InvariantViolation("a resumed native cannot suspend again")),
    }
}

/// Runs a scripted (non-native) function's body within a fresh call scope
/// closed over the function's defining scope.
///
/// No syntax construct in this crate can produce a parameter list ([`NodeKind`]
/// has no lambda/function-literal form), so `operands`/the call's raw
/// syntax are not bound into the new scope here — there is nothing to
/// name them with yet. This path exists for forward compatibility with a
/// future parameter-list node, per the spec's scripted-function Open
/// Question (recorded in `DESIGN.md`); it is unreachable from any program
/// this crate's `Writer` can currently build.
fn invoke_scripted(res: &mut FrameResources, parent: Addr, function_addr: Addr) -> Result<StepOutcome, RuntimeError> {
    let closure_scope = function::scope(res.heap, function_addr);
    let tree = function::tree(res.heap, function_addr);
    let node_offset = function::node_offset(res.heap, function_addr);
    let cap = res.default_dict_capacity;
    let call_scope = res.alloc_with_retry(|heap| scope::alloc_call(heap, Generation::Hatchery, closure_scope, cap))?;
    let body_entry = res.alloc_with_retry(|heap| alloc_entry(heap, Generation::Hatchery, parent, tree, call_scope, node_offset))?;
    Ok(StepOutcome::Descend(body_entry))
}
