// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Scope objects (§3 "Object and scope"): `CallScope`, `BlockScope`,
//! `ModuleScope`, `GlobalScope`. Each shares [`crate::object`]'s exact
//! two-field (delegates, dict) layout — the closed
//! [`crate::object::is_object_format`] set includes every scope format —
//! and differs from a plain object only in its format tag and in how its
//! single delegate is composed, mirroring the nested lexical-environment
//! chain a closure walks on name lookup (§4.6).
//!
//! Grounded in `original_source/src/whisper/vm/scope_object.hpp`'s
//! `CallScope`/`BlockScope`/`ModuleScope`/`GlobalScope`, each a thin
//! specialization of the base `Wobject` distinguished only by a type tag
//! and by which single object a new scope delegates to (its enclosing
//! scope or closed-over scope).

#[cfg(test)]
mod scope_test;

use crate::error::AllocError;
use crate::heap::{Addr, Generation, Heap, HeapFormat};

/// The global scope has no enclosing scope to delegate to; it is the root
/// of every lexical chain (§4.6's walk terminates here without a match
/// rather than failing to find a final delegate).
pub fn alloc_global(heap: &mut Heap, generation: Generation, dict_capacity: u32) -> Result<Addr, AllocError> {
    let delegates = crate::object::alloc_delegates(heap, generation, &[])?;
    let dict_addr = crate::property::alloc(heap, generation, dict_capacity)?;
    crate::object::alloc_with_format(heap, generation, HeapFormat::GlobalScope, delegates, dict_addr)
}

/// A module scope delegates directly to the global scope, so a module-level
/// name lookup falls through to globals/builtins after the module's own
/// bindings miss.
pub fn alloc_module(
    heap: &mut Heap,
    generation: Generation,
    global_scope: Addr,
    dict_capacity: u32,
) -> Result<Addr, AllocError> {
    alloc_single_delegate(heap, generation, HeapFormat::ModuleScope, global_scope, dict_capacity)
}

/// A block scope delegates to its immediately-enclosing scope (another
/// block, a call scope, or a module scope) — this is what makes `{ ... }`
/// nesting visible to name lookup without copying any bindings.
pub fn alloc_block(
    heap: &mut Heap,
    generation: Generation,
    enclosing_scope: Addr,
    dict_capacity: u32,
) -> Result<Addr, AllocError> {
    alloc_single_delegate(heap, generation, HeapFormat::BlockScope, enclosing_scope, dict_capacity)
}

/// A call scope delegates to the scope the invoked function closed over
/// (not the caller's scope) — this is what makes the function's free
/// variables resolve lexically rather than dynamically (§4.10's
/// `scope: Addr` closure field).
pub fn alloc_call(
    heap: &mut Heap,
    generation: Generation,
    closure_scope: Addr,
    dict_capacity: u32,
) -> Result<Addr, AllocError> {
    alloc_single_delegate(heap, generation, HeapFormat::CallScope, closure_scope, dict_capacity)
}

fn alloc_single_delegate(
    heap: &mut Heap,
    generation: Generation,
    format: HeapFormat,
    delegate: Addr,
    dict_capacity: u32,
) -> Result<Addr, AllocError> {
    let delegates = crate::object::alloc_delegates(heap, generation, &[delegate])?;
    let dict_addr = crate::property::alloc(heap, generation, dict_capacity)?;
    crate::object::alloc_with_format(heap, generation, format, delegates, dict_addr)
}

/// Declares `name` as a fresh binding directly in `scope`'s own dictionary
/// (§4.6's `Var` frame: a `var`/`const` declaration always writes to the
/// *current* scope, never walking delegates).
pub fn bind(
    heap: &mut Heap,
    generation: Generation,
    scope: Addr,
    name: &str,
    name_addr: Addr,
    spoiler: u64,
    value: crate::boxval::BoxValue,
    writable: bool,
) -> Result<(), AllocError> {
    crate::object::define_own(
        heap,
        generation,
        scope,
        name,
        name_addr,
        spoiler,
        crate::property::Descriptor::Slot { value, writable },
    )
}

/// Looks for `name` in `scope`'s own dictionary only, with no delegate
/// walk — used to implement assignment-to-existing-binding, which must
/// find *which* scope in the chain owns the name before mutating it.
/// Full name resolution for reads goes through [`crate::lookup`].
#[must_use]
pub fn own_binding(heap: &Heap, scope: Addr, name: &str, spoiler: u64) -> Option<crate::property::Descriptor> {
    crate::object::get_own(heap, scope, name, spoiler)
}
