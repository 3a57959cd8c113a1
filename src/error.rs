// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Closed error enums threaded through every fallible core operation.
//!
//! Follows the teacher's plain-enum-with-manual-`From` idiom
//! (`vm::RuntimeError`, `intrinsics::IntrinsicError`) rather than
//! `thiserror`/`anyhow`, which `lona-vm` does not depend on.

#[cfg(test)]
mod error_test;

use crate::heap::Generation;

/// A generation's slab ran out of space and the caller did not (or could
/// not) trigger a collection to reclaim it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The named generation has no room left for the requested allocation,
    /// even after the caller's collection attempt.
    Exhausted {
        /// Which generation was exhausted.
        generation: Generation,
    },
}

/// The error type threaded through every fallible core operation (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    /// Allocation failed and could not be satisfied by a collection.
    Alloc(AllocError),
    /// A debug-only internal invariant was violated. Release builds never
    /// construct this variant (the `debug_assert!` that would have produced
    /// it compiles to nothing); it exists so the frame/trampoline code has a
    /// single `Result` type in both build configurations.
    InvariantViolation(&'static str),
    /// The packed syntax tree reader found a node it cannot interpret at
    /// the offset it was asked to read (malformed or truncated blob).
    MalformedSyntaxTree {
        /// Byte offset into the tree where the problem was found.
        offset: u32,
    },
}

impl From<AllocError> for RuntimeError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}
