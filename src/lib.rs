// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # vmcore
//!
//! Managed heap, tagged value representation, and frame-based evaluator
//! core for a small dynamically-typed language.
//!
//! This crate provides:
//! - A three-generation copying garbage collector (hatchery/local-heap/
//!   tenured) with a generational write barrier
//! - A 64-bit tagged value representation ("Box": pointer, integer,
//!   boolean, undefined)
//! - A rooted-handle scheme for precise GC tracing across allocations
//! - Delegate-chain ("prototype chain") objects, scopes and property
//!   dictionaries
//! - A packed, relocatable syntax tree representation
//! - A continuation-passing, heap-allocated-frame tree-walking evaluator
//!   (no native call stack recursion for evaluated-program control flow)
//!
//! Parsing, tokenizing, a CLI driver and on-disk configuration loading are
//! out of scope for this crate; a host embeds it and supplies a packed
//! syntax tree plus a [`config::RuntimeConfig`] of its own construction.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(not(any(test, feature = "std")))]
extern crate alloc;

pub mod boxval;
pub mod config;
pub mod context;
pub mod error;
pub mod exception;
pub mod frame;
pub mod function;
pub mod heap;
pub mod lookup;
pub mod number;
pub mod object;
pub mod property;
pub mod rooting;
pub mod scope;
pub mod string;
pub mod syntax;

// Re-export commonly used types at crate root
pub use boxval::BoxValue;
pub use context::{Runtime, ThreadContext};
pub use error::RuntimeError;
pub use frame::EvalOutcome;
pub use heap::{Addr, Generation, Heap};

/// Crate version.
pub const VERSION: &str = match option_env!("CARGO_PKG_VERSION") {
    Some(v) => v,
    None => "unknown",
};
