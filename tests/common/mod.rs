// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared test infrastructure for integration tests.
//!
//! This module provides [`TestVm`], a stateful wrapper around a
//! [`ThreadContext`] that runs programs built with [`Writer`] through
//! [`Trampoline::run`] the same way a host embedding this crate would.
//!
//! # Design
//!
//! This module is **not** a test file, so it must comply with full clippy
//! rules. Test-specific allowances (like `unwrap_used`) are only permitted
//! in `*_test.rs` files.

#![expect(dead_code, reason = "test infrastructure used selectively across test files")]

use vmcore::config::RuntimeConfig;
use vmcore::context::{Runtime, ThreadContext};
use vmcore::frame::{EvalOutcome, Trampoline};
use vmcore::heap::{Generation, HeapSizes};
use vmcore::syntax::Writer;

/// A stateful runtime for integration testing, its own heap isolated from
/// every other test's (§5: one heap per thread-context).
pub struct TestVm {
    context: ThreadContext,
}

impl TestVm {
    /// A new VM with generation sizes generous enough that an ordinary
    /// test program never triggers a collection.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig {
            heap_sizes: HeapSizes { hatchery: 256 * 1024, local_heap: 256 * 1024, tenured: 256 * 1024 },
            string_table_capacity: 64,
            default_dict_capacity: 8,
        })
    }

    /// A VM built from a caller-supplied configuration, for tests that
    /// exercise generation exhaustion or dictionary enlargement directly.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        let runtime = Runtime::new(config);
        let context = runtime.new_thread_context(0).expect("fresh thread context");
        Self { context }
    }

    #[must_use]
    pub fn context(&self) -> &ThreadContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ThreadContext {
        &mut self.context
    }

    /// Builds a program with `build` (which returns the root node's
    /// offset), writes it into this VM's heap, and runs it to completion.
    pub fn eval(&mut self, build: impl FnOnce(&mut Writer) -> u32) -> EvalOutcome {
        let mut writer = Writer::new();
        let root = build(&mut writer);
        let tree = writer.finish(self.context.heap_mut(), Generation::Hatchery, root).expect("packed syntax tree");
        let scope = self.context.global_scope();
        let mut res = self.context.frame_resources();
        Trampoline::run(&mut res, scope, tree, root).expect("evaluation does not hit a runtime error")
    }
}

impl Default for TestVm {
    fn default() -> Self {
        Self::new()
    }
}
