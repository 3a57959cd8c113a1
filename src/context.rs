// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The external interface (§6): a [`Runtime`] the host constructs once from
//! a [`RuntimeConfig`], and a [`ThreadContext`] per independent evaluation
//! (§5: one heap per thread-context, no cross-thread pointers).
//!
//! Grounded in the teacher's `Realm`/`Process`/`Vm` split
//! (`lona-vm/src/realm/mod.rs`, `lona-vm/src/process/mod.rs`,
//! `lona-vm/src/vm/mod.rs`): `Vm::run` is a stateless namespace of
//! execution functions operating on a `Process` it borrows, which is the
//! role [`crate::frame::Trampoline`] plays here; `ThreadContext` is this
//! crate's `Process` (it owns the heap, root chain, string table and
//! per-context hash spoiler); `Runtime` is the thin, mostly-stateless
//! holder of host configuration that constructs fresh `ThreadContext`s,
//! analogous to how the teacher's `Realm` anchors state shared across the
//! processes built from it (here, nothing is actually shared between
//! thread-contexts — §5 forbids cross-thread pointers — so `Runtime`
//! carries only the config needed to build one consistently).

#[cfg(test)]
mod context_test;

use crate::boxval::BoxValue;
use crate::config::RuntimeConfig;
use crate::error::AllocError;
use crate::function::{self, FunctionKind};
use crate::heap::{Addr, Generation, Heap};
use crate::rooting::RootChain;
use crate::scope;
use crate::string::StringTable;

/// Host-facing entry point: holds the configuration every
/// [`ThreadContext`] built from it is constructed with.
#[derive(Debug, Clone)]
pub struct Runtime {
    config: RuntimeConfig,
}

impl Runtime {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Builds a fresh [`ThreadContext`]: a new three-generation heap, an
    /// empty root chain, a string table, and a global scope pre-populated
    /// with the native applicatives in [`crate::function::NATIVES`].
    /// `spoiler` seeds the string table's anti-collision hash mixer
    /// (§4.5) — the host supplies it (e.g. from a process-level RNG) so
    /// this crate, which has no entropy source of its own, does not have
    /// to fabricate one.
    pub fn new_thread_context(&self, spoiler: u64) -> Result<ThreadContext, AllocError> {
        ThreadContext::new(self.config.clone(), spoiler)
    }
}

/// Owns every piece of mutable state one independent evaluation needs:
/// the managed heap, the stack root chain, the interned-string table, and
/// the global scope natives are bound into.
pub struct ThreadContext {
    heap: Heap,
    roots: RootChain,
    strings: StringTable,
    spoiler: u64,
    default_dict_capacity: u32,
    global_scope: Addr,
}

impl ThreadContext {
    pub fn new(config: RuntimeConfig, spoiler: u64) -> Result<Self, AllocError> {
        let mut heap = Heap::new(config.heap_sizes);
        let strings = StringTable::new(config.string_table_capacity, spoiler);
        let global_scope = scope::alloc_global(&mut heap, Generation::Hatchery, config.default_dict_capacity)?;

        let mut context = Self {
            heap,
            roots: RootChain::new(),
            strings,
            spoiler,
            default_dict_capacity: config.default_dict_capacity,
            global_scope,
        };
        context.bootstrap_natives()?;
        Ok(context)
    }

    fn bootstrap_natives(&mut self) -> Result<(), AllocError> {
        for (native_id, entry) in function::NATIVES.iter().enumerate() {
            let native_id = u32::try_from(native_id).expect("native table fits in u32");
            let function_addr = function::alloc_native(&mut self.heap, Generation::Hatchery, entry.kind, native_id)?;
            let name_addr = self.strings.intern(&mut self.heap, Generation::Hatchery, entry.name)?;
            scope::bind(
                &mut self.heap,
                Generation::Hatchery,
                self.global_scope,
                entry.name,
                name_addr,
                self.spoiler,
                BoxValue::from_addr(function_addr),
                false,
            )?;
            log::trace!("bound native {} (id {native_id})", entry.name);
        }
        for entry in crate::frame::SYNTAX_NATIVES {
            let function_addr =
                function::alloc_native(&mut self.heap, Generation::Hatchery, entry.kind, entry.native_id)?;
            let name_addr = self.strings.intern(&mut self.heap, Generation::Hatchery, entry.name)?;
            scope::bind(
                &mut self.heap,
                Generation::Hatchery,
                self.global_scope,
                entry.name,
                name_addr,
                self.spoiler,
                BoxValue::from_addr(function_addr),
                false,
            )?;
            log::trace!("bound syntax native {} (id {})", entry.name, entry.native_id);
        }
        Ok(())
    }

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    #[must_use]
    pub const fn roots(&self) -> &RootChain {
        &self.roots
    }

    #[must_use]
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut StringTable {
        &mut self.strings
    }

    #[must_use]
    pub const fn spoiler(&self) -> u64 {
        self.spoiler
    }

    #[must_use]
    pub const fn default_dict_capacity(&self) -> u32 {
        self.default_dict_capacity
    }

    #[must_use]
    pub const fn global_scope(&self) -> Addr {
        self.global_scope
    }

    /// Borrows every piece of state [`crate::frame::Trampoline`] needs at
    /// once: the heap mutably, the root chain immutably (its slots are
    /// interior-mutable, §5's rooting discipline), and the string table
    /// mutably. Splitting the borrow this way lets the trampoline hold a
    /// live [`crate::rooting::Local`] (borrowing `roots`) across heap
    /// mutations without the borrow checker seeing a single `&mut
    /// ThreadContext` aliased two ways.
    pub fn frame_resources(&mut self) -> FrameResources<'_> {
        FrameResources {
            heap: &mut self.heap,
            roots: &self.roots,
            strings: &mut self.strings,
            spoiler: self.spoiler,
            default_dict_capacity: self.default_dict_capacity,
            global_scope: &mut self.global_scope,
        }
    }

    /// Interns `name`, retrying once through a collection if the table's
    /// backing allocation (or the table's own growth allocation) is
    /// exhausted.
    pub fn intern(&mut self, generation: Generation, name: &str) -> Result<Addr, AllocError> {
        match self.strings.intern(&mut self.heap, generation, name) {
            Ok(addr) => Ok(addr),
            Err(AllocError::Exhausted { generation: exhausted }) => {
                self.collect(exhausted);
                self.strings.intern(&mut self.heap, generation, name)
            }
        }
    }

    /// Runs `f` against this context's heap, retrying exactly once after
    /// triggering the appropriate collection if `f` reports its
    /// generation as exhausted (§4.1: "callers retry after a collection").
    /// A second `AllocError` is propagated — this context's slabs are
    /// simply too small for the requested allocation.
    pub fn alloc_with_retry<T>(
        &mut self,
        f: impl Fn(&mut Heap) -> Result<T, AllocError>,
    ) -> Result<T, AllocError> {
        match f(&mut self.heap) {
            Ok(value) => Ok(value),
            Err(AllocError::Exhausted { generation }) => {
                self.collect(generation);
                f(&mut self.heap)
            }
        }
    }

    /// Collects (or promotes) the generation that just reported
    /// exhaustion, rooted at the stack root chain, the string table, and
    /// the global scope — every pointer this context keeps alive outside
    /// the heap itself.
    fn collect(&mut self, exhausted: Generation) {
        match exhausted {
            Generation::Hatchery => {
                log::debug!("hatchery exhausted, running a nursery collection");
                self.heap.collect_hatchery_tracing(&self.roots, &mut self.strings, &mut [&mut self.global_scope]);
            }
            Generation::LocalHeap => {
                log::debug!("local heap exhausted, promoting survivors into tenured space");
                self.heap.promote_local_heap_tracing(&self.roots, &mut self.strings, &mut [&mut self.global_scope]);
            }
            Generation::Tenured => {
                log::warn!("tenured space exhausted; no further generation to promote into");
            }
        }
    }
}

/// The split-borrow view of a [`ThreadContext`] the evaluator trampoline
/// runs against: everything a `Step` or `Resolve` needs, minus the
/// `ThreadContext` wrapper itself, so a live root (borrowing `roots`) and a
/// heap mutation (borrowing `heap` mutably) can coexist in the same
/// function without aliasing one field through two paths.
pub struct FrameResources<'a> {
    pub heap: &'a mut Heap,
    pub roots: &'a RootChain,
    pub strings: &'a mut StringTable,
    pub spoiler: u64,
    pub default_dict_capacity: u32,
    pub global_scope: &'a mut Addr,
}

impl FrameResources<'_> {
    /// Runs `f` against the heap, retrying exactly once after collecting
    /// (or promoting) the generation `f` reports as exhausted.
    pub fn alloc_with_retry<T>(
        &mut self,
        f: impl Fn(&mut Heap) -> Result<T, AllocError>,
    ) -> Result<T, AllocError> {
        match f(self.heap) {
            Ok(value) => Ok(value),
            Err(AllocError::Exhausted { generation }) => {
                self.collect(generation);
                f(self.heap)
            }
        }
    }

    /// Interns `name`, retrying once through a collection on exhaustion.
    pub fn intern(&mut self, generation: Generation, name: &str) -> Result<Addr, AllocError> {
        match self.strings.intern(self.heap, generation, name) {
            Ok(addr) => Ok(addr),
            Err(AllocError::Exhausted { generation: exhausted }) => {
                self.collect(exhausted);
                self.strings.intern(self.heap, generation, name)
            }
        }
    }

    fn collect(&mut self, exhausted: Generation) {
        match exhausted {
            Generation::Hatchery => {
                log::debug!("hatchery exhausted, running a nursery collection");
                self.heap.collect_hatchery_tracing(self.roots, self.strings, &mut [&mut *self.global_scope]);
            }
            Generation::LocalHeap => {
                log::debug!("local heap exhausted, promoting survivors into tenured space");
                self.heap.promote_local_heap_tracing(self.roots, self.strings, &mut [&mut *self.global_scope]);
            }
            Generation::Tenured => {
                log::warn!("tenured space exhausted; no further generation to promote into");
            }
        }
    }
}
