// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Central tracing dispatch: for every non-leaf [`HeapFormat`], describes
//! where in its payload the outgoing [`BoxValue`] references live, and
//! walks them for `scan` (collector discovery) and `update` (pointer
//! rewrite after a copy).
//!
//! Grounded in `original_source/src/whisper/vm/self_traced.hpp`'s
//! scanner/updater callback shape (`scanner(addr, ptr)` /
//! `updater(addr, ptr)`), adapted from per-C++-type specialization to a
//! single data-driven dispatch keyed off [`HeapFormat`], since every heap
//! object in this crate is a raw byte payload rather than a typed struct
//! the compiler can specialize over.
//!
//! Every non-leaf format follows one shape: zero or more individually
//! named fixed reference fields (`fixed_refs`), plus an optional flat
//! trailer of homogeneous `BoxValue` slots running from `trailer_offset` to
//! the end of the payload (`header.byte_size()`). This mirrors the
//! teacher's `HeapClosure`/`HeapTuple` fixed-header-plus-trailer shape
//! (`value/function.rs`, `value/heap.rs`), generalized so this module does
//! not need to know each format's full struct definition — only which
//! byte offsets within it hold pointers.

#[cfg(test)]
mod trace_test;

use super::addr::Addr;
use super::header::HeapFormat;
use super::slab::Slab;
use crate::boxval::BoxValue;

#[cfg(feature = "std")]
use std::vec::Vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Where a format's outgoing references live within its payload.
pub(crate) struct RefLayout {
    /// Byte offsets of individually-named `BoxValue` fields.
    pub fixed_refs: &'static [u32],
    /// Start of a flat trailer of `BoxValue` slots running to the end of
    /// the payload, if this format has one.
    pub trailer_offset: Option<u32>,
    /// A trailer of fixed-size records (rather than flat `BoxValue`
    /// slots), each contributing references at the given offsets within
    /// itself. Used by [`HeapFormat::PropertyDict`], whose entries
    /// interleave a name pointer and a descriptor value with a
    /// non-pointer flags word ([`crate::property`]).
    pub entry_layout: Option<EntryLayout>,
}

#[derive(Clone, Copy)]
pub(crate) struct EntryLayout {
    pub start: u32,
    pub stride: u32,
    pub ref_offsets: &'static [u32],
}

const EMPTY: RefLayout = RefLayout { fixed_refs: &[], trailer_offset: None, entry_layout: None };

/// Layout table. Offsets here are the single source of truth every object
/// module (`property`, `object`, `frame`, `lookup`, `intrinsics`) builds
/// its field accessors against.
pub(crate) const fn ref_layout(format: HeapFormat) -> RefLayout {
    const fn fixed(fixed_refs: &'static [u32]) -> RefLayout {
        RefLayout { fixed_refs, trailer_offset: None, entry_layout: None }
    }
    const fn fixed_and_trailer(fixed_refs: &'static [u32], trailer_offset: u32) -> RefLayout {
        RefLayout { fixed_refs, trailer_offset: Some(trailer_offset), entry_layout: None }
    }
    const fn trailer(trailer_offset: u32) -> RefLayout {
        RefLayout { fixed_refs: &[], trailer_offset: Some(trailer_offset), entry_layout: None }
    }

    match format {
        HeapFormat::String | HeapFormat::PackedSyntaxTree | HeapFormat::Double => EMPTY,

        // Entries are (name: 8, value: 8, flags: 8) records; only the
        // first two words of each ever hold a pointer (§4.6, crate::property).
        HeapFormat::PropertyDict => RefLayout {
            fixed_refs: &[],
            trailer_offset: None,
            entry_layout: Some(EntryLayout { start: 16, stride: 24, ref_offsets: &[0, 8] }),
        },

        // delegates: Addr @0, dict: Addr @8 (crate::object).
        HeapFormat::PlainObject => fixed(&[0, 8]),

        // Same two-field layout as PlainObject; scopes differ only in
        // their format tag and in how crate::scope composes `delegates`
        // (crate::scope).
        HeapFormat::CallScope
        | HeapFormat::BlockScope
        | HeapFormat::ModuleScope
        | HeapFormat::GlobalScope => fixed(&[0, 8]),

        // parent: Addr @0, tree: Addr @8, scope: Addr @16, node_offset: u32 @24 (non-ref).
        HeapFormat::FrameEntry => fixed(&[0, 8, 16]),
        // parent @0, entry: Addr @8, lookup_state: Addr @16, name: Addr @24.
        HeapFormat::FrameSyntaxNameLookup => fixed(&[0, 8, 16, 24]),
        // parent @0, entry @8, handler: Box @16.
        HeapFormat::FrameInvokeSyntax => fixed(&[0, 8, 16]),
        // parent @0, entry @8, statement_index: u32 @16 (non-ref).
        HeapFormat::FrameFile | HeapFormat::FrameBlock => fixed(&[0, 8]),
        // parent @0, entry @8, binding_index: u32 @16 (non-ref).
        HeapFormat::FrameVar => fixed(&[0, 8]),
        // parent @0, entry @8, state/argNo: u32+u32 @16/@20 (non-ref),
        // callee: Box @24, operands: Addr @32.
        HeapFormat::FrameCallExpr => fixed(&[0, 8, 24, 32]),
        // parent @0, entry @8, function: Addr @16, operands: Addr @24.
        HeapFormat::FrameInvokeApplicative => fixed(&[0, 8, 16, 24]),
        // parent @0, entry @8, function: Addr @16, tree: Addr @24,
        // node_offset: u32 @32 (non-ref).
        HeapFormat::FrameInvokeOperative => fixed(&[0, 8, 16, 24]),
        // parent @0, entry @8, function: Addr @16, resume_state: Addr @24.
        HeapFormat::FrameNativeCallResume => fixed(&[0, 8, 16, 24]),
        // kind: u32 @0 (non-ref), value/object: Box @8, throwing_frame: Addr @16.
        HeapFormat::FrameTerminal => fixed(&[8, 16]),

        // Cons cells: value: Box @0, next: Addr @8 (crate::function).
        HeapFormat::OperandList => fixed(&[0, 8]),
        HeapFormat::DelegateArray | HeapFormat::BoxArray => trailer(0),

        HeapFormat::LookupSeenSet => trailer(8),
        // parent: Addr @0, object: Addr @8, delegates: Addr @16, index: u32 @24.
        HeapFormat::LookupNode => fixed(&[0, 8, 16]),
        HeapFormat::LookupState => fixed(&[0, 8, 16, 24]),
        // step: u32 @0 (non-ref), trailer of saved Box values from @8
        // (crate::function's native-call resumption state).
        HeapFormat::Continuation => trailer(8),

        // kind/native_id: u32+u32 @0/@4 (non-ref), scope: Addr @8, tree: Addr @16,
        // node_offset: u32 @24 (non-ref) (crate::function).
        HeapFormat::Function => fixed(&[8, 16]),

        HeapFormat::ExceptionInternal => fixed_and_trailer(&[0], 8),
        HeapFormat::ExceptionNameLookupFailed => fixed(&[0, 8]),
        HeapFormat::ExceptionFunctionNotOperative => fixed(&[0]),
        HeapFormat::ExceptionVoidValueUsed => fixed(&[0]),

        HeapFormat::SourceFile => fixed(&[0, 8]),
    }
}

fn for_each_ref_offset(format: HeapFormat, byte_size: u32, mut visit: impl FnMut(u32)) {
    let layout = ref_layout(format);
    for &offset in layout.fixed_refs {
        visit(offset);
    }
    if let Some(start) = layout.trailer_offset {
        let mut offset = start;
        while offset + 8 <= byte_size {
            visit(offset);
            offset += 8;
        }
    }
    if let Some(entries) = layout.entry_layout {
        let mut entry_start = entries.start;
        while entry_start + entries.stride <= byte_size {
            for &rel in entries.ref_offsets {
                visit(entry_start + rel);
            }
            entry_start += entries.stride;
        }
    }
}

/// Calls `visit` for every live (non-invalid) outgoing pointer reachable
/// from the object at `addr`, whose header format is `format`.
pub(crate) fn scan(slab: &Slab, addr: Addr, format: HeapFormat, mut visit: impl FnMut(Addr)) {
    if format.is_leaf() {
        return;
    }
    let header = slab.header_of(addr);
    for_each_ref_offset(format, header.byte_size(), |field_offset| {
        let word: u64 = slab.read_at(addr.offset() + field_offset);
        let value = BoxValue::from_raw_bits(word);
        if !value.is_invalid() && value.is_pointer() {
            visit(value.as_addr());
        }
    });
}

/// Rewrites every outgoing pointer reachable from the object at `addr`
/// (header format `format`) using `remap`, which returns the post-move
/// address for a given pre-move address.
pub(crate) fn update(
    slab: &mut Slab,
    addr: Addr,
    format: HeapFormat,
    mut remap: impl FnMut(Addr) -> Addr,
) {
    if format.is_leaf() {
        return;
    }
    let header = slab.header_of(addr);
    let byte_size = header.byte_size();
    let mut offsets = Vec::new();
    for_each_ref_offset(format, byte_size, |field_offset| offsets.push(field_offset));
    for field_offset in offsets {
        let abs = addr.offset() + field_offset;
        let word: u64 = slab.read_at(abs);
        let value = BoxValue::from_raw_bits(word);
        if value.is_invalid() || !value.is_pointer() {
            continue;
        }
        let new_addr = remap(value.as_addr());
        slab.write_at(abs, BoxValue::from_addr(new_addr).raw_bits());
    }
}
