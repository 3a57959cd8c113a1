// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The base object: a delegate array (prototype chain) plus a property
//! dictionary (§3 "Object and scope"). [`crate::scope`]'s call/block/
//! module/global scopes share this exact two-field layout and differ only
//! in their format tag and in how their delegate array is composed.
//!
//! Grounded in `original_source/src/whisper/vm/wobject.hpp`'s `Wobject`
//! (delegates array + property map) and `vm/plain_object.hpp`'s
//! `PlainObject` (a `Wobject` with no extra state).

#[cfg(test)]
mod object_test;

use crate::boxval::BoxValue;
use crate::error::AllocError;
use crate::heap::{Addr, Generation, Heap, HeapFormat};
use crate::property::{self, DefineOutcome, Descriptor};

#[cfg(feature = "std")]
use std::vec::Vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const DELEGATES_OFFSET: u32 = 0;
const DICT_OFFSET: u32 = 8;

/// The closed set of heap formats that satisfy the base-object interface
/// (§4.2's "object box" restriction: a pointer payload must be one of
/// these to be treated as an object).
#[must_use]
pub fn is_object_format(format: HeapFormat) -> bool {
    matches!(
        format,
        HeapFormat::PlainObject
            | HeapFormat::CallScope
            | HeapFormat::BlockScope
            | HeapFormat::ModuleScope
            | HeapFormat::GlobalScope
    )
}

/// A [`BoxValue`] refined to guarantee its pointer payload names a
/// registered object type (§4.2). Construction validates the format tag
/// in debug builds; release builds trust the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectBox(Addr);

impl ObjectBox {
    /// Wraps `addr`, asserting (debug builds only) that it names an
    /// object-shaped heap allocation.
    #[must_use]
    pub fn new(heap: &Heap, addr: Addr) -> Self {
        debug_assert!(
            is_object_format(heap.header_of(addr).format()),
            "ObjectBox must wrap an object-shaped heap allocation"
        );
        Self(addr)
    }

    #[must_use]
    pub const fn addr(self) -> Addr {
        self.0
    }

    #[must_use]
    pub const fn as_box(self) -> BoxValue {
        BoxValue::from_addr(self.0)
    }

    /// Attempts to view `value` as an object box, failing if it is not a
    /// pointer to a registered object format.
    #[must_use]
    pub fn from_box(heap: &Heap, value: BoxValue) -> Option<Self> {
        if !value.is_pointer() {
            return None;
        }
        let addr = value.as_addr();
        is_object_format(heap.header_of(addr).format()).then_some(Self(addr))
    }
}

/// Allocates a delegate array (the prototype chain an object searches
/// left-to-right during lookup, §4.6) holding exactly `delegates`.
pub fn alloc_delegates(
    heap: &mut Heap,
    generation: Generation,
    delegates: &[Addr],
) -> Result<Addr, AllocError> {
    let byte_size = u32::try_from(delegates.len() * 8).expect("delegate count fits in u32 bytes");
    let addr = heap.alloc_traced(generation, HeapFormat::DelegateArray, byte_size)?;
    for (i, &delegate) in delegates.iter().enumerate() {
        heap.write_at(addr, (i as u32) * 8, BoxValue::from_addr(delegate).raw_bits());
    }
    Ok(addr)
}

#[must_use]
pub fn delegate_count(heap: &Heap, delegates_addr: Addr) -> u32 {
    heap.header_of(delegates_addr).byte_size() / 8
}

#[must_use]
pub fn delegate_at(heap: &Heap, delegates_addr: Addr, index: u32) -> Addr {
    debug_assert!(index < delegate_count(heap, delegates_addr));
    BoxValue::from_raw_bits(heap.read_at(delegates_addr, index * 8)).as_addr()
}

/// Reads every delegate out of `delegates_addr` into a plain `Vec`, for
/// callers (e.g. [`crate::lookup`]) that need to iterate without holding a
/// live borrow of `heap`.
#[must_use]
pub fn delegates_to_vec(heap: &Heap, delegates_addr: Addr) -> Vec<Addr> {
    (0..delegate_count(heap, delegates_addr)).map(|i| delegate_at(heap, delegates_addr, i)).collect()
}

/// Allocates a plain object (`format` must be one of [`is_object_format`]'s
/// set) owning `delegates_addr` and `dict_addr`.
pub fn alloc_with_format(
    heap: &mut Heap,
    generation: Generation,
    format: HeapFormat,
    delegates_addr: Addr,
    dict_addr: Addr,
) -> Result<Addr, AllocError> {
    debug_assert!(is_object_format(format));
    let addr = heap.alloc_traced(generation, format, 16)?;
    heap.write_at(addr, DELEGATES_OFFSET, BoxValue::from_addr(delegates_addr).raw_bits());
    heap.write_at(addr, DICT_OFFSET, BoxValue::from_addr(dict_addr).raw_bits());
    Ok(addr)
}

/// Allocates a [`HeapFormat::PlainObject`] with `delegates_addr` and a
/// fresh, empty property dictionary of `dict_capacity` entries.
pub fn alloc(
    heap: &mut Heap,
    generation: Generation,
    delegates_addr: Addr,
    dict_capacity: u32,
) -> Result<Addr, AllocError> {
    let dict_addr = property::alloc(heap, generation, dict_capacity)?;
    alloc_with_format(heap, generation, HeapFormat::PlainObject, delegates_addr, dict_addr)
}

#[must_use]
pub fn delegates(heap: &Heap, obj: Addr) -> Addr {
    BoxValue::from_raw_bits(heap.read_at(obj, DELEGATES_OFFSET)).as_addr()
}

#[must_use]
pub fn dict(heap: &Heap, obj: Addr) -> Addr {
    BoxValue::from_raw_bits(heap.read_at(obj, DICT_OFFSET)).as_addr()
}

pub fn set_dict(heap: &mut Heap, obj: Addr, dict_addr: Addr) {
    heap.write_at(obj, DICT_OFFSET, BoxValue::from_addr(dict_addr).raw_bits());
}

/// Looks up `name` in `obj`'s *own* property dictionary only — no delegate
/// walk. [`crate::lookup`] builds the full breadth-... depth-first walk on
/// top of this.
#[must_use]
pub fn get_own(heap: &Heap, obj: Addr, name: &str, spoiler: u64) -> Option<Descriptor> {
    property::lookup(heap, dict(heap, obj), name, spoiler)
}

/// Defines `name` on `obj`'s own dictionary, enlarging and retrying as
/// needed (§4.6 "Define-property ... on insert failing because the
/// dictionary is too full, enlarges and retries").
pub fn define_own(
    heap: &mut Heap,
    generation: Generation,
    obj: Addr,
    name: &str,
    name_addr: Addr,
    spoiler: u64,
    descriptor: Descriptor,
) -> Result<(), AllocError> {
    loop {
        let dict_addr = dict(heap, obj);
        match property::define(heap, dict_addr, name, name_addr, spoiler, descriptor) {
            DefineOutcome::Done => return Ok(()),
            DefineOutcome::NeedsEnlarge => {
                let enlarged = property::create_enlarged(heap, generation, dict_addr, spoiler)?;
                set_dict(heap, obj, enlarged);
            }
        }
    }
}
