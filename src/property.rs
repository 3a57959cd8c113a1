// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Property dictionaries: a fixed-capacity open-addressed hash from string
//! keys to property descriptors (§3, §4.6).
//!
//! Grounded in `original_source/src/whisper/vm/property_dict.hpp`'s
//! `PropertyDict`/`Entry` shape. Each entry is a 24-byte record:
//! `name` (8 bytes), `value` (8 bytes), `flags` (8 bytes, only its low byte
//! used). The name slot reuses [`BoxValue`]'s tagging to hold one of three
//! states without a dedicated discriminant byte: [`BoxValue::undefined`]
//! for an empty slot, [`BoxValue::from_bool(true)`] for the teacher's
//! `SENTINEL` tombstone, or a real pointer to an interned [`crate::string`]
//! for an occupied slot. The flags word is deliberately never a valid
//! pointer encoding so the generic trace dispatch
//! ([`crate::heap::trace::ref_layout`]) can skip it while still following
//! `name`/`value` generically.

#[cfg(test)]
mod property_test;

use crate::boxval::BoxValue;
use crate::error::AllocError;
use crate::heap::{Addr, Generation, HeapFormat, Heap};
use crate::string;

#[cfg(feature = "std")]
use std::vec::Vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const HEADER_SIZE: u32 = 16;
const ENTRY_SIZE: u32 = 24;
const NAME_OFFSET: u32 = 0;
const VALUE_OFFSET: u32 = 8;
const FLAGS_OFFSET: u32 = 16;

const FLAG_METHOD_KIND: u64 = 0x1;
const FLAG_WRITABLE: u64 = 0x2;

/// A property's stored descriptor: either a value slot (with a
/// writability bit) or a method (a pointer to a [`crate::function`]
/// heap object), per spec.md §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Descriptor {
    Slot { value: BoxValue, writable: bool },
    Method { function: Addr },
}

impl Descriptor {
    fn to_raw(self) -> (BoxValue, u64) {
        match self {
            Self::Slot { value, writable } => {
                let flags = if writable { FLAG_WRITABLE } else { 0 };
                (value, flags)
            }
            Self::Method { function } => (BoxValue::from_addr(function), FLAG_METHOD_KIND),
        }
    }

    fn from_raw(value: BoxValue, flags: u64) -> Self {
        if flags & FLAG_METHOD_KIND != 0 {
            Self::Method { function: value.as_addr() }
        } else {
            Self::Slot { value, writable: flags & FLAG_WRITABLE != 0 }
        }
    }
}

fn capacity_of(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, 0)
}

fn size_of_dict(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, 4)
}

fn set_size(heap: &mut Heap, addr: Addr, size: u32) {
    heap.write_at(addr, 4, size);
}

fn entry_offset(index: u32) -> u32 {
    HEADER_SIZE + index * ENTRY_SIZE
}

fn name_at(heap: &Heap, addr: Addr, index: u32) -> BoxValue {
    BoxValue::from_raw_bits(heap.read_at(addr, entry_offset(index) + NAME_OFFSET))
}

fn is_empty_slot(name: BoxValue) -> bool {
    name.is_undefined()
}

fn is_tombstone(name: BoxValue) -> bool {
    name.is_boolean() && name.as_bool()
}

fn is_occupied(name: BoxValue) -> bool {
    name.is_pointer()
}

/// Allocates an empty dictionary with room for `capacity` entries.
pub fn alloc(heap: &mut Heap, generation: Generation, capacity: u32) -> Result<Addr, AllocError> {
    let byte_size = HEADER_SIZE + capacity * ENTRY_SIZE;
    let addr = heap.alloc_traced(generation, HeapFormat::PropertyDict, byte_size)?;
    heap.write_at(addr, 0, capacity);
    heap.write_at(addr, 4, 0u32);
    for index in 0..capacity {
        heap.write_at(addr, entry_offset(index) + NAME_OFFSET, BoxValue::undefined().raw_bits());
    }
    Ok(addr)
}

/// Probes for `name`'s slot, returning `Some(index)` of an occupied entry
/// on a hit, or `None` with the preferred insertion index stashed via
/// `first_free` when no entry matches.
fn probe(
    heap: &Heap,
    addr: Addr,
    name: &str,
    hash: u64,
    first_free: &mut Option<u32>,
) -> Option<u32> {
    let capacity = capacity_of(heap, addr);
    if capacity == 0 {
        return None;
    }
    let mut index = (hash % u64::from(capacity)) as u32;
    for _ in 0..capacity {
        let slot_name = name_at(heap, addr, index);
        if is_empty_slot(slot_name) {
            if first_free.is_none() {
                *first_free = Some(index);
            }
            return None;
        }
        if is_tombstone(slot_name) {
            if first_free.is_none() {
                *first_free = Some(index);
            }
        } else if is_occupied(slot_name) && string::content_eq(heap, slot_name.as_addr(), name) {
            return Some(index);
        }
        index = (index + 1) % capacity;
    }
    None
}

/// Looks up `name`, returning its descriptor if bound (§4.6 via the
/// underlying dictionary probe; the breadth-first delegate walk lives in
/// [`crate::lookup`]).
#[must_use]
pub fn lookup(heap: &Heap, addr: Addr, name: &str, spoiler: u64) -> Option<Descriptor> {
    let hash = string::hash_str(name, spoiler);
    let mut first_free = None;
    let index = probe(heap, addr, name, hash, &mut first_free)?;
    let value = BoxValue::from_raw_bits(heap.read_at(addr, entry_offset(index) + VALUE_OFFSET));
    let flags: u64 = heap.read_at(addr, entry_offset(index) + FLAGS_OFFSET);
    Some(Descriptor::from_raw(value, flags))
}

#[must_use]
pub fn capacity(heap: &Heap, addr: Addr) -> u32 {
    capacity_of(heap, addr)
}

#[must_use]
pub fn len(heap: &Heap, addr: Addr) -> u32 {
    size_of_dict(heap, addr)
}

const MAX_FILL_NUM: u32 = 3;
const MAX_FILL_DEN: u32 = 4;

#[must_use]
pub fn is_full(heap: &Heap, addr: Addr) -> bool {
    size_of_dict(heap, addr) * MAX_FILL_DEN >= capacity_of(heap, addr) * MAX_FILL_NUM
}

/// Outcome of [`define`]: either the update/insert landed, or the dictionary
/// must be enlarged (via [`create_enlarged`]) and the define retried.
pub enum DefineOutcome {
    Done,
    NeedsEnlarge,
}

/// Sets `name`'s descriptor, updating an existing entry in place or
/// inserting a fresh one (§4.6 "Define-property updates an existing entry
/// in place; on miss, inserts; on insert failing because the dictionary is
/// too full, enlarges and retries").
pub fn define(
    heap: &mut Heap,
    addr: Addr,
    name: &str,
    name_addr: Addr,
    spoiler: u64,
    descriptor: Descriptor,
) -> DefineOutcome {
    let hash = string::hash_str(name, spoiler);
    let mut first_free = None;
    if let Some(index) = probe(heap, addr, name, hash, &mut first_free) {
        write_entry(heap, addr, index, name_addr, descriptor);
        return DefineOutcome::Done;
    }

    if is_full(heap, addr) {
        return DefineOutcome::NeedsEnlarge;
    }

    let Some(index) = first_free else {
        return DefineOutcome::NeedsEnlarge;
    };
    write_entry(heap, addr, index, name_addr, descriptor);
    let size = size_of_dict(heap, addr);
    set_size(heap, addr, size + 1);
    DefineOutcome::Done
}

fn write_entry(heap: &mut Heap, addr: Addr, index: u32, name_addr: Addr, descriptor: Descriptor) {
    let (value, flags) = descriptor.to_raw();
    heap.write_at(addr, entry_offset(index) + NAME_OFFSET, BoxValue::from_addr(name_addr).raw_bits());
    heap.write_at(addr, entry_offset(index) + VALUE_OFFSET, value.raw_bits());
    heap.write_at(addr, entry_offset(index) + FLAGS_OFFSET, flags);
}

/// Allocates a dictionary with double the capacity and rehashes every live
/// entry of `addr` into it, dropping tombstones (§3's enlargement
/// invariant).
pub fn create_enlarged(
    heap: &mut Heap,
    generation: Generation,
    addr: Addr,
    spoiler: u64,
) -> Result<Addr, AllocError> {
    let old_capacity = capacity_of(heap, addr);
    let new_capacity = (old_capacity * 2).max(4);

    let mut live = Vec::new();
    for index in 0..old_capacity {
        let name = name_at(heap, addr, index);
        if is_occupied(name) {
            let value = BoxValue::from_raw_bits(heap.read_at(addr, entry_offset(index) + VALUE_OFFSET));
            let flags: u64 = heap.read_at(addr, entry_offset(index) + FLAGS_OFFSET);
            live.push((name.as_addr(), value, flags));
        }
    }

    let new_addr = alloc(heap, generation, new_capacity)?;
    for (name_addr, value, flags) in live {
        let name = string::to_string(heap, name_addr);
        let hash = string::hash_str(&name, spoiler);
        let mut first_free = None;
        probe(heap, new_addr, &name, hash, &mut first_free);
        let index = first_free.expect("fresh dictionary below fill ratio always has room");
        heap.write_at(new_addr, entry_offset(index) + NAME_OFFSET, BoxValue::from_addr(name_addr).raw_bits());
        heap.write_at(new_addr, entry_offset(index) + VALUE_OFFSET, value.raw_bits());
        heap.write_at(new_addr, entry_offset(index) + FLAGS_OFFSET, flags);
    }
    set_size(heap, new_addr, capacity_of_live_count(heap, new_addr));
    Ok(new_addr)
}

fn capacity_of_live_count(heap: &Heap, addr: Addr) -> u32 {
    let capacity = capacity_of(heap, addr);
    (0..capacity).filter(|&i| is_occupied(name_at(heap, addr, i))).count() as u32
}
