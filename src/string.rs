// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Strings and the interned-string table (§4.5).
//!
//! A [`HeapFormat::String`] is a leaf heap object: header plus a trailer of
//! code units, no outgoing pointers. Grounded in `original_source`'s
//! `StringTable::Query` two-width scheme (`vm/string.hpp`'s `LinearString`):
//! a string stores its code units either one byte per code point (when
//! every code point fits in a byte) or two bytes per code unit (UTF-16,
//! surrogate pairs for anything outside the BMP) otherwise. The header's
//! small flag bit 0 records which.
//!
//! The string table itself is not a heap object — it is host-side memory
//! owned by [`crate::context::ThreadContext`], holding `Addr` pointers into
//! the managed heap. [`crate::context::ThreadContext`] treats its entries as
//! additional GC roots, exactly like the stack root chain.

#[cfg(test)]
mod string_test;

use crate::error::AllocError;
use crate::heap::{Addr, Generation, Header, Heap, HeapFormat};

#[cfg(feature = "std")]
use std::{string::String as StdString, vec, vec::Vec};
#[cfg(not(feature = "std"))]
use alloc::{string::String as StdString, vec, vec::Vec};

const WIDE_FLAG: u8 = 0;

/// Allocates a managed string holding the content of `s`, choosing the
/// narrowest representation that can hold it.
pub fn alloc(heap: &mut Heap, generation: Generation, s: &str) -> Result<Addr, AllocError> {
    if s.chars().all(|c| (c as u32) <= 0xFF) {
        alloc_narrow(heap, generation, s)
    } else {
        alloc_wide(heap, generation, s)
    }
}

fn alloc_narrow(heap: &mut Heap, generation: Generation, s: &str) -> Result<Addr, AllocError> {
    let bytes: Vec<u8> = s.chars().map(|c| c as u8).collect();
    let byte_size = u32::try_from(bytes.len()).expect("string fits in u32 bytes");
    let addr = heap.alloc_leaf(generation, HeapFormat::String, byte_size)?;
    heap.bytes_mut(addr, byte_size).copy_from_slice(&bytes);
    Ok(addr)
}

fn alloc_wide(heap: &mut Heap, generation: Generation, s: &str) -> Result<Addr, AllocError> {
    let mut units: Vec<u16> = Vec::with_capacity(s.len());
    for c in s.chars() {
        let mut buf = [0u16; 2];
        units.extend_from_slice(c.encode_utf16(&mut buf));
    }
    let byte_size = u32::try_from(units.len() * 2).expect("string fits in u32 bytes");
    let addr = heap.alloc_leaf(generation, HeapFormat::String, byte_size)?;
    heap.set_header_flag(addr, WIDE_FLAG, true);
    let bytes = heap.bytes_mut(addr, byte_size);
    for (i, unit) in units.iter().enumerate() {
        bytes[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    Ok(addr)
}

#[must_use]
pub fn is_wide(header: &Header) -> bool {
    header.flag(WIDE_FLAG)
}

/// Number of code units stored (not the same as the number of Unicode
/// scalar values when wide and the string contains surrogate pairs).
#[must_use]
pub fn code_unit_len(heap: &Heap, addr: Addr) -> u32 {
    let header = heap.header_of(addr);
    if is_wide(&header) { header.byte_size() / 2 } else { header.byte_size() }
}

/// Reconstructs the string's content as an owned `String`.
#[must_use]
pub fn to_string(heap: &Heap, addr: Addr) -> StdString {
    let header = heap.header_of(addr);
    let bytes = heap.bytes(addr, header.byte_size());
    if is_wide(&header) {
        let units: Vec<u16> =
            bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        StdString::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Content equality between a managed string and an in-memory `&str`, with
/// no allocation (used by both table lookup and query matching, §4.5).
#[must_use]
pub fn content_eq(heap: &Heap, addr: Addr, query: &str) -> bool {
    let header = heap.header_of(addr);
    let bytes = heap.bytes(addr, header.byte_size());
    if is_wide(&header) {
        let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
        let mut query_units = query.encode_utf16();
        let mut units = units;
        loop {
            match (units.next(), query_units.next()) {
                (Some(a), Some(b)) if a == b => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    } else {
        query.chars().count() == bytes.len()
            && query.chars().enumerate().all(|(i, c)| (c as u32) <= 0xFF && bytes[i] == c as u8)
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over `query`'s UTF-16 code units, mixed with a per-`ThreadContext`
/// spoiler before the caller indexes the table (§4.5: "FNV-style mixer with
/// a per-thread spoiler to avoid algorithmic collision attacks").
#[must_use]
pub fn hash_str(query: &str, spoiler: u64) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for unit in query.encode_utf16() {
        hash ^= u64::from(unit);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash ^ spoiler
}

/// The same hash, computed directly from a managed string's content (used
/// when resizing the table, where entries are already heap strings).
#[must_use]
pub fn hash_addr(heap: &Heap, addr: Addr, spoiler: u64) -> u64 {
    let header = heap.header_of(addr);
    let bytes = heap.bytes(addr, header.byte_size());
    let mut hash = FNV_OFFSET_BASIS;
    if is_wide(&header) {
        for chunk in bytes.chunks_exact(2) {
            hash ^= u64::from(u16::from_le_bytes([chunk[0], chunk[1]]));
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    } else {
        for &b in bytes {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash ^ spoiler
}

const MAX_FILL_RATIO_NUM: u32 = 3;
const MAX_FILL_RATIO_DEN: u32 = 4;

/// Open-addressed table of interned strings, keyed by content. Lives on
/// [`crate::context::ThreadContext`]; its slots are additional GC roots
/// (null is the only empty sentinel — the table never deletes, so it needs
/// no tombstone).
pub struct StringTable {
    slots: Vec<Addr>,
    filled: u32,
    spoiler: u64,
}

impl StringTable {
    #[must_use]
    pub fn new(capacity: u32, spoiler: u64) -> Self {
        let capacity = capacity.max(4).next_power_of_two();
        Self { slots: vec![Addr::null(); capacity as usize], filled: 0, spoiler }
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.filled
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Every live slot, for GC root-walking.
    pub fn roots_mut(&mut self) -> impl Iterator<Item = &mut Addr> {
        self.slots.iter_mut().filter(|a| !a.is_null())
    }

    fn probe(&self, heap: &Heap, query: &str, hash: u64) -> (usize, Option<usize>) {
        let mask = self.slots.len() as u64 - 1;
        let mut index = (hash & mask) as usize;
        loop {
            let slot = self.slots[index];
            if slot.is_null() {
                return (index, None);
            }
            if content_eq(heap, slot, query) {
                return (index, Some(index));
            }
            index = (index + 1) & mask as usize;
        }
    }

    /// Looks up `query` without allocating. Returns the interned string's
    /// address if present.
    #[must_use]
    pub fn lookup(&self, heap: &Heap, query: &str) -> Option<Addr> {
        let hash = hash_str(query, self.spoiler);
        self.probe(heap, query, hash).1.map(|i| self.slots[i])
    }

    /// Interns `query`, allocating a new managed string only if it is not
    /// already present. Always lands in `generation` on a fresh intern;
    /// an existing entry is returned as-is regardless of which generation
    /// it currently lives in.
    pub fn intern(
        &mut self,
        heap: &mut Heap,
        generation: Generation,
        query: &str,
    ) -> Result<Addr, AllocError> {
        let hash = hash_str(query, self.spoiler);
        let (slot_index, found) = self.probe(heap, query, hash);
        if let Some(index) = found {
            return Ok(self.slots[index]);
        }

        if self.needs_resize() {
            self.resize(heap);
            let (slot_index, _) = self.probe(heap, query, hash);
            return self.insert_new(heap, generation, query, slot_index);
        }

        self.insert_new(heap, generation, query, slot_index)
    }

    fn insert_new(
        &mut self,
        heap: &mut Heap,
        generation: Generation,
        query: &str,
        slot_index: usize,
    ) -> Result<Addr, AllocError> {
        let addr = alloc(heap, generation, query)?;
        self.slots[slot_index] = addr;
        self.filled += 1;
        Ok(addr)
    }

    fn needs_resize(&self) -> bool {
        self.filled * MAX_FILL_RATIO_DEN >= self.slots.len() as u32 * MAX_FILL_RATIO_NUM
    }

    fn resize(&mut self, heap: &Heap) {
        let new_capacity = (self.slots.len() as u32) * 2;
        let old_slots = core::mem::replace(&mut self.slots, vec![Addr::null(); new_capacity as usize]);
        for addr in old_slots.into_iter().filter(|a| !a.is_null()) {
            let hash = hash_addr(heap, addr, self.spoiler);
            let mask = self.slots.len() as u64 - 1;
            let mut index = (hash & mask) as usize;
            while !self.slots[index].is_null() {
                index = (index + 1) & mask as usize;
            }
            self.slots[index] = addr;
        }
    }
}
