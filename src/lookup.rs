// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Delegate-chain property lookup (§4.6): a resumable, allocation-safe,
//! depth-first walk over an object's delegates, built from three heap
//! objects — a seen-set (cycle guard), a parent-linked cursor node chain,
//! and the lookup state tying them together.
//!
//! The breadth-first phrasing in §2's one-line summary and the depth-first
//! phrasing in §4.6 disagree; this module follows §4.6 and
//! `original_source/src/whisper/vm/lookup_state.cpp`'s actual `NextNode`,
//! which descends into an object's own first-unseen delegate before trying
//! a sibling of an ancestor: strictly depth-first, left-to-right, ties
//! broken by lowest delegate index.
//!
//! Every heap field that may legitimately be absent (a root node's parent,
//! a node's not-yet-cached delegates array, a fully-walked state's current
//! node) is stored as [`crate::boxval::BoxValue::undefined`] rather than a
//! null-payload pointer — the same "no entry" sentinel
//! [`crate::property`] uses for empty dictionary slots, and the only one
//! [`crate::heap::trace`]'s generic scanner safely skips.

#[cfg(test)]
mod lookup_test;

use crate::boxval::BoxValue;
use crate::error::AllocError;
use crate::heap::{Addr, Generation, Heap, HeapFormat};
use crate::property::Descriptor;

const SEEN_SIZE_OFFSET: u32 = 0;
const SEEN_FILLED_OFFSET: u32 = 4;
const SEEN_TRAILER_OFFSET: u32 = 8;
const SEEN_MAX_FILL_NUMERATOR: u32 = 3;
const SEEN_MAX_FILL_DENOMINATOR: u32 = 4;

const NODE_PARENT_OFFSET: u32 = 0;
const NODE_OBJECT_OFFSET: u32 = 8;
const NODE_DELEGATES_OFFSET: u32 = 16;
const NODE_INDEX_OFFSET: u32 = 24;
const NODE_SIZE: u32 = 32;

const STATE_RECEIVER_OFFSET: u32 = 0;
const STATE_NAME_OFFSET: u32 = 8;
const STATE_SEEN_OFFSET: u32 = 16;
const STATE_NODE_OFFSET: u32 = 24;
const STATE_SIZE: u32 = 32;

const INITIAL_SEEN_CAPACITY: u32 = 10;

fn read_ref(heap: &Heap, addr: Addr, offset: u32) -> BoxValue {
    BoxValue::from_raw_bits(heap.read_at(addr, offset))
}

fn write_ref(heap: &mut Heap, addr: Addr, offset: u32, value: BoxValue) {
    heap.write_at(addr, offset, value.raw_bits());
}

fn read_opt_addr(heap: &Heap, addr: Addr, offset: u32) -> Option<Addr> {
    let value = read_ref(heap, addr, offset);
    (!value.is_undefined()).then(|| value.as_addr())
}

fn write_opt_addr(heap: &mut Heap, addr: Addr, offset: u32, value: Option<Addr>) {
    let boxed = value.map_or(BoxValue::undefined(), BoxValue::from_addr);
    write_ref(heap, addr, offset, boxed);
}

// ---- seen-set: an open-addressed hash set of visited object addresses ----

fn alloc_seen_set(heap: &mut Heap, generation: Generation, capacity: u32) -> Result<Addr, AllocError> {
    let byte_size = SEEN_TRAILER_OFFSET + capacity * 8;
    let addr = heap.alloc_traced(generation, HeapFormat::LookupSeenSet, byte_size)?;
    heap.write_at(addr, SEEN_SIZE_OFFSET, capacity);
    heap.write_at(addr, SEEN_FILLED_OFFSET, 0u32);
    for i in 0..capacity {
        write_ref(heap, addr, SEEN_TRAILER_OFFSET + i * 8, BoxValue::undefined());
    }
    Ok(addr)
}

fn seen_capacity(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, SEEN_SIZE_OFFSET)
}

fn seen_filled(heap: &Heap, addr: Addr) -> u32 {
    heap.read_at(addr, SEEN_FILLED_OFFSET)
}

fn seen_can_add(heap: &Heap, addr: Addr) -> bool {
    seen_filled(heap, addr) * SEEN_MAX_FILL_DENOMINATOR < seen_capacity(heap, addr) * SEEN_MAX_FILL_NUMERATOR
}

/// An `Addr` has no intrinsic hash; this mixes its raw bits the same way
/// every other open-addressed table in this crate mixes a key (§3's
/// "0.75 fill-ratio" hash tables), rather than reusing the FNV string
/// hash, which is meaningless for a non-string key.
fn addr_hash(addr: Addr) -> u64 {
    let mut x = addr.raw_bits().wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^= x >> 29;
    x
}

fn seen_contains(heap: &Heap, addr: Addr, needle: Addr) -> bool {
    let capacity = seen_capacity(heap, addr);
    if capacity == 0 {
        return false;
    }
    let start = (addr_hash(needle) % u64::from(capacity)) as u32;
    let mut probe = start;
    loop {
        let entry = read_ref(heap, addr, SEEN_TRAILER_OFFSET + probe * 8);
        if entry.is_undefined() {
            return false;
        }
        if entry.as_addr() == needle {
            return true;
        }
        probe = (probe + 1) % capacity;
        if probe == start {
            return false;
        }
    }
}

/// Inserts `needle`, which must not already be present and must fit under
/// [`seen_can_add`] — callers enlarge first (see [`add_to_seen`]).
fn seen_add(heap: &mut Heap, addr: Addr, needle: Addr) {
    debug_assert!(!seen_contains(heap, addr, needle));
    debug_assert!(seen_can_add(heap, addr));
    let capacity = seen_capacity(heap, addr);
    let start = (addr_hash(needle) % u64::from(capacity)) as u32;
    let mut probe = start;
    loop {
        let entry = read_ref(heap, addr, SEEN_TRAILER_OFFSET + probe * 8);
        if entry.is_undefined() {
            write_ref(heap, addr, SEEN_TRAILER_OFFSET + probe * 8, BoxValue::from_addr(needle));
            let filled = seen_filled(heap, addr);
            heap.write_at(addr, SEEN_FILLED_OFFSET, filled + 1);
            return;
        }
        probe = (probe + 1) % capacity;
        debug_assert_ne!(probe, start, "seen-set probe wrapped with canAdd() true");
    }
}

fn seen_grow(heap: &mut Heap, generation: Generation, old_addr: Addr) -> Result<Addr, AllocError> {
    let old_capacity = seen_capacity(heap, old_addr);
    let new_addr = alloc_seen_set(heap, generation, old_capacity * 2)?;
    for i in 0..old_capacity {
        let entry = read_ref(heap, old_addr, SEEN_TRAILER_OFFSET + i * 8);
        if !entry.is_undefined() {
            seen_add(heap, new_addr, entry.as_addr());
        }
    }
    Ok(new_addr)
}

/// Adds `obj` to `state`'s seen-set, transparently enlarging (and
/// rewriting `state`'s `seen` field to point at the enlarged set) if the
/// current one has no room (§3's "enlargement doubles capacity").
fn add_to_seen(heap: &mut Heap, generation: Generation, state: Addr, obj: Addr) -> Result<(), AllocError> {
    let seen_addr = read_ref(heap, state, STATE_SEEN_OFFSET).as_addr();
    if seen_can_add(heap, seen_addr) {
        seen_add(heap, seen_addr, obj);
        return Ok(());
    }
    let grown = seen_grow(heap, generation, seen_addr)?;
    seen_add(heap, grown, obj);
    write_ref(heap, state, STATE_SEEN_OFFSET, BoxValue::from_addr(grown));
    Ok(())
}

// ---- cursor node chain ----

fn alloc_node(heap: &mut Heap, generation: Generation, parent: Option<Addr>, object: Addr) -> Result<Addr, AllocError> {
    let addr = heap.alloc_traced(generation, HeapFormat::LookupNode, NODE_SIZE)?;
    write_opt_addr(heap, addr, NODE_PARENT_OFFSET, parent);
    write_ref(heap, addr, NODE_OBJECT_OFFSET, BoxValue::from_addr(object));
    write_opt_addr(heap, addr, NODE_DELEGATES_OFFSET, None);
    heap.write_at(addr, NODE_INDEX_OFFSET, 0u32);
    Ok(addr)
}

fn node_parent(heap: &Heap, node: Addr) -> Option<Addr> {
    read_opt_addr(heap, node, NODE_PARENT_OFFSET)
}

fn node_object(heap: &Heap, node: Addr) -> Addr {
    read_ref(heap, node, NODE_OBJECT_OFFSET).as_addr()
}

fn node_delegates(heap: &Heap, node: Addr) -> Option<Addr> {
    read_opt_addr(heap, node, NODE_DELEGATES_OFFSET)
}

fn set_node_delegates(heap: &mut Heap, node: Addr, delegates: Addr) {
    write_opt_addr(heap, node, NODE_DELEGATES_OFFSET, Some(delegates));
}

fn node_index(heap: &Heap, node: Addr) -> u32 {
    heap.read_at(node, NODE_INDEX_OFFSET)
}

fn set_node_index(heap: &mut Heap, node: Addr, index: u32) {
    heap.write_at(node, NODE_INDEX_OFFSET, index);
}

// ---- lookup state ----

/// Starts a lookup of `name` (whose interned address is `name_addr`)
/// against `receiver`, returning the live [`HeapFormat::LookupState`].
/// The receiver is immediately recorded as seen, matching
/// `LookupState::Create`'s `AddToSeen(receiver)` in the original.
pub fn start(
    heap: &mut Heap,
    generation: Generation,
    receiver: Addr,
    name_addr: Addr,
) -> Result<Addr, AllocError> {
    let seen_addr = alloc_seen_set(heap, generation, INITIAL_SEEN_CAPACITY)?;
    let root = alloc_node(heap, generation, None, receiver)?;
    let state = heap.alloc_traced(generation, HeapFormat::LookupState, STATE_SIZE)?;
    write_ref(heap, state, STATE_RECEIVER_OFFSET, BoxValue::from_addr(receiver));
    write_ref(heap, state, STATE_NAME_OFFSET, BoxValue::from_addr(name_addr));
    write_ref(heap, state, STATE_SEEN_OFFSET, BoxValue::from_addr(seen_addr));
    write_ref(heap, state, STATE_NODE_OFFSET, BoxValue::from_addr(root));
    add_to_seen(heap, generation, state, receiver)?;
    Ok(state)
}

#[must_use]
pub fn receiver(heap: &Heap, state: Addr) -> Addr {
    read_ref(heap, state, STATE_RECEIVER_OFFSET).as_addr()
}

#[must_use]
pub fn name_addr(heap: &Heap, state: Addr) -> Addr {
    read_ref(heap, state, STATE_NAME_OFFSET).as_addr()
}

/// The object whose own dictionary the walk is currently positioned over,
/// or `None` once the walk has exhausted every delegate.
#[must_use]
pub fn current_object(heap: &Heap, state: Addr) -> Option<Addr> {
    read_opt_addr(heap, state, STATE_NODE_OFFSET).map(|node| node_object(heap, node))
}

fn link_next_node(
    heap: &mut Heap,
    generation: Generation,
    state: Addr,
    parent_node: Addr,
    index: u32,
) -> Result<Addr, AllocError> {
    let delegates_addr = node_delegates(heap, parent_node).expect("caller only links from a node with cached delegates");
    let obj = crate::object::delegate_at(heap, delegates_addr, index);
    let new_node = alloc_node(heap, generation, Some(parent_node), obj)?;
    add_to_seen(heap, generation, state, obj)?;
    set_node_index(heap, parent_node, index);
    write_ref(heap, state, STATE_NODE_OFFSET, BoxValue::from_addr(new_node));
    Ok(new_node)
}

/// Advances the walk to the next unseen delegate, depth-first. Returns
/// `true` if a new node was found (use [`current_object`] to read it) or
/// `false` once the chain is exhausted — after which `state`'s node is
/// left `undefined` and further calls are a programming error.
pub fn advance(heap: &mut Heap, generation: Generation, state: Addr) -> Result<bool, AllocError> {
    let cur = read_opt_addr(heap, state, STATE_NODE_OFFSET)
        .expect("advance called again after the lookup chain was already exhausted");

    let obj = node_object(heap, cur);
    let delegates_addr = match node_delegates(heap, cur) {
        Some(addr) => addr,
        None => {
            let addr = crate::object::delegates(heap, obj);
            set_node_delegates(heap, cur, addr);
            addr
        }
    };
    let count = crate::object::delegate_count(heap, delegates_addr);
    for i in 0..count {
        let candidate = crate::object::delegate_at(heap, delegates_addr, i);
        if seen_contains(heap, read_ref(heap, state, STATE_SEEN_OFFSET).as_addr(), candidate) {
            continue;
        }
        link_next_node(heap, generation, state, cur, i)?;
        return Ok(true);
    }

    // `cur`'s own delegates are exhausted (or it had none); walk up the
    // chain looking for an ancestor with an unseen sibling delegate.
    let mut ancestor = cur;
    loop {
        let Some(parent) = node_parent(heap, ancestor) else {
            write_ref(heap, state, STATE_NODE_OFFSET, BoxValue::undefined());
            return Ok(false);
        };
        ancestor = parent;
        let parent_delegates = node_delegates(heap, ancestor).expect("ancestor node always has delegates cached");
        let parent_count = crate::object::delegate_count(heap, parent_delegates);
        let mut found = None;
        for i in node_index(heap, ancestor)..parent_count {
            let candidate = crate::object::delegate_at(heap, parent_delegates, i);
            if seen_contains(heap, read_ref(heap, state, STATE_SEEN_OFFSET).as_addr(), candidate) {
                continue;
            }
            found = Some(i);
            break;
        }
        if let Some(index) = found {
            link_next_node(heap, generation, state, ancestor, index)?;
            return Ok(true);
        }
    }
}

/// Runs a full lookup of `name` starting at `receiver` to completion,
/// returning the first matching descriptor found along the delegate
/// chain, or `None` if no object in the chain owns it. Every descriptor
/// kind this crate supports (value slot, method) resolves without
/// triggering further evaluation, so unlike the heap-resident
/// [`HeapFormat::LookupState`] this drives, the walk never needs to
/// suspend mid-search — [`crate::frame::FrameSyntaxNameLookup`] still
/// allocates and steps through a real `LookupState` object (rather than
/// calling this directly) so that a future descriptor kind requiring
/// evaluation (an accessor) has somewhere to resume from.
pub fn lookup(
    heap: &mut Heap,
    generation: Generation,
    receiver: Addr,
    name: &str,
    name_addr: Addr,
    spoiler: u64,
) -> Result<Option<Descriptor>, AllocError> {
    let state = start(heap, generation, receiver, name_addr)?;
    loop {
        let Some(obj) = current_object(heap, state) else {
            return Ok(None);
        };
        if let Some(descriptor) = crate::object::get_own(heap, obj, name, spoiler) {
            return Ok(Some(descriptor));
        }
        if !advance(heap, generation, state)? {
            return Ok(None);
        }
    }
}
