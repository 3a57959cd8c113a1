// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the heap allocator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

fn tiny_heap() -> Heap {
    Heap::new(HeapSizes { hatchery: 4096, local_heap: 4096, tenured: 4096 })
}

#[test]
fn alloc_traced_round_trips_through_header() {
    let mut heap = tiny_heap();
    let addr = heap.alloc_traced(Generation::Hatchery, HeapFormat::PlainObject, 16).unwrap();
    assert_eq!(heap.header_of(addr).format(), HeapFormat::PlainObject);
}

#[test]
fn collect_hatchery_promotes_a_rooted_object_and_rewrites_the_root() {
    let mut heap = tiny_heap();
    let mut root = heap.alloc_traced(Generation::Hatchery, HeapFormat::PlainObject, 16).unwrap();
    assert_eq!(root.generation(), Generation::Hatchery);

    let mut roots: [&mut Addr; 1] = [&mut root];
    heap.collect_hatchery(&mut roots);

    assert_eq!(root.generation(), Generation::LocalHeap);
    assert_eq!(heap.header_of(root).format(), HeapFormat::PlainObject);
}

#[test]
fn collect_hatchery_follows_outgoing_pointers() {
    let mut heap = tiny_heap();
    let dict = heap.alloc_traced(Generation::Hatchery, HeapFormat::PropertyDict, 16).unwrap();
    let mut obj = heap.alloc_traced(Generation::Hatchery, HeapFormat::PlainObject, 16).unwrap();
    heap.write_at(obj, 0, crate::boxval::BoxValue::from_addr(dict).raw_bits());
    heap.write_at(obj, 8, crate::boxval::BoxValue::undefined().raw_bits());

    let mut roots: [&mut Addr; 1] = [&mut obj];
    heap.collect_hatchery(&mut roots);

    let dict_word: u64 = heap.read_at(obj, 0);
    let dict_value = crate::boxval::BoxValue::from_raw_bits(dict_word);
    assert!(dict_value.is_pointer());
    assert_eq!(dict_value.as_addr().generation(), Generation::LocalHeap);
    assert_eq!(heap.header_of(dict_value.as_addr()).format(), HeapFormat::PropertyDict);
}

#[test]
fn hatchery_is_empty_after_collection() {
    let mut heap = tiny_heap();
    let mut root = heap.alloc_traced(Generation::Hatchery, HeapFormat::PlainObject, 16).unwrap();
    let mut roots: [&mut Addr; 1] = [&mut root];
    heap.collect_hatchery(&mut roots);
    assert_eq!(heap.slab(Generation::Hatchery).used(), 0);
}
