// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for step-at-a-time delegate-chain lookup.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::boxval::BoxValue;
use crate::heap::HeapSizes;
use crate::property::Descriptor;

#[cfg(feature = "std")]
use std::vec::Vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

fn tiny_heap() -> Heap {
    Heap::new(HeapSizes { hatchery: 256 * 1024, local_heap: 4096, tenured: 4096 })
}

fn define(heap: &mut Heap, obj: Addr, name: &str, value: i64) {
    let name_addr = crate::string::alloc(heap, Generation::Hatchery, name).unwrap();
    crate::object::define_own(
        heap,
        Generation::Hatchery,
        obj,
        name,
        name_addr,
        0,
        Descriptor::Slot { value: BoxValue::from_i64(value).unwrap(), writable: true },
    )
    .unwrap();
}

#[test]
fn finds_an_own_property_without_walking_delegates() {
    let mut heap = tiny_heap();
    let empty = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let obj = crate::object::alloc(&mut heap, Generation::Hatchery, empty, 4).unwrap();
    define(&mut heap, obj, "x", 1);

    let name_addr = crate::string::alloc(&mut heap, Generation::Hatchery, "x").unwrap();
    let found = lookup(&mut heap, Generation::Hatchery, obj, "x", name_addr, 0).unwrap();
    assert_eq!(found, Some(Descriptor::Slot { value: BoxValue::from_i64(1).unwrap(), writable: true }));
}

#[test]
fn falls_through_to_a_delegate() {
    let mut heap = tiny_heap();
    let empty = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let base = crate::object::alloc(&mut heap, Generation::Hatchery, empty, 4).unwrap();
    define(&mut heap, base, "greeting", 42);

    let delegates = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[base]).unwrap();
    let child = crate::object::alloc(&mut heap, Generation::Hatchery, delegates, 4).unwrap();

    let name_addr = crate::string::alloc(&mut heap, Generation::Hatchery, "greeting").unwrap();
    let found = lookup(&mut heap, Generation::Hatchery, child, "greeting", name_addr, 0).unwrap();
    assert_eq!(found, Some(Descriptor::Slot { value: BoxValue::from_i64(42).unwrap(), writable: true }));
}

#[test]
fn missing_name_walks_the_whole_chain_and_reports_none() {
    let mut heap = tiny_heap();
    let empty = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let base = crate::object::alloc(&mut heap, Generation::Hatchery, empty, 4).unwrap();
    let delegates = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[base]).unwrap();
    let child = crate::object::alloc(&mut heap, Generation::Hatchery, delegates, 4).unwrap();

    let name_addr = crate::string::alloc(&mut heap, Generation::Hatchery, "nope").unwrap();
    let found = lookup(&mut heap, Generation::Hatchery, child, "nope", name_addr, 0).unwrap();
    assert_eq!(found, None);
}

#[test]
fn a_diamond_shaped_delegate_graph_does_not_loop_forever() {
    let mut heap = tiny_heap();
    let empty = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let root = crate::object::alloc(&mut heap, Generation::Hatchery, empty, 4).unwrap();
    define(&mut heap, root, "shared", 7);

    let root_delegates = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[root]).unwrap();
    let left = crate::object::alloc(&mut heap, Generation::Hatchery, root_delegates, 4).unwrap();
    let right_delegates = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[root]).unwrap();
    let right = crate::object::alloc(&mut heap, Generation::Hatchery, right_delegates, 4).unwrap();

    let both_delegates = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[left, right]).unwrap();
    let bottom = crate::object::alloc(&mut heap, Generation::Hatchery, both_delegates, 4).unwrap();

    let name_addr = crate::string::alloc(&mut heap, Generation::Hatchery, "shared").unwrap();
    let found = lookup(&mut heap, Generation::Hatchery, bottom, "shared", name_addr, 0).unwrap();
    assert_eq!(found, Some(Descriptor::Slot { value: BoxValue::from_i64(7).unwrap(), writable: true }));
}

#[test]
fn seen_set_enlarges_past_its_initial_capacity() {
    let mut heap = tiny_heap();
    let mut delegates = Vec::new();
    for i in 0..30i64 {
        let empty = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
        let obj = crate::object::alloc(&mut heap, Generation::Hatchery, empty, 2).unwrap();
        define(&mut heap, obj, "marker", i);
        delegates.push(obj);
    }
    let chain_delegates = crate::object::alloc_delegates(&mut heap, Generation::Hatchery, &delegates).unwrap();
    let receiver = crate::object::alloc(&mut heap, Generation::Hatchery, chain_delegates, 2).unwrap();

    let name_addr = crate::string::alloc(&mut heap, Generation::Hatchery, "absent").unwrap();
    let found = lookup(&mut heap, Generation::Hatchery, receiver, "absent", name_addr, 0).unwrap();
    assert_eq!(found, None);
}
