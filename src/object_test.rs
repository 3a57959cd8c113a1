// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the delegate-chain object representation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::heap::HeapSizes;

fn tiny_heap() -> Heap {
    Heap::new(HeapSizes { hatchery: 64 * 1024, local_heap: 4096, tenured: 4096 })
}

#[test]
fn fresh_object_has_no_own_properties() {
    let mut heap = tiny_heap();
    let empty_delegates = alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let obj = alloc(&mut heap, Generation::Hatchery, empty_delegates, 4).unwrap();
    assert!(get_own(&heap, obj, "x", 0).is_none());
}

#[test]
fn define_then_get_round_trips() {
    let mut heap = tiny_heap();
    let empty_delegates = alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let obj = alloc(&mut heap, Generation::Hatchery, empty_delegates, 4).unwrap();
    let name_addr = crate::string::alloc(&mut heap, Generation::Hatchery, "x").unwrap();
    define_own(
        &mut heap,
        Generation::Hatchery,
        obj,
        "x",
        name_addr,
        0,
        Descriptor::Slot { value: BoxValue::from_i64(7).unwrap(), writable: true },
    )
    .unwrap();
    assert_eq!(
        get_own(&heap, obj, "x", 0),
        Some(Descriptor::Slot { value: BoxValue::from_i64(7).unwrap(), writable: true })
    );
}

#[test]
fn define_enlarges_past_the_initial_capacity() {
    let mut heap = tiny_heap();
    let empty_delegates = alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let obj = alloc(&mut heap, Generation::Hatchery, empty_delegates, 2).unwrap();
    for (i, n) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        let name_addr = crate::string::alloc(&mut heap, Generation::Hatchery, n).unwrap();
        define_own(
            &mut heap,
            Generation::Hatchery,
            obj,
            n,
            name_addr,
            0,
            Descriptor::Slot { value: BoxValue::from_i64(i as i64).unwrap(), writable: true },
        )
        .unwrap();
    }
    for (i, n) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        assert_eq!(
            get_own(&heap, obj, n, 0),
            Some(Descriptor::Slot { value: BoxValue::from_i64(i as i64).unwrap(), writable: true })
        );
    }
}

#[test]
fn delegates_round_trip() {
    let mut heap = tiny_heap();
    let d0 = alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let obj0 = alloc(&mut heap, Generation::Hatchery, d0, 2).unwrap();
    let delegates_addr = alloc_delegates(&mut heap, Generation::Hatchery, &[obj0]).unwrap();
    let obj1 = alloc(&mut heap, Generation::Hatchery, delegates_addr, 2).unwrap();
    assert_eq!(delegate_count(&heap, delegates(&heap, obj1)), 1);
    assert_eq!(delegate_at(&heap, delegates(&heap, obj1), 0), obj0);
    assert_eq!(delegates_to_vec(&heap, delegates(&heap, obj1)), Vec::from([obj0]));
}

#[test]
fn object_box_validates_format_in_debug_builds() {
    let mut heap = tiny_heap();
    let d0 = alloc_delegates(&mut heap, Generation::Hatchery, &[]).unwrap();
    let obj = alloc(&mut heap, Generation::Hatchery, d0, 2).unwrap();
    let obj_box = ObjectBox::new(&heap, obj);
    assert_eq!(obj_box.addr(), obj);
    assert!(ObjectBox::from_box(&heap, BoxValue::from_i64(1).unwrap()).is_none());
    assert!(ObjectBox::from_box(&heap, obj_box.as_box()).is_some());
}
