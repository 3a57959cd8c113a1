// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for managed strings.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::heap::HeapSizes;

fn tiny_heap() -> Heap {
    Heap::new(HeapSizes { hatchery: 64 * 1024, local_heap: 4096, tenured: 4096 })
}

#[test]
fn narrow_strings_round_trip() {
    let mut heap = tiny_heap();
    let addr = alloc(&mut heap, Generation::Hatchery, "hello").unwrap();
    assert_eq!(to_string(&heap, addr), "hello");
    assert!(content_eq(&heap, addr, "hello"));
    assert!(!content_eq(&heap, addr, "hellx"));
}

#[test]
fn wide_strings_round_trip_non_latin1_content() {
    let mut heap = tiny_heap();
    let addr = alloc(&mut heap, Generation::Hatchery, "héllo\u{1F600}").unwrap();
    assert_eq!(to_string(&heap, addr), "héllo\u{1F600}");
    assert!(content_eq(&heap, addr, "héllo\u{1F600}"));
}

#[test]
fn intern_returns_identical_address_for_repeated_literal() {
    let mut heap = tiny_heap();
    let mut table = StringTable::new(4, 0);
    let a = table.intern(&mut heap, Generation::Hatchery, "foo").unwrap();
    let before = table.len();
    let b = table.intern(&mut heap, Generation::Hatchery, "foo").unwrap();
    assert_eq!(a, b);
    assert_eq!(table.len(), before);
}

#[test]
fn intern_grows_table_size_by_one_per_new_literal() {
    let mut heap = tiny_heap();
    let mut table = StringTable::new(4, 0);
    table.intern(&mut heap, Generation::Hatchery, "foo").unwrap();
    assert_eq!(table.len(), 1);
    table.intern(&mut heap, Generation::Hatchery, "bar").unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn resize_doubles_capacity_and_preserves_membership() {
    let mut heap = tiny_heap();
    let mut table = StringTable::new(4, 0);
    let words = ["a", "b", "c", "d", "e", "f"];
    let mut addrs = Vec::new();
    for w in words {
        addrs.push(table.intern(&mut heap, Generation::Hatchery, w).unwrap());
    }
    assert!(table.capacity() > 4);
    for (w, addr) in words.iter().zip(addrs) {
        assert_eq!(table.lookup(&heap, w), Some(addr));
    }
}
