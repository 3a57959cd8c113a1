// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the slab bump allocator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn head_and_tail_allocate_from_opposite_ends() {
    let mut slab = Slab::new(Generation::Hatchery, 4096);
    let a = slab.alloc_head(HeapFormat::PlainObject, 16).unwrap();
    let b = slab.alloc_tail(HeapFormat::String, 8).unwrap();
    assert!(a.offset() < b.offset());
}

#[test]
fn allocation_failure_returns_none_when_regions_collide() {
    let mut slab = Slab::new(Generation::Hatchery, 64);
    // Eat most of the slab from the head.
    assert!(slab.alloc_head(HeapFormat::PlainObject, 16).is_some());
    assert!(slab.alloc_tail(HeapFormat::String, 256).is_none());
}

#[test]
fn header_round_trips_format_and_size() {
    let mut slab = Slab::new(Generation::Hatchery, 4096);
    let addr = slab.alloc_head(HeapFormat::PropertyDict, 40).unwrap();
    let header = slab.header_of(addr);
    assert_eq!(header.format(), HeapFormat::PropertyDict);
    assert_eq!(header.byte_size(), 40);
}

#[test]
fn typed_read_write_round_trips() {
    let mut slab = Slab::new(Generation::Hatchery, 4096);
    let addr = slab.alloc_head(HeapFormat::PlainObject, 16).unwrap();
    slab.write_at(addr.offset(), 0x1122_3344_5566_7788u64);
    let value: u64 = slab.read_at(addr.offset());
    assert_eq!(value, 0x1122_3344_5566_7788);
}

#[test]
fn write_marks_the_containing_card_dirty() {
    let mut slab = Slab::new(Generation::Hatchery, 4096);
    let addr = slab.alloc_head(HeapFormat::PlainObject, 16).unwrap();
    let card = addr.offset() / CARD_SIZE as u32;
    assert!(slab.is_card_dirty(card));
    slab.clear_dirty_cards();
    assert!(!slab.is_card_dirty(card));
    slab.write_at(addr.offset(), 1u64);
    assert!(slab.is_card_dirty(card));
}

proptest::proptest! {
    #[test]
    fn used_never_exceeds_capacity_for_any_sequence_of_allocations(
        sizes in proptest::collection::vec(0u32..64, 0..64),
        from_head in proptest::collection::vec(proptest::bool::ANY, 0..64),
    ) {
        let mut slab = Slab::new(Generation::Hatchery, 4096);
        for (size, head) in sizes.iter().zip(from_head.iter()) {
            let allocated = if *head {
                slab.alloc_head(HeapFormat::PlainObject, *size)
            } else {
                slab.alloc_tail(HeapFormat::String, *size)
            };
            if allocated.is_some() {
                proptest::prop_assert!(slab.used() <= slab.capacity());
            }
        }
    }
}
