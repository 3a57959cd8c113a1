// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the tagged value representation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn undefined_round_trips() {
    let v = BoxValue::undefined();
    assert!(v.is_undefined());
    assert_eq!(v.kind(), BoxKind::Undefined);
}

#[test]
fn booleans_round_trip_both_truth_values() {
    assert!(BoxValue::from_bool(true).as_bool());
    assert!(!BoxValue::from_bool(false).as_bool());
}

#[test]
fn integers_round_trip_across_the_56_bit_range() {
    for value in [0i64, 1, -1, INTEGER_MAX, INTEGER_MIN, 12345, -98765] {
        let boxed = BoxValue::from_i64(value).expect("in range");
        assert!(boxed.is_integer());
        assert_eq!(boxed.as_i64(), value);
    }
}

#[test]
fn integers_outside_56_bits_are_rejected() {
    assert!(BoxValue::from_i64(INTEGER_MAX + 1).is_none());
    assert!(BoxValue::from_i64(INTEGER_MIN - 1).is_none());
}

#[test]
fn pointers_round_trip_through_addr() {
    let addr = Addr::new(Generation::Tenured, 0x2000);
    let boxed = BoxValue::from_addr(addr);
    assert!(boxed.is_pointer());
    assert_eq!(boxed.as_addr(), addr);
    assert_eq!(boxed.raw_bits() & POINTER_TAG_MASK, 0);
}

#[test]
fn truthiness_matches_edge_case_policy() {
    assert!(!BoxValue::undefined().is_truthy());
    assert!(!BoxValue::from_bool(false).is_truthy());
    assert!(BoxValue::from_bool(true).is_truthy());
    assert!(BoxValue::from_i64(0).unwrap().is_truthy());
    assert!(BoxValue::from_addr(Addr::new(Generation::Hatchery, 0)).is_truthy());
}

#[test]
fn tags_are_mutually_exclusive() {
    let samples = [
        BoxValue::undefined(),
        BoxValue::from_bool(true),
        BoxValue::from_bool(false),
        BoxValue::from_i64(42).unwrap(),
        BoxValue::from_addr(Addr::new(Generation::LocalHeap, 8)),
    ];
    for sample in samples {
        let flags = [
            sample.is_pointer(),
            sample.is_undefined(),
            sample.is_integer(),
            sample.is_boolean(),
        ];
        assert_eq!(flags.iter().filter(|b| **b).count(), 1);
    }
}
