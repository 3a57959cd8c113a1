// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for function objects, operand lists, and the native registry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::heap::HeapSizes;

fn tiny_heap() -> Heap {
    Heap::new(HeapSizes { hatchery: 64 * 1024, local_heap: 4096, tenured: 4096 })
}

#[test]
fn native_function_round_trips_its_id() {
    let mut heap = tiny_heap();
    let f = alloc_native(&mut heap, Generation::Hatchery, FunctionKind::Applicative, NATIVE_ADD).unwrap();
    assert!(is_native(&heap, f));
    assert_eq!(native_id(&heap, f), NATIVE_ADD);
    assert_eq!(kind(&heap, f), FunctionKind::Applicative);
}

#[test]
fn scripted_function_round_trips_its_closure() {
    let mut heap = tiny_heap();
    let scope = crate::scope::alloc_global(&mut heap, Generation::Hatchery, 4).unwrap();
    let mut writer = crate::syntax::Writer::new();
    let lit = writer.integer_literal(1);
    let tree = writer.finish(&mut heap, Generation::Hatchery, lit).unwrap();
    let f = alloc_scripted(&mut heap, Generation::Hatchery, FunctionKind::Operative, scope, tree, lit).unwrap();

    assert!(!is_native(&heap, f));
    assert_eq!(scope(&heap, f), scope);
    assert_eq!(tree(&heap, f), tree);
    assert_eq!(node_offset(&heap, f), lit);
}

#[test]
fn operand_list_preserves_call_order() {
    let mut heap = tiny_heap();
    let one = BoxValue::from_i64(1).unwrap();
    let two = BoxValue::from_i64(2).unwrap();
    let three = BoxValue::from_i64(3).unwrap();
    let mut list = nil();
    for value in [three, two, one] {
        list = cons(&mut heap, Generation::Hatchery, value, list).unwrap();
    }
    assert_eq!(operand_vec(&heap, list), [one, two, three]);
}

#[test]
fn empty_operand_list_collects_to_nothing() {
    let heap = tiny_heap();
    assert!(operand_vec(&heap, nil()).is_empty());
}

#[test]
fn native_add_computes_the_sum() {
    let mut heap = tiny_heap();
    let entry = &NATIVES[NATIVE_ADD as usize];
    let args = [BoxValue::from_i64(2).unwrap(), BoxValue::from_i64(3).unwrap()];
    match (entry.call)(&mut heap, Generation::Hatchery, &args).unwrap() {
        NativeOutcome::Value(v) => assert_eq!(v.as_i64(), 5),
        _ => panic!("expected a value"),
    }
}

#[test]
fn native_add_rejects_the_wrong_argument_count() {
    let mut heap = tiny_heap();
    let entry = &NATIVES[NATIVE_ADD as usize];
    let args = [BoxValue::from_i64(2).unwrap()];
    assert!(matches!((entry.call)(&mut heap, Generation::Hatchery, &args).unwrap(), NativeOutcome::WrongArguments));
}

#[test]
fn continuation_round_trips_its_saved_values() {
    let mut heap = tiny_heap();
    let saved = [BoxValue::from_i64(9).unwrap(), BoxValue::undefined()];
    let addr = alloc_continuation(&mut heap, Generation::Hatchery, 3, &saved).unwrap();
    assert_eq!(continuation_step(&heap, addr), 3);
    assert_eq!(continuation_saved_count(&heap, addr), 2);
    assert_eq!(continuation_saved_at(&heap, addr, 0).as_i64(), 9);
    assert!(continuation_saved_at(&heap, addr, 1).is_undefined());
}

#[test]
fn continuation_saved_vec_collects_the_whole_trailer() {
    let mut heap = tiny_heap();
    let saved = [BoxValue::from_i64(1).unwrap(), BoxValue::from_i64(2).unwrap()];
    let addr = alloc_continuation(&mut heap, Generation::Hatchery, 0, &saved).unwrap();
    assert_eq!(continuation_saved_vec(&heap, addr), saved);
}

#[test]
fn apply_requests_invocation_of_its_first_operand() {
    let mut heap = tiny_heap();
    let f = alloc_native(&mut heap, Generation::Hatchery, FunctionKind::Applicative, NATIVE_ADD).unwrap();
    let args = [BoxValue::from_addr(f), BoxValue::from_i64(2).unwrap(), BoxValue::from_i64(3).unwrap()];
    match native_apply(&mut heap, Generation::Hatchery, &args).unwrap() {
        NativeOutcome::Invoke { function, operands } => {
            assert_eq!(function, f);
            assert_eq!(operand_vec(&heap, operands), [args[1], args[2]]);
        }
        _ => panic!("expected an invocation request"),
    }
}

#[test]
fn apply_rejects_a_non_function_target() {
    let mut heap = tiny_heap();
    let args = [BoxValue::from_i64(1).unwrap()];
    assert!(matches!(native_apply(&mut heap, Generation::Hatchery, &args).unwrap(), NativeOutcome::WrongArguments));
}

#[test]
fn resume_apply_forwards_the_resumed_value() {
    let mut heap = tiny_heap();
    let five = BoxValue::from_i64(5).unwrap();
    match resume_apply(&mut heap, Generation::Hatchery, &[], ResumeValue::Value(five)).unwrap() {
        NativeOutcome::Value(v) => assert_eq!(v, five),
        _ => panic!("expected the resumed value to pass through"),
    }
    assert!(matches!(resume_apply(&mut heap, Generation::Hatchery, &[], ResumeValue::Void).unwrap(), NativeOutcome::Void));
}
