// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the exception heap formats.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::heap::HeapSizes;
use crate::string;

fn tiny_heap() -> Heap {
    Heap::new(HeapSizes { hatchery: 64 * 1024, local_heap: 4096, tenured: 4096 })
}

#[test]
fn internal_exception_carries_message_and_args() {
    let mut heap = tiny_heap();
    let message = string::alloc(&mut heap, Generation::Hatchery, "boom").unwrap();
    let one = BoxValue::from_i64(1).unwrap();
    let two = BoxValue::from_i64(2).unwrap();
    let addr = alloc_internal(&mut heap, Generation::Hatchery, message, &[one, two]).unwrap();

    assert_eq!(internal_message(&heap, addr), message);
    assert_eq!(internal_arg_count(&heap, addr), 2);
    assert_eq!(internal_args(&heap, addr), [one, two]);
}

#[test]
fn internal_exception_with_no_args_has_an_empty_trailer() {
    let mut heap = tiny_heap();
    let message = string::alloc(&mut heap, Generation::Hatchery, "oops").unwrap();
    let addr = alloc_internal(&mut heap, Generation::Hatchery, message, &[]).unwrap();
    assert_eq!(internal_arg_count(&heap, addr), 0);
}

#[test]
fn name_lookup_failed_carries_object_and_name() {
    let mut heap = tiny_heap();
    let object = string::alloc(&mut heap, Generation::Hatchery, "receiver").unwrap();
    let name = string::alloc(&mut heap, Generation::Hatchery, "missing").unwrap();
    let addr = alloc_name_lookup_failed(&mut heap, Generation::Hatchery, object, name).unwrap();

    assert_eq!(name_lookup_failed_object(&heap, addr), object);
    assert_eq!(name_lookup_failed_name(&heap, addr), name);
}

#[test]
fn function_not_operative_carries_the_offending_function() {
    let mut heap = tiny_heap();
    let function = string::alloc(&mut heap, Generation::Hatchery, "fn").unwrap();
    let addr = alloc_function_not_operative(&mut heap, Generation::Hatchery, function).unwrap();
    assert_eq!(function_not_operative_function(&heap, addr), function);
}

#[test]
fn void_value_used_carries_its_context_string() {
    let mut heap = tiny_heap();
    let context = string::alloc(&mut heap, Generation::Hatchery, "call argument").unwrap();
    let addr = alloc_void_value_used(&mut heap, Generation::Hatchery, context).unwrap();
    assert_eq!(void_value_used_context(&heap, addr), context);
}
