// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for scope objects.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::boxval::BoxValue;
use crate::heap::HeapSizes;

fn tiny_heap() -> Heap {
    Heap::new(HeapSizes { hatchery: 64 * 1024, local_heap: 4096, tenured: 4096 })
}

#[test]
fn global_scope_has_no_delegates() {
    let mut heap = tiny_heap();
    let global = alloc_global(&mut heap, Generation::Hatchery, 4).unwrap();
    let delegates = crate::object::delegates(&heap, global);
    assert_eq!(crate::object::delegate_count(&heap, delegates), 0);
}

#[test]
fn nested_scopes_chain_through_one_delegate_each() {
    let mut heap = tiny_heap();
    let global = alloc_global(&mut heap, Generation::Hatchery, 4).unwrap();
    let module = alloc_module(&mut heap, Generation::Hatchery, global, 4).unwrap();
    let call = alloc_call(&mut heap, Generation::Hatchery, module, 4).unwrap();
    let block = alloc_block(&mut heap, Generation::Hatchery, call, 4).unwrap();

    let block_delegates = crate::object::delegates(&heap, block);
    assert_eq!(crate::object::delegate_count(&heap, block_delegates), 1);
    assert_eq!(crate::object::delegate_at(&heap, block_delegates, 0), call);

    let call_delegates = crate::object::delegates(&heap, call);
    assert_eq!(crate::object::delegate_at(&heap, call_delegates, 0), module);
}

#[test]
fn bind_writes_to_own_dictionary_not_the_delegate() {
    let mut heap = tiny_heap();
    let global = alloc_global(&mut heap, Generation::Hatchery, 4).unwrap();
    let block = alloc_block(&mut heap, Generation::Hatchery, global, 4).unwrap();
    let name_addr = crate::string::alloc(&mut heap, Generation::Hatchery, "x").unwrap();
    bind(&mut heap, Generation::Hatchery, block, "x", name_addr, 0, BoxValue::from_i64(9).unwrap(), true).unwrap();

    assert_eq!(
        own_binding(&heap, block, "x", 0),
        Some(crate::property::Descriptor::Slot { value: BoxValue::from_i64(9).unwrap(), writable: true })
    );
    assert!(own_binding(&heap, global, "x", 0).is_none());
}
