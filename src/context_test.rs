// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for Runtime/ThreadContext construction and bootstrap.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::heap::HeapSizes;
use crate::property::Descriptor;

fn tiny_config() -> RuntimeConfig {
    RuntimeConfig {
        heap_sizes: HeapSizes { hatchery: 64 * 1024, local_heap: 64 * 1024, tenured: 64 * 1024 },
        string_table_capacity: 16,
        default_dict_capacity: 8,
    }
}

#[test]
fn a_fresh_thread_context_has_every_native_bound_in_its_global_scope() {
    let runtime = Runtime::new(tiny_config());
    let context = runtime.new_thread_context(0).unwrap();
    for entry in function::NATIVES {
        let found = scope::own_binding(context.heap(), context.global_scope(), entry.name, context.spoiler());
        assert!(matches!(found, Some(Descriptor::Slot { writable: false, .. })), "missing native {}", entry.name);
    }
}

#[test]
fn interning_the_same_name_twice_returns_the_same_address() {
    let runtime = Runtime::new(tiny_config());
    let mut context = runtime.new_thread_context(0).unwrap();
    let a = context.intern(Generation::Hatchery, "hello").unwrap();
    let b = context.intern(Generation::Hatchery, "hello").unwrap();
    assert_eq!(a, b);
}

#[test]
fn a_collection_survives_an_otherwise_exhausted_hatchery() {
    let config = RuntimeConfig {
        heap_sizes: HeapSizes { hatchery: 512, local_heap: 64 * 1024, tenured: 64 * 1024 },
        string_table_capacity: 16,
        default_dict_capacity: 4,
    };
    let runtime = Runtime::new(config);
    let mut context = runtime.new_thread_context(0).unwrap();
    for i in 0..64 {
        let value = BoxValue::from_i64(i).unwrap();
        context
            .alloc_with_retry(|heap| {
                let cell = function::cons(heap, Generation::Hatchery, value, function::nil())?;
                Ok(cell)
            })
            .unwrap();
    }
}
