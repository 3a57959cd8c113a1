// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the root-stack handle guards.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::heap::Generation;

#[test]
fn local_pushes_and_pops_lifo() {
    let chain = RootChain::new();
    assert_eq!(chain.depth(), 0);
    {
        let local = Local::new(&chain, Addr::new(Generation::Hatchery, 8));
        assert_eq!(chain.depth(), 1);
        assert_eq!(local.get(), Addr::new(Generation::Hatchery, 8));
    }
    assert_eq!(chain.depth(), 0);
}

#[test]
fn local_set_is_visible_through_get() {
    let chain = RootChain::new();
    let local = Local::new(&chain, Addr::new(Generation::Hatchery, 0));
    local.set(Addr::new(Generation::Hatchery, 16));
    assert_eq!(local.get(), Addr::new(Generation::Hatchery, 16));
}

#[test]
fn trace_rewrites_rooted_pointers() {
    let chain = RootChain::new();
    let local = Local::new(&chain, Addr::new(Generation::Hatchery, 4));
    chain.trace(|addr| Addr::new(Generation::LocalHeap, addr.offset() * 2));
    assert_eq!(local.get(), Addr::new(Generation::LocalHeap, 8));
}

#[test]
fn undefined_box_locals_are_not_treated_as_pointers_by_trace() {
    let chain = RootChain::new();
    let local = Local::new(&chain, BoxValue::undefined());
    let mut visited = false;
    chain.trace(|addr| {
        visited = true;
        addr
    });
    assert!(!visited);
    assert!(local.get().is_undefined());
}
