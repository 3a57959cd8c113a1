// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for error type conversions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn alloc_error_converts_into_runtime_error() {
    let alloc_err = AllocError::Exhausted { generation: Generation::Hatchery };
    let runtime_err: RuntimeError = alloc_err.into();
    assert_eq!(runtime_err, RuntimeError::Alloc(alloc_err));
}
