// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for runtime configuration.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn default_config_has_nonzero_sizes() {
    let config = RuntimeConfig::default();
    assert!(config.heap_sizes.hatchery > 0);
    assert!(config.string_table_capacity > 0);
    assert!(config.default_dict_capacity > 0);
}
