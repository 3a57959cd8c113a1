// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Heap addresses.
//!
//! An [`Addr`] names a heap allocation by generation and byte offset within
//! that generation's current slab. It plays the role the teacher workspace's
//! `Vaddr` newtype plays for a flat address space, specialized to a heap
//! that is partitioned into three independently-collected generations.

#[cfg(test)]
mod addr_test;

use core::fmt;

/// The three nominal generations a `ThreadContext` allocates into.
///
/// Ordered youngest-first: a write from `Tenured` into `Hatchery` crosses a
/// generation boundary and must be remembered by the write barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Generation {
    /// The nursery: default allocation target, collected most often.
    Hatchery = 0,
    /// Survivors of at least one hatchery collection.
    LocalHeap = 1,
    /// The oldest, most-promoted generation.
    Tenured = 2,
}

impl Generation {
    const fn from_index(index: u64) -> Self {
        match index {
            0 => Self::Hatchery,
            1 => Self::LocalHeap,
            _ => Self::Tenured,
        }
    }
}

/// A heap address: generation tag plus byte offset within that generation's
/// current slab.
///
/// Packed into 40 bits (2 bits generation, up to 32 bits offset) so that it
/// can be embedded in a [`crate::boxval::BoxValue`] pointer payload with its
/// three low bits free for tagging, per the Box format in §4.2.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr(u64);

impl Addr {
    /// Sentinel offset marking the null address (no allocation has this
    /// offset because every slab reserves offset 0 for its first header).
    const NULL_OFFSET: u32 = u32::MAX;

    #[must_use]
    pub const fn new(generation: Generation, offset: u32) -> Self {
        Self(((generation as u64) << 32) | offset as u64)
    }

    #[must_use]
    pub const fn null() -> Self {
        Self::new(Generation::Hatchery, Self::NULL_OFFSET)
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.offset() == Self::NULL_OFFSET
    }

    #[must_use]
    pub const fn generation(self) -> Generation {
        Generation::from_index((self.0 >> 32) & 0x3)
    }

    #[must_use]
    pub const fn offset(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    #[must_use]
    pub const fn add(self, bytes: u32) -> Self {
        Self::new(self.generation(), self.offset() + bytes)
    }

    /// Raw 40-bit representation, used by `Box` to embed this address as a
    /// pointer payload (the caller shifts it left by 3 to keep the low tag
    /// bits clear).
    #[must_use]
    pub(crate) const fn raw_bits(self) -> u64 {
        self.0
    }

    #[must_use]
    pub(crate) const fn from_raw_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addr({:?}+0x{:x})", self.generation(), self.offset())
    }
}
