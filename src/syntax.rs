// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The packed syntax tree: a flat, word-oriented blob living inside a
//! single [`HeapFormat::PackedSyntaxTree`] leaf allocation, read by offset
//! rather than by walking a graph of small heap objects.
//!
//! Grounded in `original_source/src/whisper/parser/packed_writer.cpp`'s
//! forward-jump-slot offset scheme: every node is a fixed-size or
//! offset-prefixed record at a known byte offset within the tree, and a
//! parent references a child purely by that child's offset — no node ever
//! holds a pointer back into the managed heap, which is what keeps the
//! whole tree a [`crate::heap::trace::ref_layout`] leaf.
//!
//! A node's identifiers and string/integer literals are not stored inline
//! at every use site; they are pulled from a small constant pool embedded
//! in the same allocation right after the node region, so two `Name` nodes
//! referring to the same identifier share one pool entry. This pool is
//! local to the tree (not [`crate::string::StringTable`]'s interning
//! table): `StringTable`'s open-addressed slots are not stably indexable
//! across a resize, so it cannot back an index-addressed constant pool
//! without being redesigned around that requirement. Frame evaluation
//! still re-interns a pool entry's text through `StringTable` whenever it
//! needs a rooted [`crate::heap::Addr`] to hand to [`crate::scope`] or
//! [`crate::lookup`].
//!
//! No parser lives in this crate (an explicit non-goal); [`Writer`] is the
//! only producer of a tree, built bottom-up by whatever constructs syntax
//! (tests, or a host's own parser sitting above this crate).

#[cfg(test)]
mod syntax_test;

use crate::error::RuntimeError;
use crate::heap::{Addr, Generation, Heap, HeapFormat};

#[cfg(feature = "std")]
use std::{string::String as StdString, vec::Vec};
#[cfg(not(feature = "std"))]
use alloc::{string::String as StdString, vec::Vec};

/// Size of the fixed tree header: `root_offset`, `string_pool_offset`,
/// `int_pool_offset`, one reserved word.
const HEADER_SIZE: u32 = 16;

/// The closed set of node kinds the frame interpreter understands
/// (supplementing spec.md's unspecified "closed enumeration" of syntax
/// forms with a concrete tag set).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum NodeKind {
    File = 0,
    Block = 1,
    Var = 2,
    Binding = 3,
    CallExpr = 4,
    Name = 5,
    IntegerLiteral = 6,
    StringLiteral = 7,
}

impl NodeKind {
    const fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            0 => Self::File,
            1 => Self::Block,
            2 => Self::Var,
            3 => Self::Binding,
            4 => Self::CallExpr,
            5 => Self::Name,
            6 => Self::IntegerLiteral,
            7 => Self::StringLiteral,
            _ => return None,
        })
    }

    /// The conventional handler-lookup name the frame interpreter searches
    /// for on the invoking scope's delegate chain for this node kind
    /// (§4.6/§4.10's "the current node kind's handler"). Kept here, next to
    /// the tag each name corresponds to, rather than in `frame.rs`, so the
    /// two cannot drift apart.
    #[must_use]
    pub const fn handler_name(self) -> &'static str {
        match self {
            Self::File => "%file",
            Self::Block => "%block",
            Self::Var => "%var",
            Self::Binding => "%binding",
            Self::CallExpr => "%call",
            Self::Name => "%name",
            Self::IntegerLiteral => "%integer-literal",
            Self::StringLiteral => "%string-literal",
        }
    }
}

fn read_u32(heap: &Heap, tree: Addr, offset: u32) -> u32 {
    heap.read_at(tree, offset)
}

/// Reads the closed node tag at `node_offset`, failing if the blob is
/// malformed (a tag this crate's [`NodeKind`] does not know, most likely
/// from a caller passing a stale or foreign offset).
pub fn node_kind(heap: &Heap, tree: Addr, node_offset: u32) -> Result<NodeKind, RuntimeError> {
    let tag = read_u32(heap, tree, node_offset);
    NodeKind::from_tag(tag).ok_or(RuntimeError::MalformedSyntaxTree { offset: node_offset })
}

#[must_use]
pub fn root_offset(heap: &Heap, tree: Addr) -> u32 {
    read_u32(heap, tree, 0)
}

fn string_pool_offset(heap: &Heap, tree: Addr) -> u32 {
    read_u32(heap, tree, 4)
}

fn int_pool_offset(heap: &Heap, tree: Addr) -> u32 {
    read_u32(heap, tree, 8)
}

/// Reads string pool entry `index`'s content as an owned `String`.
#[must_use]
pub fn string_pool_entry(heap: &Heap, tree: Addr, index: u32) -> StdString {
    let pool = string_pool_offset(heap, tree);
    let entry_offset: u32 = read_u32(heap, tree, pool + 4 + index * 4);
    let len: u32 = read_u32(heap, tree, entry_offset);
    let bytes = heap.bytes(tree.add(entry_offset + 4), len);
    StdString::from_utf8_lossy(bytes).into_owned()
}

/// Reads integer pool entry `index`.
#[must_use]
pub fn int_pool_entry(heap: &Heap, tree: Addr, index: u32) -> i64 {
    let pool = int_pool_offset(heap, tree);
    heap.read_at(tree, pool + 4 + index * 8)
}

// ---- File / Block: tag, count, count x child offsets ----

fn sequence_count(heap: &Heap, tree: Addr, node_offset: u32) -> u32 {
    read_u32(heap, tree, node_offset + 4)
}

fn sequence_at(heap: &Heap, tree: Addr, node_offset: u32, index: u32) -> u32 {
    debug_assert!(index < sequence_count(heap, tree, node_offset));
    read_u32(heap, tree, node_offset + 8 + index * 4)
}

#[must_use]
pub fn statement_count(heap: &Heap, tree: Addr, node_offset: u32) -> u32 {
    sequence_count(heap, tree, node_offset)
}

#[must_use]
pub fn statement_at(heap: &Heap, tree: Addr, node_offset: u32, index: u32) -> u32 {
    sequence_at(heap, tree, node_offset, index)
}

// ---- Var: tag, is_const, count, count x binding offsets ----

#[must_use]
pub fn var_is_const(heap: &Heap, tree: Addr, node_offset: u32) -> bool {
    read_u32(heap, tree, node_offset + 4) != 0
}

#[must_use]
pub fn var_binding_count(heap: &Heap, tree: Addr, node_offset: u32) -> u32 {
    read_u32(heap, tree, node_offset + 8)
}

#[must_use]
pub fn var_binding_at(heap: &Heap, tree: Addr, node_offset: u32, index: u32) -> u32 {
    debug_assert!(index < var_binding_count(heap, tree, node_offset));
    read_u32(heap, tree, node_offset + 12 + index * 4)
}

// ---- Binding: tag, name_pool_index, has_init, init_offset ----

#[must_use]
pub fn binding_name(heap: &Heap, tree: Addr, node_offset: u32) -> StdString {
    let index = read_u32(heap, tree, node_offset + 4);
    string_pool_entry(heap, tree, index)
}

#[must_use]
pub fn binding_init(heap: &Heap, tree: Addr, node_offset: u32) -> Option<u32> {
    let has_init = read_u32(heap, tree, node_offset + 8) != 0;
    has_init.then(|| read_u32(heap, tree, node_offset + 12))
}

// ---- CallExpr: tag, callee_offset, arg_count, arg_count x arg offsets ----

#[must_use]
pub fn call_callee(heap: &Heap, tree: Addr, node_offset: u32) -> u32 {
    read_u32(heap, tree, node_offset + 4)
}

#[must_use]
pub fn call_arg_count(heap: &Heap, tree: Addr, node_offset: u32) -> u32 {
    read_u32(heap, tree, node_offset + 8)
}

#[must_use]
pub fn call_arg_at(heap: &Heap, tree: Addr, node_offset: u32, index: u32) -> u32 {
    debug_assert!(index < call_arg_count(heap, tree, node_offset));
    read_u32(heap, tree, node_offset + 12 + index * 4)
}

// ---- Name / IntegerLiteral / StringLiteral: tag, pool index ----

#[must_use]
pub fn name_text(heap: &Heap, tree: Addr, node_offset: u32) -> StdString {
    let index = read_u32(heap, tree, node_offset + 4);
    string_pool_entry(heap, tree, index)
}

#[must_use]
pub fn integer_literal_value(heap: &Heap, tree: Addr, node_offset: u32) -> i64 {
    let index = read_u32(heap, tree, node_offset + 4);
    int_pool_entry(heap, tree, index)
}

#[must_use]
pub fn string_literal_text(heap: &Heap, tree: Addr, node_offset: u32) -> StdString {
    let index = read_u32(heap, tree, node_offset + 4);
    string_pool_entry(heap, tree, index)
}

/// Builds a packed syntax tree bottom-up: each `write_*` method appends a
/// node to the tree's node region and returns that node's final byte
/// offset (usable immediately as a child reference in a node written
/// afterwards), mirroring how a real parser would emit children before
/// the parent that holds them.
#[derive(Default)]
pub struct Writer {
    body: Vec<u8>,
    strings: Vec<StdString>,
    ints: Vec<i64>,
}

impl Writer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push_u32(&mut self, value: u32) {
        self.body.extend_from_slice(&value.to_ne_bytes());
    }

    fn node_offset(&self) -> u32 {
        HEADER_SIZE + self.body.len() as u32
    }

    fn intern_string(&mut self, s: &str) -> u32 {
        if let Some(index) = self.strings.iter().position(|existing| existing == s) {
            return index as u32;
        }
        self.strings.push(s.into());
        (self.strings.len() - 1) as u32
    }

    fn intern_int(&mut self, value: i64) -> u32 {
        self.ints.push(value);
        (self.ints.len() - 1) as u32
    }

    pub fn name(&mut self, identifier: &str) -> u32 {
        let index = self.intern_string(identifier);
        let offset = self.node_offset();
        self.push_u32(NodeKind::Name as u32);
        self.push_u32(index);
        offset
    }

    pub fn integer_literal(&mut self, value: i64) -> u32 {
        let index = self.intern_int(value);
        let offset = self.node_offset();
        self.push_u32(NodeKind::IntegerLiteral as u32);
        self.push_u32(index);
        offset
    }

    pub fn string_literal(&mut self, value: &str) -> u32 {
        let index = self.intern_string(value);
        let offset = self.node_offset();
        self.push_u32(NodeKind::StringLiteral as u32);
        self.push_u32(index);
        offset
    }

    pub fn binding(&mut self, name: &str, init: Option<u32>) -> u32 {
        let index = self.intern_string(name);
        let offset = self.node_offset();
        self.push_u32(NodeKind::Binding as u32);
        self.push_u32(index);
        self.push_u32(u32::from(init.is_some()));
        self.push_u32(init.unwrap_or(0));
        offset
    }

    pub fn var(&mut self, is_const: bool, bindings: &[u32]) -> u32 {
        let offset = self.node_offset();
        self.push_u32(NodeKind::Var as u32);
        self.push_u32(u32::from(is_const));
        self.push_u32(bindings.len() as u32);
        for &binding in bindings {
            self.push_u32(binding);
        }
        offset
    }

    pub fn call_expr(&mut self, callee: u32, args: &[u32]) -> u32 {
        let offset = self.node_offset();
        self.push_u32(NodeKind::CallExpr as u32);
        self.push_u32(callee);
        self.push_u32(args.len() as u32);
        for &arg in args {
            self.push_u32(arg);
        }
        offset
    }

    pub fn block(&mut self, statements: &[u32]) -> u32 {
        self.sequence(NodeKind::Block, statements)
    }

    pub fn file(&mut self, statements: &[u32]) -> u32 {
        self.sequence(NodeKind::File, statements)
    }

    fn sequence(&mut self, kind: NodeKind, statements: &[u32]) -> u32 {
        let offset = self.node_offset();
        self.push_u32(kind as u32);
        self.push_u32(statements.len() as u32);
        for &statement in statements {
            self.push_u32(statement);
        }
        offset
    }

    /// Assembles the finished blob — node region, then string pool, then
    /// integer pool — and allocates it as a single
    /// [`HeapFormat::PackedSyntaxTree`] leaf. Returns the tree's address;
    /// `root` (an offset this `Writer` already handed back) is stored in
    /// the blob's own header, so callers do not need to track it
    /// separately once the tree exists.
    pub fn finish(
        self,
        heap: &mut Heap,
        generation: Generation,
        root: u32,
    ) -> Result<Addr, crate::error::AllocError> {
        let mut string_pool = Vec::new();
        let table_bytes = 4 + self.strings.len() as u32 * 4;
        let mut cursor = table_bytes;
        let mut index_table = Vec::with_capacity(self.strings.len());
        let mut entries_bytes = Vec::new();
        for s in &self.strings {
            index_table.push(cursor);
            let bytes = s.as_bytes();
            entries_bytes.extend_from_slice(&(bytes.len() as u32).to_ne_bytes());
            entries_bytes.extend_from_slice(bytes);
            cursor += 4 + bytes.len() as u32;
        }
        string_pool.extend_from_slice(&(self.strings.len() as u32).to_ne_bytes());
        for offset in &index_table {
            string_pool.extend_from_slice(&offset.to_ne_bytes());
        }
        string_pool.extend_from_slice(&entries_bytes);

        let mut int_pool = Vec::new();
        int_pool.extend_from_slice(&(self.ints.len() as u32).to_ne_bytes());
        for value in &self.ints {
            int_pool.extend_from_slice(&value.to_ne_bytes());
        }

        let string_pool_off = HEADER_SIZE + self.body.len() as u32;
        let int_pool_off = string_pool_off + string_pool.len() as u32;

        let mut bytes = Vec::with_capacity((int_pool_off + int_pool.len() as u32) as usize);
        bytes.extend_from_slice(&root.to_ne_bytes());
        bytes.extend_from_slice(&string_pool_off.to_ne_bytes());
        bytes.extend_from_slice(&int_pool_off.to_ne_bytes());
        bytes.extend_from_slice(&0u32.to_ne_bytes());
        bytes.extend_from_slice(&self.body);
        bytes.extend_from_slice(&string_pool);
        bytes.extend_from_slice(&int_pool);

        let total_len = u32::try_from(bytes.len()).expect("packed syntax tree fits in u32 bytes");
        let addr = heap.alloc_leaf(generation, HeapFormat::PackedSyntaxTree, total_len)?;
        heap.bytes_mut(addr, total_len).copy_from_slice(&bytes);
        Ok(addr)
    }
}
