// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The self-describing per-object header every heap allocation is prefixed
//! with, and the closed [`HeapFormat`] enumeration that drives tracing
//! dispatch.
//!
//! Grounded in `HeapString`/`HeapTuple`/`HeapCompiledFn` from the teacher's
//! `value::heap`/`value::function` modules: a fixed `#[repr(C)]` header,
//! optionally followed by an untyped variable-length trailer not represented
//! in the struct itself.

#[cfg(test)]
mod header_test;

/// The closed set of heap object shapes. The header's format tag is always
/// one of these; the tracing dispatch match (see [`crate::heap::trace`])
/// must stay exhaustive over this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum HeapFormat {
    String = 0,
    PropertyDict = 1,
    PlainObject = 2,
    CallScope = 3,
    BlockScope = 4,
    ModuleScope = 5,
    GlobalScope = 6,
    FrameTerminal = 7,
    FrameEntry = 8,
    FrameSyntaxNameLookup = 9,
    FrameInvokeSyntax = 10,
    FrameFile = 11,
    FrameBlock = 12,
    FrameVar = 13,
    FrameCallExpr = 14,
    FrameInvokeApplicative = 15,
    FrameInvokeOperative = 16,
    FrameNativeCallResume = 17,
    DelegateArray = 18,
    OperandList = 19,
    BoxArray = 20,
    PackedSyntaxTree = 21,
    LookupSeenSet = 22,
    LookupNode = 23,
    LookupState = 24,
    Continuation = 25,
    Function = 26,
    ExceptionInternal = 27,
    ExceptionNameLookupFailed = 28,
    ExceptionFunctionNotOperative = 29,
    ExceptionVoidValueUsed = 30,
    SourceFile = 31,
    /// A boxed `f64`, produced whenever [`crate::number`] promotes an
    /// integer arithmetic op past its 32-bit overflow-checked fast path
    /// (§4.8). Grounded in `original_source/src/whisper/vm/double.hpp`'s
    /// `HeapDouble`: header plus an 8-byte payload, nothing else.
    Double = 32,
}

impl HeapFormat {
    /// Human-readable name, used in diagnostics and panic messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::PropertyDict => "PropertyDict",
            Self::PlainObject => "PlainObject",
            Self::CallScope => "CallScope",
            Self::BlockScope => "BlockScope",
            Self::ModuleScope => "ModuleScope",
            Self::GlobalScope => "GlobalScope",
            Self::FrameTerminal => "FrameTerminal",
            Self::FrameEntry => "FrameEntry",
            Self::FrameSyntaxNameLookup => "FrameSyntaxNameLookup",
            Self::FrameInvokeSyntax => "FrameInvokeSyntax",
            Self::FrameFile => "FrameFile",
            Self::FrameBlock => "FrameBlock",
            Self::FrameVar => "FrameVar",
            Self::FrameCallExpr => "FrameCallExpr",
            Self::FrameInvokeApplicative => "FrameInvokeApplicative",
            Self::FrameInvokeOperative => "FrameInvokeOperative",
            Self::FrameNativeCallResume => "FrameNativeCallResume",
            Self::DelegateArray => "DelegateArray",
            Self::OperandList => "OperandList",
            Self::BoxArray => "BoxArray",
            Self::PackedSyntaxTree => "PackedSyntaxTree",
            Self::LookupSeenSet => "LookupSeenSet",
            Self::LookupNode => "LookupNode",
            Self::LookupState => "LookupState",
            Self::Continuation => "Continuation",
            Self::Function => "Function",
            Self::ExceptionInternal => "ExceptionInternal",
            Self::ExceptionNameLookupFailed => "ExceptionNameLookupFailed",
            Self::ExceptionFunctionNotOperative => "ExceptionFunctionNotOperative",
            Self::ExceptionVoidValueUsed => "ExceptionVoidValueUsed",
            Self::SourceFile => "SourceFile",
            Self::Double => "Double",
        }
    }

    /// Formats with no outgoing pointer fields at all. Their `scan`/`update`
    /// trace operations are no-ops by construction (§4.3).
    ///
    /// `PackedSyntaxTree` qualifies because identifiers are stored as
    /// intern-table indices rather than direct string addresses (the intern
    /// table itself is a root, traced separately). `LookupSeenSet` and
    /// `SourceFile` are *not* leaves: both hold real addresses (visited
    /// objects; the owning tree and name string) that must be updated when
    /// a collection moves what they point at. `FrameTerminal` is *not* a
    /// leaf either: the terminal's stored [`crate::frame::EvalOutcome`] may
    /// itself hold a live value or exception-object pointer that must
    /// survive a collection running after the trampoline has already
    /// stopped.
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Self::String | Self::PackedSyntaxTree | Self::Double)
    }

    pub(crate) const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::String,
            1 => Self::PropertyDict,
            2 => Self::PlainObject,
            3 => Self::CallScope,
            4 => Self::BlockScope,
            5 => Self::ModuleScope,
            6 => Self::GlobalScope,
            7 => Self::FrameTerminal,
            8 => Self::FrameEntry,
            9 => Self::FrameSyntaxNameLookup,
            10 => Self::FrameInvokeSyntax,
            11 => Self::FrameFile,
            12 => Self::FrameBlock,
            13 => Self::FrameVar,
            14 => Self::FrameCallExpr,
            15 => Self::FrameInvokeApplicative,
            16 => Self::FrameInvokeOperative,
            17 => Self::FrameNativeCallResume,
            18 => Self::DelegateArray,
            19 => Self::OperandList,
            20 => Self::BoxArray,
            21 => Self::PackedSyntaxTree,
            22 => Self::LookupSeenSet,
            23 => Self::LookupNode,
            24 => Self::LookupState,
            25 => Self::Continuation,
            26 => Self::Function,
            27 => Self::ExceptionInternal,
            28 => Self::ExceptionNameLookupFailed,
            29 => Self::ExceptionFunctionNotOperative,
            30 => Self::ExceptionVoidValueUsed,
            31 => Self::SourceFile,
            32 => Self::Double,
            _ => return None,
        })
    }
}

/// Alignment every heap allocation's payload start is rounded up to.
pub const ALIGNMENT: usize = 8;

/// The header word prefixing every managed allocation.
///
/// Stored at the start of an allocation; the payload begins immediately
/// after it (the pointer handed back to callers already skips past this
/// header, matching "An allocation returns the address just past the header
/// word" in §4.1).
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Header {
    /// Format tag, see [`HeapFormat::from_tag`].
    format: u8,
    /// 4 small flag bits, packed in the low nibble.
    flags: u8,
    _reserved: u16,
    /// Byte size of the payload (header excluded).
    byte_size: u32,
    /// Offset, in card-sized units, from the start of the owning slab.
    card_number: u32,
    _pad: u32,
}

impl Header {
    pub(crate) const SIZE: usize = core::mem::size_of::<Self>();

    #[must_use]
    pub(crate) const fn new(format: HeapFormat, byte_size: u32, card_number: u32) -> Self {
        Self {
            format: format as u8,
            flags: 0,
            _reserved: 0,
            byte_size,
            card_number,
            _pad: 0,
        }
    }

    #[must_use]
    pub fn format(&self) -> HeapFormat {
        HeapFormat::from_tag(self.format).expect("header carries a tag outside the closed enum")
    }

    #[must_use]
    pub const fn byte_size(&self) -> u32 {
        self.byte_size
    }

    #[must_use]
    pub const fn card_number(&self) -> u32 {
        self.card_number
    }

    #[must_use]
    pub const fn flag(&self, bit: u8) -> bool {
        debug_assert!(bit < 4, "only 4 small flag bits are available");
        (self.flags & (1 << bit)) != 0
    }

    pub(crate) fn set_flag(&mut self, bit: u8, value: bool) {
        debug_assert!(bit < 4, "only 4 small flag bits are available");
        if value {
            self.flags |= 1 << bit;
        } else {
            self.flags &= !(1 << bit);
        }
    }
}
