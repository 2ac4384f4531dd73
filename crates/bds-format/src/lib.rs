// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! BDS binary tagged-document container.
//!
//! A [`Document`] is a named, ordered mapping from field name to typed
//! [`Value`]. Documents nest, and the whole tree serializes to a compact
//! tag-based byte stream:
//!
//! ```text
//! field    := tag (1 byte) , name-len (u16 BE) , name (UTF-8) , payload
//! document := field* , END-tag (1 byte)
//! ```
//!
//! Payloads by tag: BYTE/CHAR are one byte; SHORT/INT/LONG are fixed-width
//! big-endian two's complement; FLOAT/DOUBLE are big-endian IEEE-754 bit
//! patterns; STRING is a `u16` BE length prefix plus UTF-8 bytes; DOCUMENT is
//! recursively the field-list grammar (self-delimiting via its own END tag);
//! DOC_ARRAY is a `u32` BE element count followed by that many
//! name-prefixed field lists. The encoding is insertion-ordered and therefore
//! byte-for-byte reproducible.
//!
//! The file envelope prepends the fixed 6-byte ASCII signature
//! [`BDS_SIGNATURE`] to the root document's payload. The signature is framing,
//! not versioning.
//!
//! # Absence Semantics
//!
//! `get_*` accessors return `None` for missing fields — this is **not** an
//! error. A document read from an older or newer schema may simply lack
//! fields; callers handle absence explicitly. Error variants are reserved for
//! malformed bytes and rejected writes.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod codec;
mod document;
mod value;

pub use document::Document;
pub use value::{Tag, Value};

/// Fixed 6-byte ASCII signature prepended by the file envelope.
pub const BDS_SIGNATURE: [u8; 6] = *b"BDSDOC";

/// Maximum byte length of a field name or string value (the `u16` BE length
/// prefix is part of the wire contract).
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

/// Maximum document nesting depth accepted by the encoder and decoder.
///
/// Depth is a typed failure ([`FormatError::DepthExceeded`]), never a stack
/// fault.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Errors produced by document writes and wire decoding.
///
/// Decode variants carry the offending offset where one exists, so corrupt
/// streams can be diagnosed without a hex dump.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// A field with this name already exists in the document.
    ///
    /// The failed insertion leaves the document unchanged; the caller may
    /// retry under another name.
    #[error("duplicate field name {name:?}")]
    DuplicateField {
        /// The rejected name.
        name: String,
    },

    /// A field or document name does not fit the `u16` length prefix.
    #[error("name too long: {len} bytes exceeds max {MAX_NAME_LEN}")]
    NameTooLong {
        /// UTF-8 byte length of the rejected name.
        len: usize,
    },

    /// A string value does not fit the `u16` length prefix.
    #[error("string too long: {len} bytes exceeds max {MAX_NAME_LEN}")]
    StringTooLong {
        /// UTF-8 byte length of the rejected value.
        len: usize,
    },

    /// The decoder met a tag byte outside the documented tag set.
    #[error("unknown tag byte {tag:#04x} at offset {offset}")]
    UnknownTag {
        /// The unrecognized byte.
        tag: u8,
        /// Offset of the tag byte in the input.
        offset: usize,
    },

    /// A declared length runs past the end of the input.
    #[error("truncated input: need {needed} bytes, got {got} (reading at offset {offset})")]
    Truncated {
        /// Total bytes the declared length requires.
        needed: usize,
        /// Bytes actually available.
        got: usize,
        /// Offset at which the read started.
        offset: usize,
    },

    /// A name or string payload was not valid UTF-8.
    #[error("invalid UTF-8 in name or string at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the first byte of the invalid run.
        offset: usize,
    },

    /// Bytes remained after the root document's closing END tag.
    #[error("trailing bytes after document end: {remaining}")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// Nesting exceeded [`MAX_NESTING_DEPTH`] while encoding or decoding.
    #[error("nesting depth exceeds max {MAX_NESTING_DEPTH}")]
    DepthExceeded,
}

/// Errors produced by the file envelope operations.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The file does not start with [`BDS_SIGNATURE`].
    #[error("bad signature: expected {BDS_SIGNATURE:?}, got {0:?}")]
    BadSignature([u8; 6]),

    /// The file is shorter than the 6-byte signature.
    #[error("file too short to contain signature: {0} bytes")]
    MissingSignature(usize),

    /// The payload after the signature failed to decode.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Underlying file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
