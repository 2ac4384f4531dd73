// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cyclic-object-graph serializer over the BDS container format.
//!
//! Every object in a graph of [`ObjRef`] handles becomes one BDS document
//! carrying its fully-qualified type name ([`CLASS_NAME_FIELD`]) and a
//! per-run assignment index ([`IDREF_FIELD`], 0 for the root, ascending in
//! discovery order). The first visit of an object inlines it as a nested
//! document; every later visit — a shared reference or a cycle — is written
//! as a back-reference: a LONG entry named `"{declaring_type}::{field}"`
//! holding the target's idref.
//!
//! On load, references are resolved optimistically as objects finish
//! construction; anything that points forward (or around a cycle) is parked
//! in an unresolved set and patched by a fixed-point pass once the whole
//! tree has been instantiated. A reference that never resolves is a
//! [`GraphError::DanglingReference`], never a silent null.
//!
//! All traversal state (`visited`, `past`, `unresolved`) is local to one
//! serialize/deserialize call; concurrent calls on independent graphs with a
//! shared [`TypeRegistry`] are safe.
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

mod de;
mod reflect;
mod registry;
mod ser;

use bds_format::MAX_NESTING_DEPTH;

pub use bds_format::{Document, EnvelopeError, FormatError};
pub use de::{deserialize, deserialize_bytes, deserialize_file};
pub use reflect::{obj, FieldAccessError, FieldValue, ObjRef, Reflect};
pub use registry::TypeRegistry;
pub use ser::{serialize, serialize_to_bytes, serialize_to_file};

/// Document field carrying an object's fully-qualified type name (STRING).
///
/// Part of the persisted schema; never rename.
pub const CLASS_NAME_FIELD: &str = "__className";

/// Document field carrying an object's assignment index (LONG).
///
/// Part of the persisted schema; never rename.
pub const IDREF_FIELD: &str = "__idref";

/// Field inside a list-element wrapper document holding a back-reference
/// idref (LONG). Part of the persisted schema.
pub const REF_FIELD: &str = "__ref";

/// Field inside a list-element wrapper document holding an inline scalar or
/// a nested sub-list. Part of the persisted schema.
pub const LIST_VALUE_FIELD: &str = "value";

/// Separator between declaring type and field name in back-reference entry
/// names. Field names themselves may not contain it.
pub const BACKREF_SEP: &str = "::";

/// The idref reserved for the root object of every serialization run.
pub const ROOT_IDREF: i64 = 0;

/// Errors produced by graph serialization and deserialization.
///
/// The variants map onto the error taxonomy of the design: wire-format
/// failures, reflection failures (which always name the offending type and
/// field), and graph failures (references that cannot be resolved).
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The underlying BDS payload was malformed or could not be written.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The file envelope was malformed or file I/O failed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// A document's `__className` names a type the registry does not know.
    #[error("type not registered: {type_name}")]
    TypeNotRegistered {
        /// The unresolvable type name.
        type_name: String,
    },

    /// Two factories were registered under the same type name.
    #[error("duplicate type registration: {type_name}")]
    DuplicateRegistration {
        /// The contested type name.
        type_name: String,
    },

    /// `set_field` rejected a value during reconstruction.
    #[error("field access failed on {type_name}.{field}: {source}")]
    Field {
        /// Type whose field was being set.
        type_name: String,
        /// The offending field.
        field: String,
        /// The underlying access failure.
        source: FieldAccessError,
    },

    /// An object document carries no `__className` entry.
    #[error("object document {doc_name:?} is missing {CLASS_NAME_FIELD}")]
    MissingClassName {
        /// Name of the offending document (field name or list index).
        doc_name: String,
    },

    /// An object document carries no `__idref` entry.
    #[error("object document for {type_name} is missing {IDREF_FIELD}")]
    MissingIdRef {
        /// Type named by the offending document.
        type_name: String,
    },

    /// Two object documents claim the same idref.
    #[error("duplicate idref {idref} in input")]
    DuplicateIdRef {
        /// The contested idref.
        idref: i64,
    },

    /// A back-reference still had no target after the fixed-point pass —
    /// the stream references an object that no document ever claims.
    #[error("dangling back-reference to idref {idref}")]
    DanglingReference {
        /// The unclaimed idref.
        idref: i64,
    },

    /// A back-reference entry did not hold a LONG idref.
    #[error("malformed back-reference entry {field:?}")]
    MalformedBackRef {
        /// The offending entry name.
        field: String,
    },

    /// A list-element document was neither an object, a scalar wrapper, a
    /// back-reference wrapper, nor an empty (null) wrapper.
    #[error("malformed element {index} of list field {field:?}")]
    MalformedListElement {
        /// The list field's name.
        field: String,
        /// Zero-based element index.
        index: usize,
    },

    /// A `fields()` name contained the reserved `::` separator.
    #[error("invalid field name {field:?} on {type_name}: names may not contain {BACKREF_SEP:?}")]
    InvalidFieldName {
        /// Type that reported the field.
        type_name: String,
        /// The offending field name.
        field: String,
    },

    /// The graph nests more than [`bds_format::MAX_NESTING_DEPTH`] documents
    /// deep. Either the graph is an extremely long ownership chain, or a
    /// cycle was not cut because two handles to the same logical object have
    /// different allocation identities.
    #[error(
        "object graph too deep at depth {depth}: deepest supported nesting is \
         {MAX_NESTING_DEPTH} documents; an uncut cycle (distinct handles to \
         one logical object) produces exactly this failure"
    )]
    GraphTooDeep {
        /// Depth at which traversal gave up.
        depth: usize,
    },
}
