// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The field-visitor seam participating types implement.
//!
//! Ambient runtime reflection is replaced by an explicit capability:
//! a [`Reflect`] type enumerates its persisted fields as `(name, value)`
//! pairs and accepts values back by name. Transience falls out of the
//! design — a field that should not be persisted is simply not listed.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a reflectable object.
///
/// Shared ownership is the only way to express cyclic graphs in safe Rust;
/// the `Rc` allocation address doubles as the object's identity for cycle
/// detection (no content hashing, so no collision risk).
pub type ObjRef = Rc<RefCell<dyn Reflect>>;

/// Wraps a value in a fresh [`ObjRef`] handle.
pub fn obj<T: Reflect>(value: T) -> ObjRef {
    Rc::new(RefCell::new(value))
}

/// Stable identity key for an object handle: the allocation address.
pub(crate) fn identity(handle: &ObjRef) -> usize {
    Rc::as_ptr(handle) as *const () as usize
}

/// A field value contributed by or assigned through [`Reflect`].
///
/// The scalar arms mirror the BDS container's value kinds; `Object` and
/// `List` express the graph structure. The enum is closed: every listed
/// field is serializable by construction, so "unsupported field type"
/// cannot occur at this boundary.
#[derive(Clone)]
pub enum FieldValue {
    /// Signed byte.
    Byte(i8),
    /// Single-byte character.
    Char(u8),
    /// 16-bit signed integer.
    Short(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit IEEE-754 float.
    Float(f32),
    /// 64-bit IEEE-754 float.
    Double(f64),
    /// UTF-8 string.
    Str(String),
    /// Reference to another object in the graph.
    Object(ObjRef),
    /// Ordered, possibly heterogeneous list of values.
    List(Vec<FieldValue>),
    /// Absent reference. Omitted from the wire entirely; a field left
    /// untouched on load reads back as whatever the type's default holds.
    Null,
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "Byte({v})"),
            Self::Char(v) => write!(f, "Char({v})"),
            Self::Short(v) => write!(f, "Short({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Long(v) => write!(f, "Long({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Double(v) => write!(f, "Double({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Object(handle) => match handle.try_borrow() {
                Ok(inner) => write!(f, "Object({})", inner.type_name()),
                Err(_) => write!(f, "Object(<borrowed>)"),
            },
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Null => write!(f, "Null"),
        }
    }
}

/// Failure reported by [`Reflect::set_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldAccessError {
    /// The type declares no field with this name.
    #[error("no such field")]
    UnknownField,
    /// The value's kind does not match the field's type.
    #[error("value kind does not match the field's type")]
    KindMismatch,
}

/// Capability implemented by every type that participates in graph
/// serialization.
///
/// Contract:
/// - `type_name` must be fully qualified and stable — it is persisted and
///   resolved through the [`crate::TypeRegistry`] on load.
/// - `fields` must return the same names in the same order on every call
///   (declaration order by convention); this ordering is what makes the
///   encoding byte-for-byte reproducible.
/// - Field names are plain identifiers and must not contain `::`, which is
///   reserved for back-reference entry names.
/// - `set_field` must accept every `(name, value)` pair that `fields`
///   produces. Unknown names and kind mismatches are errors, not panics.
pub trait Reflect: 'static {
    /// Fully-qualified, stable type identifier.
    fn type_name(&self) -> &'static str;

    /// The persisted fields, in declaration order.
    fn fields(&self) -> Vec<(&'static str, FieldValue)>;

    /// Assigns one field by name.
    ///
    /// # Errors
    /// [`FieldAccessError::UnknownField`] for names the type does not
    /// declare, [`FieldAccessError::KindMismatch`] for values of the wrong
    /// kind.
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError>;
}

impl fmt::Debug for dyn Reflect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reflect({})", self.type_name())
    }
}
