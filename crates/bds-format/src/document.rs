// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The in-memory BDS document tree.

use crate::value::Value;
use crate::{FormatError, MAX_NAME_LEN};

/// A named, ordered mapping from field name to typed [`Value`].
///
/// Entries keep insertion order; that order is the serialization order, which
/// makes encoding deterministic. Field names are unique within one document —
/// inserting a duplicate fails the single call and leaves the document
/// unchanged. A document owns its nested children outright (tree ownership;
/// sub-documents are never shared at the container level).
///
/// The document's own name is the field name it is stored under when nested
/// in a parent; the root document's name is not part of the wire encoding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    name: String,
    entries: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Returns this document's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of fields in this document.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if a field with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Iterates over `(name, value)` entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the raw value stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn insert(&mut self, name: String, value: Value) -> Result<(), FormatError> {
        if name.len() > MAX_NAME_LEN {
            return Err(FormatError::NameTooLong { len: name.len() });
        }
        if self.contains(&name) {
            return Err(FormatError::DuplicateField { name });
        }
        self.entries.push((name, value));
        Ok(())
    }

    /// Decode-side insertion: names arrive from a `u16` prefix so only the
    /// uniqueness invariant needs enforcing.
    pub(crate) fn insert_decoded(&mut self, name: String, value: Value) -> Result<(), FormatError> {
        if self.contains(&name) {
            return Err(FormatError::DuplicateField { name });
        }
        self.entries.push((name, value));
        Ok(())
    }

    /// Adds a signed byte field.
    ///
    /// # Errors
    /// [`FormatError::DuplicateField`] if the name exists,
    /// [`FormatError::NameTooLong`] if it exceeds the `u16` prefix. The
    /// document is unchanged on failure. All `add_*` methods share this
    /// contract.
    pub fn add_byte(&mut self, name: impl Into<String>, value: i8) -> Result<(), FormatError> {
        self.insert(name.into(), Value::Byte(value))
    }

    /// Adds a single-byte character field.
    pub fn add_char(&mut self, name: impl Into<String>, value: u8) -> Result<(), FormatError> {
        self.insert(name.into(), Value::Char(value))
    }

    /// Adds a 16-bit integer field.
    pub fn add_short(&mut self, name: impl Into<String>, value: i16) -> Result<(), FormatError> {
        self.insert(name.into(), Value::Short(value))
    }

    /// Adds a 32-bit integer field.
    pub fn add_int(&mut self, name: impl Into<String>, value: i32) -> Result<(), FormatError> {
        self.insert(name.into(), Value::Int(value))
    }

    /// Adds a 64-bit integer field.
    pub fn add_long(&mut self, name: impl Into<String>, value: i64) -> Result<(), FormatError> {
        self.insert(name.into(), Value::Long(value))
    }

    /// Adds a 32-bit float field.
    pub fn add_float(&mut self, name: impl Into<String>, value: f32) -> Result<(), FormatError> {
        self.insert(name.into(), Value::Float(value))
    }

    /// Adds a 64-bit float field.
    pub fn add_double(&mut self, name: impl Into<String>, value: f64) -> Result<(), FormatError> {
        self.insert(name.into(), Value::Double(value))
    }

    /// Adds a string field.
    ///
    /// # Errors
    /// [`FormatError::StringTooLong`] if the value exceeds the `u16` prefix,
    /// in addition to the shared `add_*` failures.
    pub fn add_str(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), FormatError> {
        let value = value.into();
        if value.len() > MAX_NAME_LEN {
            return Err(FormatError::StringTooLong { len: value.len() });
        }
        self.insert(name.into(), Value::Str(value))
    }

    /// Adds a nested document under `name`.
    ///
    /// The child is renamed to `name` so that a document's name is always
    /// the field name it is stored under.
    pub fn add_document(
        &mut self,
        name: impl Into<String>,
        mut child: Document,
    ) -> Result<(), FormatError> {
        let name = name.into();
        child.name.clone_from(&name);
        self.insert(name, Value::Document(child))
    }

    /// Adds an ordered array of documents under `name`.
    ///
    /// Element documents keep their own names on the wire; each must fit the
    /// `u16` prefix.
    pub fn add_document_array(
        &mut self,
        name: impl Into<String>,
        children: Vec<Document>,
    ) -> Result<(), FormatError> {
        for child in &children {
            if child.name.len() > MAX_NAME_LEN {
                return Err(FormatError::NameTooLong {
                    len: child.name.len(),
                });
            }
        }
        self.insert(name.into(), Value::DocumentArray(children))
    }

    /// Adds an already-typed [`Value`] under `name`.
    ///
    /// Applies the same validation as the typed `add_*` methods. A `Document`
    /// value is renamed to `name` so the stored-under-own-name invariant
    /// holds; array children keep their own names.
    pub fn add_value(&mut self, name: impl Into<String>, value: Value) -> Result<(), FormatError> {
        let name = name.into();
        match value {
            Value::Str(s) => {
                if s.len() > MAX_NAME_LEN {
                    return Err(FormatError::StringTooLong { len: s.len() });
                }
                self.insert(name, Value::Str(s))
            }
            Value::Document(mut child) => {
                child.name.clone_from(&name);
                self.insert(name, Value::Document(child))
            }
            Value::DocumentArray(children) => {
                for child in &children {
                    if child.name.len() > MAX_NAME_LEN {
                        return Err(FormatError::NameTooLong {
                            len: child.name.len(),
                        });
                    }
                }
                self.insert(name, Value::DocumentArray(children))
            }
            other => self.insert(name, other),
        }
    }

    /// Returns the byte stored under `name`, or `None` if absent or of a
    /// different kind. All `get_*` accessors share this schema-tolerant
    /// contract: absence is a signal, never a panic or an error.
    pub fn get_byte(&self, name: &str) -> Option<i8> {
        match self.get(name) {
            Some(Value::Byte(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the single-byte character stored under `name`.
    pub fn get_char(&self, name: &str) -> Option<u8> {
        match self.get(name) {
            Some(Value::Char(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the 16-bit integer stored under `name`.
    pub fn get_short(&self, name: &str) -> Option<i16> {
        match self.get(name) {
            Some(Value::Short(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the 32-bit integer stored under `name`.
    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the 64-bit integer stored under `name`.
    pub fn get_long(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Long(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the 32-bit float stored under `name`.
    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name) {
            Some(Value::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the 64-bit float stored under `name`.
    pub fn get_double(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Double(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string stored under `name`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the nested document stored under `name`.
    pub fn get_document(&self, name: &str) -> Option<&Document> {
        match self.get(name) {
            Some(Value::Document(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the document array stored under `name`.
    pub fn get_document_array(&self, name: &str) -> Option<&[Document]> {
        match self.get(name) {
            Some(Value::DocumentArray(v)) => Some(v.as_slice()),
            _ => None,
        }
    }
}
