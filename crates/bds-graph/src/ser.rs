// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Write path: object graph → BDS document tree.
//!
//! Traversal is an explicit worklist, never call-stack recursion, so depth
//! is bounded by memory and a too-deep graph is a typed error. Objects are
//! numbered in discovery order; the visited map is keyed by allocation
//! identity and an object's entry is recorded *before* its fields are
//! walked, so a field pointing back at its own object resolves as a
//! back-reference instead of recursing forever.

use std::path::Path;

use bds_format::{Document, Value, MAX_NESTING_DEPTH};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::reflect::{identity, FieldValue, ObjRef};
use crate::{GraphError, BACKREF_SEP, CLASS_NAME_FIELD, IDREF_FIELD, LIST_VALUE_FIELD, REF_FIELD};

/// Serializes an object graph into one root [`Document`].
///
/// The root object is assigned idref 0 ([`crate::ROOT_IDREF`]); every other
/// object gets the next ascending index the first time it is reached. Shared
/// references and cycles appear exactly once as nested documents and as
/// back-references everywhere else.
///
/// # Errors
/// [`GraphError::InvalidFieldName`] for a `fields()` name containing `::`,
/// [`GraphError::GraphTooDeep`] when first-visit nesting exceeds
/// [`MAX_NESTING_DEPTH`], and wire-level failures as
/// [`GraphError::Format`].
pub fn serialize(root: &ObjRef) -> Result<Document, GraphError> {
    let mut state = SerState::default();
    state.discover(root.clone(), "root".to_string(), 0)?;
    while let Some((idx, handle)) = state.worklist.pop() {
        state.walk(idx, &handle)?;
    }
    trace!(objects = state.arena.len(), "graph lowered, assembling");
    assemble(state.arena)
}

/// Serializes an object graph straight to wire bytes (no file signature).
pub fn serialize_to_bytes(root: &ObjRef) -> Result<Vec<u8>, GraphError> {
    Ok(serialize(root)?.to_bytes()?)
}

/// Serializes an object graph to `path` under the BDS file envelope.
pub fn serialize_to_file(root: &ObjRef, path: impl AsRef<Path>) -> Result<(), GraphError> {
    serialize(root)?.write_to_file(path)?;
    Ok(())
}

/// One lowered field entry, prior to document assembly.
enum Entry {
    /// Inline scalar — including back-references, which are LONG entries
    /// under a composed `Type::field` name.
    Scalar(Value),
    /// First-visit object field; index into the arena.
    Child(usize),
    /// List field.
    Array(Vec<ArrayElem>),
}

/// One lowered list element.
enum ArrayElem {
    Scalar(Value),
    Child(usize),
    BackRef(i64),
    SubList(Vec<ArrayElem>),
    Null,
}

/// One object's document-in-waiting. Children always occupy higher arena
/// indices than their parent (they are created during the parent's field
/// walk), which is what lets assembly run bottom-up without a second
/// traversal.
struct ArenaNode {
    name: String,
    type_name: &'static str,
    idref: i64,
    depth: usize,
    entries: Vec<(String, Entry)>,
}

#[derive(Default)]
struct SerState {
    arena: Vec<ArenaNode>,
    visited: FxHashMap<usize, i64>,
    keep_alive: Vec<ObjRef>,
    worklist: Vec<(usize, ObjRef)>,
    next_idref: i64,
}

impl SerState {
    /// First visit of an object: assign its idref, mark it visited, park it
    /// on the worklist. The visited insert happens here — before any field
    /// of the object is looked at — so direct self-cycles are cut.
    fn discover(&mut self, handle: ObjRef, name: String, depth: usize) -> Result<usize, GraphError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(GraphError::GraphTooDeep { depth });
        }
        let idref = self.next_idref;
        self.next_idref += 1;
        self.visited.insert(identity(&handle), idref);

        let type_name = handle.borrow().type_name();
        trace!(type_name, idref, "discovered object");

        let idx = self.arena.len();
        self.arena.push(ArenaNode {
            name,
            type_name,
            idref,
            depth,
            entries: Vec::new(),
        });
        // The identity key is an address; keeping the handle alive for the
        // whole call is what keeps that address unique.
        self.keep_alive.push(handle.clone());
        self.worklist.push((idx, handle));
        Ok(idx)
    }

    fn walk(&mut self, idx: usize, handle: &ObjRef) -> Result<(), GraphError> {
        let fields = handle.borrow().fields();
        let owner_type = self.arena[idx].type_name;
        let depth = self.arena[idx].depth;

        let mut entries = Vec::with_capacity(fields.len());
        for (field, value) in fields {
            if field.contains(BACKREF_SEP) {
                return Err(GraphError::InvalidFieldName {
                    type_name: owner_type.to_string(),
                    field: field.to_string(),
                });
            }
            match value {
                FieldValue::Null => {}
                FieldValue::Object(child) => {
                    if let Some(&target) = self.visited.get(&identity(&child)) {
                        trace!(owner = owner_type, field, target, "back-reference");
                        entries.push((
                            format!("{owner_type}{BACKREF_SEP}{field}"),
                            Entry::Scalar(Value::Long(target)),
                        ));
                    } else {
                        let child_idx = self.discover(child, field.to_string(), depth + 1)?;
                        entries.push((field.to_string(), Entry::Child(child_idx)));
                    }
                }
                FieldValue::List(items) => {
                    let elems = self.lower_list(&items, depth + 1)?;
                    entries.push((field.to_string(), Entry::Array(elems)));
                }
                other => {
                    let Some(scalar) = lower_scalar(&other) else {
                        debug_assert!(false, "non-scalar fell through field lowering");
                        continue;
                    };
                    entries.push((field.to_string(), Entry::Scalar(scalar)));
                }
            }
        }
        self.arena[idx].entries = entries;
        Ok(())
    }

    fn lower_list(
        &mut self,
        items: &[FieldValue],
        depth: usize,
    ) -> Result<Vec<ArrayElem>, GraphError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(GraphError::GraphTooDeep { depth });
        }
        let mut elems = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let elem = match item {
                FieldValue::Null => ArrayElem::Null,
                FieldValue::Object(child) => {
                    if let Some(&target) = self.visited.get(&identity(child)) {
                        trace!(index, target, "list back-reference");
                        ArrayElem::BackRef(target)
                    } else {
                        ArrayElem::Child(self.discover(
                            child.clone(),
                            index.to_string(),
                            depth,
                        )?)
                    }
                }
                FieldValue::List(sub) => ArrayElem::SubList(self.lower_list(sub, depth + 1)?),
                other => {
                    let Some(scalar) = lower_scalar(other) else {
                        debug_assert!(false, "non-scalar fell through element lowering");
                        continue;
                    };
                    ArrayElem::Scalar(scalar)
                }
            };
            elems.push(elem);
        }
        Ok(elems)
    }
}

/// Maps the scalar arms of [`FieldValue`] onto container values.
fn lower_scalar(value: &FieldValue) -> Option<Value> {
    match value {
        FieldValue::Byte(v) => Some(Value::Byte(*v)),
        FieldValue::Char(v) => Some(Value::Char(*v)),
        FieldValue::Short(v) => Some(Value::Short(*v)),
        FieldValue::Int(v) => Some(Value::Int(*v)),
        FieldValue::Long(v) => Some(Value::Long(*v)),
        FieldValue::Float(v) => Some(Value::Float(*v)),
        FieldValue::Double(v) => Some(Value::Double(*v)),
        FieldValue::Str(v) => Some(Value::Str(v.clone())),
        FieldValue::Object(_) | FieldValue::List(_) | FieldValue::Null => None,
    }
}

/// Builds the nested document tree bottom-up. Arena children always sit at
/// higher indices than their parents, so popping from the end guarantees
/// every `Child` reference is already built when its parent needs it.
fn assemble(mut arena: Vec<ArenaNode>) -> Result<Document, GraphError> {
    let mut built: Vec<Option<Document>> = Vec::new();
    built.resize_with(arena.len(), || None);

    while let Some(node) = arena.pop() {
        let idx = arena.len();
        let mut doc = Document::new(node.name);
        doc.add_str(CLASS_NAME_FIELD, node.type_name)?;
        doc.add_long(IDREF_FIELD, node.idref)?;
        for (name, entry) in node.entries {
            match entry {
                Entry::Scalar(value) => doc.add_value(name, value)?,
                Entry::Child(child_idx) => {
                    let Some(child) = built[child_idx].take() else {
                        debug_assert!(false, "child document assembled out of order");
                        continue;
                    };
                    doc.add_document(name, child)?;
                }
                Entry::Array(elems) => {
                    let children = build_elements(elems, &mut built)?;
                    doc.add_document_array(name, children)?;
                }
            }
        }
        built[idx] = Some(doc);
    }

    let Some(root) = built.first_mut().and_then(Option::take) else {
        debug_assert!(false, "empty arena after traversal of a root object");
        return Err(GraphError::GraphTooDeep { depth: 0 });
    };
    Ok(root)
}

fn build_elements(
    elems: Vec<ArrayElem>,
    built: &mut Vec<Option<Document>>,
) -> Result<Vec<Document>, GraphError> {
    let mut children = Vec::with_capacity(elems.len());
    for (index, elem) in elems.into_iter().enumerate() {
        let child = match elem {
            ArrayElem::Scalar(value) => {
                let mut doc = Document::new(index.to_string());
                doc.add_value(LIST_VALUE_FIELD, value)?;
                doc
            }
            ArrayElem::Null => Document::new(index.to_string()),
            ArrayElem::Child(child_idx) => {
                let Some(doc) = built[child_idx].take() else {
                    debug_assert!(false, "element document assembled out of order");
                    continue;
                };
                doc
            }
            ArrayElem::BackRef(target) => {
                let mut doc = Document::new(index.to_string());
                doc.add_long(REF_FIELD, target)?;
                doc
            }
            ArrayElem::SubList(sub) => {
                let mut doc = Document::new(index.to_string());
                let nested = build_elements(sub, built)?;
                doc.add_document_array(LIST_VALUE_FIELD, nested)?;
                doc
            }
        };
        children.push(child);
    }
    Ok(children)
}
