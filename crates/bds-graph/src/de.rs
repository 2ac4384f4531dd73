// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read path: BDS document tree → reconstructed object graph.
//!
//! Two-phase resolution. References are assigned optimistically while
//! objects are built; anything pointing at an object that has not finished
//! construction (forward references, cycles) is parked in an unresolved set
//! and patched by a fixed-point pass after the whole tree has been
//! instantiated. Deferred patching is the only general answer here: a truly
//! cyclic graph has no topological order to build in.

use std::path::Path;

use bds_format::{Document, Value};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::reflect::{FieldAccessError, FieldValue, ObjRef};
use crate::registry::TypeRegistry;
use crate::{GraphError, BACKREF_SEP, CLASS_NAME_FIELD, IDREF_FIELD, LIST_VALUE_FIELD, REF_FIELD};

/// Reconstructs an object graph from a root document.
///
/// Every nested object document is instantiated through `registry`; all
/// back-references — including `list` elements pointing at the root itself —
/// are resolved before this returns.
///
/// # Errors
/// Reflection failures name the offending type and field; a back-reference
/// no document ever claims is [`GraphError::DanglingReference`].
pub fn deserialize(doc: &Document, registry: &TypeRegistry) -> Result<ObjRef, GraphError> {
    let mut state = ReadState::new(registry);
    let root = state.admit(doc)?;

    while let Some(job) = state.worklist.pop() {
        state.walk(&job)?;
        // Insertion after the field walk mirrors the write side's contract:
        // an object becomes referenceable once fully constructed.
        if state.past.insert(job.idref, job.handle).is_some() {
            return Err(GraphError::DuplicateIdRef { idref: job.idref });
        }
    }

    state.resolve_fixed_point()?;
    Ok(root)
}

/// Decodes wire bytes (no file signature) and reconstructs the graph.
pub fn deserialize_bytes(bytes: &[u8], registry: &TypeRegistry) -> Result<ObjRef, GraphError> {
    let doc = Document::from_bytes(bytes)?;
    deserialize(&doc, registry)
}

/// Loads an enveloped file and reconstructs the graph.
pub fn deserialize_file(
    path: impl AsRef<Path>,
    registry: &TypeRegistry,
) -> Result<ObjRef, GraphError> {
    let doc = Document::load_from_file(path)?;
    deserialize(&doc, registry)
}

/// An instantiated object whose fields still need reading.
struct Job<'d> {
    doc: &'d Document,
    handle: ObjRef,
    type_name: String,
    idref: i64,
}

/// Where an unresolved reference lands once its target exists.
enum Slot {
    /// The whole field.
    Field,
    /// An element of a (possibly nested) list field, addressed by index
    /// path.
    Element(Vec<usize>),
}

/// Deferred patch record: `{owner, field/slot, referenced idref}`.
struct PendingRef {
    owner: ObjRef,
    owner_type: String,
    field: String,
    slot: Slot,
    idref: i64,
}

struct ReadState<'d, 'r> {
    registry: &'r TypeRegistry,
    past: FxHashMap<i64, ObjRef>,
    unresolved: Vec<PendingRef>,
    worklist: Vec<Job<'d>>,
}

impl<'d, 'r> ReadState<'d, 'r> {
    fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            past: FxHashMap::default(),
            unresolved: Vec::new(),
            worklist: Vec::new(),
        }
    }

    /// Reads an object document's meta fields, instantiates the type and
    /// parks the field walk on the worklist.
    fn admit(&mut self, doc: &'d Document) -> Result<ObjRef, GraphError> {
        let Some(class) = doc.get_str(CLASS_NAME_FIELD) else {
            return Err(GraphError::MissingClassName {
                doc_name: doc.name().to_string(),
            });
        };
        let Some(idref) = doc.get_long(IDREF_FIELD) else {
            return Err(GraphError::MissingIdRef {
                type_name: class.to_string(),
            });
        };
        let handle = self.registry.instantiate(class)?;
        trace!(type_name = class, idref, "instantiated object");
        self.worklist.push(Job {
            doc,
            handle: handle.clone(),
            type_name: class.to_string(),
            idref,
        });
        Ok(handle)
    }

    fn walk(&mut self, job: &Job<'d>) -> Result<(), GraphError> {
        for (name, value) in job.doc.entries() {
            if name == CLASS_NAME_FIELD || name == IDREF_FIELD {
                continue;
            }

            // Back-reference entries carry a composed "Type::field" name.
            if let Some((_, field)) = name.rsplit_once(BACKREF_SEP) {
                let Value::Long(target) = value else {
                    return Err(GraphError::MalformedBackRef {
                        field: name.to_string(),
                    });
                };
                if let Some(existing) = self.past.get(target) {
                    set_field(
                        &job.handle,
                        &job.type_name,
                        field,
                        FieldValue::Object(existing.clone()),
                    )?;
                } else {
                    trace!(field, target, "deferring unresolved reference");
                    self.unresolved.push(PendingRef {
                        owner: job.handle.clone(),
                        owner_type: job.type_name.clone(),
                        field: field.to_string(),
                        slot: Slot::Field,
                        idref: *target,
                    });
                }
                continue;
            }

            match value {
                Value::Document(child_doc) => {
                    let child = self.admit(child_doc)?;
                    set_field(&job.handle, &job.type_name, name, FieldValue::Object(child))?;
                }
                Value::DocumentArray(elems) => {
                    let items =
                        self.read_list(elems, &job.handle, &job.type_name, name, &[])?;
                    set_field(&job.handle, &job.type_name, name, FieldValue::List(items))?;
                }
                other => {
                    let Some(scalar) = raise_scalar(other) else {
                        debug_assert!(false, "non-scalar fell through entry dispatch");
                        continue;
                    };
                    set_field(&job.handle, &job.type_name, name, scalar)?;
                }
            }
        }
        Ok(())
    }

    fn read_list(
        &mut self,
        elems: &'d [Document],
        owner: &ObjRef,
        owner_type: &str,
        field: &str,
        base_path: &[usize],
    ) -> Result<Vec<FieldValue>, GraphError> {
        let mut items = Vec::with_capacity(elems.len());
        for (index, elem_doc) in elems.iter().enumerate() {
            let mut path = base_path.to_vec();
            path.push(index);

            let item = if elem_doc.contains(CLASS_NAME_FIELD) {
                FieldValue::Object(self.admit(elem_doc)?)
            } else if let Some(target) = elem_doc.get_long(REF_FIELD) {
                if let Some(existing) = self.past.get(&target) {
                    FieldValue::Object(existing.clone())
                } else {
                    trace!(field, index, target, "deferring unresolved list element");
                    self.unresolved.push(PendingRef {
                        owner: owner.clone(),
                        owner_type: owner_type.to_string(),
                        field: field.to_string(),
                        slot: Slot::Element(path),
                        idref: target,
                    });
                    FieldValue::Null
                }
            } else if let Some(wrapped) = elem_doc.get(LIST_VALUE_FIELD) {
                match wrapped {
                    Value::DocumentArray(sub) => {
                        FieldValue::List(self.read_list(sub, owner, owner_type, field, &path)?)
                    }
                    Value::Document(_) => {
                        return Err(GraphError::MalformedListElement {
                            field: field.to_string(),
                            index,
                        })
                    }
                    scalar => {
                        let Some(item) = raise_scalar(scalar) else {
                            return Err(GraphError::MalformedListElement {
                                field: field.to_string(),
                                index,
                            });
                        };
                        item
                    }
                }
            } else if elem_doc.is_empty() {
                FieldValue::Null
            } else {
                return Err(GraphError::MalformedListElement {
                    field: field.to_string(),
                    index,
                });
            };
            items.push(item);
        }
        Ok(items)
    }

    /// Repeatedly scans the unresolved set, patching entries whose target
    /// now exists, until a full pass makes no progress. Anything left is a
    /// reference the stream never satisfies.
    fn resolve_fixed_point(&mut self) -> Result<(), GraphError> {
        let mut pass = 0usize;
        while !self.unresolved.is_empty() {
            pass += 1;
            let pending = std::mem::take(&mut self.unresolved);
            let total = pending.len();
            let mut remaining = Vec::new();
            for entry in pending {
                match self.past.get(&entry.idref) {
                    Some(target) => apply_patch(&entry, target.clone())?,
                    None => remaining.push(entry),
                }
            }
            debug!(
                pass,
                resolved = total - remaining.len(),
                remaining = remaining.len(),
                "fixed-point resolution pass"
            );
            if remaining.len() == total {
                return Err(GraphError::DanglingReference {
                    idref: remaining[0].idref,
                });
            }
            self.unresolved = remaining;
        }
        Ok(())
    }
}

fn apply_patch(entry: &PendingRef, target: ObjRef) -> Result<(), GraphError> {
    match &entry.slot {
        Slot::Field => set_field(
            &entry.owner,
            &entry.owner_type,
            &entry.field,
            FieldValue::Object(target),
        ),
        Slot::Element(path) => {
            let current = entry
                .owner
                .borrow()
                .fields()
                .into_iter()
                .find(|(name, _)| *name == entry.field)
                .map(|(_, value)| value);
            let Some(FieldValue::List(mut items)) = current else {
                return Err(GraphError::Field {
                    type_name: entry.owner_type.clone(),
                    field: entry.field.clone(),
                    source: FieldAccessError::KindMismatch,
                });
            };
            splice(&mut items, path, FieldValue::Object(target)).map_err(|source| {
                GraphError::Field {
                    type_name: entry.owner_type.clone(),
                    field: entry.field.clone(),
                    source,
                }
            })?;
            set_field(
                &entry.owner,
                &entry.owner_type,
                &entry.field,
                FieldValue::List(items),
            )
        }
    }
}

/// Replaces the element addressed by `path` inside a possibly nested list.
///
/// Paths were derived from the same document the list was built from, so a
/// miss here is a logic error, surfaced as a kind mismatch rather than a
/// panic.
fn splice(
    items: &mut Vec<FieldValue>,
    path: &[usize],
    value: FieldValue,
) -> Result<(), FieldAccessError> {
    match path {
        [] => {
            debug_assert!(false, "empty patch path");
            Err(FieldAccessError::KindMismatch)
        }
        [index] => match items.get_mut(*index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FieldAccessError::KindMismatch),
        },
        [index, rest @ ..] => match items.get_mut(*index) {
            Some(FieldValue::List(inner)) => splice(inner, rest, value),
            _ => Err(FieldAccessError::KindMismatch),
        },
    }
}

fn set_field(
    owner: &ObjRef,
    owner_type: &str,
    field: &str,
    value: FieldValue,
) -> Result<(), GraphError> {
    owner
        .borrow_mut()
        .set_field(field, value)
        .map_err(|source| GraphError::Field {
            type_name: owner_type.to_string(),
            field: field.to_string(),
            source,
        })
}

/// Maps scalar container values onto field values.
fn raise_scalar(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Byte(v) => Some(FieldValue::Byte(*v)),
        Value::Char(v) => Some(FieldValue::Char(*v)),
        Value::Short(v) => Some(FieldValue::Short(*v)),
        Value::Int(v) => Some(FieldValue::Int(*v)),
        Value::Long(v) => Some(FieldValue::Long(*v)),
        Value::Float(v) => Some(FieldValue::Float(*v)),
        Value::Double(v) => Some(FieldValue::Double(*v)),
        Value::Str(v) => Some(FieldValue::Str(v.clone())),
        Value::Document(_) | Value::DocumentArray(_) => None,
    }
}
