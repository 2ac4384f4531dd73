// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use std::rc::Rc;

use bds_graph::{
    deserialize, deserialize_bytes, deserialize_file, obj, serialize, serialize_to_bytes,
    serialize_to_file, Document, FieldAccessError, FieldValue, GraphError, ObjRef, Reflect,
    TypeRegistry, CLASS_NAME_FIELD, IDREF_FIELD,
};

/// A named entity that may point at one other object.
#[derive(Default)]
struct Entity {
    name: String,
    nested: Option<ObjRef>,
}

impl Reflect for Entity {
    fn type_name(&self) -> &'static str {
        "demo::Entity"
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("name", FieldValue::Str(self.name.clone())),
            (
                "nested",
                self.nested
                    .clone()
                    .map_or(FieldValue::Null, FieldValue::Object),
            ),
        ]
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
        match (name, value) {
            ("name", FieldValue::Str(s)) => self.name = s,
            ("nested", FieldValue::Object(o)) => self.nested = Some(o),
            ("name" | "nested", _) => return Err(FieldAccessError::KindMismatch),
            _ => return Err(FieldAccessError::UnknownField),
        }
        Ok(())
    }
}

/// A container holding a byte and a heterogeneous list. The `scratch`
/// field is transient: it is not listed, so it never reaches the wire.
#[derive(Default)]
struct Container {
    byte: i8,
    list: Vec<FieldValue>,
    scratch: i32,
}

impl Reflect for Container {
    fn type_name(&self) -> &'static str {
        "demo::Container"
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("byte", FieldValue::Byte(self.byte)),
            ("list", FieldValue::List(self.list.clone())),
        ]
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
        match (name, value) {
            ("byte", FieldValue::Byte(v)) => self.byte = v,
            ("list", FieldValue::List(v)) => self.list = v,
            ("byte" | "list", _) => return Err(FieldAccessError::KindMismatch),
            _ => return Err(FieldAccessError::UnknownField),
        }
        Ok(())
    }
}

/// Two reference fields, for shared-instance preservation checks.
#[derive(Default)]
struct Pair {
    label: String,
    left: Option<ObjRef>,
    right: Option<ObjRef>,
}

impl Reflect for Pair {
    fn type_name(&self) -> &'static str {
        "demo::Pair"
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("label", FieldValue::Str(self.label.clone())),
            (
                "left",
                self.left
                    .clone()
                    .map_or(FieldValue::Null, FieldValue::Object),
            ),
            (
                "right",
                self.right
                    .clone()
                    .map_or(FieldValue::Null, FieldValue::Object),
            ),
        ]
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
        match (name, value) {
            ("label", FieldValue::Str(s)) => self.label = s,
            ("left", FieldValue::Object(o)) => self.left = Some(o),
            ("right", FieldValue::Object(o)) => self.right = Some(o),
            ("label" | "left" | "right", _) => return Err(FieldAccessError::KindMismatch),
            _ => return Err(FieldAccessError::UnknownField),
        }
        Ok(())
    }
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<Entity>().unwrap();
    registry.register::<Container>().unwrap();
    registry.register::<Pair>().unwrap();
    registry
}

/// Reads one field off a reconstructed handle.
fn field(handle: &ObjRef, name: &str) -> FieldValue {
    let inner = handle.borrow();
    let Some((_, value)) = inner.fields().into_iter().find(|(n, _)| *n == name) else {
        panic!("field {name:?} missing on {}", inner.type_name());
    };
    value
}

fn expect_object(value: FieldValue) -> ObjRef {
    match value {
        FieldValue::Object(handle) => handle,
        other => panic!("expected object, got {other:?}"),
    }
}

#[test]
fn scalar_only_object_roundtrip() {
    let root = obj(Entity {
        name: "solo".into(),
        nested: None,
    });
    let back = deserialize_bytes(&serialize_to_bytes(&root).unwrap(), &registry()).unwrap();
    assert!(matches!(field(&back, "name"), FieldValue::Str(s) if s == "solo"));
    assert!(matches!(field(&back, "nested"), FieldValue::Null));
}

#[test]
fn direct_self_cycle_roundtrip() {
    let root = obj(Entity {
        name: "ouroboros".into(),
        nested: None,
    });
    root.borrow_mut()
        .set_field("nested", FieldValue::Object(root.clone()))
        .unwrap();

    let back = deserialize_bytes(&serialize_to_bytes(&root).unwrap(), &registry()).unwrap();
    let nested = expect_object(field(&back, "nested"));
    assert!(Rc::ptr_eq(&nested, &back), "self-cycle must close on itself");
}

#[test]
fn shared_reference_preserved_as_one_instance() {
    let shared = obj(Entity {
        name: "shared".into(),
        nested: None,
    });
    let root = obj(Pair {
        label: "pair".into(),
        left: Some(shared.clone()),
        right: Some(shared),
    });

    // On the wire: first visit inlined, second visit a back-reference.
    let doc = serialize(&root).unwrap();
    assert!(doc.get_document("left").is_some());
    assert_eq!(doc.get_long("demo::Pair::right"), Some(1));

    let back = deserialize(&doc, &registry()).unwrap();
    let left = expect_object(field(&back, "left"));
    let right = expect_object(field(&back, "right"));
    assert!(
        Rc::ptr_eq(&left, &right),
        "both fields must point at the one reconstructed instance"
    );
    assert!(!Rc::ptr_eq(&left, &back));
}

#[test]
fn two_member_cycle_roundtrip() {
    let a = obj(Entity {
        name: "a".into(),
        nested: None,
    });
    let b = obj(Entity {
        name: "b".into(),
        nested: Some(a.clone()),
    });
    a.borrow_mut()
        .set_field("nested", FieldValue::Object(b))
        .unwrap();

    let back = deserialize_bytes(&serialize_to_bytes(&a).unwrap(), &registry()).unwrap();
    let to_b = expect_object(field(&back, "nested"));
    let back_to_a = expect_object(field(&to_b, "nested"));
    assert!(Rc::ptr_eq(&back_to_a, &back));
    assert!(matches!(field(&to_b, "name"), FieldValue::Str(s) if s == "b"));
}

#[test]
fn end_to_end_adios_scenario() {
    // serialize {name:"Adios", nested:{byte:5, list:[self, "TestString"]}}
    // where list[0] is the enclosing root object itself.
    let root = obj(Entity {
        name: "Adios".into(),
        nested: None,
    });
    let container = obj(Container {
        byte: 5,
        list: vec![
            FieldValue::Object(root.clone()),
            FieldValue::Str("TestString".into()),
        ],
        scratch: 77,
    });
    root.borrow_mut()
        .set_field("nested", FieldValue::Object(container))
        .unwrap();

    let bytes = serialize_to_bytes(&root).unwrap();
    let back = deserialize_bytes(&bytes, &registry()).unwrap();

    assert!(matches!(field(&back, "name"), FieldValue::Str(s) if s == "Adios"));
    let container = expect_object(field(&back, "nested"));
    assert!(matches!(field(&container, "byte"), FieldValue::Byte(5)));

    let FieldValue::List(items) = field(&container, "list") else {
        panic!("list field not reconstructed");
    };
    assert_eq!(items.len(), 2);
    let first = expect_object(items[0].clone());
    assert!(
        Rc::ptr_eq(&first, &back),
        "list[0] must be reference-identical to the reconstructed root"
    );
    assert!(matches!(&items[1], FieldValue::Str(s) if s == "TestString"));

    // The unlisted `scratch` field never traveled: the container document
    // carries exactly the meta fields plus `byte` and `list`.
    let doc = serialize(&root).unwrap();
    let container_doc = doc.get_document("nested").unwrap();
    assert_eq!(container_doc.len(), 4);
    assert!(!container_doc.contains("scratch"));
}

#[test]
fn nested_lists_and_null_elements_roundtrip() {
    let root = obj(Container {
        byte: 1,
        list: vec![
            FieldValue::List(vec![FieldValue::Int(1), FieldValue::Str("x".into())]),
            FieldValue::Null,
            FieldValue::Long(-9),
        ],
        scratch: 0,
    });

    let back = deserialize_bytes(&serialize_to_bytes(&root).unwrap(), &registry()).unwrap();
    let FieldValue::List(items) = field(&back, "list") else {
        panic!("list field not reconstructed");
    };
    assert_eq!(items.len(), 3);
    let FieldValue::List(inner) = &items[0] else {
        panic!("nested list not reconstructed");
    };
    assert!(matches!(inner[0], FieldValue::Int(1)));
    assert!(matches!(&inner[1], FieldValue::Str(s) if s == "x"));
    assert!(matches!(items[1], FieldValue::Null));
    assert!(matches!(items[2], FieldValue::Long(-9)));
}

#[test]
fn missing_fields_leave_defaults_in_place() {
    // A document from an older schema: only the meta fields.
    let mut doc = Document::new("root");
    doc.add_str(CLASS_NAME_FIELD, "demo::Entity").unwrap();
    doc.add_long(IDREF_FIELD, 0).unwrap();

    let back = deserialize(&doc, &registry()).unwrap();
    assert!(matches!(field(&back, "name"), FieldValue::Str(s) if s.is_empty()));
    assert!(matches!(field(&back, "nested"), FieldValue::Null));
}

#[test]
fn unregistered_type_is_a_hard_error() {
    let root = obj(Entity {
        name: "nobody".into(),
        nested: None,
    });
    let bytes = serialize_to_bytes(&root).unwrap();
    let empty = TypeRegistry::new();
    let err = deserialize_bytes(&bytes, &empty).unwrap_err();
    assert!(matches!(
        err,
        GraphError::TypeNotRegistered { type_name } if type_name == "demo::Entity"
    ));
}

#[test]
fn overdeep_chain_reports_graph_too_deep() {
    let mut head = obj(Entity {
        name: "0".into(),
        nested: None,
    });
    for i in 1..600 {
        head = obj(Entity {
            name: i.to_string(),
            nested: Some(head),
        });
    }
    let err = serialize(&head).unwrap_err();
    assert!(matches!(err, GraphError::GraphTooDeep { .. }));
}

#[test]
fn file_envelope_roundtrip() {
    let path = std::env::temp_dir().join(format!("bds-graph-test-{}.bds", std::process::id()));

    let leaf = obj(Entity {
        name: "leaf".into(),
        nested: None,
    });
    let root = obj(Entity {
        name: "root".into(),
        nested: Some(leaf),
    });
    serialize_to_file(&root, &path).unwrap();

    let back = deserialize_file(&path, &registry()).unwrap();
    let nested = expect_object(field(&back, "nested"));
    assert!(matches!(field(&nested, "name"), FieldValue::Str(s) if s == "leaf"));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn serialized_bytes_are_deterministic_across_runs() {
    let build = || {
        let shared = obj(Entity {
            name: "s".into(),
            nested: None,
        });
        let root = obj(Pair {
            label: "p".into(),
            left: Some(shared.clone()),
            right: Some(shared),
        });
        serialize_to_bytes(&root).unwrap()
    };
    assert_eq!(build(), build());
}
