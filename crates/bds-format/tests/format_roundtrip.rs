// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use bds_format::{Document, FormatError, MAX_NAME_LEN};
use proptest::prelude::*;

fn roundtrip(doc: &Document) -> Document {
    Document::from_bytes(&doc.to_bytes().unwrap()).unwrap()
}

#[test]
fn int_sweep_roundtrip() {
    for v in [i32::MIN, -1, 0, 1, 42, i32::MAX] {
        let mut doc = Document::new("root");
        doc.add_int("v", v).unwrap();
        assert_eq!(roundtrip(&doc).get_int("v"), Some(v), "value {v}");
    }
}

#[test]
fn short_sweep_roundtrip() {
    for v in [i16::MIN, -1, 0, 1, i16::MAX] {
        let mut doc = Document::new("root");
        doc.add_short("v", v).unwrap();
        assert_eq!(roundtrip(&doc).get_short("v"), Some(v), "value {v}");
    }
}

#[test]
fn byte_sweep_roundtrip() {
    for v in [i8::MIN, -1, 0, 1, i8::MAX] {
        let mut doc = Document::new("root");
        doc.add_byte("v", v).unwrap();
        assert_eq!(roundtrip(&doc).get_byte("v"), Some(v), "value {v}");
    }
}

#[test]
fn long_sweep_roundtrip() {
    for v in [i64::MIN, -1, 0, 1, i64::MAX] {
        let mut doc = Document::new("root");
        doc.add_long("v", v).unwrap();
        assert_eq!(roundtrip(&doc).get_long("v"), Some(v), "value {v}");
    }
}

#[test]
fn char_sweep_roundtrip() {
    for v in [0u8, 1, b'A', 0x7f, 0xff] {
        let mut doc = Document::new("root");
        doc.add_char("v", v).unwrap();
        assert_eq!(roundtrip(&doc).get_char("v"), Some(v), "value {v}");
    }
}

#[test]
fn double_roundtrip_is_bit_exact() {
    for v in [
        0.0f64,
        -0.0,
        1.5,
        -2.25,
        f64::MIN,
        f64::MAX,
        f64::MIN_POSITIVE,
        f64::EPSILON,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NAN,
    ] {
        let mut doc = Document::new("root");
        doc.add_double("v", v).unwrap();
        let got = roundtrip(&doc).get_double("v").unwrap();
        assert_eq!(got.to_bits(), v.to_bits(), "value {v}");
    }
}

#[test]
fn float_roundtrip_is_bit_exact() {
    for v in [0.0f32, -0.0, 3.5, f32::MAX, f32::INFINITY, f32::NAN] {
        let mut doc = Document::new("root");
        doc.add_float("v", v).unwrap();
        let got = roundtrip(&doc).get_float("v").unwrap();
        assert_eq!(got.to_bits(), v.to_bits(), "value {v}");
    }
}

#[test]
fn string_roundtrip_including_multibyte() {
    for v in ["", "ascii", "κόσμε", "🦀 systems", "mixed κό🦀"] {
        let mut doc = Document::new("root");
        doc.add_str("v", v).unwrap();
        let back = roundtrip(&doc);
        assert_eq!(back.get_str("v"), Some(v), "value {v:?}");
    }
}

#[test]
fn max_length_string_roundtrips_and_over_max_rejected() {
    let max = "x".repeat(MAX_NAME_LEN);
    let mut doc = Document::new("root");
    doc.add_str("v", max.clone()).unwrap();
    assert_eq!(roundtrip(&doc).get_str("v"), Some(max.as_str()));

    let over = "x".repeat(MAX_NAME_LEN + 1);
    let err = Document::new("root").add_str("v", over).unwrap_err();
    assert!(matches!(err, FormatError::StringTooLong { .. }));
}

#[test]
fn sibling_nested_documents_keep_their_paths() {
    let mut root = Document::new("root");

    let mut stats = Document::new("stats");
    stats.add_short("level", 12).unwrap();
    stats.add_double("accuracy", 0.875).unwrap();
    root.add_document(stats).unwrap();

    let mut inventory = Document::new("inventory");
    inventory.add_int("gold", 250).unwrap();
    inventory.add_str("weapon", "halberd").unwrap();
    root.add_document(inventory).unwrap();

    let back = roundtrip(&root);
    let stats = back.get_document("stats").unwrap();
    assert_eq!(stats.get_short("level"), Some(12));
    assert_eq!(stats.get_double("accuracy"), Some(0.875));
    let inventory = back.get_document("inventory").unwrap();
    assert_eq!(inventory.get_int("gold"), Some(250));
    assert_eq!(inventory.get_str("weapon"), Some("halberd"));
    // Fields do not leak across siblings.
    assert_eq!(stats.get_int("gold"), None);
    assert_eq!(inventory.get_short("level"), None);
}

#[test]
fn mixed_scalars_roundtrip_in_one_document() {
    let mut doc = Document::new("root");
    doc.add_byte("b", -5).unwrap();
    doc.add_char("c", b'@').unwrap();
    doc.add_short("s", -300).unwrap();
    doc.add_int("i", 70_000).unwrap();
    doc.add_long("l", -5_000_000_000).unwrap();
    doc.add_float("f", 2.5).unwrap();
    doc.add_double("d", -0.125).unwrap();
    doc.add_str("t", "done").unwrap();

    let back = roundtrip(&doc);
    assert_eq!(back.get_byte("b"), Some(-5));
    assert_eq!(back.get_char("c"), Some(b'@'));
    assert_eq!(back.get_short("s"), Some(-300));
    assert_eq!(back.get_int("i"), Some(70_000));
    assert_eq!(back.get_long("l"), Some(-5_000_000_000));
    assert_eq!(back.get_float("f"), Some(2.5));
    assert_eq!(back.get_double("d"), Some(-0.125));
    assert_eq!(back.get_str("t"), Some("done"));
    assert_eq!(back.len(), 8);
}

proptest! {
    #[test]
    fn prop_int_roundtrip(v in any::<i32>()) {
        let mut doc = Document::new("root");
        doc.add_int("v", v).unwrap();
        prop_assert_eq!(roundtrip(&doc).get_int("v"), Some(v));
    }

    #[test]
    fn prop_long_roundtrip(v in any::<i64>()) {
        let mut doc = Document::new("root");
        doc.add_long("v", v).unwrap();
        prop_assert_eq!(roundtrip(&doc).get_long("v"), Some(v));
    }

    #[test]
    fn prop_double_roundtrip_bit_exact(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        let mut doc = Document::new("root");
        doc.add_double("v", v).unwrap();
        let got = roundtrip(&doc).get_double("v").unwrap();
        prop_assert_eq!(got.to_bits(), bits);
    }

    #[test]
    fn prop_string_roundtrip(v in ".*") {
        prop_assume!(v.len() <= MAX_NAME_LEN);
        let mut doc = Document::new("root");
        doc.add_str("v", v.clone()).unwrap();
        prop_assert_eq!(roundtrip(&doc).get_str("v"), Some(v.as_str()));
    }

    #[test]
    fn prop_encoding_is_deterministic(a in any::<i32>(), b in ".{0,32}") {
        let build = || {
            let mut doc = Document::new("root");
            doc.add_int("a", a).unwrap();
            doc.add_str("b", b.clone()).unwrap();
            doc.to_bytes().unwrap()
        };
        prop_assert_eq!(build(), build());
    }
}
