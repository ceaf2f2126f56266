// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end decode/encode flow: TOML schema sources in, detector-driven
//! record decoding, byte-exact re-encoding out.

use plog::{Decoder, Encoder, SchemaLoader, Value, RECORD_TYPE};

const SCHEMA: &str = r#"
source_guid = "uint64"

[msg_header]
description = [
  { name = "msg_type", type = "uint32" },
  { name = "src", type = "source_guid", format = "hex" },
]
detector = [
  { name = "byte_array_msg", msg_type = "0x10" },
  { name = "status_msg", msg_type = "32" },
]

[byte_array_msg]
description = [
  { name = "points", type = "uint16" },
  { name = "data", type = "uint8", count = "points" },
]

[status_msg]
description = [
  { name = "code", type = "uint8" },
  { skip = 2 },
  { name = "uptime", type = "uint32", endian = true },
]
"#;

fn load_schema() -> (plog::Catalog, plog::DetectorCatalog) {
    let table = SCHEMA.parse::<toml::Table>().expect("valid schema toml");
    let mut loader = SchemaLoader::new();
    loader.add_source(&table).expect("pass one");
    loader.finish().expect("pass two")
}

#[test]
fn detector_driven_record_with_raw_tail() {
    let (catalog, detectors) = load_schema();

    let payload: Vec<u8> = [
        // msg_header: msg_type=0x10, src=0xABCD
        &[0x10, 0x00, 0x00, 0x00][..],
        &[0xcd, 0xab, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00][..],
        // byte_array_msg: points=3, data=[2,3,4]
        &[0x03, 0x00, 0x02, 0x03, 0x04][..],
        // nothing matches byte_array_msg: raw tail
        &[0xde, 0xad][..],
    ]
    .concat();

    let mut decoder = Decoder::from_slice(&catalog, &detectors, &payload);
    let record = decoder.decode_record("msg_header").expect("decode record");

    assert_eq!(record.type_name(), RECORD_TYPE);
    assert_eq!(record.len(), 3);

    let header = record.nodes()[0].value().as_tree().expect("header tree");
    assert_eq!(header.value_of("msg_type"), Some(&Value::U32(0x10)));
    assert_eq!(header.get("src").expect("src").render(), "0xabcd");

    let body = record.nodes()[1].value().as_tree().expect("body tree");
    assert_eq!(body.type_name(), "byte_array_msg");
    assert_eq!(body.value_of("points"), Some(&Value::U16(3)));

    assert_eq!(
        record.nodes()[2].value(),
        &Value::Bytes(vec![0xde, 0xad])
    );

    // The whole record re-encodes to the original payload.
    let encoder = Encoder::new(&catalog);
    assert_eq!(encoder.encode_record(&record).expect("encode"), payload);
}

#[test]
fn big_endian_and_skip_survive_round_trip() {
    let (catalog, detectors) = load_schema();

    let payload: Vec<u8> = [
        // msg_header: msg_type=32 -> status_msg
        &[0x20, 0x00, 0x00, 0x00][..],
        &[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00][..],
        // status_msg: code=7, padding CA FE, uptime big-endian 0x00000102
        &[0x07, 0xca, 0xfe, 0x00, 0x00, 0x01, 0x02][..],
    ]
    .concat();

    let mut decoder = Decoder::from_slice(&catalog, &detectors, &payload);
    let record = decoder.decode_record("msg_header").expect("decode record");

    let status = record.nodes()[1].value().as_tree().expect("status tree");
    assert_eq!(status.value_of("code"), Some(&Value::U8(7)));
    assert_eq!(
        status.value_of("skip-1"),
        Some(&Value::Bytes(vec![0xca, 0xfe]))
    );
    assert_eq!(status.value_of("uptime"), Some(&Value::U32Be(0x0102)));

    let encoder = Encoder::new(&catalog);
    assert_eq!(encoder.encode_record(&record).expect("encode"), payload);
}

#[test]
fn byte_order_symmetry_for_every_terminal() {
    use plog::{Catalog, DetectorCatalog, Field, FieldKind, Terminal, Tree, TypeDescriptor};

    let fields = Terminal::ALL
        .iter()
        .map(|t| Field::new(t.name(), FieldKind::Terminal(*t)).big_endian())
        .collect();
    let mut catalog = Catalog::new();
    catalog
        .register(TypeDescriptor::new("all_be", fields))
        .expect("register");
    let descriptor = catalog.lookup("all_be").expect("lookup").clone();

    let mut tree = Tree::new("all_be");
    tree.push_value("int8", Value::I8(-1));
    tree.push_value("int16", Value::I16(-2));
    tree.push_value("int32", Value::I32(-3));
    tree.push_value("int64", Value::I64(-4));
    tree.push_value("uint8", Value::U8(5));
    tree.push_value("uint16", Value::U16(6));
    tree.push_value("uint32", Value::U32(7));
    tree.push_value("uint64", Value::U64(8));
    tree.push_value("float32", Value::F32(9.5));
    tree.push_value("float64", Value::F64(-10.25));

    let encoder = Encoder::new(&catalog);
    let bytes = encoder.encode(&tree, &descriptor).expect("encode");

    let detectors = DetectorCatalog::new();
    let mut decoder = Decoder::from_slice(&catalog, &detectors, &bytes);
    let decoded = decoder.decode_descriptor(&descriptor).expect("decode");

    // Decoding a big-endian field yields the original native value under the
    // big-endian tag; canonical comparison sees them as equal.
    assert_eq!(decoded.value_of("int32"), Some(&Value::I32Be(-3)));
    assert_eq!(decoded.value_of("float32"), Some(&Value::F32Be(9.5)));
    assert!(decoded.content_eq(&tree));
}

#[test]
fn decode_after_encode_preserves_content() {
    let (catalog, detectors) = load_schema();
    let encoder = Encoder::new(&catalog);

    // Hand-built tree, nodes out of descriptor order.
    let mut body = plog::Tree::new("byte_array_msg");
    body.push_value(
        "data",
        Value::Array(vec![Value::U8(9), Value::U8(8), Value::U8(7)]),
    );
    body.push_value("points", Value::U16(3));

    let descriptor = catalog.lookup("byte_array_msg").expect("lookup").clone();
    let bytes = encoder.encode(&body, &descriptor).expect("encode");
    assert_eq!(bytes, [0x03, 0x00, 0x09, 0x08, 0x07]);

    let mut decoder = Decoder::from_slice(&catalog, &detectors, &bytes);
    let decoded = decoder.decode_descriptor(&descriptor).expect("decode");
    assert!(decoded.content_eq(&body));
}
