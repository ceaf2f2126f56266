// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Descriptor-driven encoder, the exact inverse of the decoder.
//!
//! Fields are written in descriptor order with nodes looked up by name, so a
//! tree whose nodes were built (or decoded) in a different order still
//! serializes to identical bytes. Nodes the descriptor does not describe fall
//! under the schema-evolution policy: nested trees and raw blobs are appended
//! after the described fields, bare terminal scalars are dropped.

use crate::catalog::{ArraySize, ByteOrder, Catalog, ElementKind, Field, FieldKind, Terminal, TypeDescriptor};
use crate::error::EncodeError;
use crate::value::{Node, Tree, Value};
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use log::debug;
use std::io::Write;

/// Re-serializes value trees under a shared, read-only catalog.
pub struct Encoder<'a> {
    catalog: &'a Catalog,
}

impl<'a> Encoder<'a> {
    /// Create an encoder. By encode time the catalog must be complete:
    /// nested references that were lazily tolerated at load time are hard
    /// errors here.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Encode a tree against a descriptor into a fresh buffer.
    pub fn encode(&self, tree: &Tree, descriptor: &TypeDescriptor) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        self.encode_into(tree, descriptor, &mut buf)?;
        Ok(buf)
    }

    /// Encode a tree against the descriptor registered under the tree's own
    /// type name.
    pub fn encode_by_name(&self, tree: &Tree) -> Result<Vec<u8>, EncodeError> {
        let descriptor = self
            .catalog
            .lookup(tree.type_name())
            .map_err(|_| EncodeError::UnknownNestedType(tree.type_name().to_string()))?
            .clone();
        self.encode(tree, &descriptor)
    }

    /// Inverse of `Decoder::decode_record`: serialize a whole-record tree by
    /// encoding each child under its own identity — sub-trees against the
    /// descriptor their type name selects, blobs verbatim, scalars by their
    /// value tag (which fully determines the wire form).
    pub fn encode_record(&self, record: &Tree) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        for node in record.nodes() {
            match node.value() {
                Value::Tree(tree) => {
                    let descriptor = self
                        .catalog
                        .lookup(tree.type_name())
                        .map_err(|_| EncodeError::UnknownNestedType(tree.type_name().to_string()))?
                        .clone();
                    self.encode_into(tree, &descriptor, &mut buf)?;
                }
                Value::Bytes(bytes) => buf.extend_from_slice(bytes),
                scalar => write_by_tag(&mut buf, scalar).map_err(|e| e.named(node.name()))?,
            }
        }
        Ok(buf)
    }

    /// Encode a tree against a descriptor into a writer.
    pub fn encode_into<W: Write>(
        &self,
        tree: &Tree,
        descriptor: &TypeDescriptor,
        writer: &mut W,
    ) -> Result<(), EncodeError> {
        for field in &descriptor.fields {
            self.encode_field(tree, field, writer)
                .map_err(|e| e.in_field(&descriptor.name, &field.name))?;
        }
        self.encode_undescribed(tree, descriptor, writer)
    }

    fn encode_field<W: Write>(
        &self,
        tree: &Tree,
        field: &Field,
        writer: &mut W,
    ) -> Result<(), EncodeError> {
        let node = tree.get(&field.name);
        match &field.kind {
            FieldKind::Skip { count, .. } => {
                // Padding is bit-reproduced from the decoded bytes, never
                // regenerated. A hand-built tree may omit it; zero-fill then.
                match node {
                    Some(n) => match n.value() {
                        Value::Bytes(bytes) => writer.write_all(bytes)?,
                        other => {
                            return Err(EncodeError::TypeMismatch {
                                field: field.name.clone(),
                                expected: "bytes",
                                found: other.kind_name(),
                            })
                        }
                    },
                    None => writer.write_all(&vec![0u8; *count])?,
                }
                Ok(())
            }
            FieldKind::Terminal(terminal) => {
                let node = node.ok_or_else(|| EncodeError::FieldNotFound(field.name.clone()))?;
                write_terminal(writer, *terminal, field.byte_order, node.value())
                    .map_err(|e| e.named(&field.name))
            }
            FieldKind::Nested(name) => {
                let node = node.ok_or_else(|| EncodeError::FieldNotFound(field.name.clone()))?;
                if let Some(terminal) = self.catalog.resolve_alias(name) {
                    return write_terminal(writer, terminal, field.byte_order, node.value())
                        .map_err(|e| e.named(&field.name));
                }
                let descriptor = self
                    .catalog
                    .lookup(name)
                    .map_err(|_| EncodeError::UnknownNestedType(name.clone()))?
                    .clone();
                match node.value() {
                    Value::Tree(inner) => self.encode_into(inner, &descriptor, writer),
                    other => Err(EncodeError::TypeMismatch {
                        field: field.name.clone(),
                        expected: "tree",
                        found: other.kind_name(),
                    }),
                }
            }
            FieldKind::Array { size, element } => {
                let node = node.ok_or_else(|| EncodeError::FieldNotFound(field.name.clone()))?;
                let expected = self.resolve_array_size(size, tree)?;
                self.encode_array(node, expected, element, field.byte_order, writer)
            }
        }
    }

    /// Element count for an array field, from the fixed size or the sibling
    /// node, through the same width-agnostic integer parse the decoder uses.
    fn resolve_array_size(&self, size: &ArraySize, tree: &Tree) -> Result<usize, EncodeError> {
        match size {
            ArraySize::Fixed(n) => Ok(*n),
            ArraySize::Field(name) => {
                let node = tree
                    .get(name)
                    .ok_or_else(|| EncodeError::FieldNotFound(name.clone()))?;
                node.value().as_count().ok_or_else(|| EncodeError::SizeParse {
                    field: name.clone(),
                    value: node.value().to_string(),
                })
            }
        }
    }

    fn encode_array<W: Write>(
        &self,
        node: &Node,
        expected: usize,
        element: &ElementKind,
        order: ByteOrder,
        writer: &mut W,
    ) -> Result<(), EncodeError> {
        let terminal_element = match element {
            ElementKind::Terminal(t) => Some(*t),
            ElementKind::Nested(name) => self.catalog.resolve_alias(name),
        };
        match (node.value(), terminal_element) {
            (Value::Array(items), Some(terminal)) => {
                if items.len() != expected {
                    return Err(EncodeError::ArraySizeMismatch {
                        field: node.name().to_string(),
                        expected,
                        actual: items.len(),
                    });
                }
                for (index, item) in items.iter().enumerate() {
                    write_terminal(writer, terminal, order, item)
                        .map_err(|e| e.element(node.name(), index, terminal.name()))?;
                }
                Ok(())
            }
            (Value::TreeArray(items), None) => {
                let ElementKind::Nested(name) = element else {
                    unreachable!("tree arrays only arise from nested elements");
                };
                if items.len() != expected {
                    return Err(EncodeError::ArraySizeMismatch {
                        field: node.name().to_string(),
                        expected,
                        actual: items.len(),
                    });
                }
                let descriptor = self
                    .catalog
                    .lookup(name)
                    .map_err(|_| EncodeError::UnknownNestedType(name.clone()))?
                    .clone();
                for item in items {
                    self.encode_into(item, &descriptor, writer)?;
                }
                Ok(())
            }
            (other, _) => Err(EncodeError::TypeMismatch {
                field: node.name().to_string(),
                expected: if terminal_element.is_some() {
                    "array"
                } else {
                    "tree array"
                },
                found: other.kind_name(),
            }),
        }
    }

    /// Schema-evolution pass over nodes the descriptor does not name:
    /// structurally significant content (trees, tree sequences, raw blobs)
    /// is appended in tree order; bare terminal scalars are dropped.
    fn encode_undescribed<W: Write>(
        &self,
        tree: &Tree,
        descriptor: &TypeDescriptor,
        writer: &mut W,
    ) -> Result<(), EncodeError> {
        for node in tree.nodes() {
            if descriptor.describes(node.name()) {
                continue;
            }
            match node.value() {
                Value::Tree(inner) => {
                    let nested = self
                        .catalog
                        .lookup(inner.type_name())
                        .map_err(|_| EncodeError::UnknownNestedType(inner.type_name().to_string()))?
                        .clone();
                    self.encode_into(inner, &nested, writer)?;
                }
                Value::TreeArray(items) => {
                    for item in items {
                        let nested = self
                            .catalog
                            .lookup(item.type_name())
                            .map_err(|_| {
                                EncodeError::UnknownNestedType(item.type_name().to_string())
                            })?
                            .clone();
                        self.encode_into(item, &nested, writer)?;
                    }
                }
                Value::Bytes(bytes) => writer.write_all(bytes)?,
                other => {
                    debug!(
                        "dropping undescribed terminal `{}` ({}) while encoding `{}`",
                        node.name(),
                        other.kind_name(),
                        descriptor.name
                    );
                }
            }
        }
        Ok(())
    }
}

/// Write one scalar in the field's byte order. The value tag must carry the
/// field's exact terminal width; only the endianness tag is free to differ
/// (the field's byte order decides the wire form either way).
fn write_terminal<W: Write>(
    writer: &mut W,
    terminal: Terminal,
    order: ByteOrder,
    value: &Value,
) -> Result<(), TerminalWriteError> {
    macro_rules! put {
        ($write:ident, $v:expr) => {
            match order {
                ByteOrder::Little => writer.$write::<LittleEndian>($v),
                ByteOrder::Big => writer.$write::<BigEndian>($v),
            }
        };
    }
    let result = match (terminal, value) {
        (Terminal::I8, Value::I8(v)) => writer.write_i8(*v),
        (Terminal::U8, Value::U8(v)) => writer.write_u8(*v),
        (Terminal::I16, Value::I16(v) | Value::I16Be(v)) => put!(write_i16, *v),
        (Terminal::I32, Value::I32(v) | Value::I32Be(v)) => put!(write_i32, *v),
        (Terminal::I64, Value::I64(v) | Value::I64Be(v)) => put!(write_i64, *v),
        (Terminal::U16, Value::U16(v) | Value::U16Be(v)) => put!(write_u16, *v),
        (Terminal::U32, Value::U32(v) | Value::U32Be(v)) => put!(write_u32, *v),
        (Terminal::U64, Value::U64(v) | Value::U64Be(v)) => put!(write_u64, *v),
        (Terminal::F32, Value::F32(v) | Value::F32Be(v)) => put!(write_f32, *v),
        (Terminal::F64, Value::F64(v) | Value::F64Be(v)) => put!(write_f64, *v),
        (_, other) => {
            return Err(TerminalWriteError::Mismatch {
                expected: terminal.name(),
                found: other.kind_name(),
            })
        }
    };
    result.map_err(TerminalWriteError::Io)
}

/// Write one scalar purely from its value tag: native tags in little-endian
/// wire order, `*Be` tags in big-endian.
fn write_by_tag<W: Write>(writer: &mut W, value: &Value) -> Result<(), TerminalWriteError> {
    let result = match value {
        Value::I8(v) => writer.write_i8(*v),
        Value::U8(v) => writer.write_u8(*v),
        Value::I16(v) => writer.write_i16::<LittleEndian>(*v),
        Value::I32(v) => writer.write_i32::<LittleEndian>(*v),
        Value::I64(v) => writer.write_i64::<LittleEndian>(*v),
        Value::U16(v) => writer.write_u16::<LittleEndian>(*v),
        Value::U32(v) => writer.write_u32::<LittleEndian>(*v),
        Value::U64(v) => writer.write_u64::<LittleEndian>(*v),
        Value::F32(v) => writer.write_f32::<LittleEndian>(*v),
        Value::F64(v) => writer.write_f64::<LittleEndian>(*v),
        Value::I16Be(v) => writer.write_i16::<BigEndian>(*v),
        Value::I32Be(v) => writer.write_i32::<BigEndian>(*v),
        Value::I64Be(v) => writer.write_i64::<BigEndian>(*v),
        Value::U16Be(v) => writer.write_u16::<BigEndian>(*v),
        Value::U32Be(v) => writer.write_u32::<BigEndian>(*v),
        Value::U64Be(v) => writer.write_u64::<BigEndian>(*v),
        Value::F32Be(v) => writer.write_f32::<BigEndian>(*v),
        Value::F64Be(v) => writer.write_f64::<BigEndian>(*v),
        Value::Array(items) => {
            for item in items {
                write_by_tag(writer, item)?;
            }
            return Ok(());
        }
        Value::Tree(_) | Value::TreeArray(_) | Value::Bytes(_) => {
            return Err(TerminalWriteError::Mismatch {
                expected: "terminal value",
                found: value.kind_name(),
            })
        }
    };
    result.map_err(TerminalWriteError::Io)
}

/// Internal carrier so the field and array paths can map a mismatch onto
/// their own error variants while io failures stay io failures.
enum TerminalWriteError {
    Io(std::io::Error),
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl TerminalWriteError {
    fn named(self, field: &str) -> EncodeError {
        match self {
            Self::Io(e) => EncodeError::Write(e),
            Self::Mismatch { expected, found } => EncodeError::TypeMismatch {
                field: field.to_string(),
                expected,
                found,
            },
        }
    }

    fn element(self, field: &str, index: usize, expected: &'static str) -> EncodeError {
        match self {
            Self::Io(e) => EncodeError::Write(e),
            Self::Mismatch { .. } => EncodeError::ArrayElementTypeMismatch {
                field: field.to_string(),
                index,
                expected,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeDescriptor;
    use crate::codec::Decoder;
    use crate::detect::DetectorCatalog;

    fn byte_array_msg_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .register(TypeDescriptor::new(
                "ps_byte_array_msg",
                vec![
                    Field::new("dest_guid", FieldKind::Terminal(Terminal::U64)),
                    Field::new("data_type", FieldKind::Terminal(Terminal::U32)),
                    Field::new("payload", FieldKind::Terminal(Terminal::U32)),
                ],
            ))
            .expect("register");
        catalog
    }

    #[test]
    fn test_concrete_byte_layout_regardless_of_tree_order() {
        let catalog = byte_array_msg_catalog();
        let encoder = Encoder::new(&catalog);

        // Nodes deliberately out of declaration order.
        let mut tree = Tree::new("ps_byte_array_msg");
        tree.push_value("payload", Value::U32(3));
        tree.push_value("dest_guid", Value::U64(1));
        tree.push_value("data_type", Value::U32(2));

        let bytes = encoder.encode_by_name(&tree).expect("encode");
        assert_eq!(
            bytes,
            [
                0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // dest_guid
                0x02, 0x00, 0x00, 0x00, // data_type
                0x03, 0x00, 0x00, 0x00, // payload
            ]
        );
    }

    #[test]
    fn test_round_trip_restores_wire_order() {
        let catalog = byte_array_msg_catalog();
        let encoder = Encoder::new(&catalog);
        let detectors = DetectorCatalog::new();

        let mut tree = Tree::new("ps_byte_array_msg");
        tree.push_value("data_type", Value::U32(2));
        tree.push_value("payload", Value::U32(3));
        tree.push_value("dest_guid", Value::U64(1));

        let bytes = encoder.encode_by_name(&tree).expect("encode");
        let mut decoder = Decoder::from_slice(&catalog, &detectors, &bytes);
        let decoded = decoder
            .decode_descriptor(&catalog.lookup("ps_byte_array_msg").expect("lookup").clone())
            .expect("decode");

        assert!(decoded.content_eq(&tree));
        // Decoded order is descriptor order.
        assert_eq!(decoded.nodes()[0].name(), "dest_guid");
    }

    #[test]
    fn test_big_endian_symmetry() {
        let mut catalog = Catalog::new();
        catalog
            .register(TypeDescriptor::new(
                "net",
                vec![
                    Field::new("seq", FieldKind::Terminal(Terminal::U32)).big_endian(),
                    Field::new("temp", FieldKind::Terminal(Terminal::F64)).big_endian(),
                ],
            ))
            .expect("register");
        let encoder = Encoder::new(&catalog);
        let detectors = DetectorCatalog::new();

        let mut tree = Tree::new("net");
        tree.push_value("seq", Value::U32Be(0x0102_0304));
        tree.push_value("temp", Value::F64Be(-2.5));

        let bytes = encoder.encode_by_name(&tree).expect("encode");
        assert_eq!(&bytes[..4], &[0x01, 0x02, 0x03, 0x04]);

        let mut decoder = Decoder::from_slice(&catalog, &detectors, &bytes);
        let decoded = decoder
            .decode_descriptor(&catalog.lookup("net").expect("lookup").clone())
            .expect("decode");
        assert_eq!(decoded.value_of("seq"), Some(&Value::U32Be(0x0102_0304)));
        assert_eq!(decoded.value_of("temp"), Some(&Value::F64Be(-2.5)));

        // A native-tagged value in a big-endian field still writes BE bytes.
        let mut native = Tree::new("net");
        native.push_value("seq", Value::U32(0x0102_0304));
        native.push_value("temp", Value::F64(-2.5));
        assert_eq!(encoder.encode_by_name(&native).expect("encode"), bytes);
    }

    #[test]
    fn test_skip_fidelity() {
        let mut catalog = Catalog::new();
        catalog
            .register(TypeDescriptor::new(
                "padded",
                vec![
                    Field::new("id", FieldKind::Terminal(Terminal::U8)),
                    Field::skip(3, 1),
                ],
            ))
            .expect("register");
        let encoder = Encoder::new(&catalog);
        let detectors = DetectorCatalog::new();

        let wire = [0x09, 0xca, 0xfe, 0x42];
        let mut decoder = Decoder::from_slice(&catalog, &detectors, &wire);
        let tree = decoder
            .decode_descriptor(&catalog.lookup("padded").expect("lookup").clone())
            .expect("decode");

        let bytes = encoder.encode_by_name(&tree).expect("encode");
        assert_eq!(bytes, wire);

        // Omitted padding zero-fills.
        let mut bare = Tree::new("padded");
        bare.push_value("id", Value::U8(9));
        assert_eq!(
            encoder.encode_by_name(&bare).expect("encode"),
            [0x09, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_sibling_sized_array_round_trip() {
        let mut catalog = Catalog::new();
        catalog
            .register(TypeDescriptor::new(
                "samples",
                vec![
                    Field::new("points", FieldKind::Terminal(Terminal::U16)),
                    Field::new(
                        "data",
                        FieldKind::Array {
                            size: ArraySize::Field("points".into()),
                            element: ElementKind::Terminal(Terminal::U8),
                        },
                    ),
                ],
            ))
            .expect("register");
        let encoder = Encoder::new(&catalog);

        let mut tree = Tree::new("samples");
        tree.push_value("points", Value::U16(3));
        tree.push_value(
            "data",
            Value::Array(vec![Value::U8(2), Value::U8(3), Value::U8(4)]),
        );

        assert_eq!(
            encoder.encode_by_name(&tree).expect("encode"),
            [0x03, 0x00, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn test_array_size_mismatch() {
        let mut catalog = Catalog::new();
        catalog
            .register(TypeDescriptor::new(
                "samples",
                vec![
                    Field::new("points", FieldKind::Terminal(Terminal::U16)),
                    Field::new(
                        "data",
                        FieldKind::Array {
                            size: ArraySize::Field("points".into()),
                            element: ElementKind::Terminal(Terminal::U8),
                        },
                    ),
                ],
            ))
            .expect("register");
        let encoder = Encoder::new(&catalog);

        let mut tree = Tree::new("samples");
        tree.push_value("points", Value::U16(5));
        tree.push_value("data", Value::Array(vec![Value::U8(1)]));

        let err = encoder.encode_by_name(&tree).expect_err("must fail");
        let EncodeError::Field { source, .. } = err else {
            panic!("expected context frame");
        };
        assert!(matches!(
            *source,
            EncodeError::ArraySizeMismatch {
                expected: 5,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_array_element_type_mismatch() {
        let mut catalog = Catalog::new();
        catalog
            .register(TypeDescriptor::new(
                "samples",
                vec![Field::new(
                    "data",
                    FieldKind::Array {
                        size: ArraySize::Fixed(2),
                        element: ElementKind::Terminal(Terminal::U8),
                    },
                )],
            ))
            .expect("register");
        let encoder = Encoder::new(&catalog);

        let mut tree = Tree::new("samples");
        tree.push_value("data", Value::Array(vec![Value::U8(1), Value::U32(2)]));

        let err = encoder.encode_by_name(&tree).expect_err("must fail");
        let EncodeError::Field { source, .. } = err else {
            panic!("expected context frame");
        };
        assert!(matches!(
            *source,
            EncodeError::ArrayElementTypeMismatch { index: 1, .. }
        ));
    }

    #[test]
    fn test_missing_field_fails() {
        let catalog = byte_array_msg_catalog();
        let encoder = Encoder::new(&catalog);

        let mut tree = Tree::new("ps_byte_array_msg");
        tree.push_value("dest_guid", Value::U64(1));

        let err = encoder.encode_by_name(&tree).expect_err("must fail");
        let EncodeError::Field { field, source, .. } = err else {
            panic!("expected context frame");
        };
        assert_eq!(field, "data_type");
        assert!(matches!(*source, EncodeError::FieldNotFound(_)));
    }

    #[test]
    fn test_schema_evolution_appends_trees_and_drops_scalars() {
        let mut catalog = Catalog::new();
        catalog
            .register(TypeDescriptor::new(
                "v1",
                vec![Field::new("id", FieldKind::Terminal(Terminal::U8))],
            ))
            .expect("register v1");
        catalog
            .register(TypeDescriptor::new(
                "extra",
                vec![Field::new("x", FieldKind::Terminal(Terminal::U8))],
            ))
            .expect("register extra");
        let encoder = Encoder::new(&catalog);

        // Tree produced by a newer schema: one undeclared nested child, one
        // undeclared scalar, one undeclared blob.
        let mut child = Tree::new("extra");
        child.push_value("x", Value::U8(0xee));

        let mut tree = Tree::new("v1");
        tree.push_value("id", Value::U8(1));
        tree.push_value("new_counter", Value::U32(7));
        tree.push_value("annex", Value::Tree(child));
        tree.push_value("trailer", Value::Bytes(vec![0xaa, 0xbb]));

        let bytes = encoder.encode_by_name(&tree).expect("encode");
        // id, then appended annex and trailer; the scalar is dropped.
        assert_eq!(bytes, [0x01, 0xee, 0xaa, 0xbb]);

        // A tree without the undeclared scalar encodes identically.
        let mut plain = Tree::new("v1");
        plain.push_value("id", Value::U8(1));
        let mut child2 = Tree::new("extra");
        child2.push_value("x", Value::U8(0xee));
        plain.push_value("annex", Value::Tree(child2));
        plain.push_value("trailer", Value::Bytes(vec![0xaa, 0xbb]));
        assert_eq!(encoder.encode_by_name(&plain).expect("encode"), bytes);
    }

    #[test]
    fn test_unknown_nested_type_is_error_on_encode() {
        let catalog = Catalog::new();
        let encoder = Encoder::new(&catalog);
        let descriptor = TypeDescriptor::new(
            "outer",
            vec![Field::new("inner", FieldKind::Nested("ghost".into()))],
        );

        let mut tree = Tree::new("outer");
        tree.push_value("inner", Value::Tree(Tree::new("ghost")));

        let err = encoder.encode(&tree, &descriptor).expect_err("must fail");
        let EncodeError::Field { source, .. } = err else {
            panic!("expected context frame");
        };
        assert!(matches!(*source, EncodeError::UnknownNestedType(_)));
    }
}
