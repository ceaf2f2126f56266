// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-walking decoder.
//!
//! A [`Decoder`] owns the stream cursor for the duration of one record. It is
//! told where the record's payload ends; framing (record headers, offsets)
//! belongs to the caller. Type names decode through a fixed dispatch order:
//! terminal parsers first (all tags, both byte orders, plus the remainder-
//! consuming `raw` fallback), then the catalog's alias map, then compound
//! descriptors.

use crate::catalog::{ArraySize, ByteOrder, Catalog, ElementKind, Field, FieldKind, Terminal, TypeDescriptor};
use crate::detect::DetectorCatalog;
use crate::error::DecodeError;
use crate::value::{Node, Tree, Value};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use log::trace;
use std::io::{Cursor, Read, Seek};

/// Name of the remainder-consuming blob decoder, and of the detector's
/// zero-match fallback.
pub const RAW_TYPE: &str = "raw";

/// Synthetic type name given to whole-record trees.
pub const RECORD_TYPE: &str = "record";

/// Decodes byte streams into value trees under a shared, read-only catalog.
pub struct Decoder<'a, R> {
    catalog: &'a Catalog,
    detectors: &'a DetectorCatalog,
    stream: R,
    record_end: u64,
}

impl<'a> Decoder<'a, Cursor<&'a [u8]>> {
    /// Decode from an in-memory record payload. The record end offset is the
    /// slice length.
    pub fn from_slice(
        catalog: &'a Catalog,
        detectors: &'a DetectorCatalog,
        payload: &'a [u8],
    ) -> Self {
        Self::new(catalog, detectors, Cursor::new(payload), payload.len() as u64)
    }
}

impl<'a, R: Read + Seek> Decoder<'a, R> {
    /// Create a decoder over a seekable stream. `record_end` is the absolute
    /// offset at which the current record's payload ends.
    pub fn new(
        catalog: &'a Catalog,
        detectors: &'a DetectorCatalog,
        stream: R,
        record_end: u64,
    ) -> Self {
        Self {
            catalog,
            detectors,
            stream,
            record_end,
        }
    }

    /// Current stream offset.
    pub fn position(&mut self) -> Result<u64, DecodeError> {
        Ok(self.stream.stream_position()?)
    }

    /// Consume the decoder, returning the stream.
    pub fn into_stream(self) -> R {
        self.stream
    }

    /// Decode one compound value by walking the descriptor's fields in
    /// declared order.
    pub fn decode_descriptor(&mut self, descriptor: &TypeDescriptor) -> Result<Tree, DecodeError> {
        let mut tree = Tree::new(&descriptor.name);
        for field in &descriptor.fields {
            match self.decode_field(field, &tree) {
                Ok(node) => tree.push(node),
                Err(err) => return Err(err.in_field(&descriptor.name, &field.name, tree)),
            }
        }
        Ok(tree)
    }

    /// Decode a value by type name.
    ///
    /// Dispatch order: terminal parsers (including `<name>_be` wire forms and
    /// `raw`), then alias map, then catalog descriptors. A name matching none
    /// of the three is [`DecodeError::UnknownDecoder`].
    pub fn decode_type(&mut self, name: &str) -> Result<Node, DecodeError> {
        if name == RAW_TYPE {
            let value = self.read_remainder()?;
            return Ok(Node::new(name, value));
        }
        if let Some((terminal, order)) = terminal_dispatch(name) {
            let value = self.read_terminal(terminal, order)?;
            return Ok(Node::new(name, value));
        }
        if let Some(terminal) = self.catalog.resolve_alias(name) {
            let value = self.read_terminal(terminal, ByteOrder::Little)?;
            return Ok(Node::new(name, value));
        }
        match self.catalog.lookup(name) {
            Ok(descriptor) => {
                let descriptor = descriptor.clone();
                let tree = self.decode_descriptor(&descriptor)?;
                Ok(Node::new(name, Value::Tree(tree)))
            }
            Err(_) => Err(DecodeError::UnknownDecoder(name.to_string())),
        }
    }

    /// Decode a whole record: the fixed leading header type, then a detector-
    /// driven loop appending sub-structures until the cursor reaches the
    /// record end offset. Unrecognized spans decode as `raw` blobs.
    pub fn decode_record(&mut self, header_type: &str) -> Result<Tree, DecodeError> {
        let mut record = Tree::new(RECORD_TYPE);
        record.push(self.decode_type(header_type)?);

        while self.position()? < self.record_end {
            let next = match record.nodes().last().map(Node::value) {
                Some(Value::Tree(tree)) => self.detectors.detect(tree)?,
                _ => None,
            };
            let name = next.unwrap_or(RAW_TYPE).to_string();
            trace!("detected next type `{name}`");
            let node = self.decode_type(&name)?;
            record.push(node);
        }
        Ok(record)
    }

    fn decode_field(&mut self, field: &Field, decoded: &Tree) -> Result<Node, DecodeError> {
        let value = match &field.kind {
            FieldKind::Terminal(terminal) => self.read_terminal(*terminal, field.byte_order)?,
            FieldKind::Nested(name) => self.decode_nested(name, field.byte_order)?,
            FieldKind::Skip { count, .. } => Value::Bytes(self.read_exact(*count)?),
            FieldKind::Array { size, element } => {
                let count = self.resolve_array_size(size, decoded)?;
                self.decode_array(count, element, field.byte_order)?
            }
        };
        Ok(Node::new(&field.name, value).with_format(field.format))
    }

    /// Decode a nested reference. Alias resolution is attempted first — a
    /// schema author may declare an alias in a source loaded after the first
    /// use, so resolution cannot happen only at load time.
    fn decode_nested(&mut self, name: &str, order: ByteOrder) -> Result<Value, DecodeError> {
        if let Some(terminal) = self.catalog.resolve_alias(name) {
            return self.read_terminal(terminal, order);
        }
        let descriptor = self
            .catalog
            .lookup(name)
            .map_err(|_| DecodeError::UnknownNestedType(name.to_string()))?
            .clone();
        Ok(Value::Tree(self.decode_descriptor(&descriptor)?))
    }

    /// Resolve an array's element count, consulting already-decoded siblings
    /// for field-named sizes.
    fn resolve_array_size(&self, size: &ArraySize, decoded: &Tree) -> Result<usize, DecodeError> {
        match size {
            ArraySize::Fixed(n) => Ok(*n),
            ArraySize::Field(name) => {
                let node = decoded
                    .get(name)
                    .ok_or_else(|| DecodeError::SizeFieldNotFound(name.clone()))?;
                node.value().as_count().ok_or_else(|| DecodeError::SizeParse {
                    field: name.clone(),
                    value: node.value().to_string(),
                })
            }
        }
    }

    fn decode_array(
        &mut self,
        count: usize,
        element: &ElementKind,
        order: ByteOrder,
    ) -> Result<Value, DecodeError> {
        match element {
            ElementKind::Terminal(terminal) => {
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_terminal(*terminal, order)?);
                }
                Ok(Value::Array(items))
            }
            ElementKind::Nested(name) => {
                if let Some(terminal) = self.catalog.resolve_alias(name) {
                    let mut items = Vec::with_capacity(count);
                    for _ in 0..count {
                        items.push(self.read_terminal(terminal, order)?);
                    }
                    return Ok(Value::Array(items));
                }
                let descriptor = self
                    .catalog
                    .lookup(name)
                    .map_err(|_| DecodeError::UnknownNestedType(name.to_string()))?
                    .clone();
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.decode_descriptor(&descriptor)?);
                }
                Ok(Value::TreeArray(items))
            }
        }
    }

    fn read_terminal(&mut self, terminal: Terminal, order: ByteOrder) -> Result<Value, DecodeError> {
        let r = &mut self.stream;
        let value = match (terminal, order) {
            (Terminal::I8, _) => Value::I8(r.read_i8()?),
            (Terminal::U8, _) => Value::U8(r.read_u8()?),
            (Terminal::I16, ByteOrder::Little) => Value::I16(r.read_i16::<LittleEndian>()?),
            (Terminal::I16, ByteOrder::Big) => Value::I16Be(r.read_i16::<BigEndian>()?),
            (Terminal::I32, ByteOrder::Little) => Value::I32(r.read_i32::<LittleEndian>()?),
            (Terminal::I32, ByteOrder::Big) => Value::I32Be(r.read_i32::<BigEndian>()?),
            (Terminal::I64, ByteOrder::Little) => Value::I64(r.read_i64::<LittleEndian>()?),
            (Terminal::I64, ByteOrder::Big) => Value::I64Be(r.read_i64::<BigEndian>()?),
            (Terminal::U16, ByteOrder::Little) => Value::U16(r.read_u16::<LittleEndian>()?),
            (Terminal::U16, ByteOrder::Big) => Value::U16Be(r.read_u16::<BigEndian>()?),
            (Terminal::U32, ByteOrder::Little) => Value::U32(r.read_u32::<LittleEndian>()?),
            (Terminal::U32, ByteOrder::Big) => Value::U32Be(r.read_u32::<BigEndian>()?),
            (Terminal::U64, ByteOrder::Little) => Value::U64(r.read_u64::<LittleEndian>()?),
            (Terminal::U64, ByteOrder::Big) => Value::U64Be(r.read_u64::<BigEndian>()?),
            (Terminal::F32, ByteOrder::Little) => Value::F32(r.read_f32::<LittleEndian>()?),
            (Terminal::F32, ByteOrder::Big) => Value::F32Be(r.read_f32::<BigEndian>()?),
            (Terminal::F64, ByteOrder::Little) => Value::F64(r.read_f64::<LittleEndian>()?),
            (Terminal::F64, ByteOrder::Big) => Value::F64Be(r.read_f64::<BigEndian>()?),
        };
        Ok(value)
    }

    fn read_exact(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        let mut buf = vec![0u8; count];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Consume everything up to the record end offset as an undecoded blob.
    fn read_remainder(&mut self) -> Result<Value, DecodeError> {
        let position = self.position()?;
        let remaining = self.record_end.saturating_sub(position) as usize;
        Ok(Value::Bytes(self.read_exact(remaining)?))
    }
}

/// The terminal half of the name dispatch table: every tag in native order
/// plus its `_be` wire form.
fn terminal_dispatch(name: &str) -> Option<(Terminal, ByteOrder)> {
    if let Some(base) = name.strip_suffix("_be") {
        return Terminal::from_name(base).map(|t| (t, ByteOrder::Big));
    }
    Terminal::from_name(name).map(|t| (t, ByteOrder::Little))
}
