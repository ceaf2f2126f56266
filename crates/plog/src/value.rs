// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoded value model: tagged values, named nodes, ordered trees.
//!
//! Every decoded record is a [`Tree`] of [`Node`]s. A node owns exactly one
//! [`Value`]; nodes are appended during decoding and never mutated afterwards.
//! The value tag fully determines the wire encoding, so a big-endian scalar is
//! its own variant even though it stores the native machine value.

use std::fmt;

/// A single decoded value.
///
/// Scalar variants tagged `*Be` were read from (and will be written back in)
/// big-endian wire order; the stored value is always native.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Nested compound value.
    Tree(Tree),
    /// Undecoded payload, reproduced verbatim on encode.
    Bytes(Vec<u8>),

    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),

    I16Be(i16),
    I32Be(i32),
    I64Be(i64),
    U16Be(u16),
    U32Be(u32),
    U64Be(u64),
    F32Be(f32),
    F64Be(f64),

    /// Homogeneous sequence of terminal values.
    Array(Vec<Value>),
    /// Homogeneous sequence of sub-trees.
    TreeArray(Vec<Tree>),
}

impl Value {
    /// Short tag name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Tree(_) => "tree",
            Self::Bytes(_) => "bytes",
            Self::I8(_) => "int8",
            Self::I16(_) | Self::I16Be(_) => "int16",
            Self::I32(_) | Self::I32Be(_) => "int32",
            Self::I64(_) | Self::I64Be(_) => "int64",
            Self::U8(_) => "uint8",
            Self::U16(_) | Self::U16Be(_) => "uint16",
            Self::U32(_) | Self::U32Be(_) => "uint32",
            Self::U64(_) | Self::U64Be(_) => "uint64",
            Self::F32(_) | Self::F32Be(_) => "float32",
            Self::F64(_) | Self::F64Be(_) => "float64",
            Self::Array(_) => "array",
            Self::TreeArray(_) => "tree array",
        }
    }

    /// Canonical integer view, independent of width, signedness tag and
    /// byte order. `None` for floats, bytes, trees and sequences.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::I8(v) => Some(i128::from(*v)),
            Self::I16(v) | Self::I16Be(v) => Some(i128::from(*v)),
            Self::I32(v) | Self::I32Be(v) => Some(i128::from(*v)),
            Self::I64(v) | Self::I64Be(v) => Some(i128::from(*v)),
            Self::U8(v) => Some(i128::from(*v)),
            Self::U16(v) | Self::U16Be(v) => Some(i128::from(*v)),
            Self::U32(v) | Self::U32Be(v) => Some(i128::from(*v)),
            Self::U64(v) | Self::U64Be(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Canonical float view. Integer variants do not coerce.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::F32(v) | Self::F32Be(v) => Some(f64::from(*v)),
            Self::F64(v) | Self::F64Be(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative element count view, used for sibling-sized arrays.
    pub fn as_count(&self) -> Option<usize> {
        match self.as_int() {
            Some(v) if v >= 0 => usize::try_from(v).ok(),
            _ => None,
        }
    }

    /// Nested tree view.
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Raw bytes view.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Compare by canonical decoded value: a big-endian 16-bit 42 equals a
    /// native 32-bit 42. Trees and sequences compare structurally.
    pub fn canonical_eq(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (self.as_float(), other.as_float()) {
            return a == b;
        }
        match (self, other) {
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Tree(a), Self::Tree(b)) => a.content_eq(b),
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.canonical_eq(y))
            }
            (Self::TreeArray(a), Self::TreeArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.content_eq(y))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(t) => write!(f, "{{{}}}", t.type_name()),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::I8(v) => write!(f, "{}", v),
            Self::I16(v) | Self::I16Be(v) => write!(f, "{}", v),
            Self::I32(v) | Self::I32Be(v) => write!(f, "{}", v),
            Self::I64(v) | Self::I64Be(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) | Self::U16Be(v) => write!(f, "{}", v),
            Self::U32(v) | Self::U32Be(v) => write!(f, "{}", v),
            Self::U64(v) | Self::U64Be(v) => write!(f, "{}", v),
            Self::F32(v) | Self::F32Be(v) => write!(f, "{}", v),
            Self::F64(v) | Self::F64Be(v) => write!(f, "{}", v),
            Self::Array(items) => write!(f, "[{} elements]", items.len()),
            Self::TreeArray(items) => write!(f, "[{} trees]", items.len()),
        }
    }
}

/// Named display function attached to a field by its schema.
///
/// The registry is a fixed closed set; schema loading rejects unknown names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFormat {
    /// Render integers as `0x`-prefixed hexadecimal.
    Hex,
}

impl DisplayFormat {
    /// Look up a formatter by its schema name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hex" => Some(Self::Hex),
            _ => None,
        }
    }

    /// Schema name of this formatter.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hex => "hex",
        }
    }

    /// Render a value through this formatter. Values without an integer view
    /// fall back to their plain rendering.
    pub fn apply(self, value: &Value) -> String {
        match self {
            Self::Hex => match value.as_int() {
                Some(v) => format!("{:#x}", v),
                None => value.to_string(),
            },
        }
    }
}

/// A named value, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    value: Value,
    format: Option<DisplayFormat>,
}

impl Node {
    /// Create a node.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            format: None,
        }
    }

    /// Attach a display formatter.
    #[must_use]
    pub fn with_format(mut self, format: Option<DisplayFormat>) -> Self {
        self.format = format;
        self
    }

    /// Field name, or a synthetic `skip-<n>` name for padding.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owned value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the node, yielding its value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Display formatter, if the schema attached one.
    pub fn format(&self) -> Option<DisplayFormat> {
        self.format
    }

    /// Render the value, honoring the attached formatter.
    pub fn render(&self) -> String {
        match self.format {
            Some(fmt) => fmt.apply(&self.value),
            None => self.value.to_string(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.render())
    }
}

/// An ordered, named, growable sequence of nodes.
///
/// Node order is wire order (the order fields were decoded). Encoding derives
/// field order from the type descriptor, never from tree order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tree {
    type_name: String,
    nodes: Vec<Node>,
}

impl Tree {
    /// Create an empty tree for the given type name.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            nodes: Vec::new(),
        }
    }

    /// Name of the type descriptor that produced (or will validate) this tree.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Append a node.
    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Append a named value.
    pub fn push_value(&mut self, name: impl Into<String>, value: Value) {
        self.nodes.push(Node::new(name, value));
    }

    /// All nodes in wire order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// First node with the given name.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    /// Value of the first node with the given name.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.get(name).map(Node::value)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural equality that ignores node order: same type name, same node
    /// names, canonically equal values. Used by round-trip checks where the
    /// wire order of a re-decoded tree may differ from a hand-built one.
    pub fn content_eq(&self, other: &Tree) -> bool {
        if self.type_name != other.type_name || self.nodes.len() != other.nodes.len() {
            return false;
        }
        self.nodes.iter().all(|node| {
            other
                .get(node.name())
                .is_some_and(|o| node.value().canonical_eq(o.value()))
        })
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.type_name)?;
        for node in &self.nodes {
            writeln!(f, "  {}", node)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_int_eq_across_width_and_order() {
        assert!(Value::U16Be(42).canonical_eq(&Value::U32(42)));
        assert!(Value::I8(-5).canonical_eq(&Value::I64Be(-5)));
        assert!(!Value::U8(1).canonical_eq(&Value::U8(2)));
        // Integers never coerce to floats
        assert!(!Value::U32(1).canonical_eq(&Value::F32(1.0)));
    }

    #[test]
    fn test_canonical_float_eq() {
        assert!(Value::F32(1.5).canonical_eq(&Value::F64Be(1.5)));
        assert!(!Value::F64(1.5).canonical_eq(&Value::F64(2.5)));
    }

    #[test]
    fn test_as_count_rejects_negative() {
        assert_eq!(Value::I16(-1).as_count(), None);
        assert_eq!(Value::U16Be(3).as_count(), Some(3));
        assert_eq!(Value::F32(3.0).as_count(), None);
    }

    #[test]
    fn test_hex_format() {
        let node = Node::new("flags", Value::U32(0x1a2b)).with_format(Some(DisplayFormat::Hex));
        assert_eq!(node.render(), "0x1a2b");
        assert_eq!(DisplayFormat::from_name("hex"), Some(DisplayFormat::Hex));
        assert_eq!(DisplayFormat::from_name("octal"), None);
    }

    #[test]
    fn test_tree_lookup_and_order() {
        let mut tree = Tree::new("sample");
        tree.push_value("a", Value::U8(1));
        tree.push_value("b", Value::U8(2));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get("b").map(|n| n.value().as_int()), Some(Some(2)));
        assert!(tree.get("c").is_none());
    }

    #[test]
    fn test_content_eq_ignores_order() {
        let mut a = Tree::new("t");
        a.push_value("x", Value::U16(7));
        a.push_value("y", Value::U16Be(9));

        let mut b = Tree::new("t");
        b.push_value("y", Value::U32(9));
        b.push_value("x", Value::U16(7));

        assert!(a.content_eq(&b));
        assert_ne!(a, b); // strict equality sees the order difference
    }
}
