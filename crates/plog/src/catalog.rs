// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type descriptions and the type catalog.
//!
//! A [`TypeDescriptor`] is the schema for one compound binary type: an ordered
//! list of [`Field`]s whose order *is* the wire serialization order, for both
//! decode and encode. Descriptors live in a [`Catalog`] that is populated once
//! at startup and treated as immutable shared state afterwards — it is passed
//! by reference into the decoder, encoder and detector, never reached through
//! globals.

use crate::error::SchemaError;
use crate::value::{DisplayFormat, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Native fixed-width scalar tags. A fixed closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl Terminal {
    /// Every terminal tag, in registry order.
    pub const ALL: [Terminal; 10] = [
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
    ];

    /// Registry name of this tag.
    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    /// Wire size in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Reverse registry lookup. O(1); fails only for names outside the
    /// closed set.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int8" => Some(Self::I8),
            "int16" => Some(Self::I16),
            "int32" => Some(Self::I32),
            "int64" => Some(Self::I64),
            "uint8" => Some(Self::U8),
            "uint16" => Some(Self::U16),
            "uint32" => Some(Self::U32),
            "uint64" => Some(Self::U64),
            "float32" => Some(Self::F32),
            "float64" => Some(Self::F64),
            _ => None,
        }
    }

    /// Parse a string-encoded literal into a native-order [`Value`] of this
    /// tag. Integers accept decimal and `0x` hexadecimal notation; floats
    /// accept the standard decimal forms.
    pub fn parse_literal(self, text: &str) -> Option<Value> {
        fn int(text: &str) -> Option<i128> {
            let (digits, negative) = match text.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (text, false),
            };
            let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                Some(hex) => i128::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<i128>().ok()?,
            };
            Some(if negative { -magnitude } else { magnitude })
        }

        match self {
            Self::I8 => int(text).and_then(|v| i8::try_from(v).ok()).map(Value::I8),
            Self::I16 => int(text)
                .and_then(|v| i16::try_from(v).ok())
                .map(Value::I16),
            Self::I32 => int(text)
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::I32),
            Self::I64 => int(text)
                .and_then(|v| i64::try_from(v).ok())
                .map(Value::I64),
            Self::U8 => int(text).and_then(|v| u8::try_from(v).ok()).map(Value::U8),
            Self::U16 => int(text)
                .and_then(|v| u16::try_from(v).ok())
                .map(Value::U16),
            Self::U32 => int(text)
                .and_then(|v| u32::try_from(v).ok())
                .map(Value::U32),
            Self::U64 => int(text)
                .and_then(|v| u64::try_from(v).ok())
                .map(Value::U64),
            Self::F32 => text.parse::<f32>().ok().map(Value::F32),
            Self::F64 => text.parse::<f64>().ok().map(Value::F64),
        }
    }
}

/// Wire byte order of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// How an array field determines its element count.
#[derive(Debug, Clone, PartialEq)]
pub enum ArraySize {
    /// Fixed count known at schema-load time.
    Fixed(usize),
    /// Name of a previously-decoded sibling field holding the count.
    Field(String),
}

/// Element type of an array field.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Terminal(Terminal),
    Nested(String),
}

/// The kind of one descriptor field. A closed sum: every consumer matches
/// exhaustively, so a new kind cannot be half-supported.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Native scalar.
    Terminal(Terminal),
    /// Reference to another descriptor by name, resolved at decode/encode
    /// time with alias indirection attempted first.
    Nested(String),
    /// Padding bytes, preserved verbatim on encode. `index` is the
    /// per-descriptor skip order, starting at 1.
    Skip { count: usize, index: usize },
    /// Fixed- or sibling-sized homogeneous sequence.
    Array { size: ArraySize, element: ElementKind },
}

/// One field of a type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub byte_order: ByteOrder,
    pub format: Option<DisplayFormat>,
}

impl Field {
    /// Create a little-endian field with no formatter.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            byte_order: ByteOrder::Little,
            format: None,
        }
    }

    /// Create the synthetic field for a skip spec.
    pub fn skip(count: usize, index: usize) -> Self {
        Self::new(format!("skip-{index}"), FieldKind::Skip { count, index })
    }

    /// Mark the field big-endian.
    #[must_use]
    pub fn big_endian(mut self) -> Self {
        self.byte_order = ByteOrder::Big;
        self
    }

    /// Attach a display formatter.
    #[must_use]
    pub fn with_format(mut self, format: DisplayFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// The schema for one compound binary type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub fields: Vec<Field>,
}

impl TypeDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the descriptor declares a field with this name.
    pub fn describes(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// Registry of type descriptors plus the name-alias map.
///
/// Built once before any decode or encode begins; read-only thereafter, so a
/// shared reference is safe across concurrent reader threads.
#[derive(Debug)]
pub struct Catalog {
    types: HashMap<String, Arc<TypeDescriptor>>,
    aliases: HashMap<String, Terminal>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create a catalog seeded with the stock legacy aliases
    /// (`guid` and `timestamp` both fold onto `uint64`).
    pub fn new() -> Self {
        let mut aliases = HashMap::new();
        aliases.insert("guid".into(), Terminal::U64);
        aliases.insert("timestamp".into(), Terminal::U64);
        Self {
            types: HashMap::new(),
            aliases,
        }
    }

    /// Insert a descriptor. Loading two schema sources for the same name is
    /// a `DuplicateType` error, never a silent overwrite.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<(), SchemaError> {
        if self.types.contains_key(&descriptor.name) || self.aliases.contains_key(&descriptor.name)
        {
            return Err(SchemaError::DuplicateType(descriptor.name));
        }
        self.types
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Look up a descriptor by name.
    pub fn lookup(&self, name: &str) -> Result<&Arc<TypeDescriptor>, SchemaError> {
        self.types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Whether a compound descriptor with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Fold a legacy name onto a native terminal. Fails if the name already
    /// identifies a distinct compound type.
    pub fn register_alias(&mut self, alias: impl Into<String>, terminal: Terminal) -> Result<(), SchemaError> {
        let alias = alias.into();
        if self.types.contains_key(&alias) {
            return Err(SchemaError::DuplicateType(alias));
        }
        self.aliases.insert(alias, terminal);
        Ok(())
    }

    /// Resolve a name through the alias map to a terminal tag, if it is one.
    pub fn resolve_alias(&self, name: &str) -> Option<Terminal> {
        self.aliases.get(name).copied()
    }

    /// Number of registered compound types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no compound types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Names of all registered compound types.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
