// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for schema loading, decoding and encoding.
//!
//! Every error is terminal to the operation in progress; nothing is retried
//! internally. Context is attached as errors unwind (type name, field name,
//! partial tree where one exists) without overwriting what a deeper frame
//! already recorded — the innermost failure stays reachable through `source`.

use crate::value::Tree;
use std::io;
use thiserror::Error;

/// Schema-authoring and catalog-population errors.
///
/// Any of these aborts loading entirely; a partially populated catalog is
/// never handed out.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("duplicate type `{0}`")]
    DuplicateType(String),

    #[error("unsupported formatter `{0}`")]
    UnsupportedFormatter(String),

    #[error("field spec in `{type_name}` is missing required key `{key}`")]
    MissingRequiredField {
        type_name: String,
        key: &'static str,
    },

    #[error("type `{type_name}`: {reason}")]
    Malformed { type_name: String, reason: String },

    #[error("ambiguous detectors for `{precursor}`: `{first}` and `{second}` both match")]
    AmbiguousDetectors {
        precursor: String,
        first: String,
        second: String,
    },

    #[error("detector for `{precursor}` tests `{field}`, which its descriptor does not describe")]
    DetectorFieldNotDescribed { precursor: String, field: String },

    #[error("detector for `{precursor}` branches on compound field `{field}`")]
    IllegalBranchOnCompoundField { precursor: String, field: String },

    #[error("array `{array}` in `{type_name}` is sized by `{field}`, which is not declared before it")]
    ArraySizeFieldMustPrecede {
        type_name: String,
        array: String,
        field: String,
    },

    #[error("`{text}` is not a valid {terminal} literal for detector field `{field}`")]
    BadDetectorValue {
        field: String,
        terminal: &'static str,
        text: String,
    },
}

/// Errors raised while walking a byte stream against a descriptor.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("read failed: {0}")]
    Read(#[from] io::Error),

    #[error("unknown nested type `{0}`")]
    UnknownNestedType(String),

    #[error("array size field `{0}` not found among already-decoded siblings")]
    SizeFieldNotFound(String),

    #[error("array size field `{field}` holds {value}, not a usable element count")]
    SizeParse { field: String, value: String },

    #[error("no decoder for type `{0}`")]
    UnknownDecoder(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Context frame added per descriptor: the failing field plus the tree
    /// decoded so far, preserved to aid diagnosis.
    #[error("in `{type_name}`, field `{field}`: {source}")]
    Field {
        type_name: String,
        field: String,
        partial: Tree,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Wrap with a descriptor context frame.
    pub(crate) fn in_field(self, type_name: &str, field: &str, partial: Tree) -> Self {
        Self::Field {
            type_name: type_name.to_string(),
            field: field.to_string(),
            partial,
            source: Box::new(self),
        }
    }

    /// Partial tree of the outermost context frame, if any.
    pub fn partial_tree(&self) -> Option<&Tree> {
        match self {
            Self::Field { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Errors raised while re-serializing a tree against a descriptor.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("write failed: {0}")]
    Write(#[from] io::Error),

    #[error("field `{0}` has no matching node in the tree")]
    FieldNotFound(String),

    #[error("field `{field}` expects {expected}, tree holds {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("array `{field}` holds {actual} elements but its size resolves to {expected}")]
    ArraySizeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("array `{field}` element {index} is not {expected}")]
    ArrayElementTypeMismatch {
        field: String,
        index: usize,
        expected: &'static str,
    },

    #[error("unknown nested type `{0}`")]
    UnknownNestedType(String),

    #[error("array size field `{field}` holds {value}, not a usable element count")]
    SizeParse { field: String, value: String },

    /// Context frame added per descriptor.
    #[error("in `{type_name}`, field `{field}`: {source}")]
    Field {
        type_name: String,
        field: String,
        #[source]
        source: Box<EncodeError>,
    },
}

impl EncodeError {
    /// Wrap with a descriptor context frame.
    pub(crate) fn in_field(self, type_name: &str, field: &str) -> Self {
        Self::Field {
            type_name: type_name.to_string(),
            field: field.to_string(),
            source: Box::new(self),
        }
    }
}
