// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # plog - schema-driven codec for the plog binary log format
//!
//! Message layouts in a plog file are not fixed at build time. Each record is
//! a sequence of sub-structures whose types are discovered while parsing,
//! using externally supplied type schemas and disambiguation rules. This
//! crate is the codec core: the runtime type model, the decoder, the type
//! detector and the byte-exact encoder.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                       Schema sources (TOML)                  |
//! |   SchemaLoader -> Catalog (types+aliases) + DetectorCatalog  |
//! +--------------------------------------------------------------+
//! |                         Record payload                       |
//! |   Decoder: header type -> detect -> decode -> ... -> end    |
//! |   Encoder: descriptor order <- Tree (any node order)        |
//! +--------------------------------------------------------------+
//! |                       Value model                            |
//! |   Tree -> Node -> Value (scalars, bytes, trees, sequences)  |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use plog::{Catalog, Decoder, DetectorCatalog, Encoder, Field, FieldKind,
//!            Terminal, TypeDescriptor, Value};
//!
//! let mut catalog = Catalog::new();
//! catalog.register(TypeDescriptor::new(
//!     "ps_byte_array_msg",
//!     vec![
//!         Field::new("dest_guid", FieldKind::Terminal(Terminal::U64)),
//!         Field::new("data_type", FieldKind::Terminal(Terminal::U32)),
//!         Field::new("payload", FieldKind::Terminal(Terminal::U32)),
//!     ],
//! ))?;
//!
//! let detectors = DetectorCatalog::new();
//! let bytes = [1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0];
//! let mut decoder = Decoder::from_slice(&catalog, &detectors, &bytes);
//! let descriptor = catalog.lookup("ps_byte_array_msg")?.clone();
//! let tree = decoder.decode_descriptor(&descriptor)?;
//! assert_eq!(tree.value_of("data_type"), Some(&Value::U32(2)));
//!
//! // The inverse transform is byte-exact.
//! let encoder = Encoder::new(&catalog);
//! assert_eq!(encoder.encode(&tree, &descriptor)?, bytes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Catalog`] | Registry of type descriptors, terminal tags and aliases |
//! | [`SchemaLoader`] | Two-pass loader from parsed TOML tables |
//! | [`Decoder`] | Walks a schema and a byte stream into a [`Tree`] |
//! | [`DetectorCatalog`] | Chooses the next schema from decoded field values |
//! | [`Encoder`] | Re-serializes a [`Tree`] in descriptor wire order |
//!
//! The catalogs are built once at startup and passed by shared reference;
//! they are never global state, so decoding stays testable in isolation and
//! safe across concurrent reader threads.
//!
//! Record framing (the `index, size, prev_size, timestamp` header before each
//! payload) lives in the companion `plog-file` crate; this crate only needs
//! to be told where a record's payload ends.

pub mod catalog;
pub mod codec;
pub mod detect;
pub mod error;
pub mod schema;
pub mod value;

pub use catalog::{
    ArraySize, ByteOrder, Catalog, ElementKind, Field, FieldKind, Terminal, TypeDescriptor,
};
pub use codec::{Decoder, Encoder};
pub use detect::{DetectorCatalog, DetectorRule};
pub use error::{DecodeError, EncodeError, SchemaError};
pub use schema::SchemaLoader;
pub use value::{DisplayFormat, Node, Tree, Value};

pub use codec::{RAW_TYPE, RECORD_TYPE};
