// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record framing for `.plog` files.
//!
//! # Format Overview
//!
//! ```text
//! +------------------------------------------------------------+
//! |                    Record 0                                 |
//! |  index (4) | size (4) | prev_size (4) | timestamp (8)      |
//! |  payload (size bytes)                                      |
//! +------------------------------------------------------------+
//! |                    Record 1                                 |
//! |  ...                                                        |
//! +------------------------------------------------------------+
//! ```
//!
//! All header integers are little-endian. `prev_size` is the previous
//! record's payload size, enabling backwards traversal; it is zero for the
//! first record. The payload is the byte span the codec core decodes — the
//! core is only ever told where the payload ends.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use plog::{DecodeError, EncodeError, SchemaError};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Fixed record header preceding each payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Zero-based record index within the file.
    pub index: u32,
    /// Payload size in bytes.
    pub size: u32,
    /// Previous record's payload size; zero for the first record.
    pub prev_size: u32,
    /// Capture timestamp in microseconds.
    pub timestamp: u64,
}

impl RecordHeader {
    pub const SIZE: usize = 20;

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.index)?;
        w.write_u32::<LittleEndian>(self.size)?;
        w.write_u32::<LittleEndian>(self.prev_size)?;
        w.write_u64::<LittleEndian>(self.timestamp)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            index: r.read_u32::<LittleEndian>()?,
            size: r.read_u32::<LittleEndian>()?,
            prev_size: r.read_u32::<LittleEndian>()?,
            timestamp: r.read_u64::<LittleEndian>()?,
        })
    }
}

/// Errors for plog file operations.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("truncated record at offset {offset}: need {need} bytes, have {have}")]
    Truncated { offset: u64, need: u64, have: u64 },

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("decode error in record {index}: {source}")]
    Decode {
        index: u32,
        #[source]
        source: DecodeError,
    },

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("schema file error: {0}")]
    Toml(#[from] toml::de::Error),
}
