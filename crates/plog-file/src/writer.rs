// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record-by-record log writing.

use crate::format::{FileError, RecordHeader};
use plog::{Encoder, Tree};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Appending writer for `.plog` files. Maintains the `index`/`prev_size`
/// chain across records.
pub struct LogWriter {
    writer: BufWriter<File>,
    index: u32,
    prev_size: u32,
}

impl LogWriter {
    /// Create a new log file, truncating any existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, FileError> {
        let file = File::create(&path)?;
        debug!(path = %path.as_ref().display(), "created plog file");
        Ok(Self {
            writer: BufWriter::new(file),
            index: 0,
            prev_size: 0,
        })
    }

    /// Append one record with an already-encoded payload.
    pub fn write_payload(&mut self, timestamp: u64, payload: &[u8]) -> Result<(), FileError> {
        let header = RecordHeader {
            index: self.index,
            size: payload.len() as u32,
            prev_size: self.prev_size,
            timestamp,
        };
        header.write(&mut self.writer)?;
        self.writer.write_all(payload)?;
        trace!(index = header.index, size = header.size, "wrote record");

        self.index += 1;
        self.prev_size = header.size;
        Ok(())
    }

    /// Encode a whole-record tree through the codec core and append it.
    pub fn write_record(
        &mut self,
        timestamp: u64,
        record: &Tree,
        encoder: &Encoder<'_>,
    ) -> Result<(), FileError> {
        let payload = encoder.encode_record(record)?;
        self.write_payload(timestamp, &payload)
    }

    /// Number of records written so far.
    pub fn record_count(&self) -> u32 {
        self.index
    }

    /// Flush and close the file.
    pub fn finish(mut self) -> Result<(), FileError> {
        self.writer.flush()?;
        Ok(())
    }
}
