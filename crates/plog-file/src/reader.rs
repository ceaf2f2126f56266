// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record-by-record log reading.
//!
//! The reader walks fixed-size record headers and buffers each payload; the
//! decoding iterator hands every payload to the codec core. Per-record
//! decode failures abort that record only — the iterator surfaces them and
//! keeps its position on the next record, so skip/continue policy stays with
//! the caller.

use crate::format::{FileError, RecordHeader};
use plog::{Catalog, Decoder, DetectorCatalog, Tree};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

/// One framed record: header plus its undecoded payload.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub header: RecordHeader,
    pub payload: Vec<u8>,
}

/// One decoded record.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub header: RecordHeader,
    pub tree: Tree,
}

/// Sequential reader over a `.plog` file.
pub struct LogReader {
    reader: BufReader<File>,
    len: u64,
}

impl LogReader {
    /// Open a log file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FileError> {
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        debug!(
            path = %path.as_ref().display(),
            len,
            "opened plog file"
        );
        Ok(Self {
            reader: BufReader::new(file),
            len,
        })
    }

    /// Read the next framed record. `Ok(None)` at a clean end of file; a
    /// file ending mid-header or mid-payload is [`FileError::Truncated`].
    pub fn read_record(&mut self) -> Result<Option<RawRecord>, FileError> {
        let offset = self.reader.stream_position()?;
        let remaining = self.len.saturating_sub(offset);
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < RecordHeader::SIZE as u64 {
            return Err(FileError::Truncated {
                offset,
                need: RecordHeader::SIZE as u64,
                have: remaining,
            });
        }

        let header = RecordHeader::read(&mut self.reader)?;
        let body_remaining = self.len - offset - RecordHeader::SIZE as u64;
        if u64::from(header.size) > body_remaining {
            return Err(FileError::Truncated {
                offset: offset + RecordHeader::SIZE as u64,
                need: u64::from(header.size),
                have: body_remaining,
            });
        }

        let mut payload = vec![0u8; header.size as usize];
        self.reader.read_exact(&mut payload)?;
        trace!(index = header.index, size = header.size, "read record");
        Ok(Some(RawRecord { header, payload }))
    }

    /// Seek back to the first record.
    pub fn rewind(&mut self) -> Result<(), FileError> {
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Iterate over framed records.
    pub fn records(self) -> Records {
        Records { reader: self }
    }

    /// Iterate over decoded records: each payload runs through the
    /// detector-driven decode loop, starting at `header_type`.
    pub fn decode_records<'a>(
        self,
        catalog: &'a Catalog,
        detectors: &'a DetectorCatalog,
        header_type: &'a str,
    ) -> DecodedRecords<'a> {
        DecodedRecords {
            reader: self,
            catalog,
            detectors,
            header_type,
        }
    }
}

/// Iterator over framed records.
pub struct Records {
    reader: LogReader,
}

impl Iterator for Records {
    type Item = Result<RawRecord, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

/// Iterator over decoded records.
pub struct DecodedRecords<'a> {
    reader: LogReader,
    catalog: &'a Catalog,
    detectors: &'a DetectorCatalog,
    header_type: &'a str,
}

impl Iterator for DecodedRecords<'_> {
    type Item = Result<DecodedRecord, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = match self.reader.read_record() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        let mut decoder = Decoder::from_slice(self.catalog, self.detectors, &raw.payload);
        match decoder.decode_record(self.header_type) {
            Ok(tree) => Some(Ok(DecodedRecord {
                header: raw.header,
                tree,
            })),
            Err(source) => Some(Err(FileError::Decode {
                index: raw.header.index,
                source,
            })),
        }
    }
}
