// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! plog file layer: record framing, file iteration, schema-file loading.
//!
//! The codec core (the `plog` crate) decodes one record payload at a time and
//! only needs to be told where the payload ends. This crate owns everything
//! around that: the `index | size | prev_size | timestamp` header before each
//! payload, sequential file iteration, the `prev_size` chain on write, and
//! feeding `.toml` schema files from disk into the core's loader.
//!
//! # Quick Start
//!
//! ```no_run
//! use plog_file::{load_schema_dir, LogReader};
//!
//! let (catalog, detectors) = load_schema_dir("schemas/")?;
//! let reader = LogReader::open("capture.plog")?;
//! for record in reader.decode_records(&catalog, &detectors, "msg_header") {
//!     match record {
//!         Ok(decoded) => println!("{}", decoded.tree),
//!         // A bad record aborts only itself; skipping is the caller's call.
//!         Err(e) => eprintln!("skipping record: {e}"),
//!     }
//! }
//! # Ok::<(), plog_file::FileError>(())
//! ```

pub mod format;
pub mod reader;
pub mod schema_files;
pub mod writer;

pub use format::{FileError, RecordHeader};
pub use reader::{DecodedRecord, DecodedRecords, LogReader, RawRecord, Records};
pub use schema_files::{add_schema_file, load_schema_dir};
pub use writer::LogWriter;
