// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema loading from `.toml` files on disk.
//!
//! The codec core consumes schema sources as already-parsed tables and never
//! touches the filesystem; this module is the bridge. Loading a directory
//! feeds every `.toml` file (sorted by name, for deterministic duplicate
//! reporting) through one loader, so cross-file detector references resolve
//! in the loader's second pass.

use crate::format::FileError;
use plog::{Catalog, DetectorCatalog, SchemaLoader};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Parse one schema file and run the loader's first pass over it.
pub fn add_schema_file(loader: &mut SchemaLoader, path: &Path) -> Result<(), FileError> {
    let text = fs::read_to_string(path)?;
    let table = text.parse::<toml::Table>()?;
    loader.add_source(&table)?;
    debug!(path = %path.display(), "loaded schema source");
    Ok(())
}

/// Load every `.toml` file in a directory into sealed catalogs.
pub fn load_schema_dir<P: AsRef<Path>>(dir: P) -> Result<(Catalog, DetectorCatalog), FileError> {
    let mut paths: Vec<_> = fs::read_dir(&dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut loader = SchemaLoader::new();
    for path in &paths {
        add_schema_file(&mut loader, path)?;
    }
    let (catalog, detectors) = loader.finish()?;
    info!(
        files = paths.len(),
        types = catalog.len(),
        rules = detectors.len(),
        "schema directory loaded"
    );
    Ok((catalog, detectors))
}
