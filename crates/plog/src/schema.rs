// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema loading from nested key/value tables.
//!
//! Sources arrive as already-parsed [`toml::value::Table`]s; this module never
//! touches the text format. A table without a `description` key is a
//! namespace: each child table is visited recursively and the key path is
//! dot-joined into the nested type name. A table with `description` declares
//! one compound type as an ordered list of field specs. A string-valued entry
//! declares a bare alias onto a terminal.
//!
//! Loading is two full passes across all sources — descriptors first, then
//! the `detector` lists — because detector validation needs the complete
//! catalog. [`SchemaLoader::add_source`] runs pass one per source;
//! [`SchemaLoader::finish`] runs pass two and seals both catalogs.
//!
//! ```toml
//! [sensor.lidar_points]
//! description = [
//!   { name = "sensor_guid", type = "guid" },
//!   { skip = 4 },
//!   { name = "point_count", type = "uint16" },
//!   { name = "points", type = "uint32", count = "point_count", endian = true },
//! ]
//! detector = [
//!   { name = "sensor.lidar_tail", point_count = "0x0" },
//! ]
//! ```

use crate::catalog::{ArraySize, Catalog, ElementKind, Field, FieldKind, Terminal, TypeDescriptor};
use crate::detect::{DetectorCatalog, DetectorRule};
use crate::error::SchemaError;
use crate::value::{DisplayFormat, Value};
use log::{debug, warn};
use toml::value::Table;

/// Two-pass loader producing a sealed [`Catalog`] and [`DetectorCatalog`].
#[derive(Debug)]
pub struct SchemaLoader {
    catalog: Catalog,
    pending: Vec<PendingDetectors>,
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Detector list captured during pass one, validated in pass two.
#[derive(Debug)]
struct PendingDetectors {
    precursor: String,
    entries: Vec<Table>,
}

impl SchemaLoader {
    /// Create a loader over a freshly seeded catalog.
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            pending: Vec::new(),
        }
    }

    /// Pass one for a single source: register every descriptor and alias it
    /// declares, and set its detector lists aside for pass two.
    pub fn add_source(&mut self, table: &Table) -> Result<(), SchemaError> {
        self.walk("", table)
    }

    /// Pass two: validate and install all captured detector rules, then
    /// seal both catalogs.
    pub fn finish(mut self) -> Result<(Catalog, DetectorCatalog), SchemaError> {
        let mut detectors = DetectorCatalog::new();
        let pending = std::mem::take(&mut self.pending);
        for block in &pending {
            for entry in &block.entries {
                detectors.push(self.build_rule(&block.precursor, entry)?);
            }
        }
        debug!(
            "schema load complete: {} types, {} detector rules",
            self.catalog.len(),
            detectors.len()
        );
        Ok((self.catalog, detectors))
    }

    fn walk(&mut self, prefix: &str, table: &Table) -> Result<(), SchemaError> {
        if table.contains_key("description") {
            if prefix.is_empty() {
                return Err(SchemaError::Malformed {
                    type_name: "<root>".into(),
                    reason: "a schema source root cannot itself be a type description".into(),
                });
            }
            return self.load_descriptor(prefix, table);
        }
        for (key, value) in table {
            let name = join(prefix, key);
            match value {
                toml::Value::Table(child) => self.walk(&name, child)?,
                toml::Value::String(target) => self.load_alias(&name, target)?,
                other => {
                    warn!("ignoring schema entry `{name}` of kind {}", kind_of(other));
                }
            }
        }
        Ok(())
    }

    /// A bare alias folds a legacy name onto a native terminal. The target
    /// may itself be an already-loaded alias.
    fn load_alias(&mut self, name: &str, target: &str) -> Result<(), SchemaError> {
        let terminal = Terminal::from_name(target)
            .or_else(|| self.catalog.resolve_alias(target))
            .ok_or_else(|| SchemaError::UnknownType(target.to_string()))?;
        self.catalog.register_alias(name, terminal)
    }

    fn load_descriptor(&mut self, name: &str, table: &Table) -> Result<(), SchemaError> {
        let specs = table
            .get("description")
            .and_then(toml::Value::as_array)
            .ok_or_else(|| SchemaError::Malformed {
                type_name: name.to_string(),
                reason: "`description` must be an array of field specs".into(),
            })?;

        let mut fields: Vec<Field> = Vec::with_capacity(specs.len());
        let mut skip_index = 0usize;
        for spec in specs {
            let spec = spec.as_table().ok_or_else(|| SchemaError::Malformed {
                type_name: name.to_string(),
                reason: "field specs must be tables".into(),
            })?;
            let field = if let Some(count) = spec.get("skip") {
                skip_index += 1;
                self.load_skip(name, count, skip_index)?
            } else {
                self.load_field(name, spec, &fields)?
            };
            fields.push(field);
        }

        if let Some(list) = table.get("detector") {
            let entries = list.as_array().ok_or_else(|| SchemaError::Malformed {
                type_name: name.to_string(),
                reason: "`detector` must be an array of rule entries".into(),
            })?;
            let mut captured = Vec::with_capacity(entries.len());
            for entry in entries {
                captured.push(entry.as_table().cloned().ok_or_else(|| {
                    SchemaError::Malformed {
                        type_name: name.to_string(),
                        reason: "detector entries must be tables".into(),
                    }
                })?);
            }
            self.pending.push(PendingDetectors {
                precursor: name.to_string(),
                entries: captured,
            });
        }

        self.catalog.register(TypeDescriptor::new(name, fields))
    }

    fn load_skip(
        &self,
        type_name: &str,
        count: &toml::Value,
        index: usize,
    ) -> Result<Field, SchemaError> {
        let count = count
            .as_integer()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| SchemaError::Malformed {
                type_name: type_name.to_string(),
                reason: "`skip` must be a non-negative byte count".into(),
            })?;
        Ok(Field::skip(count, index))
    }

    fn load_field(
        &self,
        type_name: &str,
        spec: &Table,
        declared: &[Field],
    ) -> Result<Field, SchemaError> {
        let field_name =
            spec.get("name")
                .and_then(toml::Value::as_str)
                .ok_or(SchemaError::MissingRequiredField {
                    type_name: type_name.to_string(),
                    key: "name",
                })?;
        let type_ref =
            spec.get("type")
                .and_then(toml::Value::as_str)
                .ok_or(SchemaError::MissingRequiredField {
                    type_name: type_name.to_string(),
                    key: "type",
                })?;

        // Terminal registry first; anything else becomes a lazily-resolved
        // nested reference (the target need not be loaded yet).
        let element = match Terminal::from_name(type_ref) {
            Some(terminal) => ElementKind::Terminal(terminal),
            None => ElementKind::Nested(type_ref.to_string()),
        };

        let kind = match spec.get("count") {
            None => match element {
                ElementKind::Terminal(t) => FieldKind::Terminal(t),
                ElementKind::Nested(n) => FieldKind::Nested(n),
            },
            Some(toml::Value::Integer(n)) => {
                let n = usize::try_from(*n).map_err(|_| SchemaError::Malformed {
                    type_name: type_name.to_string(),
                    reason: format!("array `{field_name}` has a negative count"),
                })?;
                FieldKind::Array {
                    size: ArraySize::Fixed(n),
                    element,
                }
            }
            Some(toml::Value::String(sibling)) => {
                if !declared.iter().any(|f| &f.name == sibling) {
                    return Err(SchemaError::ArraySizeFieldMustPrecede {
                        type_name: type_name.to_string(),
                        array: field_name.to_string(),
                        field: sibling.clone(),
                    });
                }
                FieldKind::Array {
                    size: ArraySize::Field(sibling.clone()),
                    element,
                }
            }
            Some(other) => {
                return Err(SchemaError::Malformed {
                    type_name: type_name.to_string(),
                    reason: format!(
                        "array `{field_name}` count must be an integer or field name, not {}",
                        kind_of(other)
                    ),
                })
            }
        };

        let mut field = Field::new(field_name, kind);
        if truthy(spec.get("endian")) {
            field = field.big_endian();
        }
        if let Some(format) = spec.get("format") {
            let format_name = format.as_str().unwrap_or("");
            let format = DisplayFormat::from_name(format_name).ok_or_else(|| {
                SchemaError::UnsupportedFormatter(match format.as_str() {
                    Some(s) => s.to_string(),
                    None => format.to_string(),
                })
            })?;
            field = field.with_format(format);
        }
        Ok(field)
    }

    /// Pass-two construction of one detector rule, with full validation
    /// against the now-complete catalog.
    fn build_rule(&self, precursor: &str, entry: &Table) -> Result<DetectorRule, SchemaError> {
        let next_type =
            entry
                .get("name")
                .and_then(toml::Value::as_str)
                .ok_or(SchemaError::MissingRequiredField {
                    type_name: precursor.to_string(),
                    key: "name",
                })?;

        let descriptor = self.catalog.lookup(precursor)?;
        let mut conditions = Vec::new();
        for (field_name, raw) in entry {
            if field_name == "name" {
                continue;
            }
            let field = descriptor.field(field_name).ok_or_else(|| {
                SchemaError::DetectorFieldNotDescribed {
                    precursor: precursor.to_string(),
                    field: field_name.clone(),
                }
            })?;
            let terminal = self.branchable_terminal(field).ok_or_else(|| {
                SchemaError::IllegalBranchOnCompoundField {
                    precursor: precursor.to_string(),
                    field: field_name.clone(),
                }
            })?;
            let expected = parse_expected(terminal, raw).ok_or_else(|| {
                SchemaError::BadDetectorValue {
                    field: field_name.clone(),
                    terminal: terminal.name(),
                    text: raw.to_string(),
                }
            })?;
            conditions.push((field_name.clone(), expected));
        }
        Ok(DetectorRule::new(precursor, conditions, next_type))
    }

    /// Only terminal-valued fields may gate detection. A nested reference
    /// that aliases onto a terminal still qualifies.
    fn branchable_terminal(&self, field: &Field) -> Option<Terminal> {
        match &field.kind {
            FieldKind::Terminal(t) => Some(*t),
            FieldKind::Nested(name) => self.catalog.resolve_alias(name),
            FieldKind::Skip { .. } | FieldKind::Array { .. } => None,
        }
    }
}

/// String-encoded expected values go through the terminal's string-to-value
/// conversion; plain TOML integers and floats are accepted and routed
/// through the same conversion.
fn parse_expected(terminal: Terminal, raw: &toml::Value) -> Option<Value> {
    match raw {
        toml::Value::String(text) => terminal.parse_literal(text),
        toml::Value::Integer(n) => terminal.parse_literal(&n.to_string()),
        toml::Value::Float(f) => terminal.parse_literal(&f.to_string()),
        _ => None,
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// `endian` is a presence marker: any value other than an explicit `false`
/// selects big-endian.
fn truthy(value: Option<&toml::Value>) -> bool {
    match value {
        None => false,
        Some(toml::Value::Boolean(b)) => *b,
        Some(_) => true,
    }
}

fn kind_of(value: &toml::Value) -> &'static str {
    match value {
        toml::Value::String(_) => "string",
        toml::Value::Integer(_) => "integer",
        toml::Value::Float(_) => "float",
        toml::Value::Boolean(_) => "boolean",
        toml::Value::Datetime(_) => "datetime",
        toml::Value::Array(_) => "array",
        toml::Value::Table(_) => "table",
    }
}
