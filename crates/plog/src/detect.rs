// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type detection: deciding which schema applies to the next byte span.
//!
//! After each sub-structure is decoded, the decoder asks the detector catalog
//! which type comes next. A rule applies when its precursor type matches the
//! just-decoded tree and every field condition compares equal by canonical
//! value (width and byte order do not matter). Zero matches is the documented
//! fallback to raw-byte capture, not an error; more than one match is a
//! schema-authoring defect and always fatal.
//!
//! Detection runs once per sub-structure on the record-decoding hot path, so
//! the scan is linear with precursor-type rejection before any field
//! condition is evaluated.

use crate::error::SchemaError;
use crate::value::{Tree, Value};

/// One disambiguation rule: when a `precursor` tree satisfies all
/// `conditions`, the next span decodes as `next_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorRule {
    precursor: String,
    conditions: Vec<(String, Value)>,
    next_type: String,
}

impl DetectorRule {
    /// Create a rule. Condition values must already be parsed to their
    /// field's terminal kind (the schema loader does this).
    pub fn new(
        precursor: impl Into<String>,
        conditions: Vec<(String, Value)>,
        next_type: impl Into<String>,
    ) -> Self {
        Self {
            precursor: precursor.into(),
            conditions,
            next_type: next_type.into(),
        }
    }

    /// Precursor type name.
    pub fn precursor(&self) -> &str {
        &self.precursor
    }

    /// Type name selected when this rule matches.
    pub fn next_type(&self) -> &str {
        &self.next_type
    }

    /// Field conditions.
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    fn matches(&self, node: &Tree) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            node.get(field)
                .is_some_and(|n| n.value().canonical_eq(expected))
        })
    }
}

/// Ordered rule set, populated once at startup and read-only afterwards.
#[derive(Debug, Default)]
pub struct DetectorCatalog {
    rules: Vec<DetectorRule>,
}

impl DetectorCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    pub fn push(&mut self, rule: DetectorRule) {
        self.rules.push(rule);
    }

    /// All rules, in load order.
    pub fn rules(&self) -> &[DetectorRule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the catalog holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Determine the type of the next byte span from a just-decoded node.
    ///
    /// Returns `Ok(None)` when no rule matches — the caller falls back to
    /// raw-byte capture. Two fully-satisfied rules for the same node raise
    /// [`SchemaError::AmbiguousDetectors`].
    pub fn detect<'c>(&'c self, node: &Tree) -> Result<Option<&'c str>, SchemaError> {
        let mut hit: Option<&DetectorRule> = None;
        for rule in &self.rules {
            if rule.precursor != node.type_name() {
                continue;
            }
            if !rule.matches(node) {
                continue;
            }
            if let Some(first) = hit {
                return Err(SchemaError::AmbiguousDetectors {
                    precursor: node.type_name().to_string(),
                    first: first.next_type.clone(),
                    second: rule.next_type.clone(),
                });
            }
            hit = Some(rule);
        }
        Ok(hit.map(|r| r.next_type.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(msg_type: u32, flags: u16) -> Tree {
        let mut tree = Tree::new("msg_header");
        tree.push_value("msg_type", Value::U32(msg_type));
        tree.push_value("flags", Value::U16(flags));
        tree
    }

    #[test]
    fn test_unique_match() {
        let mut catalog = DetectorCatalog::new();
        catalog.push(DetectorRule::new(
            "msg_header",
            vec![("msg_type".into(), Value::U32(1))],
            "status_msg",
        ));
        catalog.push(DetectorRule::new(
            "msg_header",
            vec![("msg_type".into(), Value::U32(2))],
            "sensor_msg",
        ));

        let next = catalog.detect(&header(2, 0)).expect("detect");
        assert_eq!(next, Some("sensor_msg"));
    }

    #[test]
    fn test_zero_matches_is_fallback_not_error() {
        let mut catalog = DetectorCatalog::new();
        catalog.push(DetectorRule::new(
            "msg_header",
            vec![("msg_type".into(), Value::U32(1))],
            "status_msg",
        ));
        assert_eq!(catalog.detect(&header(99, 0)).expect("detect"), None);
    }

    #[test]
    fn test_precursor_rejection() {
        let mut catalog = DetectorCatalog::new();
        catalog.push(DetectorRule::new(
            "other_header",
            vec![("msg_type".into(), Value::U32(1))],
            "status_msg",
        ));
        // Same field values, wrong precursor type.
        assert_eq!(catalog.detect(&header(1, 0)).expect("detect"), None);
    }

    #[test]
    fn test_width_and_order_agnostic_comparison() {
        let mut catalog = DetectorCatalog::new();
        // Expected value loaded as a 16-bit big-endian literal; the decoded
        // field is a native 32-bit scalar.
        catalog.push(DetectorRule::new(
            "msg_header",
            vec![("msg_type".into(), Value::U16Be(42))],
            "wide_msg",
        ));
        assert_eq!(
            catalog.detect(&header(42, 0)).expect("detect"),
            Some("wide_msg")
        );
    }

    #[test]
    fn test_overlapping_rules_are_ambiguous() {
        let mut catalog = DetectorCatalog::new();
        catalog.push(DetectorRule::new(
            "msg_header",
            vec![("msg_type".into(), Value::U32(1))],
            "status_msg",
        ));
        catalog.push(DetectorRule::new(
            "msg_header",
            vec![
                ("msg_type".into(), Value::U32(1)),
                ("flags".into(), Value::U16(0)),
            ],
            "extended_status_msg",
        ));

        let err = catalog.detect(&header(1, 0)).expect_err("must be ambiguous");
        match err {
            SchemaError::AmbiguousDetectors { first, second, .. } => {
                assert_eq!(first, "status_msg");
                assert_eq!(second, "extended_status_msg");
            }
            other => panic!("unexpected error: {other}"),
        }
        // A node matching only the narrower rule is still unambiguous.
        assert_eq!(
            catalog.detect(&header(1, 7)).expect("detect"),
            Some("status_msg")
        );
    }

    #[test]
    fn test_condition_on_missing_field_never_matches() {
        let mut catalog = DetectorCatalog::new();
        catalog.push(DetectorRule::new(
            "msg_header",
            vec![("absent".into(), Value::U32(1))],
            "status_msg",
        ));
        assert_eq!(catalog.detect(&header(1, 0)).expect("detect"), None);
    }
}
