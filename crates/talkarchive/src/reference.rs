//! Per-document reference tables.
//!
//! Labels are matched the way Markdown matches reference labels: surrounding
//! whitespace is trimmed, inner whitespace runs collapse to one space, and
//! comparison is case-insensitive.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Reference, Target};

/// Normalize a label for lookup.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A mapping from label to target, unique per document.
///
/// Definition order is preserved for iteration and output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    references: Vec<Reference>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ReferenceTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLabel`] if two definitions share a label
    /// but disagree on the target.
    pub fn from_references(references: impl IntoIterator<Item = Reference>) -> Result<Self> {
        let mut table = Self::new();
        for reference in references {
            table.insert(reference)?;
        }
        Ok(table)
    }

    /// Add a definition.
    ///
    /// Returns `false` when the label was already defined with the same
    /// target; the table is unchanged in that case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLabel`] if the label is already defined
    /// with a different target.
    pub fn insert(&mut self, reference: Reference) -> Result<bool> {
        let key = normalize_label(&reference.label);
        if let Some(&existing) = self.index.get(&key) {
            let first = &self.references[existing];
            if first.target == reference.target {
                debug!(
                    label = %reference.label,
                    line = reference.line,
                    "redundant reference definition"
                );
                return Ok(false);
            }
            return Err(Error::duplicate_label(
                key,
                first.target.as_str(),
                reference.target.as_str(),
            ));
        }
        self.index.insert(key, self.references.len());
        self.references.push(reference);
        Ok(true)
    }

    /// Look up a label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Reference> {
        self.index
            .get(&normalize_label(label))
            .map(|&i| &self.references[i])
    }

    /// Resolve a label to its target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingReference`] if the label is not defined.
    pub fn resolve(&self, label: &str) -> Result<&Target> {
        self.get(label)
            .map(|r| &r.target)
            .ok_or_else(|| Error::missing_reference(label))
    }

    /// Check if a label is defined.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(&normalize_label(label))
    }

    /// Definitions in the order they were first seen.
    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter()
    }

    /// Number of distinct labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Check if the table has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qemu_table() -> ReferenceTable {
        ReferenceTable::from_references([
            Reference::new(
                "1",
                "https://liuxocakn.org.cn/qemu/优化手段分析.md",
            ),
            Reference::new("2", "https://www.bilibili.com/video/BV1XpnnzSEfm/"),
        ])
        .unwrap()
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  QEMU   Slides "), "qemu slides");
        assert_eq!(normalize_label("1"), "1");
        assert_eq!(normalize_label("Video\t2"), "video 2");
    }

    #[test]
    fn test_resolve_defined_labels() {
        let table = qemu_table();
        assert_eq!(
            table.resolve("1").unwrap().as_str(),
            "https://liuxocakn.org.cn/qemu/优化手段分析.md"
        );
        assert_eq!(
            table.resolve("2").unwrap(),
            &Target::Url("https://www.bilibili.com/video/BV1XpnnzSEfm/".to_string())
        );
    }

    #[test]
    fn test_resolve_missing_label() {
        let table = qemu_table();
        let err = table.resolve("3").unwrap_err();
        assert!(matches!(err, Error::MissingReference { ref label } if label == "3"));
    }

    #[test]
    fn test_resolve_case_insensitive() {
        let table =
            ReferenceTable::from_references([Reference::new("Slides", "a.pdf")]).unwrap();
        assert!(table.contains("slides"));
        assert!(table.contains("SLIDES"));
        assert_eq!(table.resolve("sLiDeS").unwrap().as_str(), "a.pdf");
    }

    #[test]
    fn test_duplicate_label_different_targets() {
        let err = ReferenceTable::from_references([
            Reference::new("1", "https://a.example/"),
            Reference::new("1", "https://b.example/"),
        ])
        .unwrap_err();

        match err {
            Error::DuplicateLabel {
                label,
                first,
                second,
            } => {
                assert_eq!(label, "1");
                assert_eq!(first, "https://a.example/");
                assert_eq!(second, "https://b.example/");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_redundant_definition_accepted() {
        let mut table = ReferenceTable::new();
        assert!(table.insert(Reference::new("1", "https://a.example/")).unwrap());
        assert!(!table.insert(Reference::new("1", "https://a.example/")).unwrap());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_relative_target_unchanged() {
        let table = ReferenceTable::from_references([Reference::new(
            "3",
            "docs/2025/qemu/qemu-docker.pdf",
        )])
        .unwrap();
        assert_eq!(
            table.resolve("3").unwrap(),
            &Target::RelativePath("docs/2025/qemu/qemu-docker.pdf".to_string())
        );
    }

    #[test]
    fn test_iteration_keeps_definition_order() {
        let table = ReferenceTable::from_references([
            Reference::new("b", "2.pdf"),
            Reference::new("a", "1.pdf"),
        ])
        .unwrap();
        let labels: Vec<_> = table.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a"]);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_serialize_as_list() {
        let table = qemu_table();
        let json = serde_json::to_value(&table).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 2);
    }
}
