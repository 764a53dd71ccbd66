//! Core archive types.
//!
//! A [`Document`] is an ordered list of [`Section`]s holding talk
//! [`Entry`] records, plus the [`ReferenceTable`] that its labeled links are
//! resolved against.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::reference::ReferenceTable;

/// Where a named link points before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LinkTarget {
    /// `[role][label]`: looked up in the document's reference table.
    Label(String),
    /// `[role](target)`: written out in the entry itself.
    Inline(Target),
}

/// A link attached to an entry, named by its role ("slides", "video", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLink {
    /// Role text shown to the reader.
    pub role: String,
    /// Label or inline target.
    pub target: LinkTarget,
}

impl NamedLink {
    /// A link that goes through the reference table.
    #[must_use]
    pub fn labeled(role: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            target: LinkTarget::Label(label.into()),
        }
    }

    /// A link with its target written inline.
    #[must_use]
    pub fn inline(role: impl Into<String>, target: impl AsRef<str>) -> Self {
        Self {
            role: role.into(),
            target: LinkTarget::Inline(Target::parse(target.as_ref())),
        }
    }

    /// The label, if this link is resolved through the reference table.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match &self.target {
            LinkTarget::Label(label) => Some(label),
            LinkTarget::Inline(_) => None,
        }
    }
}

/// One talk record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Talk title.
    pub title: String,
    /// Speaker name(s); absent when the line has no separator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Links in the order they were written.
    pub links: Vec<NamedLink>,
    /// 1-based source line, 0 when built in code.
    #[serde(default)]
    pub line: usize,
}

impl Entry {
    /// Create an entry with no links.
    #[must_use]
    pub fn new(title: impl Into<String>, speaker: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            speaker: Some(speaker.into()),
            links: Vec::new(),
            line: 0,
        }
    }

    /// Append a link.
    #[must_use]
    pub fn with_link(mut self, link: NamedLink) -> Self {
        self.links.push(link);
        self
    }

    /// Look up a link by role (case-insensitive).
    #[must_use]
    pub fn link(&self, role: &str) -> Option<&NamedLink> {
        self.links
            .iter()
            .find(|link| link.role.eq_ignore_ascii_case(role))
    }

    /// Labels used by this entry, in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.links.iter().filter_map(NamedLink::label)
    }
}

/// A label-to-target definition (`[label]: target`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Label as written.
    pub label: String,
    /// Where the label points.
    pub target: Target,
    /// 1-based source line, 0 when built in code.
    #[serde(default)]
    pub line: usize,
}

impl Reference {
    /// Create a reference.
    #[must_use]
    pub fn new(label: impl Into<String>, target: impl AsRef<str>) -> Self {
        Self {
            label: label.into(),
            target: Target::parse(target.as_ref()),
            line: 0,
        }
    }
}

/// A link destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// A fully-qualified URL (has a scheme).
    Url(String),
    /// A path to an asset stored alongside the documents.
    RelativePath(String),
}

impl Target {
    /// Classify a raw target string.
    ///
    /// Anything with a URI scheme (`https:`, `mailto:`, ...) or a leading
    /// `//` is a URL; everything else is a relative path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("//") || has_scheme(raw) {
            Self::Url(raw.to_string())
        } else {
            Self::RelativePath(raw.to_string())
        }
    }

    /// The target exactly as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(s) | Self::RelativePath(s) => s,
        }
    }

    /// Check if this is a relative path.
    #[must_use]
    pub fn is_relative(&self) -> bool {
        matches!(self, Self::RelativePath(_))
    }

    /// The on-disk part of a relative path: anchor and query removed,
    /// percent-escapes decoded. `None` for URLs and for pure anchors.
    #[must_use]
    pub fn asset_path(&self) -> Option<PathBuf> {
        let Self::RelativePath(raw) = self else {
            return None;
        };
        let end = raw.find(['#', '?']).unwrap_or(raw.len());
        let path = &raw[..end];
        if path.is_empty() {
            return None;
        }
        let decoded = urlencoding::decode_binary(path.as_bytes());
        Some(PathBuf::from(String::from_utf8_lossy(&decoded).into_owned()))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":".
/// Single letters are rejected so Windows drive paths stay relative.
fn has_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// A headed group of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text; `None` for entries that precede any heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// Heading level (1-6), 0 for the leading untitled section.
    pub level: u8,
    /// Entries in document order.
    pub entries: Vec<Entry>,
}

impl Section {
    /// Create an empty section.
    #[must_use]
    pub fn new(heading: impl Into<String>, level: u8) -> Self {
        Self {
            heading: Some(heading.into()),
            level,
            entries: Vec::new(),
        }
    }
}

/// One Markdown file: its sections and the reference table it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Source path, if loaded from disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// First level-1 heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Sections in document order.
    pub sections: Vec<Section>,
    /// Reference definitions, owned by this document.
    pub references: ReferenceTable,
}

impl Document {
    /// Assemble a document from parts.
    #[must_use]
    pub fn new(title: Option<String>, sections: Vec<Section>, references: ReferenceTable) -> Self {
        Self {
            path: None,
            title,
            sections,
            references,
        }
    }

    /// Attach a source path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Directory containing the source file, if any.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// All entries across sections, in document order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.sections.iter().flat_map(|s| s.entries.iter())
    }

    /// Number of entries across sections.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }
}
