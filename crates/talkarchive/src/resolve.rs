//! Label resolution and resolved output.
//!
//! Resolving a [`Document`] replaces every labeled link by the target its
//! reference table maps it to. The rendered forms are deterministic, so
//! rendering the same document twice yields the same text.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::model::{Document, Entry, LinkTarget, NamedLink, Target};

/// A named link with its final destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    /// Role text ("slides", "video", ...).
    pub role: String,
    /// Where the link points.
    pub target: Target,
}

/// An entry whose links have all been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntry {
    /// Talk title.
    pub title: String,
    /// Speaker, if the entry names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Resolved links in entry order.
    pub links: Vec<ResolvedLink>,
}

/// A section of resolved entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSection {
    /// Heading text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// Heading level, 0 for the leading untitled section.
    pub level: u8,
    /// Entries in document order.
    pub entries: Vec<ResolvedEntry>,
}

/// A document with every link resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDocument {
    /// Document title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Sections in document order.
    pub sections: Vec<ResolvedSection>,
}

impl Document {
    /// Resolve one link against this document's reference table.
    ///
    /// Inline links resolve to themselves.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingReference`] if the label is undefined.
    pub fn resolve_link(&self, link: &NamedLink) -> Result<Target> {
        match &link.target {
            LinkTarget::Inline(target) => Ok(target.clone()),
            LinkTarget::Label(label) => self.references.resolve(label).cloned(),
        }
    }

    /// Resolve every link of an entry.
    ///
    /// # Errors
    ///
    /// Returns the first missing-reference error.
    pub fn resolve_entry(&self, entry: &Entry) -> Result<ResolvedEntry> {
        let links = entry
            .links
            .iter()
            .map(|link| {
                Ok(ResolvedLink {
                    role: link.role.clone(),
                    target: self.resolve_link(link)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedEntry {
            title: entry.title.clone(),
            speaker: entry.speaker.clone(),
            links,
        })
    }

    /// Resolve the whole document.
    ///
    /// # Errors
    ///
    /// Returns the first missing-reference error, in document order.
    pub fn resolve(&self) -> Result<ResolvedDocument> {
        let sections = self
            .sections
            .iter()
            .map(|section| {
                Ok(ResolvedSection {
                    heading: section.heading.clone(),
                    level: section.level,
                    entries: section
                        .entries
                        .iter()
                        .map(|entry| self.resolve_entry(entry))
                        .collect::<Result<Vec<_>>>()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            path = ?self.path,
            entries = self.entry_count(),
            "resolved document"
        );
        Ok(ResolvedDocument {
            title: self.title.clone(),
            sections,
        })
    }
}

impl ResolvedDocument {
    /// Render as Markdown with every link written inline.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if let Some(heading) = &section.heading {
                if !out.is_empty() {
                    out.push('\n');
                }
                let level = usize::from(section.level.max(1));
                let _ = writeln!(out, "{} {heading}\n", "#".repeat(level));
            }
            for entry in &section.entries {
                let _ = writeln!(out, "- {}", entry.to_markdown());
            }
        }
        out
    }

    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ResolvedEntry {
    /// Render as a single Markdown list item body.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut line = self.title.clone();
        if let Some(speaker) = &self.speaker {
            let _ = write!(line, " - {speaker}");
        }
        if !self.links.is_empty() {
            let links: Vec<String> = self
                .links
                .iter()
                .map(|link| format!("[{}]({})", link.role, inline_destination(&link.target)))
                .collect();
            let _ = write!(line, " ({})", links.join(", "));
        }
        line
    }
}

/// Destinations with whitespace need angle brackets to stay one token.
fn inline_destination(target: &Target) -> String {
    let raw = target.as_str();
    if raw.chars().any(char::is_whitespace) {
        format!("<{raw}>")
    } else {
        raw.to_string()
    }
}
