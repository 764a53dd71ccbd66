//! Line-oriented reader for archive Markdown.
//!
//! Only the subset of Markdown the archive uses is understood:
//!
//! - ATX headings open sections; the first level-1 heading is the title.
//! - List items are talk entries:
//!   `title SEP speaker ([slides][1], [video](https://...))`.
//! - In a year index, a list item that is nothing but `[text](target)` is
//!   an ordering link for the topic folders. Elsewhere it is a talk whose
//!   title is the link text.
//! - `[label]: target "optional title"` lines are reference definitions.
//! - Fenced code blocks are skipped.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::config::ParseConfig;
use crate::error::{Error, Result};
use crate::model::{Document, Entry, NamedLink, Reference, Section};
use crate::reference::ReferenceTable;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ {0,3}(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").expect("Invalid regex pattern")
    })
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-*+]\s+(.*?)\s*$").expect("Invalid regex pattern"))
}

fn definition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^ {0,3}\[([^\]^][^\]]*)\]:\s*(?:<([^>]*)>|(\S+))(?:\s+(?:"[^"]*"|'[^']*'|\([^)]*\)))?\s*$"#,
        )
        .expect("Invalid regex pattern")
    })
}

fn ordering_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[([^\]]*)\]\(\s*([^)\s]*)\s*\)$").expect("Invalid regex pattern")
    })
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"\[([^\]]+)\](?:\[([^\]]*)\]|\(\s*(?:<([^>]*)>|((?:[^\s()<]|\([^\s()]*\))+))(?:\s+"[^"]*")?\s*\))?"#,
        )
        .expect("Invalid regex pattern")
    })
}

/// Role given to the link of a talk written as a bare `[title](target)`.
const LINK_ROLE: &str = "link";

/// A list item of the form `[text](target)` in a year index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingLink {
    /// Link text.
    pub text: String,
    /// Link target as written.
    pub target: String,
    /// 1-based source line.
    pub line: usize,
}

/// Everything read from one file, before the reference table is built.
///
/// Keeping the raw definitions lets the checker report every duplicate
/// instead of stopping at the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    /// Source path, if read from disk.
    pub path: Option<PathBuf>,
    /// First level-1 heading.
    pub title: Option<String>,
    /// Sections in document order.
    pub sections: Vec<Section>,
    /// Reference definitions in document order, duplicates included.
    pub definitions: Vec<Reference>,
    /// Ordering links in document order.
    pub ordering: Vec<OrderingLink>,
}

impl ParsedDocument {
    /// All entries across sections.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.sections.iter().flat_map(|s| s.entries.iter())
    }

    /// Build the reference table and produce a [`Document`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLabel`] if two definitions conflict.
    pub fn into_document(self) -> Result<Document> {
        let references = ReferenceTable::from_references(self.definitions)?;
        let document = Document::new(self.title, self.sections, references);
        Ok(match self.path {
            Some(path) => document.with_path(path),
            None => document,
        })
    }
}

/// Archive Markdown parser.
#[derive(Debug, Clone)]
pub struct Parser {
    separators: Vec<String>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(&ParseConfig::default())
    }
}

impl Parser {
    /// Create a parser from configuration.
    #[must_use]
    pub fn new(config: &ParseConfig) -> Self {
        Self {
            separators: config.separators.clone(),
        }
    }

    /// Read and parse a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileRead`] if the file cannot be read as UTF-8.
    pub fn read_file(&self, path: &Path) -> Result<ParsedDocument> {
        self.read(path, false)
    }

    /// Read and parse a year index, collecting ordering links.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileRead`] if the file cannot be read as UTF-8.
    pub fn read_index(&self, path: &Path) -> Result<ParsedDocument> {
        self.read(path, true)
    }

    fn read(&self, path: &Path, index: bool) -> Result<ParsedDocument> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let mut parsed = self.parse_text(&text, index);
        debug!(
            path = %path.display(),
            entries = parsed.entries().count(),
            definitions = parsed.definitions.len(),
            "parsed document"
        );
        parsed.path = Some(path.to_path_buf());
        Ok(parsed)
    }

    /// Parse Markdown text.
    #[must_use]
    pub fn parse(&self, text: &str) -> ParsedDocument {
        self.parse_text(text, false)
    }

    /// Parse a year index: single-link list items become ordering links.
    #[must_use]
    pub fn parse_index(&self, text: &str) -> ParsedDocument {
        self.parse_text(text, true)
    }

    fn parse_text(&self, text: &str, index: bool) -> ParsedDocument {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut doc = ParsedDocument::default();
        let mut fence: Option<&str> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim_start();

            if let Some(marker) = fence {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
                continue;
            }
            if let Some(marker) = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m)) {
                fence = Some(marker);
                continue;
            }

            if let Some(caps) = heading_re().captures(raw) {
                let level = u8::try_from(caps[1].len()).unwrap_or(6);
                let heading = caps[2].trim().to_string();
                if level == 1 && doc.title.is_none() {
                    doc.title = Some(heading.clone());
                }
                doc.sections.push(Section::new(heading, level));
                continue;
            }

            if let Some(caps) = definition_re().captures(raw) {
                let target = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
                let mut reference = Reference::new(caps[1].trim(), target);
                reference.line = line;
                doc.definitions.push(reference);
                continue;
            }

            if let Some(caps) = list_item_re().captures(raw) {
                let body = &caps[1];
                if body.is_empty() {
                    continue;
                }
                let entry = match ordering_re().captures(body) {
                    Some(link) if index => {
                        doc.ordering.push(OrderingLink {
                            text: link[1].trim().to_string(),
                            target: link[2].to_string(),
                            line,
                        });
                        continue;
                    }
                    Some(link) => Entry {
                        title: link[1].trim().to_string(),
                        speaker: None,
                        links: vec![NamedLink::inline(LINK_ROLE, &link[2])],
                        line,
                    },
                    None => self.parse_entry(body, line),
                };
                trace!(line, title = %entry.title, "entry");
                if doc.sections.is_empty() {
                    doc.sections.push(Section::default());
                }
                if let Some(section) = doc.sections.last_mut() {
                    section.entries.push(entry);
                }
            }
        }

        doc
    }

    /// Parse the body of one list item (marker already removed).
    #[must_use]
    pub fn parse_entry(&self, body: &str, line: usize) -> Entry {
        let body = body.trim();
        let (head, links) = match split_link_group(body) {
            Some((head, group)) => (head, parse_links(group)),
            None => (body, Vec::new()),
        };

        let (title, speaker) = self.split_speaker(head);
        Entry {
            title,
            speaker,
            links,
            line,
        }
    }

    fn split_speaker(&self, head: &str) -> (String, Option<String>) {
        for separator in &self.separators {
            if let Some(at) = head.rfind(separator.as_str()) {
                let title = head[..at].trim();
                let speaker = head[at + separator.len()..].trim();
                if title.is_empty() {
                    continue;
                }
                let speaker = (!speaker.is_empty()).then(|| speaker.to_string());
                return (title.to_string(), speaker);
            }
        }
        (head.trim().to_string(), None)
    }
}

/// Split `head (links)` into `head` and the text inside the trailing group.
///
/// The group must hold at least one bracketed link and nothing else but
/// link separators, so a title ending in "(part 2)" is left alone.
fn split_link_group(body: &str) -> Option<(&str, &str)> {
    let close = body.chars().next_back()?;
    if close != ')' && close != '）' {
        return None;
    }

    let mut depth = 0usize;
    for (at, c) in body.char_indices().rev() {
        match c {
            ')' | '）' => depth += 1,
            '(' | '（' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    // A `(` directly after `]` belongs to an inline link
                    if body[..at].ends_with(']') {
                        return None;
                    }
                    let group = &body[at + c.len_utf8()..body.len() - close.len_utf8()];
                    return is_link_group(group).then(|| (body[..at].trim_end(), group));
                }
            }
            _ => {}
        }
    }
    None
}

fn is_link_group(group: &str) -> bool {
    let re = link_re();
    if !re.is_match(group) {
        return false;
    }
    re.replace_all(group, "")
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, ',' | '，' | '、' | '|' | '/' | ';' | '；'))
}

fn parse_links(group: &str) -> Vec<NamedLink> {
    link_re()
        .captures_iter(group)
        .map(|caps| {
            let role = caps[1].trim().to_string();
            if let Some(url) = caps.get(3).or_else(|| caps.get(4)) {
                NamedLink::inline(role, url.as_str())
            } else {
                // `[role][]` and `[role]` both use the role as the label
                let label = caps
                    .get(2)
                    .map(|m| m.as_str().trim())
                    .filter(|l| !l.is_empty())
                    .unwrap_or(&role)
                    .to_string();
                NamedLink::labeled(role, label)
            }
        })
        .collect()
}

/// Parse Markdown text with the default grammar and build its document.
///
/// # Errors
///
/// Returns [`Error::DuplicateLabel`] if two definitions conflict.
pub fn parse_document(text: &str) -> Result<Document> {
    Parser::default().parse(text).into_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkTarget, Target};

    const QEMU_DOC: &str = "\
# QEMU

## TCG

- QEMU TCG IR 常见性能优化手段分析 - 李大 ([slides][1], [video][2])
- QEMU 容器化实践 —— 王二 ([slides][3])

## 其他

- 开放讨论

[1]: https://liuxocakn.org.cn/qemu/优化手段分析.md
[2]: https://www.bilibili.com/video/BV1XpnnzSEfm/
[3]: docs/2025/qemu/qemu-docker.pdf
";

    #[test]
    fn test_parse_title_and_sections() {
        let doc = Parser::default().parse(QEMU_DOC);
        assert_eq!(doc.title.as_deref(), Some("QEMU"));

        let headings: Vec<_> = doc
            .sections
            .iter()
            .map(|s| (s.heading.as_deref(), s.level))
            .collect();
        assert_eq!(
            headings,
            vec![(Some("QEMU"), 1), (Some("TCG"), 2), (Some("其他"), 2)]
        );
        assert_eq!(doc.sections[1].entries.len(), 2);
        assert_eq!(doc.sections[2].entries.len(), 1);
    }

    #[test]
    fn test_parse_entry_with_labeled_links() {
        let doc = Parser::default().parse(QEMU_DOC);
        let entry = &doc.sections[1].entries[0];

        assert_eq!(entry.title, "QEMU TCG IR 常见性能优化手段分析");
        assert_eq!(entry.speaker.as_deref(), Some("李大"));
        assert_eq!(
            entry.links,
            vec![
                NamedLink::labeled("slides", "1"),
                NamedLink::labeled("video", "2")
            ]
        );
        assert_eq!(entry.line, 5);
    }

    #[test]
    fn test_parse_definitions() {
        let doc = Parser::default().parse(QEMU_DOC);
        let labels: Vec<_> = doc.definitions.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3"]);
        assert_eq!(
            doc.definitions[2].target,
            Target::RelativePath("docs/2025/qemu/qemu-docker.pdf".to_string())
        );
        assert_eq!(doc.definitions[0].line, 12);
    }

    #[test]
    fn test_entry_without_links_or_speaker() {
        let doc = Parser::default().parse(QEMU_DOC);
        let entry = &doc.sections[2].entries[0];
        assert_eq!(entry.title, "开放讨论");
        assert!(entry.speaker.is_none());
        assert!(entry.links.is_empty());
    }

    #[test]
    fn test_double_dash_separator() {
        let entry = Parser::default().parse_entry("QEMU 容器化实践 —— 王二 ([slides][3])", 1);
        assert_eq!(entry.title, "QEMU 容器化实践");
        assert_eq!(entry.speaker.as_deref(), Some("王二"));
    }

    #[test]
    fn test_last_separator_wins() {
        let entry = Parser::default().parse_entry("Rust - 从入门到实践 - 张三 ([video][v])", 1);
        assert_eq!(entry.title, "Rust - 从入门到实践");
        assert_eq!(entry.speaker.as_deref(), Some("张三"));
    }

    #[test]
    fn test_inline_links() {
        let entry = Parser::default().parse_entry(
            "Talk - Speaker ([slides](slides/talk.pdf), [video](https://example.org/watch?v=1))",
            1,
        );
        assert_eq!(
            entry.links,
            vec![
                NamedLink::inline("slides", "slides/talk.pdf"),
                NamedLink::inline("video", "https://example.org/watch?v=1"),
            ]
        );
    }

    #[test]
    fn test_inline_link_with_parentheses() {
        let entry = Parser::default().parse_entry(
            "Talk - Speaker ([wiki](https://en.wikipedia.org/wiki/QEMU_(software)))",
            1,
        );
        assert_eq!(entry.title, "Talk");
        assert_eq!(
            entry.links,
            vec![NamedLink::inline(
                "wiki",
                "https://en.wikipedia.org/wiki/QEMU_(software)"
            )]
        );
    }

    #[test]
    fn test_angle_bracket_destination() {
        let entry = Parser::default().parse_entry("Talk - Speaker ([slides](<slides/my talk.pdf>))", 1);
        assert_eq!(entry.links, vec![NamedLink::inline("slides", "slides/my talk.pdf")]);
    }

    #[test]
    fn test_fullwidth_parentheses_and_separators() {
        let entry = Parser::default().parse_entry("议题 - 讲者（[slides][1]，[video][2]）", 1);
        assert_eq!(entry.title, "议题");
        assert_eq!(entry.speaker.as_deref(), Some("讲者"));
        assert_eq!(entry.links.len(), 2);
    }

    #[test]
    fn test_collapsed_and_shortcut_labels() {
        let entry = Parser::default().parse_entry("Talk - Speaker ([slides][], [video])", 1);
        assert_eq!(
            entry.links,
            vec![
                NamedLink::labeled("slides", "slides"),
                NamedLink::labeled("video", "video")
            ]
        );
    }

    #[test]
    fn test_plain_parenthetical_is_title_text() {
        let entry = Parser::default().parse_entry("Memory models (part 2) - Speaker", 1);
        assert_eq!(entry.title, "Memory models (part 2)");
        assert_eq!(entry.speaker.as_deref(), Some("Speaker"));
        assert!(entry.links.is_empty());

        let entry = Parser::default().parse_entry("Talk - Speaker (remote)", 1);
        assert_eq!(entry.speaker.as_deref(), Some("Speaker (remote)"));
    }

    #[test]
    fn test_ordering_links() {
        let doc = Parser::default().parse_index("# 2025 年度\n\n- [QEMU](qemu)\n- [Rust](rust)\n");
        assert_eq!(doc.title.as_deref(), Some("2025 年度"));
        assert_eq!(doc.ordering.len(), 2);
        assert_eq!(doc.ordering[0].target, "qemu");
        assert_eq!(doc.ordering[1].text, "Rust");
        assert_eq!(doc.entries().count(), 0);
    }

    #[test]
    fn test_single_link_item_is_a_talk_outside_index() {
        let doc = Parser::default().parse("# QEMU\n\n- [QEMU 容器化实践](gone.pdf)\n- a - b\n");
        assert!(doc.ordering.is_empty());

        let entries: Vec<_> = doc.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "QEMU 容器化实践");
        assert!(entries[0].speaker.is_none());
        assert_eq!(entries[0].links, vec![NamedLink::inline("link", "gone.pdf")]);
        assert_eq!(entries[0].line, 3);
    }

    #[test]
    fn test_read_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.md");
        std::fs::write(&path, "# 2025\n\n- [QEMU](qemu/)\n").unwrap();

        let index = Parser::default().read_index(&path).unwrap();
        assert_eq!(index.ordering.len(), 1);
        assert_eq!(index.entries().count(), 0);

        let topic = Parser::default().read_file(&path).unwrap();
        assert!(topic.ordering.is_empty());
        assert_eq!(topic.entries().count(), 1);
    }

    #[test]
    fn test_fenced_code_skipped() {
        let text = "# Doc\n\n```\n- not an entry\n[x]: nope\n```\n\n- real - entry\n";
        let doc = Parser::default().parse(text);
        assert_eq!(doc.entries().count(), 1);
        assert!(doc.definitions.is_empty());
    }

    #[test]
    fn test_entries_before_heading() {
        let doc = Parser::default().parse("- early - speaker\n\n# Title\n");
        assert_eq!(doc.sections[0].heading, None);
        assert_eq!(doc.sections[0].level, 0);
        assert_eq!(doc.sections[0].entries.len(), 1);
    }

    #[test]
    fn test_definition_forms() {
        let text = "[a]: <slides/my talk.pdf>\n[b]: https://example.org \"Title\"\n[^1]: footnote\n";
        let doc = Parser::default().parse(text);
        assert_eq!(doc.definitions.len(), 2);
        assert_eq!(doc.definitions[0].target.as_str(), "slides/my talk.pdf");
        assert_eq!(doc.definitions[1].target.as_str(), "https://example.org");
    }

    #[test]
    fn test_bom_and_crlf() {
        let doc = Parser::default().parse("\u{feff}# Title\r\n- a - b ([s][1])\r\n[1]: x.pdf\r\n");
        assert_eq!(doc.title.as_deref(), Some("Title"));
        assert_eq!(doc.definitions[0].target.as_str(), "x.pdf");
        assert_eq!(
            doc.entries().next().map(|e| e.links[0].target.clone()),
            Some(LinkTarget::Label("1".to_string()))
        );
    }

    #[test]
    fn test_custom_separators() {
        let parser = Parser::new(&ParseConfig {
            separators: vec![" by ".to_string()],
        });
        let entry = parser.parse_entry("Async Rust by Alice", 1);
        assert_eq!(entry.title, "Async Rust");
        assert_eq!(entry.speaker.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_into_document_duplicate_label() {
        let err = parse_document("[1]: a.pdf\n[1]: b.pdf\n").unwrap_err();
        assert!(err.is_duplicate_label());
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.md");
        std::fs::write(&path, QEMU_DOC).unwrap();

        let parsed = Parser::default().read_file(&path).unwrap();
        assert_eq!(parsed.path.as_deref(), Some(path.as_path()));

        let doc = parsed.into_document().unwrap();
        assert_eq!(doc.entry_count(), 3);
        assert_eq!(doc.references.len(), 3);
    }

    #[test]
    fn test_read_missing_file() {
        let err = Parser::default()
            .read_file(Path::new("/nonexistent/index.md"))
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
