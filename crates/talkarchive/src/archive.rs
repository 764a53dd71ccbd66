//! Archive layout: year folders and topic folders.
//!
//! ```text
//! docs/
//!   2025/
//!     index.md        # "# 2025 年度" + "- [QEMU](qemu)" ordering links
//!     qemu/index.md   # topic document
//!     rust/index.md
//!   2024/
//!     ...
//! ```
//!
//! Year folders are the children of the docs directory whose names match
//! `archive.year_pattern` (all digits by default), newest first. Topics are ordered by the year index first, then by name.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::check::{
    check_document, find_duplicate_entries, CheckOptions, Finding, FindingKind, Report,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::{ParsedDocument, Parser};

/// One topic folder and its document.
#[derive(Debug, Clone)]
pub struct Topic {
    /// Folder name.
    pub folder: String,
    /// Parsed index document.
    pub document: ParsedDocument,
}

impl Topic {
    /// Display title: the document's heading, else the folder name.
    #[must_use]
    pub fn title(&self) -> &str {
        self.document.title.as_deref().unwrap_or(&self.folder)
    }
}

/// One year folder.
#[derive(Debug, Clone)]
pub struct Year {
    /// Folder name.
    pub name: String,
    /// Heading of the year index, else the folder name.
    pub display_name: String,
    /// Folder path.
    pub path: PathBuf,
    /// Topics in display order.
    pub topics: Vec<Topic>,
}

/// A loaded archive.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Repository root.
    pub root: PathBuf,
    /// Directory holding the year folders.
    pub docs_dir: PathBuf,
    /// Years, newest first.
    pub years: Vec<Year>,
    /// Layout problems found while loading.
    pub issues: Vec<Finding>,
}

impl Archive {
    /// Load the archive rooted at `root`.
    ///
    /// The docs directory is `root/<docs_dir>` when it exists, else `root`
    /// itself. In that case, if `root` is named like the docs directory, its
    /// parent is taken as the repository root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `root` does not exist,
    /// [`Error::ConfigValidation`] if `year_pattern` does not compile, or an
    /// I/O error if a directory cannot be listed.
    pub fn load(root: &Path, config: &Config) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::NotFound {
                path: root.to_path_buf(),
            });
        }
        let configured = config.docs_dir(root);
        let (repo_root, docs_dir) = if configured.is_dir() {
            (root.to_path_buf(), configured)
        } else {
            (repository_root(root, config), root.to_path_buf())
        };
        debug!(
            root = %repo_root.display(),
            docs_dir = %docs_dir.display(),
            "loading archive"
        );

        let year_re =
            Regex::new(&config.archive.year_pattern).map_err(|e| Error::ConfigValidation {
                message: format!("invalid year_pattern: {e}"),
            })?;

        let parser = Parser::new(&config.parse);
        let index_file = config.archive.index_file.as_str();
        let mut issues = Vec::new();
        let mut years = Vec::new();

        for (name, path) in year_folders(&docs_dir, &year_re)? {
            years.push(load_year(name, path, &parser, index_file, &mut issues)?);
        }

        info!(
            years = years.len(),
            topics = years.iter().map(|y| y.topics.len()).sum::<usize>(),
            "archive loaded"
        );
        Ok(Self {
            root: repo_root,
            docs_dir,
            years,
            issues,
        })
    }

    /// All topic documents, in display order.
    pub fn documents(&self) -> impl Iterator<Item = &ParsedDocument> {
        self.years
            .iter()
            .flat_map(|y| y.topics.iter().map(|t| &t.document))
    }

    /// Run every check over the archive.
    #[must_use]
    pub fn check(&self, options: &CheckOptions) -> Report {
        let mut report = Report::default();
        report.extend(self.issues.iter().cloned());
        for doc in self.documents() {
            report.documents += 1;
            report.entries += doc.entries().count();
            report.extend(check_document(doc, options));
        }
        if options.report_duplicate_entries {
            report.extend(find_duplicate_entries(self.documents()));
        }
        report.sort();
        report
    }

    /// Count years, topics and entries.
    #[must_use]
    pub fn stats(&self) -> ArchiveStats {
        let years: Vec<YearStats> = self
            .years
            .iter()
            .map(|year| {
                let topics: Vec<TopicStats> = year
                    .topics
                    .iter()
                    .map(|topic| TopicStats {
                        folder: topic.folder.clone(),
                        title: topic.title().to_string(),
                        entries: topic.document.entries().count(),
                    })
                    .collect();
                YearStats {
                    name: year.name.clone(),
                    display_name: year.display_name.clone(),
                    entries: topics.iter().map(|t| t.entries).sum(),
                    topics,
                }
            })
            .collect();

        ArchiveStats {
            total_topics: years.iter().map(|y| y.topics.len()).sum(),
            total_entries: years.iter().map(|y| y.entries).sum(),
            years,
        }
    }
}

/// Entry count of one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    /// Folder name.
    pub folder: String,
    /// Display title.
    pub title: String,
    /// Number of entries.
    pub entries: usize,
}

/// Counts for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearStats {
    /// Folder name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Entries across topics.
    pub entries: usize,
    /// Per-topic counts.
    pub topics: Vec<TopicStats>,
}

/// Counts for the whole archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    /// Topics across years.
    pub total_topics: usize,
    /// Entries across years.
    pub total_entries: usize,
    /// Per-year counts, newest first.
    pub years: Vec<YearStats>,
}

/// `root` given as the docs directory itself: step up to the repository.
fn repository_root(root: &Path, config: &Config) -> PathBuf {
    let named_like_docs = root.file_name().is_some()
        && root.file_name() == config.archive.docs_dir.file_name();
    match root.parent() {
        Some(parent) if named_like_docs && parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) if named_like_docs => parent.to_path_buf(),
        _ => root.to_path_buf(),
    }
}

/// Subdirectories of `path`, symlinks followed.
fn list_dir(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| Error::file_read(path, e))? {
        let entry = entry?;
        let entry_path = entry.path();
        if !entry_path.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => dirs.push((name, entry_path)),
            Err(name) => warn!(folder = ?name, "skipping folder with a non-UTF-8 name"),
        }
    }
    Ok(dirs)
}

/// Folders named like years, newest first.
fn year_folders(docs_dir: &Path, year_re: &Regex) -> Result<Vec<(String, PathBuf)>> {
    let mut years: Vec<_> = list_dir(docs_dir)?
        .into_iter()
        .filter(|(name, _)| year_re.is_match(name))
        .collect();
    years.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| b.cmp(a)));
    Ok(years)
}

fn load_year(
    name: String,
    path: PathBuf,
    parser: &Parser,
    index_file: &str,
    issues: &mut Vec<Finding>,
) -> Result<Year> {
    let index_path = path.join(index_file);
    let mut display_name = name.clone();
    let mut ordering = Vec::new();

    if index_path.is_file() {
        match parser.read_index(&index_path) {
            Ok(index) => {
                if let Some(title) = index.title {
                    display_name = title;
                }
                let mut seen = HashSet::new();
                for link in index.ordering {
                    let folder = normalize_folder(&link.target);
                    if !folder.is_empty() && seen.insert(folder.clone()) {
                        ordering.push((folder, link.line));
                    }
                }
            }
            Err(e) => {
                warn!(year = %name, error = %e, "unreadable year index, using defaults");
                issues.push(Finding::new(
                    FindingKind::Unreadable,
                    Some(&index_path),
                    0,
                    e.to_string(),
                ));
            }
        }
    } else {
        info!(year = %name, "no year index, using folder name and default order");
    }

    let mut remaining: Vec<(String, PathBuf)> = list_dir(&path)?
        .into_iter()
        .filter(|(folder, _)| !folder.starts_with('.'))
        .collect();

    let mut ordered = Vec::new();
    for (folder, line) in ordering {
        if let Some(at) = remaining.iter().position(|(f, _)| *f == folder) {
            ordered.push(remaining.remove(at));
        } else {
            warn!(year = %name, topic = %folder, "ordered topic folder does not exist");
            issues.push(Finding::new(
                FindingKind::MissingTopic,
                Some(&index_path),
                line,
                format!("topic folder '{folder}' does not exist"),
            ));
        }
    }
    remaining.sort_by(|(a, _), (b, _)| a.cmp(b));
    ordered.extend(remaining);

    let mut topics = Vec::new();
    for (folder, topic_path) in ordered {
        let topic_index = topic_path.join(index_file);
        if !topic_index.is_file() {
            warn!(year = %name, topic = %folder, "topic folder has no index, skipped");
            issues.push(Finding::new(
                FindingKind::MissingIndex,
                Some(&topic_path),
                0,
                format!("no {index_file} in topic folder"),
            ));
            continue;
        }
        match parser.read_file(&topic_index) {
            Ok(document) => topics.push(Topic { folder, document }),
            Err(e) => {
                warn!(year = %name, topic = %folder, error = %e, "unreadable topic, skipped");
                issues.push(Finding::new(
                    FindingKind::Unreadable,
                    Some(&topic_index),
                    0,
                    e.to_string(),
                ));
            }
        }
    }

    debug!(year = %name, display_name = %display_name, topics = topics.len(), "loaded year");
    Ok(Year {
        name,
        display_name,
        path,
        topics,
    })
}

/// `./qemu/`, `qemu/index.md` and `qemu` all name the folder `qemu`.
fn normalize_folder(target: &str) -> String {
    let target = target.trim().trim_start_matches("./");
    let target = target
        .strip_suffix("index.md")
        .unwrap_or(target)
        .trim_matches('/');
    target.to_string()
}
