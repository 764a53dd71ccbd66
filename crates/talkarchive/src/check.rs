//! Integrity checks for archive documents.
//!
//! Unlike [`crate::Document::resolve`], which stops at the first problem,
//! the checker walks a whole [`ParsedDocument`] and reports every finding:
//!
//! - **dangling-reference**: an entry uses a label the document never defines.
//! - **duplicate-label**: a label is defined twice with different targets.
//! - **missing-asset**: a relative-path target is not a file in the repository.
//! - **redundant-definition**: a label is defined twice with the same target.
//! - **missing-speaker**: an entry has no title/speaker separator.
//! - **unused-reference**: a label is defined but never used (opt-in).
//! - **duplicate-entry**: the same talk appears in several documents.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use regex::RegexSet;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::CheckConfig;
use crate::error::{Error, Result};
use crate::model::{Entry, LinkTarget, Reference, Target};
use crate::parser::ParsedDocument;
use crate::reference::normalize_label;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Worth knowing, never fails a check.
    Info,
    /// Fails a check in strict mode.
    Warning,
    /// Always fails a check.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// Label used but not defined.
    DanglingReference,
    /// Label defined twice with different targets.
    DuplicateLabel,
    /// Label defined twice with the same target.
    RedundantDefinition,
    /// Relative-path target not found on disk.
    MissingAsset,
    /// Label defined but never used.
    UnusedReference,
    /// Entry without a speaker.
    MissingSpeaker,
    /// Same talk listed in more than one document.
    DuplicateEntry,
    /// Year index orders a topic folder that does not exist.
    MissingTopic,
    /// Topic folder without an index file.
    MissingIndex,
    /// A document could not be read.
    Unreadable,
}

impl FindingKind {
    /// Stable kebab-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DanglingReference => "dangling-reference",
            Self::DuplicateLabel => "duplicate-label",
            Self::RedundantDefinition => "redundant-definition",
            Self::MissingAsset => "missing-asset",
            Self::UnusedReference => "unused-reference",
            Self::MissingSpeaker => "missing-speaker",
            Self::DuplicateEntry => "duplicate-entry",
            Self::MissingTopic => "missing-topic",
            Self::MissingIndex => "missing-index",
            Self::Unreadable => "unreadable",
        }
    }

    /// Default severity of this kind.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::DanglingReference | Self::DuplicateLabel | Self::MissingAsset | Self::Unreadable => {
                Severity::Error
            }
            Self::RedundantDefinition
            | Self::MissingSpeaker
            | Self::MissingTopic
            | Self::MissingIndex => Severity::Warning,
            Self::UnusedReference | Self::DuplicateEntry => Severity::Info,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// File the finding is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// 1-based line, 0 when not tied to a line.
    pub line: usize,
    /// Severity.
    pub severity: Severity,
    /// Kind.
    pub kind: FindingKind,
    /// Human-readable description.
    pub message: String,
}

impl Finding {
    /// Create a finding with the kind's default severity.
    #[must_use]
    pub fn new(kind: FindingKind, path: Option<&Path>, line: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            line,
            severity: kind.severity(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(path), 0) => write!(f, "{}: ", path.display())?,
            (Some(path), line) => write!(f, "{}:{line}: ", path.display())?,
            (None, 0) => {}
            (None, line) => write!(f, "line {line}: ")?,
        }
        write!(f, "{}[{}]: {}", self.severity, self.kind, self.message)
    }
}

/// Settings for a check run.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Verify relative-path targets on disk.
    pub check_assets: bool,
    /// Report unused labels.
    pub report_unused: bool,
    /// Report talks listed in several documents.
    pub report_duplicate_entries: bool,
    /// Fail on warnings.
    pub strict: bool,
    /// Targets never checked on disk.
    pub ignore_targets: RegexSet,
    /// Repository root; relative targets are tried here after the
    /// document's own directory.
    pub root: Option<PathBuf>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            check_assets: true,
            report_unused: false,
            report_duplicate_entries: true,
            strict: false,
            ignore_targets: RegexSet::empty(),
            root: None,
        }
    }
}

impl CheckOptions {
    /// Build options from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if an ignore pattern does not compile.
    pub fn from_config(config: &CheckConfig) -> Result<Self> {
        let ignore_targets =
            RegexSet::new(&config.ignore_targets).map_err(|e| Error::ConfigValidation {
                message: format!("invalid ignore_targets pattern: {e}"),
            })?;
        Ok(Self {
            check_assets: config.check_assets,
            report_unused: config.report_unused,
            report_duplicate_entries: config.report_duplicate_entries,
            strict: config.strict,
            ignore_targets,
            root: None,
        })
    }

    /// Set the repository root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Find a relative-path target on disk.
    ///
    /// Tries the document's directory, then the repository root. A leading
    /// `/` anchors the path at the repository root only. Only regular files
    /// inside the repository root count (the working directory when no root
    /// is set). Returns the first match, or `None`.
    #[must_use]
    pub fn locate_asset(&self, target: &Target, base_dir: Option<&Path>) -> Option<PathBuf> {
        let path = target.asset_path()?;
        let root = self.root.as_deref().unwrap_or(Path::new("."));
        let boundary = root.canonicalize().ok()?;

        let mut candidates = Vec::with_capacity(2);
        if let Ok(rooted) = path.strip_prefix("/") {
            candidates.push(root.join(rooted));
        } else {
            candidates.push(base_dir.unwrap_or(Path::new(".")).join(&path));
            if self.root.is_some() {
                candidates.push(root.join(&path));
            }
        }
        candidates.into_iter().find(|candidate| {
            candidate.is_file()
                && candidate
                    .canonicalize()
                    .is_ok_and(|real| real.starts_with(&boundary))
        })
    }

    /// Like [`Self::locate_asset`], but a missing file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAsset`] if the target is not a file inside
    /// the repository.
    pub fn require_asset(&self, target: &Target, base_dir: Option<&Path>) -> Result<PathBuf> {
        self.locate_asset(target, base_dir)
            .ok_or_else(|| Error::MissingAsset {
                path: target
                    .asset_path()
                    .unwrap_or_else(|| PathBuf::from(target.as_str())),
            })
    }
}

/// The outcome of checking one or more documents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Documents checked.
    pub documents: usize,
    /// Entries seen.
    pub entries: usize,
    /// Findings, sorted by path and line.
    pub findings: Vec<Finding>,
}

impl Report {
    /// Add findings.
    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    /// Order findings by path, then line, then kind.
    pub fn sort(&mut self) {
        self.findings.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.line.cmp(&b.line))
                .then(a.kind.as_str().cmp(b.kind.as_str()))
        });
    }

    /// Number of findings at a severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Whether the check passed.
    #[must_use]
    pub fn is_success(&self, strict: bool) -> bool {
        self.count(Severity::Error) == 0 && (!strict || self.count(Severity::Warning) == 0)
    }
}

/// Check one document.
#[must_use]
pub fn check_document(doc: &ParsedDocument, options: &CheckOptions) -> Vec<Finding> {
    let path = doc.path.as_deref();
    let base_dir = path.and_then(Path::parent);
    let mut findings = Vec::new();

    // First definition of each label wins, as in ReferenceTable
    let mut defined: HashMap<String, &Reference> = HashMap::new();
    let mut unique = Vec::new();
    for reference in &doc.definitions {
        let key = normalize_label(&reference.label);
        match defined.get(&key) {
            Some(first) if first.target == reference.target => findings.push(Finding::new(
                FindingKind::RedundantDefinition,
                path,
                reference.line,
                format!(
                    "label [{}] already defined on line {} with the same target",
                    reference.label, first.line
                ),
            )),
            Some(first) => findings.push(Finding::new(
                FindingKind::DuplicateLabel,
                path,
                reference.line,
                format!(
                    "label [{}] already defined on line {} as '{}', redefined as '{}'",
                    reference.label, first.line, first.target, reference.target
                ),
            )),
            None => {
                defined.insert(key, reference);
                unique.push(reference);
            }
        }
    }

    let mut used = HashSet::new();
    for entry in doc.entries() {
        check_entry(entry, path, &defined, &mut used, &mut findings);
        if options.check_assets {
            for link in &entry.links {
                if let LinkTarget::Inline(target) = &link.target {
                    check_asset(target, entry.line, path, base_dir, options, &mut findings);
                }
            }
        }
    }

    for reference in unique {
        if options.check_assets {
            check_asset(&reference.target, reference.line, path, base_dir, options, &mut findings);
        }
        if options.report_unused && !used.contains(&normalize_label(&reference.label)) {
            findings.push(Finding::new(
                FindingKind::UnusedReference,
                path,
                reference.line,
                format!("label [{}] is never used", reference.label),
            ));
        }
    }

    debug!(
        path = ?path,
        findings = findings.len(),
        "checked document"
    );
    findings
}

fn check_entry(
    entry: &Entry,
    path: Option<&Path>,
    defined: &HashMap<String, &Reference>,
    used: &mut HashSet<String>,
    findings: &mut Vec<Finding>,
) {
    if entry.speaker.is_none() {
        findings.push(Finding::new(
            FindingKind::MissingSpeaker,
            path,
            entry.line,
            format!("entry '{}' names no speaker", entry.title),
        ));
    }

    for link in &entry.links {
        let Some(label) = link.label() else {
            continue;
        };
        let key = normalize_label(label);
        if defined.contains_key(&key) {
            used.insert(key);
        } else {
            findings.push(Finding::new(
                FindingKind::DanglingReference,
                path,
                entry.line,
                format!(
                    "[{}][{label}] in '{}' has no reference definition",
                    link.role, entry.title
                ),
            ));
        }
    }
}

fn check_asset(
    target: &Target,
    line: usize,
    path: Option<&Path>,
    base_dir: Option<&Path>,
    options: &CheckOptions,
    findings: &mut Vec<Finding>,
) {
    if !target.is_relative() || target.asset_path().is_none() {
        return;
    }
    if options.ignore_targets.is_match(target.as_str()) {
        trace!(target = %target, "ignored target");
        return;
    }
    if let Err(err) = options.require_asset(target, base_dir) {
        findings.push(Finding::new(FindingKind::MissingAsset, path, line, err.to_string()));
    }
}

/// Content hash identifying a talk across documents.
///
/// Title and speaker are whitespace-normalized and case-folded first.
#[must_use]
pub fn entry_fingerprint(entry: &Entry) -> String {
    let title = normalize_label(&entry.title);
    let speaker = entry.speaker.as_deref().map(normalize_label).unwrap_or_default();
    let mut hasher = blake3::Hasher::new();
    hasher.update(title.as_bytes());
    hasher.update(&[0x1f]);
    hasher.update(speaker.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Report talks that appear in more than one document.
///
/// Repeats inside one document are left alone; the first document to list
/// a talk owns it and every later document gets a finding.
#[must_use]
pub fn find_duplicate_entries<'a>(
    docs: impl IntoIterator<Item = &'a ParsedDocument>,
) -> Vec<Finding> {
    let mut seen: HashMap<String, (Option<&'a Path>, usize)> = HashMap::new();
    let mut findings = Vec::new();

    for doc in docs {
        let path = doc.path.as_deref();
        for entry in doc.entries() {
            let fingerprint = entry_fingerprint(entry);
            match seen.get(&fingerprint) {
                Some(&(first_path, first_line)) if first_path != path => {
                    let first = first_path.map_or_else(String::new, |p| p.display().to_string());
                    findings.push(Finding::new(
                        FindingKind::DuplicateEntry,
                        path,
                        entry.line,
                        format!("'{}' is also listed at {first}:{first_line}", entry.title),
                    ));
                }
                Some(_) => {}
                None => {
                    seen.insert(fingerprint, (path, entry.line));
                }
            }
        }
    }

    findings
}

/// Check a set of standalone documents and build a report.
#[must_use]
pub fn check_documents(docs: &[ParsedDocument], options: &CheckOptions) -> Report {
    let mut report = Report::default();
    for doc in docs {
        report.documents += 1;
        report.entries += doc.entries().count();
        report.extend(check_document(doc, options));
    }
    if options.report_duplicate_entries {
        report.extend(find_duplicate_entries(docs));
    }
    report.sort();
    report
}
