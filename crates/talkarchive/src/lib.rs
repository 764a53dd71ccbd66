//! `talkarchive` - structural model of a Markdown talk archive
//!
//! Parses talk lists (title, speaker, named links) and per-document reference
//! tables, resolves labeled links, and checks that every label is defined
//! once, every used label exists, and every local asset is present.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod archive;
pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod parser;
pub mod reference;
pub mod resolve;

pub use archive::{Archive, ArchiveStats};
pub use check::{check_document, CheckOptions, Finding, FindingKind, Report, Severity};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{Document, Entry, LinkTarget, NamedLink, Reference, Section, Target};
pub use parser::{parse_document, ParsedDocument, Parser};
pub use reference::ReferenceTable;
pub use resolve::{ResolvedDocument, ResolvedEntry, ResolvedLink};
