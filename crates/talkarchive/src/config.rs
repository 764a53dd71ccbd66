//! Configuration management for talkarchive.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name inside the user config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file picked up from the working directory.
const LOCAL_CONFIG_FILE_NAME: &str = "talkarchive.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "talkarchive";

/// Prefix for environment overrides. Nested keys are split on `__`,
/// e.g. `TALKARCHIVE_ARCHIVE__DOCS_DIR`.
const ENV_PREFIX: &str = "TALKARCHIVE_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TALKARCHIVE_`)
/// 2. The file given with `--config`, or else `./talkarchive.toml` layered
///    over `~/.config/talkarchive/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Archive layout.
    pub archive: ArchiveConfig,
    /// Entry line grammar.
    pub parse: ParseConfig,
    /// Integrity checks.
    pub check: CheckConfig,
}

/// Archive layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory holding the year folders, relative to the archive root.
    pub docs_dir: PathBuf,
    /// Name of the Markdown file inside each year and topic folder.
    pub index_file: String,
    /// Regex a folder name must match to count as a year.
    pub year_pattern: String,
}

/// Entry parsing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Separators between title and speaker, tried in order.
    /// The last occurrence of the first separator found wins.
    pub separators: Vec<String>,
}

/// Integrity check configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Verify that relative-path targets exist on disk.
    pub check_assets: bool,
    /// Report labels that are defined but never used.
    pub report_unused: bool,
    /// Report entries that appear in more than one document.
    pub report_duplicate_entries: bool,
    /// Treat warnings as failures.
    pub strict: bool,
    /// Targets matching any of these regexes are never checked on disk.
    pub ignore_targets: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            index_file: "index.md".to_string(),
            year_pattern: r"^\d+$".to_string(),
        }
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            separators: default_separators(),
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            check_assets: true,
            report_unused: false,
            report_duplicate_entries: true,
            strict: false,
            ignore_targets: Vec::new(),
        }
    }
}

/// Default title/speaker separators, longest first.
fn default_separators() -> Vec<String> {
    vec![
        " —— ".to_string(),
        " — ".to_string(),
        " – ".to_string(),
        " - ".to_string(),
        " | ".to_string(),
        "：".to_string(),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        figment = match config_path {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment
                .merge(Toml::file(Self::default_config_path()))
                .merge(Toml::file(LOCAL_CONFIG_FILE_NAME)),
        };

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.archive.index_file.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "index_file must not be empty".to_string(),
            });
        }

        if regex::Regex::new(&self.archive.year_pattern).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid year_pattern: {}", self.archive.year_pattern),
            });
        }

        if self.parse.separators.is_empty() {
            return Err(Error::ConfigValidation {
                message: "separators must not be empty".to_string(),
            });
        }

        if let Some(blank) = self.parse.separators.iter().find(|s| s.trim().is_empty()) {
            return Err(Error::ConfigValidation {
                message: format!("separator {blank:?} is blank"),
            });
        }

        for pattern in &self.check.ignore_targets {
            if regex::Regex::new(pattern).is_err() {
                return Err(Error::ConfigValidation {
                    message: format!("invalid regex pattern: {pattern}"),
                });
            }
        }

        Ok(())
    }

    /// Get the docs directory for an archive rooted at `root`.
    ///
    /// An absolute `docs_dir` is returned as is.
    #[must_use]
    pub fn docs_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.archive.docs_dir)
    }
}
