//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Archive root, docs directory, or a single Markdown file
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Fail on warnings as well as errors
    #[arg(short, long)]
    pub strict: bool,

    /// Report reference labels that are never used
    #[arg(short, long)]
    pub unused: bool,

    /// Skip checking relative-path targets on disk
    #[arg(long)]
    pub no_assets: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Resolve command arguments.
#[derive(Debug, Args)]
pub struct ResolveCommand {
    /// Markdown document to resolve
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "markdown")]
    pub format: OutputFormat,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Archive root or docs directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Configuration file to validate (defaults to the user config file)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

/// Output format for resolved documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Markdown with every link written inline
    #[default]
    Markdown,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Markdown);
    }

    #[test]
    fn test_check_command_debug() {
        let cmd = CheckCommand {
            path: PathBuf::from("docs"),
            strict: true,
            unused: false,
            no_assets: false,
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("strict"));
        assert!(debug_str.contains("docs"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }

    #[test]
    fn test_output_format_debug() {
        assert_eq!(format!("{:?}", OutputFormat::Json), "Json");
    }
}
