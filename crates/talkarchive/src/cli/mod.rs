//! Command-line interface for talkarchive.
//!
//! This module provides the CLI structure for the `talkarc` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{CheckCommand, ConfigCommand, OutputFormat, ResolveCommand, StatsCommand};

/// talkarc - Keep a Markdown talk archive consistent
///
/// Parses the archive's talk lists and reference tables, resolves labeled
/// links, and reports dangling references, duplicate labels and missing
/// assets.
#[derive(Debug, Parser)]
#[command(name = "talkarc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check documents for dangling references, duplicate labels and missing assets
    Check(CheckCommand),

    /// Print a document with every link resolved
    Resolve(ResolveCommand),

    /// Count years, topics and talks
    Stats(StatsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn stats_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Stats(StatsCommand {
                path: PathBuf::from("."),
                json: false,
            }),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "talkarc");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(stats_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(stats_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(stats_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(stats_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_defaults() {
        let cli = Cli::try_parse_from(["talkarc", "check"]).unwrap();
        match cli.command {
            Command::Check(cmd) => {
                assert_eq!(cmd.path, PathBuf::from("."));
                assert!(!cmd.strict);
                assert!(!cmd.no_assets);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_flags() {
        let cli =
            Cli::try_parse_from(["talkarc", "check", "docs", "--strict", "--unused", "--json"])
                .unwrap();
        match cli.command {
            Command::Check(cmd) => {
                assert_eq!(cmd.path, PathBuf::from("docs"));
                assert!(cmd.strict);
                assert!(cmd.unused);
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_resolve_json() {
        let cli = Cli::try_parse_from([
            "talkarc",
            "resolve",
            "docs/2025/qemu/index.md",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Command::Resolve(cmd) => assert_eq!(cmd.format, OutputFormat::Json),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_resolve_requires_file() {
        assert!(Cli::try_parse_from(["talkarc", "resolve"]).is_err());
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::try_parse_from(["talkarc", "config", "validate", "talkarchive.toml"])
            .unwrap();
        match cli.command {
            Command::Config(ConfigCommand::Validate { file }) => {
                assert_eq!(file, Some(PathBuf::from("talkarchive.toml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["talkarc", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: None })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["talkarc", "-c", "/custom/talkarchive.toml", "stats"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/talkarchive.toml")));
    }

    #[test]
    fn test_parse_with_verbose_and_quiet() {
        let cli = Cli::try_parse_from(["talkarc", "-vv", "stats"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["talkarc", "-q", "stats"]).unwrap();
        assert!(cli.quiet);
    }
}
