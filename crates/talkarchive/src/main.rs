//! `talkarc` - CLI for talkarchive
//!
//! This binary checks, resolves and summarizes a Markdown talk archive.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use talkarchive::check::check_documents;
use talkarchive::cli::{
    CheckCommand, Cli, Command, ConfigCommand, OutputFormat, ResolveCommand, StatsCommand,
};
use talkarchive::{init_logging, Archive, CheckOptions, Config, Report, Severity};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    // Execute the command
    match cli.command {
        Command::Check(check_cmd) => handle_check(&config, &check_cmd),
        Command::Resolve(resolve_cmd) => {
            handle_resolve(&config, &resolve_cmd)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Stats(stats_cmd) => {
            handle_stats(&config, &stats_cmd)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_check(config: &Config, cmd: &CheckCommand) -> anyhow::Result<ExitCode> {
    let mut options = CheckOptions::from_config(&config.check)?;
    options.strict |= cmd.strict;
    options.report_unused |= cmd.unused;
    if cmd.no_assets {
        options.check_assets = false;
    }

    let report = if cmd.path.is_file() {
        let parsed = talkarchive::Parser::new(&config.parse)
            .read_file(&cmd.path)
            .with_context(|| format!("reading {}", cmd.path.display()))?;
        let root = std::env::current_dir().context("resolving current directory")?;
        check_documents(&[parsed], &options.clone().with_root(root))
    } else {
        let archive = Archive::load(&cmd.path, config)
            .with_context(|| format!("loading archive at {}", cmd.path.display()))?;
        archive.check(&options.clone().with_root(&archive.root))
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.is_success(options.strict) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &Report) {
    for finding in &report.findings {
        println!("{finding}");
    }
    if !report.findings.is_empty() {
        println!();
    }
    println!(
        "Checked {} documents, {} talks: {} errors, {} warnings, {} notes",
        report.documents,
        report.entries,
        report.count(Severity::Error),
        report.count(Severity::Warning),
        report.count(Severity::Info),
    );
}

fn handle_resolve(config: &Config, cmd: &ResolveCommand) -> anyhow::Result<()> {
    let document = talkarchive::Parser::new(&config.parse)
        .read_file(&cmd.file)?
        .into_document()
        .with_context(|| format!("building reference table for {}", cmd.file.display()))?;
    let resolved = document
        .resolve()
        .with_context(|| format!("resolving {}", cmd.file.display()))?;

    match cmd.format {
        OutputFormat::Markdown => print!("{}", resolved.to_markdown()),
        OutputFormat::Json => println!("{}", resolved.to_json()?),
    }
    Ok(())
}

fn handle_stats(config: &Config, cmd: &StatsCommand) -> anyhow::Result<()> {
    let archive = Archive::load(&cmd.path, config)
        .with_context(|| format!("loading archive at {}", cmd.path.display()))?;
    let stats = archive.stats();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    for year in &stats.years {
        println!(
            "{} ({}): {} topics, {} talks",
            year.display_name,
            year.name,
            year.topics.len(),
            year.entries
        );
        for topic in &year.topics {
            println!("  {:<32} {:>4}", topic.title, topic.entries);
        }
    }
    println!();
    println!(
        "Total: {} topics, {} talks",
        stats.total_topics, stats.total_entries
    );
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Archive]");
                println!("  Docs dir:           {}", config.archive.docs_dir.display());
                println!("  Index file:         {}", config.archive.index_file);
                println!("  Year pattern:       {}", config.archive.year_pattern);
                println!();
                println!("[Parse]");
                println!("  Separators:         {:?}", config.parse.separators);
                println!();
                println!("[Check]");
                println!("  Check assets:       {}", config.check.check_assets);
                println!("  Report unused:      {}", config.check.report_unused);
                println!(
                    "  Duplicate entries:  {}",
                    config.check.report_duplicate_entries
                );
                println!("  Strict:             {}", config.check.strict);
                println!(
                    "  Ignored targets:    {}",
                    config.check.ignore_targets.len()
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            if !path.is_file() {
                println!("Configuration file not found; defaults apply.");
            }
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
