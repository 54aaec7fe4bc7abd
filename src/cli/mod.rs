//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

pub mod commands;
pub mod output;

/// Dojo import - bring external skill and agent definitions into the catalog
#[derive(Parser, Debug)]
#[command(name = "dojo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable JSON output for machine consumption (same as --output-format=json).
    #[arg(long, global = true)]
    pub robot: bool,

    /// Output format (human, json, jsonl, plain)
    #[arg(long, short = 'O', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Enable machine-readable JSON output (shorthand for --output-format=json).
    #[arg(long, short = 'm', global = true)]
    pub machine: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/dojo/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective output format.
    ///
    /// Priority order:
    /// 1. `--output-format` → Explicit format
    /// 2. `--machine` / `--robot` → JSON format
    /// 3. Default → Human format
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        if let Some(fmt) = self.output_format {
            return fmt;
        }
        OutputFormat::from_args(self.machine || self.robot, None)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrieve a definition from a source reference
    Fetch(commands::fetch::FetchArgs),

    /// Extract metadata from a fetched bundle
    Analyze(commands::analyze::AnalyzeArgs),

    /// Assign the canonical name for an analysis record
    Name(commands::name::NameArgs),

    /// Compare a definition against an existing catalog
    Similarity(commands::similarity::SimilarityArgs),

    /// Rewrite a bundle into the canonical catalog layout
    Convert(commands::convert::ConvertArgs),

    /// Check a catalog entry against the layout rules
    Validate(commands::validate::ValidateArgs),

    /// Check that a definition's dependencies are installed
    Requirements(commands::requirements::RequirementsArgs),

    /// Run the whole pipeline from source reference to catalog entry
    Import(commands::import::ImportArgs),
}
