//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command and report its verdict

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::app::AppContext;
use crate::cli::Commands;
use crate::cli::output::{self, HumanLayout, OutputFormat};
use crate::core::SoftIssue;
use crate::error::{DojoError, Result};
use crate::utils::fs::ensure_dir;

pub mod analyze;
pub mod convert;
pub mod fetch;
pub mod import;
pub mod name;
pub mod requirements;
pub mod similarity;
pub mod validate;

/// Outcome of a command that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Conflict found, validation failed, or dependencies missing.
    Fail,
}

impl Verdict {
    #[must_use]
    pub const fn from_pass(pass: bool) -> Self {
        if pass { Self::Pass } else { Self::Fail }
    }
}

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<Verdict> {
    match command {
        Commands::Fetch(args) => fetch::run(ctx, args),
        Commands::Analyze(args) => analyze::run(ctx, args),
        Commands::Name(args) => name::run(ctx, args),
        Commands::Similarity(args) => similarity::run(ctx, args),
        Commands::Convert(args) => convert::run(ctx, args),
        Commands::Validate(args) => validate::run(ctx, args),
        Commands::Requirements(args) => requirements::run(ctx, args),
        Commands::Import(args) => import::run(ctx, args),
    }
}

/// Pretty JSON to `path`, creating parent directories.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    tracing::debug!(path = %path.display(), "wrote result document");
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(DojoError::NotFound(path.display().to_string()));
    }
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| {
        DojoError::InvalidInput(format!("{} is not a valid document: {err}", path.display()))
    })
}

/// Emit `data` in the context's format. `human` builds the text layout.
pub(crate) fn emit<T: Serialize>(
    ctx: &AppContext,
    data: &T,
    warnings: Vec<String>,
    human: impl FnOnce(&T) -> HumanLayout,
) -> Result<()> {
    if ctx.robot_mode {
        return output::emit_robot(&output::robot_ok(data).with_warnings(warnings), ctx.output_format);
    }
    if ctx.quiet {
        return Ok(());
    }
    let mut layout = human(data);
    if !warnings.is_empty() {
        layout.blank().section("Warnings");
        for warning in &warnings {
            layout.bullet(warning);
        }
    }
    output::emit_human(layout);
    Ok(())
}

pub(crate) fn issue_messages(issues: &[SoftIssue]) -> Vec<String> {
    issues.iter().map(|issue| issue.message.clone()).collect()
}

/// `✓`/`✗` marker, colored unless plain output was requested.
pub(crate) fn mark(ctx: &AppContext, ok: bool) -> String {
    use colored::Colorize;
    match (ok, ctx.output_format == OutputFormat::Human) {
        (true, true) => "✓".green().to_string(),
        (false, true) => "✗".red().to_string(),
        (true, false) => "ok".to_string(),
        (false, false) => "FAIL".to_string(),
    }
}
