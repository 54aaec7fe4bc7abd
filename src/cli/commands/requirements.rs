//! dojo requirements - Check that a definition's dependencies are installed

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, OutputFormat};
use crate::error::Result;
use crate::requirements::{DependencyStatus, RequirementsChecker, RequirementsReport};

use super::{Verdict, emit, mark, write_json};

#[derive(Args, Debug)]
pub struct RequirementsArgs {
    /// Definition directory (fetched bundle or catalog entry)
    #[arg(long)]
    pub path: PathBuf,

    /// Write the requirements report here
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &AppContext, args: &RequirementsArgs) -> Result<Verdict> {
    let report = RequirementsChecker::new(ctx.config.requirements.clone()).check(&args.path)?;
    if let Some(output) = &args.output {
        write_json(output, &report)?;
    }
    emit(ctx, &report, Vec::new(), |report| render(ctx, report))?;
    Ok(Verdict::from_pass(report.all_satisfied))
}

pub(crate) fn render(ctx: &AppContext, report: &RequirementsReport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    let headline = if report.all_satisfied {
        "All dependencies satisfied".to_string()
    } else {
        format!("{} missing dependencies", report.missing().len())
    };
    layout.title(&format!("{} {headline}", mark(ctx, report.all_satisfied)));

    if report.dependencies.is_empty() {
        layout.push_line("No dependencies detected.");
        return layout;
    }
    group(ctx, &mut layout, "CLI tools", &report.cli_tools);
    group(ctx, &mut layout, "Python packages", &report.python_packages);
    group(ctx, &mut layout, "npm packages", &report.npm_packages);
    layout
}

fn group(ctx: &AppContext, layout: &mut HumanLayout, heading: &str, statuses: &[DependencyStatus]) {
    if statuses.is_empty() {
        return;
    }
    layout.section(heading);
    for status in statuses {
        let detail = status
            .version
            .clone()
            .or_else(|| status.path.as_ref().map(|p| p.display().to_string()))
            .or_else(|| status.note.clone())
            .unwrap_or_default();
        let marker = if status.checked {
            mark(ctx, status.installed)
        } else if ctx.output_format == OutputFormat::Human {
            "?".yellow().to_string()
        } else {
            "?".to_string()
        };
        layout.push_line(format!("  {marker} {:<24} {detail}", status.name));
    }
    layout.blank();
}
