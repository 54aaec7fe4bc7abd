//! dojo validate - Check a catalog entry against the layout rules

use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::HumanLayout;
use crate::core::ResourceKind;
use crate::error::Result;
use crate::validate::{Finding, ValidationReport, Validator};

use super::{Verdict, emit, mark, write_json};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Catalog entry directory
    #[arg(long)]
    pub path: PathBuf,

    /// Kind of the entry
    #[arg(long = "type", value_enum)]
    pub kind: ResourceKind,

    /// Write the validation report here
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &AppContext, args: &ValidateArgs) -> Result<Verdict> {
    let report = Validator.validate(&args.path, args.kind);
    if let Some(output) = &args.output {
        write_json(output, &report)?;
    }
    emit(ctx, &report, Vec::new(), |report| render(ctx, report))?;
    Ok(Verdict::from_pass(report.passed))
}

pub(crate) fn render(ctx: &AppContext, report: &ValidationReport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    let verdict = if report.passed { "passed" } else { "failed" };
    layout.title(&format!(
        "{} Validation {verdict}: {}",
        mark(ctx, report.passed),
        report.path.display()
    ));
    findings(&mut layout, "Errors", &report.errors);
    findings(&mut layout, "Warnings", &report.warnings);
    findings(&mut layout, "Info", &report.info);
    layout
}

fn findings(layout: &mut HumanLayout, heading: &str, items: &[Finding]) {
    if items.is_empty() {
        return;
    }
    layout.section(heading);
    for finding in items {
        let location = match (&finding.file, finding.line) {
            (Some(file), Some(line)) => format!(" [{file}:{line}]"),
            (Some(file), None) => format!(" [{file}]"),
            _ => String::new(),
        };
        layout.bullet(&format!("{}{location}", finding.message));
    }
    layout.blank();
}
