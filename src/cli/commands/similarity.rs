//! dojo similarity - Compare a definition against an existing catalog

use std::path::{Path, PathBuf};

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::HumanLayout;
use crate::dedup::{Profile, SimilarityChecker, SimilarityReport, load_catalog};
use crate::error::{DojoError, Result};
use crate::utils::format::truncate_string;

use super::{Verdict, emit, issue_messages, mark, write_json};

#[derive(Args, Debug)]
pub struct SimilarityArgs {
    /// Candidate definition directory
    #[arg(long = "new")]
    pub candidate: PathBuf,

    /// Catalog directory holding one definition per subdirectory
    #[arg(long)]
    pub existing: PathBuf,

    /// Conflict threshold (default from config)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Write the similarity report here
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &AppContext, args: &SimilarityArgs) -> Result<Verdict> {
    let checker = SimilarityChecker::new(ctx.config.similarity.clone());
    let threshold = resolve_threshold(args.threshold, checker.config().threshold)?;

    let candidate = Profile::from_dir(&args.candidate, checker.config()).ok_or_else(|| {
        DojoError::NotFound(format!(
            "no primary document in {}",
            args.candidate.display()
        ))
    })?;
    let report = check_against(&checker, &candidate, &args.existing, threshold);

    if let Some(output) = &args.output {
        write_json(output, &report)?;
    }
    emit(ctx, &report, issue_messages(&report.issues), |report| render(ctx, report))?;
    Ok(Verdict::from_pass(!report.has_conflict))
}

/// Compare `candidate` with every profiled entry under `catalog_dir`.
pub(crate) fn check_against(
    checker: &SimilarityChecker,
    candidate: &Profile,
    catalog_dir: &Path,
    threshold: f64,
) -> SimilarityReport {
    let catalog = load_catalog(catalog_dir, checker.config());
    let mut report = checker.check(candidate, &catalog.value, threshold);
    report.issues.extend(catalog.issues);
    report
}

pub(crate) fn resolve_threshold(explicit: Option<f64>, default: f64) -> Result<f64> {
    let threshold = explicit.unwrap_or(default);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(DojoError::InvalidInput(format!(
            "threshold must be between 0 and 1, got {threshold}"
        )));
    }
    Ok(threshold)
}

pub(crate) fn render(ctx: &AppContext, report: &SimilarityReport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    let headline = if report.has_conflict {
        format!(
            "{} {} conflicts with {} catalog entr{}",
            mark(ctx, false),
            report.candidate.name,
            report.conflicts.len(),
            if report.conflicts.len() == 1 { "y" } else { "ies" }
        )
    } else {
        format!("{} {} has no conflicts", mark(ctx, true), report.candidate.name)
    };
    layout
        .title(&headline)
        .kv("Threshold", &format!("{:.2}", report.threshold))
        .kv("Compared", &report.compared.to_string());

    if !report.similarities.is_empty() {
        layout.blank().section("Most similar");
        for entry in &report.similarities {
            layout.bullet(&format!(
                "{:.3}  {}  (name {:.2}, title {:.2}, purpose {:.2}, keywords {:.2})",
                entry.score,
                truncate_string(&entry.name, 48),
                entry.fields.name,
                entry.fields.title,
                entry.fields.purpose,
                entry.fields.keywords
            ));
        }
    }
    layout
}
