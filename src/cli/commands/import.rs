//! dojo import - Run the whole pipeline from source reference to catalog entry
//!
//! Stages run strictly in order: fetch, analyze, name, similarity, convert,
//! validate, requirements. With `--work-dir` every intermediate document is
//! kept on disk so a failed later stage can be retried on its own.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{info, warn};

use crate::analyze::Analyzer;
use crate::app::AppContext;
use crate::cli::output::HumanLayout;
use crate::convert::{ConversionResult, StructureConverter};
use crate::core::{AnalysisRecord, NamingDecision, ResourceKind};
use crate::dedup::{Profile, SimilarityChecker, SimilarityReport};
use crate::error::Result;
use crate::fetch::{Fetcher, SourceReference};
use crate::naming::Namer;
use crate::requirements::{RequirementsChecker, RequirementsReport};
use crate::utils::fs::read_optional;
use crate::validate::{ValidationReport, Validator};

use super::analyze::AnalysisDocument;
use super::name::NamingDocument;
use super::similarity::{check_against, resolve_threshold};
use super::{Verdict, emit, issue_messages, mark, write_json};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Source reference (URL or local path)
    #[arg(long)]
    pub source: String,

    /// Kind of definition being imported
    #[arg(long = "type", value_enum)]
    pub kind: ResourceKind,

    /// Catalog root holding `skills/` and `agents/`
    #[arg(long)]
    pub catalog: PathBuf,

    /// Keep fetched files and stage documents here (default: temporary)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Conflict threshold (default from config)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Convert even when a similar entry already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported,
    /// Stopped before conversion.
    Conflict,
    /// Converted but the entry failed validation.
    Invalid,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub outcome: ImportOutcome,
    pub source: String,
    pub resource_kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_directory: Option<PathBuf>,
    pub fetched_files: usize,
    pub analysis: AnalysisRecord,
    pub naming: NamingDecision,
    pub similarity: SimilarityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<RequirementsReport>,
}

/// Where intermediate files go for one run.
enum WorkArea {
    Kept(PathBuf),
    Scratch(TempDir),
}

impl WorkArea {
    fn open(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(Self::Kept(dir.to_path_buf()))
            }
            None => Ok(Self::Scratch(TempDir::new()?)),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Kept(dir) => dir,
            Self::Scratch(temp) => temp.path(),
        }
    }

    fn kept(&self) -> Option<&Path> {
        match self {
            Self::Kept(dir) => Some(dir),
            Self::Scratch(_) => None,
        }
    }
}

pub fn run(ctx: &AppContext, args: &ImportArgs) -> Result<Verdict> {
    let (report, warnings) = import(ctx, args)?;
    emit(ctx, &report, warnings, |report| render(ctx, report))?;
    Ok(Verdict::from_pass(report.outcome == ImportOutcome::Imported))
}

/// Run every stage and collect the soft warnings raised along the way.
pub fn import(ctx: &AppContext, args: &ImportArgs) -> Result<(ImportReport, Vec<String>)> {
    let checker = SimilarityChecker::new(ctx.config.similarity.clone());
    let threshold = resolve_threshold(args.threshold, checker.config().threshold)?;
    let work = WorkArea::open(args.work_dir.as_deref())?;
    let mut warnings = Vec::new();

    let reference = SourceReference::parse(args.source.as_str());
    let bundle = Fetcher::new(ctx.config.fetch.clone()).fetch(
        &reference,
        args.kind,
        &work.path().join("fetched"),
    )?;
    warnings.extend(
        bundle
            .skipped
            .iter()
            .map(|entry| format!("fetch skipped {}: {}", entry.path, entry.reason)),
    );

    let assessed = Analyzer::new(ctx.config.analysis.clone()).analyze(&bundle);
    warnings.extend(issue_messages(&assessed.issues));
    let analysis = AnalysisDocument {
        record: assessed.value,
        issues: assessed.issues,
    };
    let naming = Namer.name(&analysis.record);
    info!(canonical = %naming.canonical_name, "named");

    let primary = analysis
        .record
        .primary_document
        .as_deref()
        .map(|doc| read_optional(bundle.root.join(doc)))
        .transpose()?
        .flatten()
        .unwrap_or_default();
    let candidate = Profile::from_document(
        naming.canonical_name.as_str(),
        &bundle.root,
        &primary,
        checker.config(),
    );
    let similarity = check_against(
        &checker,
        &candidate,
        &args.catalog.join(args.kind.plural()),
        threshold,
    );
    warnings.extend(issue_messages(&similarity.issues));

    if let Some(dir) = work.kept() {
        write_json(&dir.join("analysis.json"), &analysis)?;
        write_json(
            &dir.join("naming.json"),
            &NamingDocument {
                decision: naming.clone(),
                analysis: Some(analysis.clone()),
            },
        )?;
        write_json(&dir.join("similarity.json"), &similarity)?;
    }

    let mut report = ImportReport {
        outcome: ImportOutcome::Conflict,
        source: args.source.clone(),
        resource_kind: args.kind,
        work_directory: work.kept().map(Path::to_path_buf),
        fetched_files: bundle.files.len(),
        analysis: analysis.record,
        naming,
        similarity,
        conversion: None,
        validation: None,
        requirements: None,
    };

    if report.similarity.has_conflict {
        if !args.force {
            warn!(
                conflicts = report.similarity.conflicts.len(),
                "similar catalog entries found; not converting"
            );
            return Ok((report, warnings));
        }
        warnings.push(format!(
            "converted despite {} similar catalog entries (--force)",
            report.similarity.conflicts.len()
        ));
    }

    let conversion =
        StructureConverter.convert(&bundle, &report.naming, &report.analysis, &args.catalog)?;
    if let Some(dir) = work.kept() {
        conversion.write_descriptor(dir)?;
    }
    warnings.extend(
        conversion
            .skipped
            .iter()
            .map(|entry| format!("convert skipped {}: {}", entry.path, entry.reason)),
    );

    let validation = Validator.validate(&conversion.target_directory, args.kind);
    report.outcome = if validation.passed {
        ImportOutcome::Imported
    } else {
        ImportOutcome::Invalid
    };

    match RequirementsChecker::new(ctx.config.requirements.clone())
        .check(&conversion.target_directory)
    {
        Ok(requirements) => {
            for missing in requirements.missing() {
                warnings.push(format!("dependency not installed: {}", missing.name));
            }
            report.requirements = Some(requirements);
        }
        Err(err) => warnings.push(format!("requirements check skipped: {err}")),
    }

    report.conversion = Some(conversion);
    report.validation = Some(validation);
    info!(outcome = ?report.outcome, name = %report.naming.canonical_name, "import finished");
    Ok((report, warnings))
}

fn render(ctx: &AppContext, report: &ImportReport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    let headline = match report.outcome {
        ImportOutcome::Imported => format!("{} Imported {}", mark(ctx, true), report.naming.target_path),
        ImportOutcome::Conflict => format!(
            "{} Not imported: {} is too similar to existing entries",
            mark(ctx, false),
            report.naming.canonical_name
        ),
        ImportOutcome::Invalid => format!(
            "{} Imported {} but validation failed",
            mark(ctx, false),
            report.naming.target_path
        ),
    };
    layout
        .title(&headline)
        .kv("Source", &report.source)
        .kv("Files fetched", &report.fetched_files.to_string())
        .kv("Original name", &report.naming.original_name)
        .kv("Canonical name", &report.naming.canonical_name)
        .kv("Compared", &report.similarity.compared.to_string());

    if !report.similarity.conflicts.is_empty() {
        layout.blank().section("Similar entries");
        for entry in &report.similarity.conflicts {
            layout.bullet(&format!("{:.3}  {}", entry.score, entry.name));
        }
    }
    if let Some(validation) = &report.validation {
        layout.blank();
        for finding in validation.errors.iter().chain(&validation.warnings) {
            layout.bullet(&finding.message);
        }
        layout.kv(
            "Validation",
            if validation.passed { "passed" } else { "failed" },
        );
    }
    if let Some(requirements) = &report.requirements {
        layout.kv(
            "Dependencies",
            &format!(
                "{} detected, {} missing",
                requirements.statuses().count(),
                requirements.missing().len()
            ),
        );
    }
    layout
}
