//! dojo analyze - Extract metadata from a fetched bundle

use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::analyze::Analyzer;
use crate::app::AppContext;
use crate::cli::output::HumanLayout;
use crate::core::{AnalysisRecord, FetchedBundle, ResourceKind, SoftIssue};
use crate::error::Result;

use super::{Verdict, emit, issue_messages, write_json};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Bundle directory produced by `dojo fetch` (or any directory)
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Kind of definition in the bundle
    #[arg(long = "type", value_enum)]
    pub kind: ResourceKind,

    /// Write the analysis document here
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Analysis document: the record plus whatever was defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDocument {
    #[serde(flatten)]
    pub record: AnalysisRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<SoftIssue>,
}

pub fn run(ctx: &AppContext, args: &AnalyzeArgs) -> Result<Verdict> {
    let bundle = FetchedBundle::open(&args.input_dir, args.kind)?;
    let assessed = Analyzer::new(ctx.config.analysis.clone()).analyze(&bundle);
    let document = AnalysisDocument {
        record: assessed.value,
        issues: assessed.issues,
    };

    if let Some(output) = &args.output {
        write_json(output, &document)?;
    }
    emit(ctx, &document, issue_messages(&document.issues), render)?;
    Ok(Verdict::Pass)
}

pub(crate) fn render(document: &AnalysisDocument) -> HumanLayout {
    let record = &document.record;
    let mut layout = HumanLayout::new();
    layout
        .title(&format!("Analysis: {}", display_or_dash(&record.original_name)))
        .kv("Kind", record.resource_kind.as_str())
        .kv("Description", display_or_dash(&record.description))
        .kv("Purpose", display_or_dash(&record.purpose))
        .kv("Scope", display_or_dash(&record.scope))
        .kv("Autonomy", &format!("{:?}", record.autonomy_level).to_lowercase())
        .kv("Scripts", yes_no(record.has_scripts))
        .kv("Workflow", yes_no(record.has_workflow));

    let c = record.characteristics;
    let traits: Vec<&str> = [
        (c.procedural, "procedural"),
        (c.single_action, "single-action"),
        (c.conditional, "conditional"),
        (c.orchestrator, "orchestrator"),
        (c.specialist, "specialist"),
    ]
    .into_iter()
    .filter_map(|(on, label)| on.then_some(label))
    .collect();
    let traits = traits.join(", ");
    layout.kv("Characteristics", display_or_dash(&traits));

    if !record.dependencies.is_empty() {
        layout.blank().section("Dependencies");
        for dep in &record.dependencies {
            layout.bullet(dep);
        }
    }
    layout
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
