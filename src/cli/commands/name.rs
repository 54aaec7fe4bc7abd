//! dojo name - Assign the canonical name for an analysis record

use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::app::AppContext;
use crate::cli::output::HumanLayout;
use crate::core::NamingDecision;
use crate::error::Result;
use crate::naming::Namer;

use super::analyze::AnalysisDocument;
use super::{Verdict, emit, read_json, write_json};

#[derive(Args, Debug)]
pub struct NameArgs {
    /// Analysis document written by `dojo analyze`
    #[arg(long)]
    pub input: PathBuf,

    /// Write the naming document here
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Naming document: the decision with the analysis it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingDocument {
    #[serde(flatten)]
    pub decision: NamingDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisDocument>,
}

pub fn run(ctx: &AppContext, args: &NameArgs) -> Result<Verdict> {
    let analysis: AnalysisDocument = read_json(&args.input)?;
    let decision = Namer.name(&analysis.record);
    let document = NamingDocument {
        decision,
        analysis: Some(analysis),
    };

    if let Some(output) = &args.output {
        write_json(output, &document)?;
    }
    emit(ctx, &document, Vec::new(), |doc| render(&doc.decision))?;
    Ok(Verdict::Pass)
}

pub(crate) fn render(decision: &NamingDecision) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout
        .title(&format!("Name: {}", decision.canonical_name))
        .kv("Original", &decision.original_name)
        .kv("Kebab", &decision.kebab_name)
        .kv("Sub-type", decision.sub_type.as_str())
        .kv("Target", &decision.target_path);
    layout
}
