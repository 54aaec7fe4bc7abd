//! dojo convert - Rewrite a bundle into the canonical catalog layout

use std::path::PathBuf;

use clap::Args;

use crate::analyze::Analyzer;
use crate::app::AppContext;
use crate::cli::output::HumanLayout;
use crate::convert::{ConversionResult, StructureConverter};
use crate::core::FetchedBundle;
use crate::error::Result;

use super::name::NamingDocument;
use super::{Verdict, emit, mark, read_json};

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Bundle directory produced by `dojo fetch`
    #[arg(long)]
    pub input: PathBuf,

    /// Catalog root; the entry is written under `{kind-plural}/{name}`
    #[arg(long)]
    pub output: PathBuf,

    /// Naming document written by `dojo name`
    #[arg(long)]
    pub naming: PathBuf,
}

pub fn run(ctx: &AppContext, args: &ConvertArgs) -> Result<Verdict> {
    let naming: NamingDocument = read_json(&args.naming)?;
    let kind = naming.decision.resource_kind;
    let bundle = FetchedBundle::open(&args.input, kind)?;

    let record = match naming.analysis {
        Some(analysis) => analysis.record,
        None => {
            tracing::debug!("naming document carries no analysis; analyzing bundle");
            Analyzer::new(ctx.config.analysis.clone())
                .analyze(&bundle)
                .into_value()
        }
    };

    let result = StructureConverter.convert(&bundle, &naming.decision, &record, &args.output)?;
    result.write_descriptor(&args.output)?;

    let warnings = result
        .skipped
        .iter()
        .map(|entry| format!("skipped {}: {}", entry.path, entry.reason))
        .collect();
    emit(ctx, &result, warnings, |result| render(ctx, result))?;
    Ok(Verdict::Pass)
}

pub(crate) fn render(ctx: &AppContext, result: &ConversionResult) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout
        .title(&format!("{} Converted {}", mark(ctx, true), result.canonical_name))
        .kv("Directory", &result.target_directory.display().to_string())
        .kv(
            "Primary document",
            &if result.synthesized {
                format!("{} (from template)", result.primary_document)
            } else {
                result.primary_document.clone()
            },
        );
    layout.blank().section("Files");
    for file in &result.created_files {
        layout.bullet(file);
    }
    layout
}
