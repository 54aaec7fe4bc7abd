//! dojo fetch - Retrieve a definition from a source reference

use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::HumanLayout;
use crate::core::{FetchedBundle, ResourceKind};
use crate::error::Result;
use crate::fetch::{Fetcher, SourceReference};
use crate::utils::format::format_size;

use super::{Verdict, emit, mark};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Source reference (URL or local path)
    #[arg(long)]
    pub source: String,

    /// Kind of definition being fetched
    #[arg(long = "type", value_enum)]
    pub kind: ResourceKind,

    /// Directory to materialize files into
    #[arg(long)]
    pub output_dir: PathBuf,
}

pub fn run(ctx: &AppContext, args: &FetchArgs) -> Result<Verdict> {
    let reference = SourceReference::parse(args.source.as_str());
    let bundle = Fetcher::new(ctx.config.fetch.clone()).fetch(&reference, args.kind, &args.output_dir)?;

    let warnings = bundle
        .skipped
        .iter()
        .map(|entry| format!("skipped {}: {}", entry.path, entry.reason))
        .collect();
    emit(ctx, &bundle, warnings, |bundle| render(ctx, bundle))?;
    Ok(Verdict::Pass)
}

fn render(ctx: &AppContext, bundle: &FetchedBundle) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout
        .title(&format!("{} Fetched {}", mark(ctx, true), bundle.source))
        .kv("Origin", bundle.origin_kind.as_str())
        .kv("Kind", bundle.resource_kind.as_str())
        .kv("Directory", &bundle.root.display().to_string())
        .kv("Files", &bundle.files.len().to_string());
    if let Some(bytes) = bundle
        .metadata
        .get("archive_bytes")
        .or_else(|| bundle.metadata.get("bytes"))
        .and_then(|v| v.parse::<u64>().ok())
    {
        layout.kv("Downloaded", &format_size(bytes));
    }
    if let Some(digest) = bundle.metadata.get("content_sha256") {
        layout.kv("SHA-256", digest);
    }
    layout
}
