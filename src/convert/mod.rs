//! Rewrite a fetched bundle into the canonical catalog layout.
//!
//! The target directory must be new (or empty). Everything is written under
//! it; if any step fails the partially written tree is removed again.

pub mod templates;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::markdown::{self, title_case};
use crate::core::types::CONVERSION_DESCRIPTOR;
use crate::core::{AnalysisRecord, FetchedBundle, NamingDecision, ResourceKind, SkippedEntry};
use crate::error::{DojoError, Result};
use crate::fetch::guard::safe_relative_path;
use crate::utils::fs::{read_lossy, slash_path};

/// A `- Field: value` line for one of the known header fields. A run of
/// these directly under the title is the header block; other list items are
/// body content.
static FIELD_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[-*]\s*(purpose|scope|owner|author|version|status|tags)\s*:")
        .expect("valid regex")
});

const DEFAULT_PURPOSE: &str = "Imported resource";
const DEFAULT_SCOPE: &str = "External definition";

const DOCUMENT_EXTENSIONS: &[&str] = &["md"];
const ASSET_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "gif", "csv", "json"];
const VERIFICATION_EXTENSIONS: &[&str] = &["py", "sh", "js", "md"];

/// Source directories copied into one canonical subtree.
#[derive(Debug, Clone, Copy)]
pub struct AuxMapping {
    pub target: &'static str,
    pub sources: &'static [&'static str],
    /// Allowed lowercase extensions; `None` copies everything.
    pub extensions: Option<&'static [&'static str]>,
}

pub const SKILL_LAYOUT: &[AuxMapping] = &[
    AuxMapping {
        target: "scripts",
        sources: &["scripts", "bin", "tools"],
        extensions: None,
    },
    AuxMapping {
        target: "references",
        sources: &["docs", "documentation", "references"],
        extensions: Some(DOCUMENT_EXTENSIONS),
    },
    AuxMapping {
        target: "assets",
        sources: &["assets", "images", "data"],
        extensions: Some(ASSET_EXTENSIONS),
    },
];

pub const AGENT_LAYOUT: &[AuxMapping] = &[
    AuxMapping {
        target: "rules",
        sources: &["rules", "policies"],
        extensions: Some(DOCUMENT_EXTENSIONS),
    },
    AuxMapping {
        target: "knowledge",
        sources: &["knowledge", "docs", "documentation"],
        extensions: Some(DOCUMENT_EXTENSIONS),
    },
    AuxMapping {
        target: "verification",
        sources: &["verification", "tests", "scripts"],
        extensions: Some(VERIFICATION_EXTENSIONS),
    },
];

#[must_use]
pub const fn layout_for(kind: ResourceKind) -> &'static [AuxMapping] {
    match kind {
        ResourceKind::Skill => SKILL_LAYOUT,
        ResourceKind::Agent => AGENT_LAYOUT,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub target_directory: PathBuf,
    pub canonical_name: String,
    pub resource_kind: ResourceKind,
    /// Primary document path relative to the target directory.
    pub primary_document: String,
    /// The primary document was generated from a template.
    pub synthesized: bool,
    /// Written files relative to the target directory, sorted.
    pub created_files: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<SkippedEntry>,
}

impl ConversionResult {
    /// Write `conversion_result.json` into `dir`.
    pub fn write_descriptor(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(CONVERSION_DESCRIPTOR);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// Removes a freshly created target tree unless disarmed.
struct TargetGuard {
    path: PathBuf,
    armed: bool,
}

impl TargetGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = std::fs::remove_dir_all(&self.path) {
                warn!(path = %self.path.display(), error = %err, "failed to remove partial conversion");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureConverter;

impl StructureConverter {
    /// Write the canonical tree for `bundle` at `output_dir/{target_path}`.
    pub fn convert(
        &self,
        bundle: &FetchedBundle,
        naming: &NamingDecision,
        record: &AnalysisRecord,
        output_dir: &Path,
    ) -> Result<ConversionResult> {
        let rel_target = safe_relative_path(Path::new(&naming.target_path)).ok_or_else(|| {
            DojoError::security(
                "target path must stay inside the output directory",
                naming.target_path.clone(),
            )
        })?;
        let target = output_dir.join(rel_target);
        let guard = prepare_target(&target)?;
        info!(target = %target.display(), name = %naming.canonical_name, "converting structure");

        let kind = naming.resource_kind;
        let source_root = bundle.content_dir();
        let source_files = bundle.content_files();
        let mut written: BTreeSet<String> = BTreeSet::new();
        let mut skipped = Vec::new();

        let purpose = first_non_empty(&[record.purpose.as_str(), record.description.as_str()])
            .unwrap_or(DEFAULT_PURPOSE)
            .to_string();
        let scope = first_non_empty(&[record.scope.as_str()])
            .unwrap_or(DEFAULT_SCOPE)
            .to_string();

        let primary_name = kind.primary_document();
        let source_doc = primary_source(bundle, record, &source_files);
        let synthesized = source_doc.is_none();
        let document = match &source_doc {
            Some(rel) => {
                debug!(source = %rel, "transforming primary document");
                let raw = read_lossy(source_root.join(rel))?;
                ensure_header(&raw, &title_case(&naming.canonical_name), &purpose, &scope)
            }
            None => {
                debug!("no primary document; synthesizing from template");
                templates::render(kind, &naming.canonical_name, &purpose, &scope, record)
            }
        };
        std::fs::write(target.join(primary_name), document)?;
        written.insert(primary_name.to_string());

        for mapping in layout_for(kind) {
            copy_mapping(mapping, &source_root, &source_files, &target, &mut written, &mut skipped)?;
        }

        let result = ConversionResult {
            target_directory: target,
            canonical_name: naming.canonical_name.clone(),
            resource_kind: kind,
            primary_document: primary_name.to_string(),
            synthesized,
            created_files: written.into_iter().collect(),
            skipped,
        };
        guard.disarm();
        info!(
            files = result.created_files.len(),
            synthesized = result.synthesized,
            "conversion complete"
        );
        Ok(result)
    }
}

fn first_non_empty<'a>(values: &[&'a str]) -> Option<&'a str> {
    values.iter().copied().map(str::trim).find(|v| !v.is_empty())
}

/// Create `target` or accept it when it is an empty directory. Refuses to
/// write into anything that already has content.
fn prepare_target(target: &Path) -> Result<TargetGuard> {
    if target.exists() {
        if !target.is_dir() {
            return Err(DojoError::InvalidInput(format!(
                "target {} exists and is not a directory",
                target.display()
            )));
        }
        if std::fs::read_dir(target)?.next().is_some() {
            return Err(DojoError::InvalidInput(format!(
                "target directory {} is not empty",
                target.display()
            )));
        }
    } else {
        std::fs::create_dir_all(target)?;
    }
    Ok(TargetGuard {
        path: target.to_path_buf(),
        armed: true,
    })
}

/// The analyzed primary document when it is still part of the bundle,
/// otherwise the same priority search the analyzer uses.
fn primary_source(
    bundle: &FetchedBundle,
    record: &AnalysisRecord,
    content_files: &[String],
) -> Option<String> {
    let prefix = bundle.content_prefix();
    record
        .primary_document
        .as_deref()
        .and_then(|doc| doc.strip_prefix(prefix.as_str()))
        .filter(|doc| content_files.iter().any(|f| f == doc))
        .map(ToString::to_string)
        .or_else(|| markdown::select_primary_document(&bundle.content_dir(), content_files))
}

/// Make sure the document opens with a title followed by `Purpose:` then
/// `Scope:`. Only the field block directly under the title counts; missing
/// fields are inserted into it and everything else, front matter included,
/// is kept as written.
pub fn ensure_header(content: &str, fallback_title: &str, purpose: &str, scope: &str) -> String {
    let (_, body) = markdown::split_front_matter(content);
    let front = &content[..content.len() - body.len()];
    let body = body.trim_start_matches(['\n', '\r']);

    let Some(first_line) = body.lines().next().filter(|l| l.starts_with("# ")) else {
        return format!(
            "{front}# {fallback_title}\n\n- Purpose: {purpose}\n- Scope: {scope}\n\n{body}"
        );
    };

    let rest = body[first_line.len()..].trim_start_matches(['\r', '\n']);
    let block_len: usize = rest
        .split_inclusive('\n')
        .take_while(|line| FIELD_LINE_RE.is_match(line))
        .map(str::len)
        .sum();
    let (block, tail) = rest.split_at(block_len);

    let find = |lines: &[String], field: &str| {
        lines
            .iter()
            .position(|line| markdown::field_value(line, field).is_some())
    };
    let mut lines: Vec<String> = block
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect();
    let has_purpose = find(&lines, "Purpose").is_some();
    let has_scope = find(&lines, "Scope").is_some();
    if has_purpose && has_scope {
        return content.to_string();
    }

    if !has_purpose {
        let at = find(&lines, "Scope").unwrap_or(0);
        lines.insert(at, format!("- Purpose: {purpose}"));
    }
    if !has_scope {
        let at = find(&lines, "Purpose").map_or(0, |idx| idx + 1);
        lines.insert(at, format!("- Scope: {scope}"));
    }

    let mut out = format!("{front}{first_line}\n\n{}\n", lines.join("\n"));
    if !tail.is_empty() {
        if block.is_empty() {
            out.push('\n');
        }
        out.push_str(tail);
    }
    out
}

fn copy_mapping(
    mapping: &AuxMapping,
    source_root: &Path,
    source_files: &[String],
    target: &Path,
    written: &mut BTreeSet<String>,
    skipped: &mut Vec<SkippedEntry>,
) -> Result<()> {
    for source_dir in mapping.sources {
        let prefix = format!("{source_dir}/");
        for file in source_files {
            let Some(rest) = file.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if !extension_allowed(rest, mapping.extensions) {
                continue;
            }
            let Some(rel) = safe_relative_path(Path::new(rest)) else {
                skipped.push(SkippedEntry::new(file.clone(), "unsafe path"));
                continue;
            };
            let dest_rel = format!("{}/{}", mapping.target, slash_path(&rel));
            if written.contains(&dest_rel) {
                debug!(file = %file, dest = %dest_rel, "destination already written");
                skipped.push(SkippedEntry::new(
                    file.clone(),
                    format!("{dest_rel} already provided by another source"),
                ));
                continue;
            }

            let dest = target.join(&dest_rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(source_root.join(file), &dest)?;
            written.insert(dest_rel);
        }
    }
    Ok(())
}

fn extension_allowed(path: &str, allowed: Option<&[&str]>) -> bool {
    let Some(allowed) = allowed else {
        return true;
    };
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| allowed.contains(&ext.as_str()))
}
