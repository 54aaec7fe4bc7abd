//! Metadata extraction from a fetched bundle.
//!
//! The analyzer never fails. Anything it cannot determine is left at its
//! default and reported as a [`SoftIssue`] on the returned [`Assessed`].

pub mod classify;
pub mod deps;

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::core::markdown::{self, FrontMatter};
use crate::core::{AnalysisRecord, Assessed, FetchedBundle, SoftIssue, SoftIssueKind};
use crate::utils::format::take_chars;
use crate::utils::fs::read_lossy;

const MAX_TITLE_CHARS: usize = 100;
const MIN_PROSE_CHARS: usize = 10;
const GENERIC_STEMS: &[&str] = &["README", "INDEX", "MAIN", "SKILL", "AGENT"];
const SCRIPT_DIRS: &[&str] = &["scripts", "bin", "tools"];

static DESCRIPTION_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)description:[ \t]*(\S.*)$").expect("valid regex"));

pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    #[must_use]
    pub const fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, bundle: &FetchedBundle) -> Assessed<AnalysisRecord> {
        let root = bundle.content_dir();
        let files = bundle.content_files();
        let mut issues = Vec::new();

        let primary = markdown::select_primary_document(&root, &files);
        let content = match &primary {
            Some(rel) => match read_lossy(root.join(rel)) {
                Ok(content) => {
                    debug!(document = %rel, "primary document selected");
                    content
                }
                Err(err) => {
                    warn!(document = %rel, error = %err, "primary document unreadable");
                    issues.push(SoftIssue::new(
                        SoftIssueKind::UnreadableDocument,
                        format!("{rel}: {err}"),
                    ));
                    String::new()
                }
            },
            None => {
                warn!(root = %root.display(), "no primary document found");
                issues.push(SoftIssue::new(
                    SoftIssueKind::MissingPrimaryDocument,
                    format!("no markup document in {}", root.display()),
                ));
                String::new()
            }
        };

        let (front, body) = markdown::split_front_matter(&content);
        let front = front.unwrap_or_default();

        let mut record = AnalysisRecord::empty(bundle.resource_kind);
        record.original_name = original_name(&root, primary.as_deref(), &content, &front);
        record.description = self.description(&content, body, &front);
        record.purpose = markdown::field_value(&content, "Purpose").unwrap_or_default();
        record.scope = markdown::field_value(&content, "Scope").unwrap_or_default();
        record.dependencies = deps::extract_dependencies(&content);

        let script_count = direct_children(&files, "scripts");
        record.autonomy_level = classify::autonomy(&content, script_count, &self.config);
        record.has_scripts = SCRIPT_DIRS
            .iter()
            .any(|dir| direct_children(&files, dir) > 0);
        record.has_workflow = classify::has_workflow(&content);
        record.characteristics = classify::characteristics(&content, &self.config);
        record.primary_document = primary.map(|rel| format!("{}{rel}", bundle.content_prefix()));
        record.files.clone_from(&bundle.files);

        for (field, value) in [
            ("original_name", &record.original_name),
            ("description", &record.description),
            ("purpose", &record.purpose),
            ("scope", &record.scope),
        ] {
            if value.is_empty() {
                issues.push(SoftIssue::new(
                    SoftIssueKind::FieldDefaulted,
                    format!("{field} not found"),
                ));
            }
        }

        info!(
            name = %record.original_name,
            autonomy = ?record.autonomy_level,
            scripts = record.has_scripts,
            workflow = record.has_workflow,
            "analysis complete"
        );
        Assessed::with_issues(record, issues)
    }

    fn description(&self, content: &str, body: &str, front: &FrontMatter) -> String {
        let found = markdown::field_value(content, "Purpose")
            .or_else(|| front.description.clone().filter(|d| !d.trim().is_empty()))
            .or_else(|| {
                DESCRIPTION_LINE_RE
                    .captures(body)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim().to_string())
            })
            .or_else(|| first_prose_line(body).map(ToString::to_string));
        found
            .map(|d| take_chars(d.trim(), self.config.description_max_chars))
            .unwrap_or_default()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

/// Title if short enough, else the front-matter name, else a name derived
/// from the document's file name or directory.
fn original_name(root: &Path, primary: Option<&str>, content: &str, front: &FrontMatter) -> String {
    if let Some(title) = markdown::title(content).filter(|t| t.chars().count() < MAX_TITLE_CHARS) {
        return title;
    }
    if let Some(name) = front.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    let dir_name = |path: &Path| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    match primary {
        Some(rel) => {
            let path = root.join(rel);
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if GENERIC_STEMS.contains(&stem.to_uppercase().as_str()) {
                path.parent().map(dir_name).unwrap_or_default()
            } else {
                stem
            }
        }
        None => dir_name(root),
    }
}

/// First line of ordinary prose: not a heading, list item, rule, table row
/// or fenced code.
fn first_prose_line(body: &str) -> Option<&str> {
    let mut in_fence = false;
    for line in body.lines() {
        let line = line.trim();
        if line.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence
            || line.is_empty()
            || line.starts_with(['#', '-', '*', '|', '>'])
        {
            continue;
        }
        if line.chars().count() > MIN_PROSE_CHARS {
            return Some(line);
        }
    }
    None
}

/// Distinct entries directly under `dir/`.
fn direct_children(files: &[String], dir: &str) -> usize {
    let prefix = format!("{dir}/");
    let mut names: Vec<&str> = files
        .iter()
        .filter_map(|f| f.strip_prefix(prefix.as_str()))
        .filter_map(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort_unstable();
    names.dedup();
    names.len()
}
