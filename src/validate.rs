//! Structural checks for a converted catalog entry.
//!
//! Validation never returns an error: every problem, including a missing or
//! wrong-type path, is a finding in the [`ValidationReport`]. Only blocking
//! errors fail the report; warnings and info notes are advisory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::core::markdown;
use crate::core::ResourceKind;
use crate::utils::fs::{read_lossy, slash_path};

const WORKFLOW_KEYWORDS: &[&str] = &["workflow", "ワークフロー", "plan", "execute", "verify"];
const REQUIRED_FIELDS: &[&str] = &["Purpose", "Scope"];

const SKILL_OPTIONAL_DIRS: &[&str] = &["scripts", "references", "assets"];
const AGENT_OPTIONAL_DIRS: &[&str] = &["rules", "knowledge", "verification"];
/// Recognized for agents but never produced by conversion.
const AGENT_EXTRA_DIRS: &[&str] = &["collection", "generation"];

static SKILL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(proc|action|cond)-.+-skill$").expect("valid regex"));
static AGENT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(shihan|deshi)-.+$").expect("valid regex"));
static SNAKE_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+\.[a-z0-9]+$").expect("valid regex"));
static KEBAB_STEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));
static DOUBLE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+[-*+]\s+[^-*+\s]").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    Path,
    Naming,
    PrimaryDocument,
    Heading,
    RequiredField,
    Workflow,
    FileNaming,
    FenceParity,
    ListMarker,
    OptionalDirectory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: Rule,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Finding {
    fn new(rule: Rule, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub resource_kind: ResourceKind,
    /// No blocking errors.
    pub passed: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub info: Vec<Finding>,
}

impl ValidationReport {
    fn new(path: &Path, kind: ResourceKind) -> Self {
        Self {
            path: path.to_path_buf(),
            resource_kind: kind,
            passed: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
        }
    }

    #[must_use]
    pub fn has_error(&self, rule: Rule) -> bool {
        self.errors.iter().any(|f| f.rule == rule)
    }

    #[must_use]
    pub fn has_warning(&self, rule: Rule) -> bool {
        self.warnings.iter().any(|f| f.rule == rule)
    }

    fn finish(mut self) -> Self {
        self.passed = self.errors.is_empty();
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    #[must_use]
    pub fn validate(&self, path: &Path, kind: ResourceKind) -> ValidationReport {
        let mut report = ValidationReport::new(path, kind);

        if !path.exists() {
            report.errors.push(Finding::new(
                Rule::Path,
                format!("path does not exist: {}", path.display()),
            ));
            return report.finish();
        }
        if !path.is_dir() {
            report.errors.push(Finding::new(
                Rule::Path,
                format!("path is not a directory: {}", path.display()),
            ));
            return report.finish();
        }

        check_naming(path, kind, &mut report);
        check_primary_document(path, kind, &mut report);
        check_optional_dirs(path, kind, &mut report);
        check_file_naming(path, &mut report);

        let report = report.finish();
        info!(
            path = %path.display(),
            passed = report.passed,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "validation complete"
        );
        report
    }
}

fn check_naming(path: &Path, kind: ResourceKind, report: &mut ValidationReport) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (re, expected) = match kind {
        ResourceKind::Skill => (&*SKILL_NAME_RE, "(proc|action|cond)-<name>-skill"),
        ResourceKind::Agent => (&*AGENT_NAME_RE, "(shihan|deshi)-<specialty>"),
    };
    if re.is_match(&name) {
        report
            .info
            .push(Finding::new(Rule::Naming, format!("{kind} naming convention: {name}")));
    } else {
        report.errors.push(Finding::new(
            Rule::Naming,
            format!("invalid {kind} name '{name}', expected {expected}"),
        ));
    }
}

fn check_primary_document(path: &Path, kind: ResourceKind, report: &mut ValidationReport) {
    let doc_name = kind.primary_document();
    let doc_path = path.join(doc_name);
    if !doc_path.is_file() {
        report.errors.push(
            Finding::new(Rule::PrimaryDocument, format!("required file missing: {doc_name}"))
                .in_file(doc_name),
        );
        return;
    }
    let content = match read_lossy(&doc_path) {
        Ok(content) => content,
        Err(err) => {
            report.errors.push(
                Finding::new(Rule::PrimaryDocument, format!("cannot read {doc_name}: {err}"))
                    .in_file(doc_name),
            );
            return;
        }
    };
    report
        .info
        .push(Finding::new(Rule::PrimaryDocument, format!("{doc_name} exists")).in_file(doc_name));

    let (_, body) = markdown::split_front_matter(&content);
    if body.trim_start_matches(['\u{feff}', '\r', '\n']).starts_with('#') {
        report
            .info
            .push(Finding::new(Rule::Heading, "document starts with a title").in_file(doc_name));
    } else {
        report.errors.push(
            Finding::new(Rule::Heading, format!("{doc_name} must start with a title (# Title)"))
                .in_file(doc_name),
        );
    }

    for field in REQUIRED_FIELDS {
        if markdown::field_value(&content, field).is_some() {
            report.info.push(
                Finding::new(Rule::RequiredField, format!("field present: {field}"))
                    .in_file(doc_name),
            );
        } else {
            report.errors.push(
                Finding::new(
                    Rule::RequiredField,
                    format!("{doc_name} missing required field: {field}"),
                )
                .in_file(doc_name),
            );
        }
    }

    let lower = content.to_lowercase();
    if WORKFLOW_KEYWORDS.iter().any(|k| lower.contains(k)) {
        report
            .info
            .push(Finding::new(Rule::Workflow, "workflow section detected").in_file(doc_name));
    } else {
        report.warnings.push(
            Finding::new(Rule::Workflow, format!("{doc_name} has no workflow section"))
                .in_file(doc_name),
        );
    }

    check_markdown(&content, doc_name, report);
}

/// Fence parity and doubled list markers. Marker checks skip fenced code.
fn check_markdown(content: &str, file: &str, report: &mut ValidationReport) {
    let mut fences = 0usize;
    for (idx, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            fences += 1;
            continue;
        }
        if fences % 2 == 1 {
            continue;
        }
        if DOUBLE_MARKER_RE.is_match(line) {
            report.warnings.push(
                Finding::new(Rule::ListMarker, "double list marker")
                    .in_file(file)
                    .at_line(idx + 1),
            );
        }
    }

    if fences % 2 == 1 {
        report
            .warnings
            .push(Finding::new(Rule::FenceParity, "unclosed code block").in_file(file));
    }
}

fn check_optional_dirs(path: &Path, kind: ResourceKind, report: &mut ValidationReport) {
    let dirs: Vec<&str> = match kind {
        ResourceKind::Skill => SKILL_OPTIONAL_DIRS.to_vec(),
        ResourceKind::Agent => [AGENT_OPTIONAL_DIRS, AGENT_EXTRA_DIRS].concat(),
    };
    for dir in dirs {
        let dir_path = path.join(dir);
        if !dir_path.exists() {
            continue;
        }
        if dir_path.is_dir() {
            report.info.push(Finding::new(
                Rule::OptionalDirectory,
                format!("optional directory: {dir}/"),
            ));
        } else {
            report.warnings.push(
                Finding::new(
                    Rule::OptionalDirectory,
                    format!("{dir} exists but is not a directory"),
                )
                .in_file(dir),
            );
        }
    }
}

/// Snake-case file names under `scripts/`; kebab-case markdown stems under
/// `references/` and `knowledge/`.
fn check_file_naming(path: &Path, report: &mut ValidationReport) {
    for file in files_under(path, "scripts") {
        let name = file.rsplit('/').next().unwrap_or_default();
        if !SNAKE_FILE_RE.is_match(name) {
            report.warnings.push(
                Finding::new(Rule::FileNaming, "script file name is not snake_case")
                    .in_file(file.clone()),
            );
        }
    }

    for dir in ["references", "knowledge"] {
        for file in files_under(path, dir) {
            let file_path = Path::new(&file);
            if !markdown::is_markup(&file) {
                continue;
            }
            let stem = file_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !KEBAB_STEM_RE.is_match(&stem) {
                report.warnings.push(
                    Finding::new(Rule::FileNaming, format!("{dir} file name is not kebab-case"))
                        .in_file(file.clone()),
                );
            }
        }
    }
}

/// Files below `root/dir`, relative to `root`.
fn files_under(root: &Path, dir: &str) -> Vec<String> {
    let base = root.join(dir);
    if !base.is_dir() {
        return Vec::new();
    }
    WalkDir::new(&base)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(slash_path))
        .collect()
}
