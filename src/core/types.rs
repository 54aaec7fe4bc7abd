//! Records passed between pipeline stages.
//!
//! Each record serializes to a self-describing JSON document so a later stage
//! can be re-run from disk without repeating the earlier ones.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{DojoError, Result};

/// File name of the descriptor written next to fetched files.
pub const FETCH_DESCRIPTOR: &str = "fetch_result.json";
/// File name of the descriptor written next to a converted tree.
pub const CONVERSION_DESCRIPTOR: &str = "conversion_result.json";

/// Directories never treated as bundle content.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
];

/// Catalog entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Skill,
    Agent,
}

impl ResourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Agent => "agent",
        }
    }

    /// Top-level catalog directory for this kind.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Skill => "skills",
            Self::Agent => "agents",
        }
    }

    /// Canonical primary document file name.
    #[must_use]
    pub const fn primary_document(self) -> &'static str {
        match self {
            Self::Skill => "SKILL.md",
            Self::Agent => "AGENT.md",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = DojoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skill" | "skills" => Ok(Self::Skill),
            "agent" | "agents" => Ok(Self::Agent),
            other => Err(DojoError::InvalidInput(format!(
                "unknown resource kind '{other}' (expected skill|agent)"
            ))),
        }
    }
}

/// Retrieval strategy selected from the lexical form of a source reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginKind {
    HostedRepo,
    HostedRepoPath,
    PasteSnippet,
    GenericGit,
    DirectDownload,
    CompressedArchive,
    LocalFilesystem,
    Unsupported,
}

impl OriginKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HostedRepo => "hosted-repo",
            Self::HostedRepoPath => "hosted-repo-path",
            Self::PasteSnippet => "paste-snippet",
            Self::GenericGit => "generic-git",
            Self::DirectDownload => "direct-download",
            Self::CompressedArchive => "compressed-archive",
            Self::LocalFilesystem => "local-filesystem",
            Self::Unsupported => "unsupported",
        }
    }

    /// Whether retrieval for this kind goes over the network.
    #[must_use]
    pub const fn is_network(self) -> bool {
        !matches!(self, Self::LocalFilesystem | Self::Unsupported)
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file or archive entry left out of a fetch, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: String,
}

impl SkippedEntry {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Files materialized by the fetch stage plus their provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedBundle {
    pub origin_kind: OriginKind,
    pub source: String,
    pub resource_kind: ResourceKind,
    /// Relative paths with `/` separators, sorted.
    pub files: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub skipped: Vec<SkippedEntry>,
    #[serde(skip)]
    pub root: PathBuf,
}

impl FetchedBundle {
    /// Open a bundle directory, preferring its descriptor when present.
    ///
    /// A directory without a descriptor is treated as a local bundle so later
    /// stages can run against hand-assembled inputs.
    pub fn open(root: &Path, kind: ResourceKind) -> Result<Self> {
        if !root.is_dir() {
            return Err(DojoError::NotFound(root.display().to_string()));
        }

        let descriptor = root.join(FETCH_DESCRIPTOR);
        if descriptor.is_file() {
            let raw = std::fs::read_to_string(&descriptor)?;
            let mut bundle: Self = serde_json::from_str(&raw)?;
            bundle.root = root.to_path_buf();
            bundle.resource_kind = kind;
            return Ok(bundle);
        }

        Ok(Self {
            origin_kind: OriginKind::LocalFilesystem,
            source: root.display().to_string(),
            resource_kind: kind,
            files: scan_files(root),
            metadata: BTreeMap::new(),
            skipped: Vec::new(),
            root: root.to_path_buf(),
        })
    }

    pub fn write_descriptor(&self) -> Result<PathBuf> {
        let path = self.root.join(FETCH_DESCRIPTOR);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Common directory prefix that wraps all content, e.g. `repo-main/` for
    /// an archive that unpacks into a single folder. Empty when files sit at
    /// the top level.
    #[must_use]
    pub fn content_prefix(&self) -> String {
        let mut prefix = String::new();
        loop {
            let remaining: Vec<&str> = self
                .files
                .iter()
                .filter_map(|f| f.strip_prefix(prefix.as_str()))
                .collect();
            if remaining.is_empty() || remaining.iter().any(|f| !f.contains('/')) {
                return prefix;
            }
            let first = remaining[0].split('/').next().unwrap_or_default();
            if remaining
                .iter()
                .any(|f| f.split('/').next().unwrap_or_default() != first)
            {
                return prefix;
            }
            prefix.push_str(first);
            prefix.push('/');
        }
    }

    /// Directory holding the bundle content (see [`Self::content_prefix`]).
    #[must_use]
    pub fn content_dir(&self) -> PathBuf {
        let prefix = self.content_prefix();
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            self.root.clone()
        } else {
            self.root.join(trimmed)
        }
    }

    /// File paths relative to [`Self::content_dir`].
    #[must_use]
    pub fn content_files(&self) -> Vec<String> {
        let prefix = self.content_prefix();
        self.files
            .iter()
            .filter_map(|f| f.strip_prefix(prefix.as_str()))
            .map(ToString::to_string)
            .collect()
    }
}

/// List regular files under `root` as sorted relative paths, skipping VCS and
/// dependency-cache directories and pipeline descriptors.
#[must_use]
pub fn scan_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir()
                    && IGNORED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref()))
        })
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (rel != FETCH_DESCRIPTOR && rel != CONVERSION_DESCRIPTOR).then_some(rel)
        })
        .collect();
    files.sort();
    files
}

/// Coarse estimate of how much the definition relies on the executing agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyLevel {
    Low,
    Medium,
    High,
}

/// Independent behavioral detectors; several may hold at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    pub procedural: bool,
    pub single_action: bool,
    pub conditional: bool,
    pub orchestrator: bool,
    pub specialist: bool,
}

/// Metadata inferred from a bundle's primary document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub resource_kind: ResourceKind,
    pub original_name: String,
    pub description: String,
    pub purpose: String,
    pub scope: String,
    pub dependencies: Vec<String>,
    pub autonomy_level: AutonomyLevel,
    pub has_scripts: bool,
    pub has_workflow: bool,
    pub characteristics: Characteristics,
    /// Primary document path relative to the bundle root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_document: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl AnalysisRecord {
    /// The default-valued record used when no document could be read.
    #[must_use]
    pub fn empty(kind: ResourceKind) -> Self {
        Self {
            resource_kind: kind,
            original_name: String::new(),
            description: String::new(),
            purpose: String::new(),
            scope: String::new(),
            dependencies: Vec::new(),
            autonomy_level: AutonomyLevel::Medium,
            has_scripts: false,
            has_workflow: false,
            characteristics: Characteristics::default(),
            primary_document: None,
            files: Vec::new(),
        }
    }
}

/// Behavioral sub-type prefix of a canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubType {
    Proc,
    Action,
    Cond,
    Shihan,
    Deshi,
}

impl SubType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proc => "proc",
            Self::Action => "action",
            Self::Cond => "cond",
            Self::Shihan => "shihan",
            Self::Deshi => "deshi",
        }
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical identity assigned to an imported resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingDecision {
    pub original_name: String,
    pub kebab_name: String,
    pub canonical_name: String,
    pub sub_type: SubType,
    pub resource_kind: ResourceKind,
    /// `{kind-plural}/{canonical-name}`
    pub target_path: String,
}
