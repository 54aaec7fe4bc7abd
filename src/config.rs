use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DojoError, Result};

/// Runtime configuration for every pipeline stage.
///
/// Layering: defaults, then the global file (`~/.config/dojo/config.toml`),
/// then the project file (`.dojo/config.toml`), then `DOJO_*` environment
/// variables. An explicit path (flag or `DOJO_CONFIG`) replaces both files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub requirements: RequirementsConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("DOJO_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(DojoError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(project_root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("dojo/config.toml"))
    }

    fn load_project(project_root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&project_root.join(".dojo/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| DojoError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| DojoError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.fetch {
            self.fetch.merge(patch);
        }
        if let Some(patch) = patch.analysis {
            self.analysis.merge(patch);
        }
        if let Some(patch) = patch.similarity {
            self.similarity.merge(patch);
        }
        if let Some(patch) = patch.requirements {
            self.requirements.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_u64("DOJO_MAX_TRANSFER_BYTES")? {
            self.fetch.max_transfer_bytes = value;
        }
        if let Some(value) = env_u64("DOJO_FETCH_TIMEOUT_SECONDS")? {
            self.fetch.timeout_seconds = value;
        }
        if let Some(values) = env_list("DOJO_BLOCKED_HOSTS") {
            self.fetch.blocked_hosts = merge_unique(values, &self.fetch.blocked_hosts);
        }
        if let Some(value) = env_string("DOJO_GITHUB_API_BASE") {
            self.fetch.github_api_base = value;
        }
        if self.fetch.github_token.is_none() {
            self.fetch.github_token = ["DOJO_GITHUB_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"]
                .iter()
                .find_map(|key| env_string(key).filter(|value| !value.trim().is_empty()));
        }

        if let Some(value) = env_f64("DOJO_SIMILARITY_THRESHOLD")? {
            self.similarity.threshold = value;
        }
        if let Some(value) = env_f64("DOJO_SIMILARITY_FLOOR")? {
            self.similarity.floor = value;
        }

        if let Some(value) = env_u64("DOJO_PROBE_TIMEOUT_SECONDS")? {
            self.requirements.probe_timeout_seconds = value;
        }

        Ok(())
    }
}

/// Limits and trust boundaries for the fetch stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub max_transfer_bytes: u64,
    pub timeout_seconds: u64,
    pub allowed_schemes: Vec<String>,
    pub blocked_hosts: Vec<String>,
    pub denied_local_roots: Vec<String>,
    pub github_api_base: String,
    #[serde(default, skip_serializing)]
    pub github_token: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_transfer_bytes: 100 * 1024 * 1024,
            timeout_seconds: 60,
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            blocked_hosts: vec![
                "localhost".to_string(),
                "127.0.0.1".to_string(),
                "0.0.0.0".to_string(),
                "::1".to_string(),
            ],
            denied_local_roots: ["/etc", "/sys", "/proc", "/dev", "/boot", "/root"]
                .iter()
                .map(|root| (*root).to_string())
                .collect(),
            github_api_base: "https://api.github.com".to_string(),
            github_token: None,
        }
    }
}

impl FetchConfig {
    fn merge(&mut self, patch: FetchPatch) {
        if let Some(value) = patch.max_transfer_bytes {
            self.max_transfer_bytes = value;
        }
        if let Some(value) = patch.timeout_seconds {
            self.timeout_seconds = value;
        }
        if let Some(value) = patch.allowed_schemes {
            self.allowed_schemes = value;
        }
        if let Some(value) = patch.blocked_hosts {
            self.blocked_hosts = merge_unique(value, &self.blocked_hosts);
        }
        if let Some(value) = patch.denied_local_roots {
            self.denied_local_roots = merge_unique(value, &self.denied_local_roots);
        }
        if let Some(value) = patch.github_api_base {
            self.github_api_base = value;
        }
        if let Some(value) = patch.github_token {
            self.github_token = Some(value);
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

/// Thresholds used by the classification heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub short_document_chars: usize,
    pub high_autonomy_chars: usize,
    pub conditional_if_threshold: usize,
    pub conditional_marker_threshold: usize,
    pub script_count_threshold: usize,
    pub description_max_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            short_document_chars: 2000,
            high_autonomy_chars: 1000,
            conditional_if_threshold: 5,
            conditional_marker_threshold: 3,
            script_count_threshold: 3,
            description_max_chars: 200,
        }
    }
}

impl AnalysisConfig {
    fn merge(&mut self, patch: AnalysisPatch) {
        if let Some(value) = patch.short_document_chars {
            self.short_document_chars = value;
        }
        if let Some(value) = patch.high_autonomy_chars {
            self.high_autonomy_chars = value;
        }
        if let Some(value) = patch.conditional_if_threshold {
            self.conditional_if_threshold = value;
        }
        if let Some(value) = patch.conditional_marker_threshold {
            self.conditional_marker_threshold = value;
        }
        if let Some(value) = patch.script_count_threshold {
            self.script_count_threshold = value;
        }
        if let Some(value) = patch.description_max_chars {
            self.description_max_chars = value;
        }
    }
}

/// Weights and cutoffs for duplicate detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    pub threshold: f64,
    pub floor: f64,
    pub name_weight: f64,
    pub title_weight: f64,
    pub purpose_weight: f64,
    pub keyword_weight: f64,
    pub top_keywords: usize,
    pub min_keyword_len: usize,
    pub display_limit: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            floor: 0.1,
            name_weight: 0.3,
            title_weight: 0.2,
            purpose_weight: 0.3,
            keyword_weight: 0.2,
            top_keywords: 20,
            min_keyword_len: 3,
            display_limit: 10,
        }
    }
}

impl SimilarityConfig {
    fn merge(&mut self, patch: SimilarityPatch) {
        if let Some(value) = patch.threshold {
            self.threshold = value;
        }
        if let Some(value) = patch.floor {
            self.floor = value;
        }
        if let Some(value) = patch.name_weight {
            self.name_weight = value;
        }
        if let Some(value) = patch.title_weight {
            self.title_weight = value;
        }
        if let Some(value) = patch.purpose_weight {
            self.purpose_weight = value;
        }
        if let Some(value) = patch.keyword_weight {
            self.keyword_weight = value;
        }
        if let Some(value) = patch.top_keywords {
            self.top_keywords = value;
        }
        if let Some(value) = patch.min_keyword_len {
            self.min_keyword_len = value;
        }
        if let Some(value) = patch.display_limit {
            self.display_limit = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsConfig {
    pub probe_timeout_seconds: u64,
}

impl Default for RequirementsConfig {
    fn default() -> Self {
        Self {
            probe_timeout_seconds: 5,
        }
    }
}

impl RequirementsConfig {
    fn merge(&mut self, patch: RequirementsPatch) {
        if let Some(value) = patch.probe_timeout_seconds {
            self.probe_timeout_seconds = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub fetch: Option<FetchPatch>,
    pub analysis: Option<AnalysisPatch>,
    pub similarity: Option<SimilarityPatch>,
    pub requirements: Option<RequirementsPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FetchPatch {
    pub max_transfer_bytes: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub allowed_schemes: Option<Vec<String>>,
    pub blocked_hosts: Option<Vec<String>>,
    pub denied_local_roots: Option<Vec<String>>,
    pub github_api_base: Option<String>,
    pub github_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AnalysisPatch {
    pub short_document_chars: Option<usize>,
    pub high_autonomy_chars: Option<usize>,
    pub conditional_if_threshold: Option<usize>,
    pub conditional_marker_threshold: Option<usize>,
    pub script_count_threshold: Option<usize>,
    pub description_max_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SimilarityPatch {
    pub threshold: Option<f64>,
    pub floor: Option<f64>,
    pub name_weight: Option<f64>,
    pub title_weight: Option<f64>,
    pub purpose_weight: Option<f64>,
    pub keyword_weight: Option<f64>,
    pub top_keywords: Option<usize>,
    pub min_keyword_len: Option<usize>,
    pub display_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RequirementsPatch {
    pub probe_timeout_seconds: Option<u64>,
}

fn merge_unique(values: Vec<String>, existing: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values.into_iter().chain(existing.iter().cloned()) {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| DojoError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|err| DojoError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect()
    })
}
