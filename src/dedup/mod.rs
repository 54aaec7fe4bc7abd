//! Near-duplicate detection against an existing catalog
//!
//! ## Strategy
//!
//! 1. **Profile** every entry from its primary document: directory name,
//!    title, `Purpose:` field and most frequent content words.
//! 2. **Field similarity**: token-set Jaccard coefficient per field.
//! 3. **Composite score**: weighted sum of the field scores, with weights
//!    from [`SimilarityConfig`].
//!
//! ## Usage
//!
//! ```ignore
//! use dojo_import::dedup::{load_catalog, Profile, SimilarityChecker};
//!
//! let catalog = load_catalog(&existing_dir, &config);
//! let candidate = Profile::from_dir(&new_dir, &config).unwrap();
//! let report = SimilarityChecker::new(config).check(&candidate, &catalog.value, 0.7);
//! ```

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimilarityConfig;
use crate::core::markdown;
use crate::core::{Assessed, SoftIssue, SoftIssueKind};
use crate::utils::fs::read_optional;

/// Documents that can profile a catalog entry, in priority order.
const PROFILE_DOCUMENTS: &[&str] = &["SKILL.md", "AGENT.md", "README.md"];

/// Words too common to say anything about a definition.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "be", "been", "this", "that", "these", "those",
    "it", "its", "use", "using", "used", "can", "will", "would", "should", "may", "might",
    "must",
];

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));
static KEYWORD_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

/// The fields compared between two definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub path: PathBuf,
    pub name: String,
    pub title: String,
    pub purpose: String,
    /// Most frequent content words, most frequent first.
    pub keywords: Vec<String>,
}

impl Profile {
    /// Profile a definition directory. `None` when it has no readable,
    /// non-empty primary document.
    pub fn from_dir(dir: &Path, config: &SimilarityConfig) -> Option<Self> {
        let content = PROFILE_DOCUMENTS.iter().find_map(|doc| {
            read_optional(dir.join(doc))
                .ok()
                .flatten()
                .filter(|c| !c.trim().is_empty())
        })?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Self::from_document(name, dir, &content, config))
    }

    /// Profile a document under an explicit name.
    pub fn from_document(
        name: impl Into<String>,
        path: &Path,
        content: &str,
        config: &SimilarityConfig,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            name: name.into(),
            title: first_heading(content),
            purpose: markdown::field_value(content, "Purpose").unwrap_or_default(),
            keywords: keywords(content, config.top_keywords, config.min_keyword_len),
        }
    }
}

/// Raw text of the first `# ` heading.
fn first_heading(content: &str) -> String {
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Per-field similarity behind a composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldScores {
    pub name: f64,
    pub title: f64,
    pub purpose: f64,
    pub keywords: f64,
    /// Number of shared keywords.
    pub keyword_overlap: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEntry {
    pub path: PathBuf,
    pub name: String,
    /// Composite score in `[0, 1]`.
    pub score: f64,
    pub fields: FieldScores,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub path: PathBuf,
    pub name: String,
}

/// Ranked comparison of one candidate against a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityReport {
    pub candidate: CandidateSummary,
    pub threshold: f64,
    /// Entries at or above the floor, best first, truncated for display.
    pub similarities: Vec<SimilarityEntry>,
    /// Every entry at or above the threshold, never truncated.
    pub conflicts: Vec<SimilarityEntry>,
    pub has_conflict: bool,
    /// Catalog entries compared.
    pub compared: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<SoftIssue>,
}

pub struct SimilarityChecker {
    config: SimilarityConfig,
}

impl SimilarityChecker {
    #[must_use]
    pub const fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Composite score of `a` against `b` plus the field breakdown.
    #[must_use]
    pub fn compare(&self, a: &Profile, b: &Profile) -> (f64, FieldScores) {
        let keywords_a: HashSet<&str> = a.keywords.iter().map(String::as_str).collect();
        let keywords_b: HashSet<&str> = b.keywords.iter().map(String::as_str).collect();

        let fields = FieldScores {
            name: text_similarity(&a.name, &b.name),
            title: text_similarity(&a.title, &b.title),
            purpose: text_similarity(&a.purpose, &b.purpose),
            keywords: jaccard(&keywords_a, &keywords_b),
            keyword_overlap: keywords_a.intersection(&keywords_b).count(),
        };
        let score = self.config.keyword_weight.mul_add(
            fields.keywords,
            self.config.purpose_weight.mul_add(
                fields.purpose,
                self.config
                    .name_weight
                    .mul_add(fields.name, self.config.title_weight * fields.title),
            ),
        );
        (score.clamp(0.0, 1.0), fields)
    }

    /// Compare `candidate` with every catalog profile.
    #[must_use]
    pub fn check(&self, candidate: &Profile, catalog: &[Profile], threshold: f64) -> SimilarityReport {
        let mut entries: Vec<SimilarityEntry> = catalog
            .iter()
            .filter_map(|existing| {
                let (score, fields) = self.compare(candidate, existing);
                debug!(entry = %existing.name, score, "compared");
                (score >= self.config.floor).then(|| SimilarityEntry {
                    path: existing.path.clone(),
                    name: existing.name.clone(),
                    score,
                    fields,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        let conflicts: Vec<SimilarityEntry> = entries
            .iter()
            .filter(|entry| entry.score >= threshold)
            .cloned()
            .collect();
        entries.truncate(self.config.display_limit);

        if conflicts.is_empty() {
            info!(candidate = %candidate.name, compared = catalog.len(), "no conflicts");
        } else {
            warn!(candidate = %candidate.name, conflicts = conflicts.len(), "similar entries found");
        }

        SimilarityReport {
            candidate: CandidateSummary {
                path: candidate.path.clone(),
                name: candidate.name.clone(),
            },
            threshold,
            similarities: entries,
            has_conflict: !conflicts.is_empty(),
            conflicts,
            compared: catalog.len(),
            issues: Vec::new(),
        }
    }
}

impl Default for SimilarityChecker {
    fn default() -> Self {
        Self::new(SimilarityConfig::default())
    }
}

/// Profile every non-hidden subdirectory of `dir`. Entries without a
/// primary document are reported as issues, not errors. A missing catalog
/// directory is an empty catalog.
pub fn load_catalog(dir: &Path, config: &SimilarityConfig) -> Assessed<Vec<Profile>> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        debug!(dir = %dir.display(), "catalog directory not readable; treating as empty");
        return Assessed::confident(Vec::new());
    };

    let mut dirs: Vec<PathBuf> = read_dir
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .is_some_and(|n| !n.to_string_lossy().starts_with('.'))
        })
        .collect();
    dirs.sort();

    let mut profiles = Vec::new();
    let mut issues = Vec::new();
    for path in dirs {
        match Profile::from_dir(&path, config) {
            Some(profile) => profiles.push(profile),
            None => issues.push(SoftIssue::new(
                SoftIssueKind::UnprofiledEntry,
                format!("{}: no primary document", path.display()),
            )),
        }
    }
    Assessed::with_issues(profiles, issues)
}

/// Intersection over union; 0 when either set is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Lowercased word set of `text`.
#[must_use]
pub fn word_set(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

#[must_use]
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard(&word_set(a), &word_set(b))
}

/// The `top` most frequent words of at least `min_len` characters that are
/// not stop words. Ties keep first-appearance order.
#[must_use]
pub fn keywords(content: &str, top: usize, min_len: usize) -> Vec<String> {
    let lower = content.to_lowercase();
    let cleaned = KEYWORD_NOISE_RE.replace_all(&lower, " ");

    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, word) in cleaned.split_whitespace().enumerate() {
        if word.chars().count() < min_len || STOP_WORDS.contains(&word) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    ranked
        .into_iter()
        .take(top)
        .map(|(word, _)| word.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile(name: &str, title: &str, purpose: &str, keywords: &[&str]) -> Profile {
        Profile {
            path: PathBuf::from(name),
            name: name.to_string(),
            title: title.to_string(),
            purpose: purpose.to_string(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    fn write_entry(root: &Path, name: &str, body: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), body).unwrap();
    }

    #[test]
    fn jaccard_bounds() {
        let a: HashSet<&str> = ["x", "y"].into_iter().collect();
        let b: HashSet<&str> = ["y", "z"].into_iter().collect();
        let empty: HashSet<&str> = HashSet::new();
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
        assert!((jaccard(&a, &a) - 1.0).abs() < f64::EPSILON);
        assert!(jaccard(&a, &empty).abs() < f64::EPSILON);
    }

    #[test]
    fn self_similarity_is_one() {
        let a = profile("lint-code", "Lint Code", "Run linters", &["lint", "code"]);
        let (score, fields) = SimilarityChecker::default().compare(&a, &a);
        assert!((score - 1.0).abs() < 1e-9);
        assert!((fields.name - 1.0).abs() < f64::EPSILON);
        assert_eq!(fields.keyword_overlap, 2);
    }

    #[test]
    fn disjoint_profiles_score_zero() {
        let a = profile("lint-code", "Lint Code", "Run linters", &["lint"]);
        let b = profile("deploy-app", "Deploy App", "Ship builds", &["ship"]);
        let (score, _) = SimilarityChecker::default().compare(&a, &b);
        assert!(score.abs() < f64::EPSILON);
    }

    #[test]
    fn weights_combine_fields() {
        // only the name matches
        let a = profile("review", "One", "alpha", &["k1"]);
        let b = profile("review", "Two", "beta", &["k2"]);
        let (score, _) = SimilarityChecker::default().compare(&a, &b);
        assert!((score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn keywords_rank_by_frequency_and_skip_stop_words() {
        let text = "The deploy script will deploy the app. Deploy again; app app app. it is ok";
        let words = keywords(text, 20, 3);
        assert_eq!(words[0], "app");
        assert_eq!(words[1], "deploy");
        assert!(!words.contains(&"the".to_string()));
        assert!(!words.contains(&"ok".to_string()));
        assert_eq!(keywords(text, 1, 3), vec!["app"]);
    }

    #[test]
    fn check_ranks_filters_and_flags_conflicts() {
        let checker = SimilarityChecker::default();
        let candidate = profile("lint-rust", "Lint Rust", "Lint rust code", &["lint", "rust"]);
        let catalog = vec![
            profile("lint-rust", "Lint Rust", "Lint rust code", &["lint", "rust"]),
            profile("lint-python", "Lint Python", "Lint python code", &["lint", "python"]),
            profile("bake-bread", "Bake Bread", "Make dough", &["flour"]),
        ];

        let report = checker.check(&candidate, &catalog, 0.7);
        assert_eq!(report.compared, 3);
        assert_eq!(report.similarities.len(), 2);
        assert_eq!(report.similarities[0].name, "lint-rust");
        assert_eq!(report.conflicts.len(), 1);
        assert!(report.has_conflict);
    }

    #[test]
    fn conflicts_survive_display_truncation() {
        let config = SimilarityConfig {
            display_limit: 1,
            ..SimilarityConfig::default()
        };
        let checker = SimilarityChecker::new(config);
        let candidate = profile("same", "Same", "Same", &["same"]);
        let catalog = vec![candidate.clone(), candidate.clone(), candidate.clone()];

        let report = checker.check(&candidate, &catalog, 0.5);
        assert_eq!(report.similarities.len(), 1);
        assert_eq!(report.conflicts.len(), 3);
    }

    #[test]
    fn catalog_skips_hidden_and_unprofiled_entries() {
        let temp = TempDir::new().unwrap();
        write_entry(temp.path(), "proc-linting-skill", "# Lint\n\n- Purpose: lint code\n");
        write_entry(temp.path(), ".hidden", "# Hidden\n");
        std::fs::create_dir_all(temp.path().join("empty-entry")).unwrap();

        let catalog = load_catalog(temp.path(), &SimilarityConfig::default());
        assert_eq!(catalog.value.len(), 1);
        assert_eq!(catalog.value[0].name, "proc-linting-skill");
        assert_eq!(catalog.value[0].purpose, "lint code");
        assert!(catalog.has_issue(SoftIssueKind::UnprofiledEntry));
    }

    #[test]
    fn missing_catalog_is_empty() {
        let temp = TempDir::new().unwrap();
        let catalog = load_catalog(&temp.path().join("nope"), &SimilarityConfig::default());
        assert!(catalog.value.is_empty());
        assert!(catalog.is_confident());
    }
}
