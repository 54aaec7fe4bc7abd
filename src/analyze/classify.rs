//! Behavioral detectors over the primary document text.
//!
//! Each detector is independent; the namer decides what wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::AnalysisConfig;
use crate::core::{AutonomyLevel, Characteristics};

const ORCHESTRATOR_TERMS: &[&str] = &[
    "orchestrat",
    "coordinat",
    "delegat",
    "routing",
    "parallel",
    "オーケストレーション",
    "統合",
    "振り分け",
    "委任",
];

const SPECIALIST_TERMS: &[&str] = &[
    "expert",
    "specialist",
    "analyst",
    "specific",
    "domain",
    "専門家",
    "エキスパート",
    "専門",
    "ドメイン",
];

const WORKFLOW_TERMS: &[&str] = &[
    "workflow",
    "ワークフロー",
    "step 1",
    "step 2",
    "plan",
    "execute",
    "verify",
];

static PROCEDURAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"step \d+|## \d+\.|workflow|procedure|ワークフロー|手順").expect("valid regex")
});
static IF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bif\b").expect("valid regex"));
static CONDITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"条件|condition|判断|判定").expect("valid regex"));
static STEP_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Step \d+|## \d+\.|### \d+\.").expect("valid regex"));

pub fn is_procedural(lower: &str) -> bool {
    PROCEDURAL_RE.is_match(lower)
}

pub fn is_conditional(lower: &str, config: &AnalysisConfig) -> bool {
    IF_RE.find_iter(lower).count() > config.conditional_if_threshold
        || CONDITION_RE.find_iter(lower).count() > config.conditional_marker_threshold
}

pub fn is_orchestrator(lower: &str) -> bool {
    ORCHESTRATOR_TERMS.iter().any(|term| lower.contains(term))
}

pub fn is_specialist(lower: &str) -> bool {
    SPECIALIST_TERMS.iter().any(|term| lower.contains(term))
}

pub fn has_workflow(content: &str) -> bool {
    let lower = content.to_lowercase();
    WORKFLOW_TERMS.iter().any(|term| lower.contains(term))
}

#[must_use]
pub fn characteristics(content: &str, config: &AnalysisConfig) -> Characteristics {
    let lower = content.to_lowercase();
    let procedural = is_procedural(&lower);
    Characteristics {
        procedural,
        single_action: !procedural && content.chars().count() < config.short_document_chars,
        conditional: is_conditional(&lower, config),
        orchestrator: is_orchestrator(&lower),
        specialist: is_specialist(&lower),
    }
}

/// `script_count` is the number of entries directly under `scripts/`.
#[must_use]
pub fn autonomy(content: &str, script_count: usize, config: &AnalysisConfig) -> AutonomyLevel {
    if script_count > config.script_count_threshold {
        AutonomyLevel::Low
    } else if STEP_MARKER_RE.is_match(content) {
        AutonomyLevel::Medium
    } else if content.chars().count() < config.high_autonomy_chars && script_count == 0 {
        AutonomyLevel::High
    } else {
        AutonomyLevel::Medium
    }
}
