//! Canonical names under the kind × sub-type taxonomy.
//!
//! Naming is a pure function of the analysis record: the same record always
//! yields the same [`NamingDecision`].

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{AnalysisRecord, NamingDecision, ResourceKind, SubType};

/// Used when normalization leaves nothing.
pub const FALLBACK_NAME: &str = "unnamed";

const SUBTYPE_TOKENS: &[&str] = &["proc", "action", "cond", "shihan", "deshi"];
const KIND_SUFFIXES: &[&str] = &["skill", "agent"];

/// Verb stem -> present participle. Exact token matches only.
const GERUNDS: &[(&str, &str)] = &[
    ("analyse", "analysing"),
    ("analyze", "analyzing"),
    ("audit", "auditing"),
    ("build", "building"),
    ("check", "checking"),
    ("clean", "cleaning"),
    ("commit", "committing"),
    ("compile", "compiling"),
    ("configure", "configuring"),
    ("convert", "converting"),
    ("coordinate", "coordinating"),
    ("create", "creating"),
    ("debug", "debugging"),
    ("deploy", "deploying"),
    ("design", "designing"),
    ("document", "documenting"),
    ("execute", "executing"),
    ("export", "exporting"),
    ("fetch", "fetching"),
    ("fix", "fixing"),
    ("format", "formatting"),
    ("generate", "generating"),
    ("handle", "handling"),
    ("import", "importing"),
    ("install", "installing"),
    ("lint", "linting"),
    ("manage", "managing"),
    ("merge", "merging"),
    ("migrate", "migrating"),
    ("monitor", "monitoring"),
    ("optimize", "optimizing"),
    ("orchestrate", "orchestrating"),
    ("parse", "parsing"),
    ("plan", "planning"),
    ("process", "processing"),
    ("publish", "publishing"),
    ("refactor", "refactoring"),
    ("release", "releasing"),
    ("review", "reviewing"),
    ("run", "running"),
    ("scan", "scanning"),
    ("search", "searching"),
    ("summarize", "summarizing"),
    ("sync", "syncing"),
    ("test", "testing"),
    ("transform", "transforming"),
    ("translate", "translating"),
    ("update", "updating"),
    ("validate", "validating"),
    ("verify", "verifying"),
    ("write", "writing"),
];

static CAMEL_LOWER_UPPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));
static CAMEL_ACRONYM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w-]+").expect("valid regex"));
static HYPHEN_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

/// One row of a sub-type table. Rows are evaluated top-down; the first
/// matching row wins.
#[derive(Clone, Copy)]
pub struct SubTypeRule {
    pub tag: SubType,
    pub applies: fn(&AnalysisRecord) -> bool,
}

fn is_conditional(record: &AnalysisRecord) -> bool {
    record.characteristics.conditional
}

fn is_procedural(record: &AnalysisRecord) -> bool {
    record.characteristics.procedural || record.has_workflow
}

fn is_single_action(record: &AnalysisRecord) -> bool {
    record.characteristics.single_action
}

fn is_orchestrator(record: &AnalysisRecord) -> bool {
    record.characteristics.orchestrator
}

fn is_specialist(record: &AnalysisRecord) -> bool {
    record.characteristics.specialist
}

pub const SKILL_RULES: &[SubTypeRule] = &[
    SubTypeRule { tag: SubType::Cond, applies: is_conditional },
    SubTypeRule { tag: SubType::Proc, applies: is_procedural },
    SubTypeRule { tag: SubType::Action, applies: is_single_action },
];

pub const AGENT_RULES: &[SubTypeRule] = &[
    SubTypeRule { tag: SubType::Shihan, applies: is_orchestrator },
    SubTypeRule { tag: SubType::Deshi, applies: is_specialist },
];

#[must_use]
pub const fn rules_for(kind: ResourceKind) -> (&'static [SubTypeRule], SubType) {
    match kind {
        ResourceKind::Skill => (SKILL_RULES, SubType::Proc),
        ResourceKind::Agent => (AGENT_RULES, SubType::Deshi),
    }
}

#[must_use]
pub fn sub_type(record: &AnalysisRecord) -> SubType {
    let (rules, default) = rules_for(record.resource_kind);
    rules
        .iter()
        .find(|rule| (rule.applies)(record))
        .map_or(default, |rule| rule.tag)
}

/// Lowercase hyphen-delimited form of `name`, without taxonomy prefixes or
/// kind suffixes. May be empty.
#[must_use]
pub fn to_kebab(name: &str) -> String {
    let name = CAMEL_LOWER_UPPER_RE.replace_all(name, "${1}-${2}");
    let name = CAMEL_ACRONYM_RE.replace_all(&name, "${1}-${2}");
    let name = name.replace('_', "-");
    let name = NON_WORD_RE.replace_all(&name, "-");
    let name = HYPHEN_RUN_RE.replace_all(&name, "-");
    let name = name.trim_matches('-').to_lowercase();

    let mut tokens: Vec<&str> = name.split('-').filter(|t| !t.is_empty()).collect();
    if tokens.len() > 1 && SUBTYPE_TOKENS.contains(&tokens[0]) {
        tokens.remove(0);
    }
    if tokens.len() > 1 && tokens.last().is_some_and(|t| KIND_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join("-")
}

/// Replace every token that is a known verb stem with its participle.
#[must_use]
pub fn to_gerund(kebab: &str) -> String {
    kebab
        .split('-')
        .map(|token| {
            GERUNDS
                .iter()
                .find(|(stem, _)| *stem == token)
                .map_or(token, |(_, participle)| *participle)
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Namer;

impl Namer {
    /// Name `record` using its own `original_name`.
    #[must_use]
    pub fn name(&self, record: &AnalysisRecord) -> NamingDecision {
        self.name_as(record, &record.original_name)
    }

    #[must_use]
    pub fn name_as(&self, record: &AnalysisRecord, original_name: &str) -> NamingDecision {
        let mut kebab_name = to_kebab(original_name);
        if kebab_name.is_empty() {
            kebab_name = FALLBACK_NAME.to_string();
        }

        let kind = record.resource_kind;
        let sub_type = sub_type(record);
        let canonical_name = match kind {
            ResourceKind::Skill => format!("{sub_type}-{}-skill", to_gerund(&kebab_name)),
            ResourceKind::Agent => format!("{sub_type}-{kebab_name}"),
        };

        NamingDecision {
            original_name: original_name.to_string(),
            target_path: format!("{}/{canonical_name}", kind.plural()),
            kebab_name,
            canonical_name,
            sub_type,
            resource_kind: kind,
        }
    }
}
