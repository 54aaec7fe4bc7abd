//! Dependency hints from prose and embedded code.
//!
//! Shared by the analyzer and the requirements checker so both see the same
//! vocabulary.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::markdown::code_fences;

/// Command-line tools recognized in shell snippets and dependency sections.
pub const KNOWN_CLI_TOOLS: &[&str] = &[
    "gh", "git", "jq", "curl", "wget", "docker", "kubectl", "npm", "node", "yarn", "pip",
    "python", "python3", "terraform", "ansible", "aws", "gcloud", "az",
];

/// Python modules that never count as third-party dependencies.
pub const PYTHON_STDLIB: &[&str] = &[
    "os",
    "sys",
    "re",
    "json",
    "pathlib",
    "subprocess",
    "argparse",
    "typing",
    "collections",
    "itertools",
    "functools",
    "datetime",
];

const SHELL_LANGS: &[&str] = &["bash", "sh", "shell", "zsh", "console"];
const MAX_ITEM_CHARS: usize = 50;

static SECTION_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^##\s+(?:dependencies|依存関係)\s*$").expect("valid regex")
});
static NEXT_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##?\s").expect("valid regex"));
static PY_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:import|from)\s+([A-Za-z_][\w.]*)").expect("valid regex")
});
static JS_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:require\s*\(\s*|import\s*\(?\s*|from\s+)['"]([^'")]+)"#).expect("valid regex")
});
static BOLD_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*(.+?)\*\*").expect("valid regex"));
static CODE_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`(.+?)`").expect("valid regex"));
static TOOL_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    KNOWN_CLI_TOOLS
        .iter()
        .map(|tool| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(tool))).expect("valid regex");
            (*tool, re)
        })
        .collect()
});

/// Body of the `## Dependencies` section, up to the next heading.
#[must_use]
pub fn dependency_section(content: &str) -> Option<&str> {
    let heading = SECTION_HEADING_RE.find(content)?;
    let rest = &content[heading.end()..];
    let end = NEXT_HEADING_RE.find(rest).map_or(rest.len(), |m| m.start());
    Some(&rest[..end])
}

/// List items of the dependency section, reduced to their leading name.
#[must_use]
pub fn section_items(section: &str) -> Vec<String> {
    section
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let item = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))?
                .trim();
            let name = BOLD_ITEM_RE
                .captures(item)
                .or_else(|| CODE_ITEM_RE.captures(item))
                .and_then(|caps| caps.get(1))
                .map_or_else(
                    || item.split(':').next().unwrap_or_default(),
                    |m| m.as_str(),
                )
                .trim()
                .to_string();
            (!name.is_empty() && name.chars().count() < MAX_ITEM_CHARS).then_some(name)
        })
        .collect()
}

/// Known CLI tools mentioned as whole words in `text`.
#[must_use]
pub fn cli_tools(text: &str) -> Vec<&'static str> {
    TOOL_RES
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(tool, _)| *tool)
        .collect()
}

/// Top-level third-party modules imported by Python source.
#[must_use]
pub fn python_imports(code: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in PY_IMPORT_RE.captures_iter(code) {
        let base = caps[1].split('.').next().unwrap_or_default();
        if base.is_empty() || PYTHON_STDLIB.contains(&base) {
            continue;
        }
        if !out.iter().any(|m| m == base) {
            out.push(base.to_string());
        }
    }
    out
}

/// Packages pulled in by `require(...)` or `import ... from` in JavaScript.
#[must_use]
pub fn js_imports(code: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in JS_IMPORT_RE.captures_iter(code) {
        let module = caps[1].trim();
        if module.starts_with('.') || module.starts_with('/') {
            continue;
        }
        if !out.iter().any(|m| m == module) {
            out.push(module.to_string());
        }
    }
    out
}

/// Dependency hints for a document: section items first, then tools and
/// modules found in shell and Python fences, in order of first appearance.
#[must_use]
pub fn extract_dependencies(content: &str) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !deps.contains(&name) {
            deps.push(name);
        }
    };

    if let Some(section) = dependency_section(content) {
        section_items(section).into_iter().for_each(&mut push);
    }

    for fence in code_fences(content) {
        let lang = fence.lang.split_whitespace().next().unwrap_or_default();
        if SHELL_LANGS.contains(&lang) {
            cli_tools(&fence.body)
                .into_iter()
                .for_each(|tool| push(tool.to_string()));
        } else if lang == "python" || lang == "py" {
            cli_tools(&fence.body)
                .into_iter()
                .for_each(|tool| push(tool.to_string()));
            python_imports(&fence.body).into_iter().for_each(&mut push);
        }
    }

    deps
}
